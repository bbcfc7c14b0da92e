//! The modem core: one `Modem` holding every piece of mutable state named in
//! the data model, shared behind a single mutex plus a channel for inbound
//! connections, exactly as laid out in the concurrency design.

pub mod dispatcher;
pub mod parser;
pub mod phonebook;
pub mod profiles;
pub mod pump;
pub mod registers;
pub mod ringer;
pub mod settings;
pub mod signals;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::warn;

use crate::dte::DteWriter;
use crate::transport::Connection;
use phonebook::Phonebook;
use profiles::StoredProfiles;
use registers::Registers;
use settings::Settings;
use signals::{LedEvent, Signals};

/// Every piece of mutable modem state, behind one lock so the pump, ringer,
/// and dispatcher never have to reason about lock ordering between pieces.
pub struct Modem {
    pub registers: Registers,
    pub settings: Settings,
    pub profiles: StoredProfiles,
    pub phonebook: Phonebook,
    pub signals: Signals,
    pub conn: Option<Box<dyn Connection>>,
    /// An inbound call mid-ring, not yet handed over to `conn`. Owned by
    /// the ringer task until answered (manually or automatically) or given
    /// up on.
    pub pending_call: Option<Box<dyn Connection>>,
    pub last_cmd: Option<String>,
    pub last_dialed: Option<String>,
    pub connect_speed: u32,
}

pub type Shared = Arc<Mutex<Modem>>;
pub type DteSink = Arc<Mutex<Box<dyn DteWriter>>>;

impl Modem {
    /// Load stored profiles and the phonebook, apply the power-up profile
    /// when one is selected, and wrap the result for sharing across tasks.
    #[must_use]
    pub fn new(
        profiles_path: impl AsRef<Path>,
        phonebook_path: Option<impl AsRef<Path>>,
        led_tx: Option<UnboundedSender<LedEvent>>,
    ) -> Shared {
        let (profiles, err) = StoredProfiles::load(profiles_path);
        if let Some(e) = err {
            warn!(error = %e, "stored profiles unavailable, starting from factory defaults");
        }

        let mut registers = Registers::new();
        let mut settings = Settings::new();
        if profiles.power_up_config() >= 0 {
            if let Ok((s, r)) = profiles.switch(profiles.power_up_config()) {
                settings = s;
                registers = r;
            }
        }

        let phonebook = match phonebook_path {
            Some(p) => Phonebook::load(p),
            None => Phonebook::new(),
        };

        Arc::new(Mutex::new(Modem {
            registers,
            settings,
            profiles,
            phonebook,
            signals: Signals::new(led_tx),
            conn: None,
            pending_call: None,
            last_cmd: None,
            last_dialed: None,
            connect_speed: 0,
        }))
    }
}
