#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]

//! # hayesd
//!
//! Hayes AT-command smart-modem emulator.
//!
//! A connected terminal issues `AT`-prefixed commands exactly as it would to
//! a real Hayes-compatible modem; this crate parses them, mutates register
//! and configuration state, drives simulated control lines and indicator
//! LEDs, and — on `ATD…` — bridges the DTE byte stream to an outbound
//! TELNET or SSH connection.
//!
//! - `modem` — the control plane: registers, settings, stored profiles,
//!   phonebook, signal state, command lexer/dispatcher, byte pump, ringer
//! - `transport` — the `Connection` capability plus TELNET/SSH dialers
//! - `dte` — the `Dte` capability plus serial-port and TCP-socket adapters
//! - `net` — inbound TELNET/SSH listeners
//! - `led` — LED event sink
//! - `config` — configuration loading
//! - `error` — the `ResultCode` taxonomy

pub mod config;
pub mod dte;
pub mod error;
pub mod led;
pub mod modem;
pub mod net;
pub mod transport;
pub mod util;

pub use config::Config;
pub use error::ResultCode;
pub use modem::Modem;
