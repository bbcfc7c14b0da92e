//! LED event sink. The core only ever emits pure [`crate::modem::signals::LedEvent`]s;
//! this task is the ambient collaborator that would drive real GPIO. Here it
//! just logs transitions.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::modem::signals::LedEvent;

pub async fn run(mut rx: UnboundedReceiver<LedEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            LedEvent::Aa(on) => info!(led = "AA", state = on, "indicator changed"),
            LedEvent::Oh(on) => info!(led = "OH", state = on, "indicator changed"),
            LedEvent::Hs(on) => info!(led = "HS", state = on, "indicator changed"),
            LedEvent::Sd(on) => info!(led = "SD", state = on, "indicator changed"),
        }
    }
}
