//! Ring cadence for an inbound call: 2s on, 4s off, up to ten rings, with
//! auto-answer once the ring count reaches `S0` and write-based probing so a
//! caller that hangs up mid-ring doesn't ring forever into dead air.

use std::time::Duration;

use tracing::info;

use super::dispatcher;
use super::registers::{REG_AUTO_ANSWER, REG_CARRIER_DETECT_RESPONSE_TIME, REG_RING_COUNT};
use super::signals::Mode;
use super::{DteSink, Shared};
use crate::error::ResultCode;
use crate::transport::Connection;

pub(crate) const MAX_RINGS: u32 = 10;
/// Transport-level dial timeout: the time a caller would wait for this
/// modem to exhaust its ring cycles before giving up.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(MAX_RINGS as u64 * 6);
const RING_ON: Duration = Duration::from_secs(2);
const RING_OFF: Duration = Duration::from_secs(4);
const PROBE_INTERVAL: Duration = Duration::from_millis(20);

enum ProbeOutcome {
    Continue,
    PeerClosed,
    OffHook,
}

/// Drive one inbound call through the ring cadence until it is answered
/// (manually via `ATA` or automatically via `S0`), the caller hangs up, or
/// the ring count is exhausted.
pub async fn ring(modem: Shared, dte: DteSink, conn: Box<dyn Connection>) {
    {
        let mut m = modem.lock().await;
        if m.signals.check_busy() {
            let mut conn = conn;
            let _ = conn.close().await;
            return;
        }
        m.signals.set_line_busy(true);
        m.registers.write(REG_RING_COUNT, 0).ok();
        m.pending_call = Some(conn);
    }

    for _ in 0..MAX_RINGS {
        if !write_to_pending(&modem, b"Ringing...\r\n").await {
            give_up(&modem).await;
            return;
        }
        if modem.lock().await.signals.is_off_hook() {
            install_pending_call(&modem).await;
            return;
        }

        modem.lock().await.signals.set_ri(true);
        match probe_window(&modem, RING_ON).await {
            ProbeOutcome::OffHook => {
                install_pending_call(&modem).await;
                return;
            }
            ProbeOutcome::PeerClosed => {
                info!("caller hung up during ringing");
                give_up(&modem).await;
                return;
            }
            ProbeOutcome::Continue => {}
        }

        modem.lock().await.signals.set_ri(false);
        let _ = dte.lock().await.println("RING").await;

        let count = modem.lock().await.registers.inc(REG_RING_COUNT);
        let auto_answer = modem.lock().await.registers.read(REG_AUTO_ANSWER).unwrap_or(0);
        if auto_answer > 0 && u32::from(count) >= u32::from(auto_answer) {
            answer_call(&modem, &dte).await;
            return;
        }

        match probe_window(&modem, RING_OFF).await {
            ProbeOutcome::OffHook => {
                install_pending_call(&modem).await;
                return;
            }
            ProbeOutcome::PeerClosed => {
                info!("caller hung up during ringing");
                give_up(&modem).await;
                return;
            }
            ProbeOutcome::Continue => {}
        }
    }

    give_up(&modem).await;
}

/// Auto-answer on `S0`: same carrier-detect delay as a manual `ATA`, then
/// hand the pending call over and emit `CONNECT` ourselves since no DTE
/// command triggered this.
async fn answer_call(modem: &Shared, dte: &DteSink) {
    let delay = modem
        .lock()
        .await
        .registers
        .read(REG_CARRIER_DETECT_RESPONSE_TIME)
        .unwrap_or(30);
    tokio::time::sleep(Duration::from_millis(u64::from(delay) * 100)).await;

    install_pending_call(modem).await;
    let mut m = modem.lock().await;
    m.signals.go_off_hook();
    m.signals.set_dcd(true);
    m.signals.set_mode(Mode::Data);
    m.connect_speed = 38400;
    drop(m);
    dispatcher::emit_code(dte, modem, ResultCode::Connect).await;
}

/// Move the call being rung into `conn`, write the remote-facing
/// "Answered" notice, lower RI, and reset the ring count — shared by the
/// manual-`ATA`-while-ringing handoff and auto-answer.
async fn install_pending_call(modem: &Shared) {
    let mut m = modem.lock().await;
    if let Some(mut conn) = m.pending_call.take() {
        let _ = conn.write(b"Answered\r\n").await;
        m.conn = Some(conn);
    }
    m.signals.set_ri(false);
    m.registers.write(REG_RING_COUNT, 0).ok();
}

/// Ring cycles exhausted, or the caller hung up first: tell the remote,
/// close it, and clear the line.
async fn give_up(modem: &Shared) {
    let mut m = modem.lock().await;
    m.signals.set_ri(false);
    m.signals.set_line_busy(false);
    let conn = m.pending_call.take();
    drop(m);
    if let Some(mut conn) = conn {
        let _ = conn.write(b"No answer, closing connection\r\n").await;
        let _ = conn.close().await;
    }
}

/// Poll for up to `total`, checking every `PROBE_INTERVAL` for a manual
/// off-hook transition or a closed peer (a single zero byte write that
/// fails means the far end is gone).
async fn probe_window(modem: &Shared, total: Duration) -> ProbeOutcome {
    let mut waited = Duration::ZERO;
    while waited < total {
        if modem.lock().await.signals.is_off_hook() {
            return ProbeOutcome::OffHook;
        }
        if !write_to_pending(modem, &[0u8]).await {
            return ProbeOutcome::PeerClosed;
        }
        let step = PROBE_INTERVAL.min(total - waited);
        tokio::time::sleep(step).await;
        waited += step;
    }
    ProbeOutcome::Continue
}

async fn write_to_pending(modem: &Shared, data: &[u8]) -> bool {
    let mut m = modem.lock().await;
    match m.pending_call.as_mut() {
        Some(conn) => conn.write(data).await.is_ok(),
        None => false,
    }
}
