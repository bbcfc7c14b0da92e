//! The two-mode byte pump: one cooperative loop selecting between a DTE
//! byte and an escape-guard timer tick, accumulating COMMAND-mode lines and
//! relaying DATA-mode bytes while watching for the `+++` escape sequence.

use std::time::Duration;

use tokio::time::{self, Interval};

use super::dispatcher;
use super::registers::{REG_BS_CH, REG_CR_CH, REG_ESC_CH, REG_ESC_CODE_GUARD_TIME};
use super::signals::Mode;
use super::{DteSink, Shared};
use crate::dte::DteReader;
use crate::error::ResultCode;
use crate::transport::Connection;

/// How often the pump polls an active connection for inbound bytes while
/// in DATA mode. Bounded so a read that never returns doesn't starve the
/// modem lock for longer than this.
const CONN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The escape-sequence detector's transient state. Reset whenever `S2`
/// (the escape character) or `S12` (the guard time) changes underneath it —
/// reproduced as counters-and-flags exactly as described in the reference
/// semantics, not as an `{IDLE, SAW_GUARD, CONFIRMED}` enum, since the
/// counter formulation is what the reference implementation tests against.
pub struct EscapeDetector {
    last_three: [u8; 3],
    idx: usize,
    count_at_tick: u32,
    count_at_last_tick: u32,
    wait_for_one_tick: bool,
}

impl EscapeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_three: [b' '; 3],
            idx: 0,
            count_at_tick: 0,
            count_at_last_tick: 0,
            wait_for_one_tick: false,
        }
    }

    /// A register that feeds the detector changed; drop anything
    /// in-flight rather than let a stale buffer trigger a switch to
    /// COMMAND mode against the new configuration.
    pub fn reset_on_register_change(&mut self) {
        self.last_three = [b' '; 3];
        self.idx = 0;
        self.wait_for_one_tick = false;
    }

    fn on_data_byte(&mut self, byte: u8, esc_ch: u8) {
        if byte == esc_ch {
            self.last_three[self.idx] = byte;
            self.idx = (self.idx + 1) % 3;
        } else {
            self.last_three = [b' '; 3];
            self.idx = 0;
        }
        self.count_at_tick += 1;
    }

    /// Returns `true` when this tick confirms the escape sequence and the
    /// pump should switch back to COMMAND mode.
    fn on_tick(&mut self, esc_ch: u8) -> bool {
        let confirm = if self.count_at_tick == 3
            && self.count_at_last_tick == 0
            && self.last_three == [esc_ch; 3]
        {
            self.wait_for_one_tick = true;
            false
        } else if self.wait_for_one_tick && self.count_at_tick == 0 {
            true
        } else {
            self.wait_for_one_tick = false;
            false
        };
        self.count_at_last_tick = self.count_at_tick;
        self.count_at_tick = 0;
        confirm
    }
}

impl Default for EscapeDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn guard_interval(guard_time_units: u8) -> Interval {
    // 20ms x S12.
    let period = Duration::from_millis(20 * u64::from(guard_time_units.max(1)));
    time::interval(period)
}

/// Run the byte pump until the DTE reader ends (peer closed / device gone).
pub async fn run(modem: Shared, dte_sink: DteSink, mut reader: Box<dyn DteReader>) {
    let mut detector = EscapeDetector::new();
    let mut accumulator = String::new();
    let mut ticker = guard_interval(50);
    let mut guard_time_cache: u8 = 50;
    let mut conn_ticker = time::interval(CONN_POLL_INTERVAL);

    loop {
        let mode = modem.lock().await.signals.mode();
        tokio::select! {
            byte = reader.read_byte() => {
                let Ok(byte) = byte else { break };
                let (cr, bs, esc) = {
                    let m = modem.lock().await;
                    (
                        m.registers.read(REG_CR_CH).unwrap_or(13),
                        m.registers.read(REG_BS_CH).unwrap_or(8),
                        m.registers.read(REG_ESC_CH).unwrap_or(b'+'),
                    )
                };
                match mode {
                    Mode::Command => {
                        handle_command_byte(&modem, &dte_sink, &mut accumulator, byte, cr, bs).await;
                    }
                    Mode::Data => {
                        detector.on_data_byte(byte, esc);
                        relay_data_byte(&modem, byte).await;
                    }
                }
            }
            _ = ticker.tick() => {
                if mode != Mode::Data {
                    continue;
                }
                let esc = modem.lock().await.registers.read(REG_ESC_CH).unwrap_or(b'+');
                if detector.on_tick(esc) {
                    modem.lock().await.signals.set_mode(Mode::Command);
                    dispatcher::emit_code(&dte_sink, &modem, ResultCode::Ok).await;
                    accumulator.clear();
                }
            }
            _ = conn_ticker.tick() => {
                poll_conn_to_dte(&modem, &dte_sink).await;
            }
        }

        let guard_time = modem
            .lock()
            .await
            .registers
            .read(REG_ESC_CODE_GUARD_TIME)
            .unwrap_or(50);
        if guard_time != guard_time_cache {
            guard_time_cache = guard_time;
            ticker = guard_interval(guard_time);
            detector.reset_on_register_change();
        }
    }
}

async fn handle_command_byte(
    modem: &Shared,
    dte: &DteSink,
    accumulator: &mut String,
    byte: u8,
    cr: u8,
    bs: u8,
) {
    let echo = modem.lock().await.settings.echo_in_cmd_mode;
    if echo {
        let _ = dte.lock().await.write_bytes(&[byte]).await;
    }

    if (accumulator.eq_ignore_ascii_case("a")) && byte == b'/' {
        let _ = dte.lock().await.write_bytes(b"\r\n").await;
        dispatcher::rerun_last(modem, dte).await;
        accumulator.clear();
        return;
    }

    if byte == cr {
        if !accumulator.is_empty() {
            let line = accumulator.clone();
            dispatcher::run_line(modem, dte, &line).await;
        }
        accumulator.clear();
        return;
    }

    if byte == bs {
        if !accumulator.is_empty() {
            accumulator.pop();
        }
        return;
    }

    accumulator.push(byte as char);
}

async fn relay_data_byte(modem: &Shared, byte: u8) {
    let mut m = modem.lock().await;
    if !m.signals.is_off_hook() || m.conn.is_none() {
        return;
    }
    m.signals.toggle_send_data_led(true);
    if let Some(conn) = m.conn.as_mut() {
        let _ = conn.write(&[byte]).await;
    }
    m.signals.toggle_send_data_led(false);
}

/// Bridge conn -> DTE: while in DATA mode with an active connection, take a
/// brief look for inbound bytes and relay them. A short timeout bounds how
/// long this holds the modem lock, since a connection with nothing to say
/// would otherwise block every other task waiting on `modem`.
async fn poll_conn_to_dte(modem: &Shared, dte_sink: &DteSink) {
    let mut buf = [0u8; 512];
    let outcome = {
        let mut m = modem.lock().await;
        if m.signals.mode() != Mode::Data {
            return;
        }
        let Some(conn) = m.conn.as_mut() else { return };
        match time::timeout(Duration::from_millis(15), conn.read(&mut buf)).await {
            Ok(result) => Some(result),
            Err(_) => None,
        }
    };
    match outcome {
        Some(Ok(0)) | Some(Err(_)) => handle_remote_close(modem, dte_sink).await,
        Some(Ok(n)) => {
            let _ = dte_sink.lock().await.write_bytes(&buf[..n]).await;
        }
        None => {}
    }
}

/// The far end closed the connection (or errored) while in DATA mode —
/// the same state transition as a manual `ATH0`, triggered from the remote
/// side instead of the DTE.
async fn handle_remote_close(modem: &Shared, dte_sink: &DteSink) {
    let code = dispatcher::hangup(modem, dte_sink).await;
    dispatcher::emit_code(dte_sink, modem, code).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirms_escape_after_silence_then_silence() {
        let mut d = EscapeDetector::new();
        d.on_data_byte(b'+', b'+');
        d.on_data_byte(b'+', b'+');
        d.on_data_byte(b'+', b'+');
        assert!(!d.on_tick(b'+')); // first tick after 3 plusses: armed, not yet confirmed
        assert!(d.on_tick(b'+')); // silent tick confirms
    }

    #[test]
    fn fewer_than_three_plusses_never_confirms() {
        let mut d = EscapeDetector::new();
        d.on_data_byte(b'+', b'+');
        d.on_data_byte(b'+', b'+');
        assert!(!d.on_tick(b'+'));
        assert!(!d.on_tick(b'+'));
    }

    #[test]
    fn byte_during_guard_window_resets_arming() {
        let mut d = EscapeDetector::new();
        d.on_data_byte(b'+', b'+');
        d.on_data_byte(b'+', b'+');
        d.on_data_byte(b'+', b'+');
        assert!(!d.on_tick(b'+'));
        d.on_data_byte(b'x', b'+');
        assert!(!d.on_tick(b'+'));
    }

    #[test]
    fn more_than_three_plusses_in_one_window_never_confirms() {
        let mut d = EscapeDetector::new();
        for _ in 0..4 {
            d.on_data_byte(b'+', b'+');
        }
        assert!(!d.on_tick(b'+'));
        assert!(!d.on_tick(b'+'));
    }
}
