//! End-to-end DTE scenarios, driven straight through the dispatcher with an
//! in-memory DTE sink and no stored profiles/phonebook on disk — the way the
//! teacher crate's parser tests feed canned strings through rather than
//! standing up real sockets.

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Mutex;

use hayesd::dte::DteWriter;
use hayesd::modem::dispatcher;
use hayesd::modem::Modem;

struct RecordingWriter {
    buf: Arc<StdMutex<Vec<u8>>>,
}

#[async_trait]
impl DteWriter for RecordingWriter {
    async fn write_bytes(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn harness() -> (hayesd::modem::Shared, hayesd::modem::DteSink, Arc<StdMutex<Vec<u8>>>, TempDir) {
    let dir = TempDir::new().unwrap();
    let profiles_path = dir.path().join("hayes.config.json");
    let phonebook_path = dir.path().join("phonebook");
    let modem = Modem::new(&profiles_path, Some(&phonebook_path), None);
    let buf = Arc::new(StdMutex::new(Vec::new()));
    let dte: hayesd::modem::DteSink = Arc::new(Mutex::new(Box::new(RecordingWriter { buf: buf.clone() })));
    (modem, dte, buf, dir)
}

fn output(buf: &Arc<StdMutex<Vec<u8>>>) -> String {
    let bytes = buf.lock().unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn bare_at_returns_ok() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "AT").await;
    assert!(output(&buf).contains("OK"));
}

#[tokio::test]
async fn unknown_opcode_returns_error() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATJ1").await;
    assert!(output(&buf).contains("ERROR"));
}

#[tokio::test]
async fn echo_setting_toggles() {
    let (modem, dte, _buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATE0").await;
    assert!(!modem.lock().await.settings.echo_in_cmd_mode);
    dispatcher::run_line(&modem, &dte, "ATE1").await;
    assert!(modem.lock().await.settings.echo_in_cmd_mode);
}

#[tokio::test]
async fn register_write_then_query_round_trips() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATS2=43").await;
    assert!(output(&buf).contains("OK"));
    dispatcher::run_line(&modem, &dte, "ATS2?").await;
    assert!(output(&buf).contains("43"));
}

#[tokio::test]
async fn invalid_register_value_is_rejected() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATS8=100").await;
    assert!(output(&buf).contains("ERROR"));
}

#[tokio::test]
async fn dial_unknown_number_is_error() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATDT5551212").await;
    assert!(output(&buf).contains("ERROR"));
    assert!(modem.lock().await.signals.check_busy());
}

#[tokio::test]
async fn hangup_without_connection_is_ok_not_no_carrier() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATH0").await;
    assert!(output(&buf).contains("OK"));
    assert!(!output(&buf).contains("NO CARRIER"));
}

#[tokio::test]
async fn info_banner_reports_identification_string() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATI0").await;
    assert!(output(&buf).contains("14400"));
}

#[tokio::test]
async fn amper_v_dump_contains_expected_sections() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "AT&V").await;
    let text = output(&buf);
    assert!(text.contains("ACTIVE PROFILE:"));
    assert!(text.contains("TELEPHONE NUMBERS:"));
}

#[tokio::test]
async fn factory_reset_clears_line_busy_and_last_dialed() {
    let (modem, dte, _buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATDT5551212").await;
    dispatcher::run_line(&modem, &dte, "AT&F").await;
    let m = modem.lock().await;
    assert!(!m.signals.check_busy());
    assert!(m.last_dialed.is_none());
}

#[tokio::test]
async fn quiet_mode_suppresses_result_codes() {
    let (modem, dte, buf, _dir) = harness();
    dispatcher::run_line(&modem, &dte, "ATQ1").await;
    dispatcher::run_line(&modem, &dte, "ATE1").await;
    assert!(output(&buf).is_empty());
}
