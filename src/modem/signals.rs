//! Hook, line-busy, DCD/DSR/CTS/RI control signals, and the mode flag the
//! byte pump switches on. LED transitions are emitted as pure events over a
//! channel — this module never touches GPIO.

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Data,
}

/// Advisory indicator-LED transitions. `AA` auto-answer, `OH` off-hook,
/// `HS` high-speed/carrier, `SD` send-data (toggled around each data byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    Aa(bool),
    Oh(bool),
    Hs(bool),
    Sd(bool),
}

#[derive(Debug)]
pub struct Signals {
    hook: Hook,
    line_busy: bool,
    dcd: bool,
    dsr: bool,
    cts: bool,
    ri: bool,
    mode: Mode,
    led_tx: Option<UnboundedSender<LedEvent>>,
}

impl Signals {
    #[must_use]
    pub fn new(led_tx: Option<UnboundedSender<LedEvent>>) -> Self {
        Self {
            hook: Hook::On,
            line_busy: false,
            dcd: false,
            dsr: false,
            cts: false,
            ri: false,
            mode: Mode::Command,
            led_tx,
        }
    }

    fn emit(&self, event: LedEvent) {
        if let Some(tx) = &self.led_tx {
            let _ = tx.send(event);
        }
    }

    #[must_use]
    pub fn hook(&self) -> Hook {
        self.hook
    }

    #[must_use]
    pub fn is_off_hook(&self) -> bool {
        self.hook == Hook::Off
    }

    #[must_use]
    pub fn line_busy(&self) -> bool {
        self.line_busy
    }

    pub fn set_line_busy(&mut self, busy: bool) {
        self.line_busy = busy;
    }

    /// `offHook() || lineBusy` — whether the line currently refuses new
    /// incoming calls.
    #[must_use]
    pub fn check_busy(&self) -> bool {
        self.is_off_hook() || self.line_busy
    }

    pub fn go_off_hook(&mut self) {
        self.hook = Hook::Off;
        self.set_line_busy(true);
        self.emit(LedEvent::Oh(true));
    }

    pub fn go_on_hook(&mut self) {
        self.hook = Hook::On;
        self.emit(LedEvent::Oh(false));
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.emit(LedEvent::Hs(mode == Mode::Data));
    }

    #[must_use]
    pub fn dcd(&self) -> bool {
        self.dcd
    }

    pub fn set_dcd(&mut self, v: bool) {
        self.dcd = v;
    }

    #[must_use]
    pub fn dsr(&self) -> bool {
        self.dsr
    }

    pub fn set_dsr(&mut self, v: bool) {
        self.dsr = v;
    }

    #[must_use]
    pub fn cts(&self) -> bool {
        self.cts
    }

    pub fn set_cts(&mut self, v: bool) {
        self.cts = v;
    }

    #[must_use]
    pub fn ri(&self) -> bool {
        self.ri
    }

    pub fn set_ri(&mut self, v: bool) {
        self.ri = v;
    }

    pub fn set_auto_answer_led(&self, on: bool) {
        self.emit(LedEvent::Aa(on));
    }

    pub fn toggle_send_data_led(&self, on: bool) {
        self.emit(LedEvent::Sd(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_off_hook_sets_line_busy() {
        let mut s = Signals::new(None);
        s.go_off_hook();
        assert!(s.is_off_hook());
        assert!(s.line_busy());
    }

    #[test]
    fn go_on_hook_does_not_clear_line_busy_on_its_own() {
        let mut s = Signals::new(None);
        s.go_off_hook();
        s.go_on_hook();
        assert!(!s.is_off_hook());
        assert!(s.line_busy());
    }

    #[test]
    fn check_busy_reflects_either_hook_or_line_busy() {
        let mut s = Signals::new(None);
        assert!(!s.check_busy());
        s.set_line_busy(true);
        assert!(s.check_busy());
    }
}
