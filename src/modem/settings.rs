//! Non-register modem configuration: echo, verbosity, speaker, result-code
//! style, and control-line pinning policy. Named `Settings` rather than
//! `Config` to keep it distinct from the process-level [`crate::config::Config`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub echo_in_cmd_mode: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub connect_msg_speed: bool,
    pub extended_result_codes: bool,
    pub busy_detect: bool,
    pub dcd_pinned: bool,
    pub dsr_pinned: bool,
    /// 0..=2
    pub speaker_mode: u8,
    /// 0..=3
    pub speaker_volume: u8,
    /// 0..=3
    pub dtr: u8,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        let mut s = Self {
            echo_in_cmd_mode: false,
            verbose: false,
            quiet: false,
            connect_msg_speed: false,
            extended_result_codes: false,
            busy_detect: false,
            dcd_pinned: false,
            dsr_pinned: false,
            speaker_mode: 0,
            speaker_volume: 0,
            dtr: 0,
        };
        s.reset();
        s
    }

    pub fn reset(&mut self) {
        self.echo_in_cmd_mode = true;
        self.verbose = true;
        self.quiet = false;
        self.speaker_mode = 1;
        self.speaker_volume = 1;
        self.connect_msg_speed = true;
        self.busy_detect = true;
        self.extended_result_codes = true;
        self.dcd_pinned = false;
        self.dsr_pinned = false;
        self.dtr = 0;
    }

    fn bit(v: bool) -> char {
        if v {
            '1'
        } else {
            '0'
        }
    }

    /// Combine extended-result-code style and busy detection into the
    /// single `X` digit a real Hayes modem reports.
    fn x_code(&self) -> char {
        match (self.extended_result_codes, self.busy_detect) {
            (false, _) => '0',
            (true, false) => '1',
            (true, true) => '7',
        }
    }

    /// The `E_ V_ Q_ M_ L_ W_ X_ &C_` line `AT&V` prints for the active
    /// configuration.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "E{} V{} Q{} M{} L{} W{} X{} &C{}",
            Self::bit(self.echo_in_cmd_mode),
            Self::bit(self.verbose),
            Self::bit(self.quiet),
            self.speaker_mode,
            self.speaker_volume,
            Self::bit(self.connect_msg_speed),
            self.x_code(),
            Self::bit(self.dcd_pinned),
        )
    }

    /// `AT&V`'s stored-profile summary line always includes the `F1`
    /// backwards-compatibility token right after `E` and moves `&C` to the
    /// end, differing slightly from the live summary above.
    #[must_use]
    pub fn stored_summary(&self) -> String {
        format!(
            "E{} F1 L{} M{} Q{} V{} W{} X{} &C{}",
            Self::bit(self.echo_in_cmd_mode),
            self.speaker_volume,
            self.speaker_mode,
            Self::bit(self.quiet),
            Self::bit(self.verbose),
            Self::bit(self.connect_msg_speed),
            self.x_code(),
            Self::bit(self.dcd_pinned),
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_matches_spec_defaults() {
        let s = Settings::new();
        assert!(s.echo_in_cmd_mode);
        assert!(s.verbose);
        assert!(!s.quiet);
        assert_eq!(s.speaker_mode, 1);
        assert_eq!(s.speaker_volume, 1);
        assert!(s.connect_msg_speed);
        assert!(s.busy_detect);
        assert!(s.extended_result_codes);
        assert!(!s.dcd_pinned);
    }

    #[test]
    fn x_code_combines_extended_and_busy() {
        let mut s = Settings::new();
        s.extended_result_codes = false;
        s.busy_detect = false;
        assert_eq!(s.x_code(), '0');
        s.extended_result_codes = true;
        s.busy_detect = false;
        assert_eq!(s.x_code(), '1');
        s.busy_detect = true;
        assert_eq!(s.x_code(), '7');
    }
}
