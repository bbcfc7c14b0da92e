//! The 256 S-registers and their validated writes.

use std::collections::BTreeMap;

pub const REG_AUTO_ANSWER: usize = 0;
pub const REG_RING_COUNT: usize = 1;
pub const REG_ESC_CH: usize = 2;
pub const REG_CR_CH: usize = 3;
pub const REG_LF_CH: usize = 4;
pub const REG_BS_CH: usize = 5;
pub const REG_BLIND_DIAL_WAIT: usize = 6;
pub const REG_CARRIER_DETECT_RESPONSE_TIME: usize = 7;
pub const REG_COMMA_DELAY: usize = 8;
pub const REG_ESC_CODE_GUARD_TIME: usize = 12;

const COUNT: usize = 256;

/// Side effect a register write must trigger beyond storing the byte.
/// The registers themselves only validate bounds; reacting to these
/// (resetting the escape timer, rebuilding the 3-byte escape buffer,
/// toggling the AA indicator) is the dispatcher's job, since it alone
/// has a handle on the pump and LED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    None,
    AutoAnswerChanged,
    EscCharChanged,
    EscGuardTimeChanged,
}

#[derive(Debug, Clone)]
pub struct Registers {
    slots: [u8; COUNT],
    selected: usize,
}

impl Registers {
    #[must_use]
    pub fn new() -> Self {
        let mut r = Self {
            slots: [0; COUNT],
            selected: 0,
        };
        r.reset();
        r
    }

    /// Restore the documented power-up defaults.
    pub fn reset(&mut self) {
        self.slots = [0; COUNT];
        self.slots[REG_ESC_CH] = b'+';
        self.slots[REG_CR_CH] = 13;
        self.slots[REG_LF_CH] = 10;
        self.slots[REG_BS_CH] = 8;
        self.slots[REG_BLIND_DIAL_WAIT] = 2;
        self.slots[REG_CARRIER_DETECT_RESPONSE_TIME] = 30;
        self.slots[REG_COMMA_DELAY] = 2;
        self.slots[REG_ESC_CODE_GUARD_TIME] = 50;
        self.selected = 0;
    }

    #[must_use]
    pub fn read(&self, index: usize) -> Option<u8> {
        self.slots.get(index).copied()
    }

    /// Validated write. `value` is accepted as `u16` so callers can pass an
    /// out-of-range parse result and still get a proper rejection rather
    /// than a silent truncation.
    pub fn write(&mut self, index: usize, value: u16) -> Result<WriteEffect, ()> {
        if index >= COUNT || value > 255 {
            return Err(());
        }
        let v = value as u8;
        match index {
            REG_BLIND_DIAL_WAIT if !(2..=255).contains(&v) => return Err(()),
            REG_COMMA_DELAY if v > 65 => return Err(()),
            REG_BS_CH | REG_LF_CH | REG_CR_CH if v > 127 => return Err(()),
            _ => {}
        }
        self.slots[index] = v;
        Ok(match index {
            REG_AUTO_ANSWER => WriteEffect::AutoAnswerChanged,
            REG_ESC_CH => WriteEffect::EscCharChanged,
            REG_ESC_CODE_GUARD_TIME => WriteEffect::EscGuardTimeChanged,
            _ => WriteEffect::None,
        })
    }

    /// Increment a register, wrapping at 255->0, and return the new value.
    pub fn inc(&mut self, index: usize) -> u8 {
        let v = self.slots[index].wrapping_add(1);
        self.slots[index] = v;
        v
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn set_selected(&mut self, index: usize) -> Result<(), ()> {
        if index >= COUNT {
            return Err(());
        }
        self.selected = index;
        Ok(())
    }

    #[must_use]
    pub fn read_selected(&self) -> u8 {
        self.slots[self.selected]
    }

    /// Dump the full register bank as a decimal-string-keyed map, matching
    /// the on-disk profile format.
    #[must_use]
    pub fn json_map(&self) -> BTreeMap<String, u8> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), *v))
            .collect()
    }

    /// Load from a decimal-string-keyed map. Indices absent from the map
    /// are left at zero; out-of-range keys are ignored.
    pub fn json_unmap(&mut self, map: &BTreeMap<String, u8>) {
        self.slots = [0; COUNT];
        for (k, v) in map {
            if let Ok(idx) = k.parse::<usize>() {
                if idx < COUNT {
                    self.slots[idx] = *v;
                }
            }
        }
    }

    /// Render the register table the way `AT&V` prints it: eight columns of
    /// `Sn=v` grouped per line, covering every non-zero register plus the
    /// well-known ones that default to zero but still report.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (i, chunk) in self.slots.chunks(8).enumerate() {
            let base = i * 8;
            let line: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(j, v)| format!("S{:<3}={:<3}", base + j, v))
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
            // Only the well-known registers matter for a readable dump;
            // stop after the block that contains the highest named slot.
            if base + 8 > REG_ESC_CODE_GUARD_TIME {
                break;
            }
        }
        out
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let r = Registers::new();
        assert_eq!(r.read(REG_ESC_CH), Some(b'+'));
        assert_eq!(r.read(REG_CR_CH), Some(13));
        assert_eq!(r.read(REG_BLIND_DIAL_WAIT), Some(2));
        assert_eq!(r.read(REG_ESC_CODE_GUARD_TIME), Some(50));
        assert_eq!(r.read(200), Some(0));
    }

    #[test]
    fn blind_dial_wait_rejects_below_minimum() {
        let mut r = Registers::new();
        assert!(r.write(REG_BLIND_DIAL_WAIT, 1).is_err());
        assert_eq!(r.read(REG_BLIND_DIAL_WAIT), Some(2));
    }

    #[test]
    fn comma_delay_rejects_above_maximum() {
        let mut r = Registers::new();
        assert!(r.write(REG_COMMA_DELAY, 66).is_err());
    }

    #[test]
    fn cr_char_rejects_above_127() {
        let mut r = Registers::new();
        assert!(r.write(REG_CR_CH, 128).is_err());
    }

    #[test]
    fn round_trip_arbitrary_register() {
        let mut r = Registers::new();
        assert!(r.write(40, 199).is_ok());
        assert_eq!(r.read(40), Some(199));
    }

    #[test]
    fn out_of_range_index_or_value_rejected() {
        let mut r = Registers::new();
        assert!(r.write(256, 1).is_err());
        assert!(r.write(0, 256).is_err());
    }

    #[test]
    fn json_round_trip() {
        let mut r = Registers::new();
        r.write(40, 7).unwrap();
        let map = r.json_map();
        let mut r2 = Registers::new();
        r2.json_unmap(&map);
        assert_eq!(r2.read(40), Some(7));
        assert_eq!(r2.read(REG_ESC_CH), Some(b'+'));
    }

    #[test]
    fn inc_wraps() {
        let mut r = Registers::new();
        r.write(REG_RING_COUNT, 255).unwrap();
        assert_eq!(r.inc(REG_RING_COUNT), 0);
    }
}
