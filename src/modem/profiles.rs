//! Two on-disk profile snapshots, power-up selection, and the `&W/&Y/ATZn`
//! operations that read and write them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::registers::Registers;
use super::settings::Settings;

/// One stored `(Settings, Registers)` snapshot, as it appears inside the
/// `Config` array of `hayes.config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(rename = "Regs")]
    pub regs: BTreeMap<String, u8>,
}

impl Slot {
    fn fresh() -> Self {
        let settings = Settings::new();
        let regs = Registers::new().json_map();
        Self { settings, regs }
    }

    fn capture(settings: &Settings, registers: &Registers) -> Self {
        Self {
            settings: settings.clone(),
            regs: registers.json_map(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OnDisk {
    #[serde(rename = "PowerUpConfig")]
    power_up_config: i32,
    #[serde(rename = "Config")]
    config: [Slot; 2],
}

#[derive(Debug, Clone)]
pub struct StoredProfiles {
    path: PathBuf,
    power_up_config: i32,
    slots: [Slot; 2],
}

impl StoredProfiles {
    /// Load the profile file, or synthesize a fresh default set with
    /// `power_up_config = -1` if the file is absent or unparseable. The
    /// caller must still run with live defaults in the error case.
    pub fn load(path: impl AsRef<Path>) -> (Self, Option<String>) {
        let path = path.as_ref().to_path_buf();
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<OnDisk>(&text) {
                Ok(disk) => (
                    Self {
                        path,
                        power_up_config: disk.power_up_config,
                        slots: disk.config,
                    },
                    None,
                ),
                Err(e) => {
                    warn!(error = %e, "profiles file unparseable, using defaults");
                    (Self::fresh(path), Some(e.to_string()))
                }
            },
            Err(e) => (Self::fresh(path), Some(e.to_string())),
        }
    }

    fn fresh(path: PathBuf) -> Self {
        Self {
            path,
            power_up_config: -1,
            slots: [Slot::fresh(), Slot::fresh()],
        }
    }

    #[must_use]
    pub fn power_up_config(&self) -> i32 {
        self.power_up_config
    }

    fn validate_slot(i: i32) -> Result<usize, ()> {
        if i == 0 || i == 1 {
            Ok(i as usize)
        } else {
            Err(())
        }
    }

    /// Deep-copy slot `i` out for `ATZn` to install as the live state.
    pub fn switch(&self, i: i32) -> Result<(Settings, Registers), ()> {
        let idx = Self::validate_slot(i)?;
        let slot = &self.slots[idx];
        let mut regs = Registers::new();
        regs.json_unmap(&slot.regs);
        Ok((slot.settings.clone(), regs))
    }

    /// Snapshot the live state into slot `i` and persist.
    pub fn write_active(&mut self, i: i32, settings: &Settings, registers: &Registers) -> Result<(), String> {
        let idx = Self::validate_slot(i).map_err(|()| "invalid profile index".to_string())?;
        self.slots[idx] = Slot::capture(settings, registers);
        self.flush()
    }

    pub fn set_power_up_config(&mut self, i: i32) -> Result<(), String> {
        Self::validate_slot(i).map_err(|()| "invalid profile index".to_string())?;
        self.power_up_config = i;
        self.flush()
    }

    fn flush(&self) -> Result<(), String> {
        let disk = OnDisk {
            power_up_config: self.power_up_config,
            config: self.slots.clone(),
        };
        let text = serde_json::to_string_pretty(&disk).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, text).map_err(|e| e.to_string())
    }

    /// The two `STORED PROFILE n` blocks `AT&V` prints.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, slot) in self.slots.iter().enumerate() {
            out.push_str(&format!("STORED PROFILE {i}\n"));
            out.push_str(&slot.settings.stored_summary());
            out.push('\n');
            let mut regs = Registers::new();
            regs.json_unmap(&slot.regs);
            out.push_str(&regs.summary());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_default_with_power_up_config_negative_one() {
        let dir = TempDir::new().unwrap();
        let (profiles, err) = StoredProfiles::load(dir.path().join("hayes.config.json"));
        assert!(err.is_some());
        assert_eq!(profiles.power_up_config(), -1);
    }

    #[test]
    fn write_then_switch_round_trips() {
        let dir = TempDir::new().unwrap();
        let (mut profiles, _) = StoredProfiles::load(dir.path().join("hayes.config.json"));
        let mut settings = Settings::new();
        settings.quiet = true;
        let mut regs = Registers::new();
        regs.write(40, 9).unwrap();
        profiles.write_active(0, &settings, &regs).unwrap();

        let (loaded_settings, loaded_regs) = profiles.switch(0).unwrap();
        assert!(loaded_settings.quiet);
        assert_eq!(loaded_regs.read(40), Some(9));
    }

    #[test]
    fn switch_rejects_out_of_range_slot() {
        let dir = TempDir::new().unwrap();
        let (profiles, _) = StoredProfiles::load(dir.path().join("hayes.config.json"));
        assert!(profiles.switch(2).is_err());
    }

    #[test]
    fn set_power_up_config_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hayes.config.json");
        let (mut profiles, _) = StoredProfiles::load(&path);
        profiles.set_power_up_config(1).unwrap();
        let (reloaded, err) = StoredProfiles::load(&path);
        assert!(err.is_none());
        assert_eq!(reloaded.power_up_config(), 1);
    }
}
