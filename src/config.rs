//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** — `HAYESD_PHONEBOOK_PATH`,
//!    `HAYESD_PROFILES_PATH`, `HAYESD_DTE_TCP_LISTEN`
//! 2. **Config file** — path via `--config <path>`, or `hayesd.toml` in CWD
//! 3. **Compiled defaults** — see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [dte]
//! mode = "tcp"
//! serial_device = "/dev/ttyUSB0"
//! tcp_listen = "127.0.0.1:7000"
//!
//! [modem]
//! phonebook_path = "./phonebook"
//! profiles_path = "./hayes.config.json"
//!
//! [[inbound]]
//! protocol = "telnet"
//! listen = "0.0.0.0:2323"
//!
//! [[inbound]]
//! protocol = "ssh"
//! listen = "0.0.0.0:2222"
//!
//! [logging]
//! level = "info"
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dte: DteConfig,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub inbound: Vec<InboundConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which DTE implementation to open on startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DteConfig {
    /// `"serial"` opens a real termios port; `"tcp"` listens for one
    /// inbound connection and treats it as the terminal.
    #[serde(default = "default_dte_mode")]
    pub mode: String,
    #[serde(default = "default_serial_device")]
    pub serial_device: String,
    #[serde(default = "default_dte_tcp_listen")]
    pub tcp_listen: String,
}

/// Paths to the two files the modem core persists to.
#[derive(Debug, Clone, Deserialize)]
pub struct ModemConfig {
    #[serde(default = "default_phonebook_path")]
    pub phonebook_path: String,
    #[serde(default = "default_profiles_path")]
    pub profiles_path: String,
}

/// One inbound TELNET or SSH listener.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundConfig {
    pub protocol: String,
    pub listen: String,
}

impl fmt::Display for InboundConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.protocol)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_dte_mode() -> String {
    "tcp".to_string()
}
fn default_serial_device() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_dte_tcp_listen() -> String {
    "127.0.0.1:7000".to_string()
}
fn default_phonebook_path() -> String {
    "./phonebook".to_string()
}
fn default_profiles_path() -> String {
    "./hayes.config.json".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DteConfig {
    fn default() -> Self {
        Self {
            mode: default_dte_mode(),
            serial_device: default_serial_device(),
            tcp_listen: default_dte_tcp_listen(),
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            phonebook_path: default_phonebook_path(),
            profiles_path: default_profiles_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, reads that file (panics on failure). Otherwise
    /// looks for `hayesd.toml` in the current directory, falling back to
    /// compiled defaults.
    #[must_use]
    pub fn load(path: Option<&str>) -> Self {
        let mut config = if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .unwrap_or_else(|e| panic!("Failed to read config file {p}: {e}"));
            toml::from_str(&content)
                .unwrap_or_else(|e| panic!("Failed to parse config file {p}: {e}"))
        } else if Path::new("hayesd.toml").exists() {
            let content = std::fs::read_to_string("hayesd.toml").expect("Failed to read hayesd.toml");
            toml::from_str(&content).expect("Failed to parse hayesd.toml")
        } else {
            Config {
                dte: DteConfig::default(),
                modem: ModemConfig::default(),
                inbound: Vec::new(),
                logging: LoggingConfig::default(),
            }
        };

        if let Ok(path) = std::env::var("HAYESD_PHONEBOOK_PATH") {
            config.modem.phonebook_path = path;
        }
        if let Ok(path) = std::env::var("HAYESD_PROFILES_PATH") {
            config.modem.profiles_path = path;
        }
        if let Ok(listen) = std::env::var("HAYESD_DTE_TCP_LISTEN") {
            config.dte.tcp_listen = listen;
        }

        config
    }
}
