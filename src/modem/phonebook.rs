//! Sanitized phone number to dial target mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Telnet,
    Ssh,
}

impl Protocol {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TELNET" => Some(Self::Telnet),
            "SSH" => Some(Self::Ssh),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telnet => "TELNET",
            Self::Ssh => "SSH",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub host: String,
    pub protocol: Protocol,
    pub username: String,
    pub password: String,
    /// `0..=3` if addressable via `ATDS<n>`, `None` otherwise.
    pub stored_slot: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Phonebook {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Entry>,
}

/// Map a raw dial payload to its sanitized digit form. Digits pass through;
/// `- ( ) ` (and space) are dropped; any other character is replaced by `*`,
/// which marks the whole number invalid.
#[must_use]
pub fn sanitize_number(raw: &str) -> (String, bool) {
    let mut out = String::with_capacity(raw.len());
    let mut valid = true;
    for c in raw.chars() {
        match c {
            '0'..='9' => out.push(c),
            '-' | '(' | ')' | ' ' => {}
            _ => {
                out.push('*');
                valid = false;
            }
        }
    }
    (out, valid)
}

impl Phonebook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated record file with `#` comments.
    /// Each record is `number host protocol slot`. Records that don't have
    /// exactly four fields are skipped with a warning rather than aborting
    /// the whole load.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut book = Self {
            path: Some(path.clone()),
            entries: BTreeMap::new(),
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return book;
        };
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                warn!(%line, "skipping malformed phonebook record");
                continue;
            }
            let (number, valid) = sanitize_number(fields[0]);
            if !valid {
                warn!(%line, "skipping phonebook record with invalid number");
                continue;
            }
            let Some(protocol) = Protocol::parse(fields[2]) else {
                warn!(%line, "skipping phonebook record with unknown protocol");
                continue;
            };
            let stored_slot = fields[3].parse::<i32>().ok().and_then(|n| {
                if (0..=3).contains(&n) {
                    Some(n as u8)
                } else {
                    None
                }
            });
            book.entries.insert(
                number,
                Entry {
                    host: fields[1].to_string(),
                    protocol,
                    username: String::new(),
                    password: String::new(),
                    stored_slot,
                },
            );
        }
        book
    }

    pub fn reload(&mut self) {
        if let Some(path) = self.path.clone() {
            *self = Self::load(path);
        }
    }

    /// Resolve a dial payload to its target, or `Err` if the number is
    /// invalid or unknown.
    pub fn lookup(&self, phone: &str) -> Result<&Entry, ()> {
        let (number, valid) = sanitize_number(phone);
        if !valid {
            return Err(());
        }
        self.entries.get(&number).ok_or(())
    }

    /// The phone of the first entry stored in slot `n` (`0..=3`).
    pub fn lookup_stored_number(&self, n: u8) -> Result<String, ()> {
        if n > 3 {
            return Err(());
        }
        self.entries
            .iter()
            .find(|(_, e)| e.stored_slot == Some(n))
            .map(|(phone, _)| phone.clone())
            .ok_or(())
    }

    /// `AT&Z<n>=<spec>` — `spec` is `host protocol [user pass]`, replacing
    /// any existing entry already stored in slot `n`.
    pub fn add(&mut self, slot: u8, phone: &str, host: &str, protocol: Protocol) -> Result<(), ()> {
        if slot > 3 {
            return Err(());
        }
        let (number, valid) = sanitize_number(phone);
        if !valid {
            return Err(());
        }
        self.entries.retain(|_, e| e.stored_slot != Some(slot));
        self.entries.insert(
            number,
            Entry {
                host: host.to_string(),
                protocol,
                username: String::new(),
                password: String::new(),
                stored_slot: Some(slot),
            },
        );
        Ok(())
    }

    /// `AT&Z<n>=D` — remove whichever entry currently occupies slot `n`.
    pub fn delete(&mut self, slot: u8) -> Result<(), ()> {
        if slot > 3 {
            return Err(());
        }
        self.entries.retain(|_, e| e.stored_slot != Some(slot));
        Ok(())
    }

    /// The `TELEPHONE NUMBERS:` block `AT&V` prints.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (phone, e) in &self.entries {
            let slot = e.stored_slot.map_or("-".to_string(), |s| s.to_string());
            out.push_str(&format!("{slot} {phone} {} {}\n", e.host, e.protocol.as_str()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_punctuation_and_keeps_digits() {
        let (n, valid) = sanitize_number("(555) 123-4567");
        assert_eq!(n, "5551234567");
        assert!(valid);
    }

    #[test]
    fn sanitize_rejects_other_characters() {
        let (_, valid) = sanitize_number("555-CALL-NOW");
        assert!(!valid);
    }

    #[test]
    fn add_then_lookup_stored_number() {
        let mut book = Phonebook::new();
        book.add(2, "5551212", "example.com", Protocol::Telnet).unwrap();
        assert_eq!(book.lookup_stored_number(2).unwrap(), "5551212");
        assert!(book.lookup("5551212").is_ok());
    }

    #[test]
    fn add_replaces_existing_occupant_of_slot() {
        let mut book = Phonebook::new();
        book.add(0, "111", "a.example", Protocol::Telnet).unwrap();
        book.add(0, "222", "b.example", Protocol::Telnet).unwrap();
        assert!(book.lookup("111").is_err());
        assert_eq!(book.lookup_stored_number(0).unwrap(), "222");
    }

    #[test]
    fn delete_removes_slot_occupant() {
        let mut book = Phonebook::new();
        book.add(1, "333", "c.example", Protocol::Ssh).unwrap();
        book.delete(1).unwrap();
        assert!(book.lookup_stored_number(1).is_err());
    }

    #[test]
    fn lookup_stored_number_rejects_out_of_range_slot() {
        let book = Phonebook::new();
        assert!(book.lookup_stored_number(4).is_err());
    }
}
