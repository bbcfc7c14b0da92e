//! Result-code taxonomy emitted to the DTE.
//!
//! The dispatcher's entire external contract is "which of these codes do I
//! print"; encoding that as an enum lets every call site match exhaustively
//! instead of comparing strings.

use std::fmt;

/// A Hayes result code, as returned by one dispatched sub-command or an
/// entire AT line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    Error,
    Connect,
    NoCarrier,
    Busy,
    NoAnswer,
    Ring,
}

impl ResultCode {
    /// Numeric form used when `verbose` is false.
    #[must_use]
    pub fn numeric(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Connect => 1,
            Self::Ring => 2,
            Self::NoCarrier => 3,
            Self::Error => 4,
            Self::Busy => 7,
            Self::NoAnswer => 8,
        }
    }

    /// Verbose word form used when `verbose` is true.
    #[must_use]
    pub fn verbose(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Connect => "CONNECT",
            Self::Ring => "RING",
            Self::NoCarrier => "NO CARRIER",
            Self::Error => "ERROR",
            Self::Busy => "BUSY",
            Self::NoAnswer => "NO ANSWER",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verbose())
    }
}
