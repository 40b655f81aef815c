//! Host side of the accelerator protocol.
//!
//! One evaluation ("session") is strictly sequential and counted in whole
//! clock cycles:
//!
//! ```text
//! reset (once) ─► load Cr/Ci ─► start ─► poll status ─► iteration count
//! ```
//!
//! - [`reset`]: hold reset for a fixed number of cycles
//! - [`RegisterLoader`]: serialize both operands, with the register cache
//! - [`start`]: standalone one-cycle start strobe (when it cannot be fused)
//! - [`Poller`]: sample the sticky status line once per cycle
//!
//! Two wire protocols exist, selected once per accelerator through
//! [`ProtocolVersion`]. Everything after the load phase is identical.

mod loader;
mod poller;
mod reset;
mod strobe;

pub use loader::{LoadReport, RegisterCache, RegisterLoader};
pub use poller::Poller;
pub use reset::{reset, DEFAULT_RESET_CYCLES};
pub use strobe::{start, STROBE_SETTLE_CYCLES};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Wire protocol spoken by the accelerator's operand registers.
///
/// Serialized as its name; configuration files accept every spelling that
/// [`FromStr`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolVersion {
    /// Protocol A: 4 byte-cycles per changed operand, least significant byte
    /// first, latched by `load_cr` / `load_ci` on the final byte. Unchanged
    /// operands are skipped.
    #[default]
    Bytewise,
    /// Protocol B: 8 cycles, each carrying the Ci nibble in the high half and
    /// the Cr nibble in the low half, most significant nibble first. Always
    /// reloads both operands.
    Nibble,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolVersion::Bytewise => "bytewise",
            ProtocolVersion::Nibble => "nibble",
        })
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "bytewise" | "byte" => Ok(ProtocolVersion::Bytewise),
            "b" | "nibble" | "interleaved" => Ok(ProtocolVersion::Nibble),
            _ => Err(Error::UnknownProtocol(s.to_string())),
        }
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(v: ProtocolVersion) -> String {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_protocol_version() {
        assert_eq!("A".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Bytewise);
        assert_eq!("bytewise".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Bytewise);
        assert_eq!(" nibble ".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Nibble);
        assert_eq!("b".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Nibble);
        assert!(matches!("c".parse::<ProtocolVersion>(), Err(Error::UnknownProtocol(_))));
    }

    #[test]
    fn test_deserialize_accepts_parse_spellings() {
        for (text, expected) in [
            ("A", ProtocolVersion::Bytewise),
            ("byte", ProtocolVersion::Bytewise),
            ("Nibble", ProtocolVersion::Nibble),
            ("interleaved", ProtocolVersion::Nibble),
        ] {
            let encoded = bincode::serialize(text).unwrap();
            assert_eq!(bincode::deserialize::<ProtocolVersion>(&encoded).unwrap(), expected);
        }
        let encoded = bincode::serialize("c").unwrap();
        assert!(bincode::deserialize::<ProtocolVersion>(&encoded).is_err());
    }

    #[test]
    fn test_serializes_as_name() {
        let encoded = bincode::serialize(&ProtocolVersion::Nibble).unwrap();
        assert_eq!(bincode::deserialize::<String>(&encoded).unwrap(), "nibble");
    }

    #[test]
    fn test_display_parses_back() {
        for v in [ProtocolVersion::Bytewise, ProtocolVersion::Nibble] {
            assert_eq!(v.to_string().parse::<ProtocolVersion>().unwrap(), v);
        }
    }
}
