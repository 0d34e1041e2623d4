//! Object identifiers.
//!
//! An [`Oid`] is a content hash over an object's canonical serialisation:
//! 20 raw bytes, rendered as 40 lowercase hex characters, abbreviated to
//! 7 on display surfaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Oid
// ---------------------------------------------------------------------------

/// A 20-byte content-addressed object identifier.
///
/// Stored as raw bytes for efficient comparison, hashing, and Copy
/// semantics. Displays as 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid([u8; 20]);

impl Oid {
    /// The number of hex characters in a fully spelled oid.
    pub const HEX_LEN: usize = 40;

    /// The number of hex characters shown on display surfaces.
    pub const SHORT_LEN: usize = 7;

    /// Hash a canonical serialisation into an oid.
    ///
    /// The digest is the first 20 bytes of SHA-256 over `data`.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Create an oid from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The 40-char lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// The 7-char abbreviated rendering.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(Self::SHORT_LEN);
        s
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({self})")
    }
}

/// Failure to parse a hex string into an [`Oid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The value that failed to parse.
    pub value: String,
    /// Why parsing failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid oid `{}`: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl FromStr for Oid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected {} hex characters, got {}", Self::HEX_LEN, s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]).ok_or_else(|| OidParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[0] as char),
            })?;
            let lo = hex_digit(chunk[1]).ok_or_else(|| OidParseError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[1] as char),
            })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Oid {
    type Error = OidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

/// Returns `true` if `s` is a plausible oid prefix (4–40 lowercase hex).
#[must_use]
pub fn is_hex_prefix(s: &str) -> bool {
    s.len() >= 4
        && s.len() <= Oid::HEX_LEN
        && s.bytes().all(|b| hex_digit(b).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_content_addressed() {
        let a = Oid::hash(b"hello");
        let b = Oid::hash(b"hello");
        let c = Oid::hash(b"hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_roundtrip() {
        let oid = Oid::hash(b"content");
        let hex = oid.to_string();
        assert_eq!(hex.len(), 40);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<Oid>().unwrap(), oid);
    }

    #[test]
    fn short_is_seven_chars() {
        let oid = Oid::hash(b"x");
        assert_eq!(oid.short().len(), 7);
        assert!(oid.to_string().starts_with(&oid.short()));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("abc".parse::<Oid>().is_err());
        assert!("g".repeat(40).parse::<Oid>().is_err());
        assert!("A".repeat(40).parse::<Oid>().is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let oid = Oid::hash(b"serde");
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, format!("\"{oid}\""));
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }

    #[test]
    fn hex_prefix_detection() {
        assert!(is_hex_prefix("abcd"));
        assert!(is_hex_prefix(&"a".repeat(40)));
        assert!(!is_hex_prefix("abc"));
        assert!(!is_hex_prefix("main"));
        assert!(!is_hex_prefix(&"a".repeat(41)));
    }
}
