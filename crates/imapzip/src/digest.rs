//! Per-message identifier used to namespace extracted files.

use std::fmt;

use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of a message's received-date text.
///
/// Only a collision-avoidance tag between messages; it carries no security meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageDigestId(String);

impl MessageDigestId {
    pub fn from_received_date(received: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(received.as_bytes());
        Self(hex_encode(&hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<digest>_<name>`, the on-disk name for anything extracted from this message.
    pub fn prefixed(&self, name: &str) -> String {
        format!("{}_{}", self.0, name)
    }
}

impl fmt::Display for MessageDigestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}
