//! Text-safe transport encoding for bytes crossing the exec channel.
//!
//! Standard base64: the alphabet is shell-safe and contains no control
//! characters, and every POSIX-ish userland ships a `base64` tool to undo it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Error, Result};

pub fn encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decodes `text`, ignoring ASCII whitespace (remote `base64` wraps lines).
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::Channel(format!("Invalid base64 payload: {}", e)))
}
