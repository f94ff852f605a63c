//! Caller identifiers used to partition limiter state.
//!
//! A fingerprint is a coarse abuse deterrent, not an identity: distinct
//! callers with the same environment share a key, and a determined caller
//! can change theirs at will.

use serde::{Deserialize, Serialize};

/// Prefix that namespaces generated fingerprints.
pub const FINGERPRINT_PREFIX: &str = "fp_";

/// Something that can name the current caller.
pub trait IdentifierProvider: Send + Sync {
    /// A stable key for the current caller.
    fn identifier(&self) -> String;
}

impl<F> IdentifierProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn identifier(&self) -> String {
        self()
    }
}

/// A provider that always returns the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentifier(pub String);

impl IdentifierProvider for StaticIdentifier {
    fn identifier(&self) -> String {
        self.0.clone()
    }
}

/// Observable attributes of a client environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSignals {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u8,
    /// Minutes from UTC, as reported by the client
    pub timezone_offset_minutes: i32,
    /// Digest of a rendered test canvas
    pub canvas_signature: String,
}

impl EnvironmentSignals {
    /// All signals joined into one string.
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}x{}|{}|{}|{}",
            self.user_agent,
            self.language,
            self.screen_width,
            self.screen_height,
            self.color_depth,
            self.timezone_offset_minutes,
            self.canvas_signature,
        )
    }
}

/// Derives a fingerprint from environment signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalFingerprint {
    signals: EnvironmentSignals,
}

impl SignalFingerprint {
    pub fn new(signals: EnvironmentSignals) -> Self {
        Self { signals }
    }

    pub fn signals(&self) -> &EnvironmentSignals {
        &self.signals
    }
}

impl IdentifierProvider for SignalFingerprint {
    fn identifier(&self) -> String {
        fingerprint(&self.signals.canonical())
    }
}

/// Hash `input` into a prefixed, base-36 fingerprint.
pub fn fingerprint(input: &str) -> String {
    let hash = string_hash(input);
    format!("{}{}", FINGERPRINT_PREFIX, to_base36(hash.unsigned_abs()))
}

/// 32-bit rolling string hash (`h = h * 31 + unit`) over UTF-16 code units.
fn string_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit))
        })
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.iter().rev().map(|&d| d as char).collect()
}
