//! SHA-256 + base36 issue ID generation.
//!
//! IDs have the form `{workspace_prefix}-{short_hash}`. The hash length is
//! sized so that two independently-operating workspaces producing up to a
//! million issues each stay below a one-in-a-million collision chance,
//! which makes journals from unrelated clones mergeable without structural
//! collisions.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use sha2::{Digest, Sha256};

/// Base36 alphabet (0-9, a-z).
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default hash length in base36 characters.
///
/// 36^12 ~ 4.7e18 possible values; 2e6 issues give a birthday-bound
/// collision probability around 4e-7, under the 1e-6 target.
pub const DEFAULT_HASH_LENGTH: usize = 12;

/// Encodes a byte slice as exactly `length` base36 digits.
///
/// The output is a fixed-width window onto the value: digits fill a
/// zero-initialized buffer from the least-significant end, so short
/// values come out zero-padded and anything wider than `length` digits
/// simply never reaches the buffer (the low digits win).
pub fn encode_base36(data: &[u8], length: usize) -> String {
    let mut out = vec![b'0'; length];
    let mut num = BigUint::from_bytes_be(data);

    for slot in out.iter_mut().rev() {
        if num.is_zero() {
            break;
        }
        let digit = (&num % 36u32).to_u32().unwrap_or(0) as usize;
        *slot = BASE36_ALPHABET[digit];
        num /= 36u32;
    }

    String::from_utf8(out).expect("alphabet is ASCII")
}

/// Creates a hash-based ID for an issue.
///
/// The content string mixes title, creator, nanosecond timestamp, and a
/// nonce so that retries on a (vanishingly unlikely) local collision
/// produce a fresh candidate.
pub fn generate_hash_id(
    prefix: &str,
    title: &str,
    creator: &str,
    timestamp: DateTime<Utc>,
    length: usize,
    nonce: i32,
) -> String {
    let content = format!(
        "{}|{}|{}|{}",
        title,
        creator,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        nonce
    );

    let hash = Sha256::digest(content.as_bytes());

    // 2 base36 chars fit in ~1.29 bytes; take enough hash bytes to cover
    // the requested length with headroom.
    let num_bytes = (length * 2 / 3 + 1).min(hash.len());
    let short_hash = encode_base36(&hash[..num_bytes], length);
    format!("{prefix}-{short_hash}")
}

/// Computes the collision probability using the birthday paradox
/// approximation: `P ~ 1 - e^(-n^2 / 2N)`.
pub fn collision_probability(num_issues: usize, id_length: usize) -> f64 {
    let total: f64 = 36.0_f64.powi(id_length as i32);
    let exponent = -(num_issues as f64).powi(2) / (2.0 * total);
    1.0 - exponent.exp()
}

/// Normalizes an id for case-insensitive display lookup.
///
/// IDs are case-sensitive in storage; lowercase is the canonical display
/// form.
pub fn normalize_for_lookup(id: &str) -> String {
    id.to_ascii_lowercase()
}
