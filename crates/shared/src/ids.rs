//! Identifier generation for operation records.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Prefix carried by every bulk operation identifier.
pub const OPERATION_ID_PREFIX: &str = "bulk";

/// Length of the random suffix appended to generated identifiers.
pub const RANDOM_SUFFIX_LEN: usize = 9;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random lowercase alphanumeric suffix of the given length.
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Generates an operation identifier of the form `bulk_<unix-millis>_<suffix>`.
pub fn generate_operation_id(now: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        OPERATION_ID_PREFIX,
        now.timestamp_millis(),
        random_suffix(RANDOM_SUFFIX_LEN)
    )
}
