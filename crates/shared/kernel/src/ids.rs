use crate::safe_nanoid;

/// Prefix of every threat log entry id.
pub const THREAT_LOG_PREFIX: &str = "TL-";

/// A fresh threat log entry id, e.g. `TL-4fKq9ZxbW2hN`.
#[must_use]
pub fn threat_log_id() -> String {
    let mut id = String::with_capacity(THREAT_LOG_PREFIX.len() + 12);
    id.push_str(THREAT_LOG_PREFIX);
    id.push_str(&safe_nanoid!());
    id
}

/// Returns `true` when `id` carries the threat log prefix followed by a safe-alphabet body.
#[must_use]
pub fn is_threat_log_id(id: &str) -> bool {
    id.strip_prefix(THREAT_LOG_PREFIX)
        .is_some_and(|body| !body.is_empty() && body.chars().all(|c| crate::SAFE_ALPHABET.contains(&c)))
}
