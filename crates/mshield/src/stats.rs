use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldStats {
    pub emails_scanned: u64,
    pub phishing_detected: u64,
    pub blocked: u64,
    pub quarantined: u64,
    pub messages_encrypted: u64,
    pub messages_decrypted: u64,
    pub keys_generated: u64,
    pub keys_revoked: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) emails_scanned: AtomicU64,
    pub(crate) phishing_detected: AtomicU64,
    pub(crate) blocked: AtomicU64,
    pub(crate) quarantined: AtomicU64,
    pub(crate) messages_encrypted: AtomicU64,
    pub(crate) messages_decrypted: AtomicU64,
    pub(crate) keys_generated: AtomicU64,
    pub(crate) keys_revoked: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ShieldStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ShieldStats {
            emails_scanned: load(&self.emails_scanned),
            phishing_detected: load(&self.phishing_detected),
            blocked: load(&self.blocked),
            quarantined: load(&self.quarantined),
            messages_encrypted: load(&self.messages_encrypted),
            messages_decrypted: load(&self.messages_decrypted),
            keys_generated: load(&self.keys_generated),
            keys_revoked: load(&self.keys_revoked),
        }
    }
}
