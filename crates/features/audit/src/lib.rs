//! Threat log feature slice.
//!
//! The scoring engine writes one [`ThreatLogEntry`] per analysed message through a
//! [`ThreatLogSink`]. Entries are immutable once appended and are read back in insertion
//! order.

mod error;

pub use crate::error::{AuditError, AuditErrorExt};
use fxhash::FxHashSet;
use mshield_domain::config::AuditConfig;
use mshield_domain::threat::ThreatLogEntry;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Append-only destination for threat log entries.
///
/// Implementations must make `append` linearizable: concurrent appends land in a single
/// total order and `entries` never observes a partially written entry.
pub trait ThreatLogSink: Send + Sync {
    fn append(&self, entry: ThreatLogEntry) -> Result<Arc<ThreatLogEntry>, AuditError>;

    /// Snapshot of every entry in insertion order.
    fn entries(&self) -> Vec<Arc<ThreatLogEntry>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<Arc<ThreatLogEntry>>,
    ids: FxHashSet<String>,
}

/// Process-local threat log guarded by a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryThreatLog {
    state: Mutex<LogState>,
    capacity: Option<usize>,
}

impl InMemoryThreatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects appends with [`AuditError::Full`] once `capacity` entries are stored.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { state: Mutex::new(LogState::default()), capacity: Some(capacity) }
    }

    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        config.capacity.map_or_else(Self::new, Self::with_capacity)
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ThreatLogEntry>> {
        let state = self.state.lock();
        if !state.ids.contains(id) {
            return None;
        }
        state.entries.iter().rev().find(|entry| entry.id == id).cloned()
    }
}

impl ThreatLogSink for InMemoryThreatLog {
    fn append(&self, entry: ThreatLogEntry) -> Result<Arc<ThreatLogEntry>, AuditError> {
        let mut state = self.state.lock();

        if let Some(capacity) = self.capacity
            && state.entries.len() >= capacity
        {
            return Err(AuditError::Full { capacity, context: None });
        }
        if !state.ids.insert(entry.id.clone()) {
            return Err(AuditError::Duplicate { id: entry.id, context: None });
        }

        let entry = Arc::new(entry);
        state.entries.push(Arc::clone(&entry));
        let position = state.entries.len();
        drop(state);

        debug!(id = %entry.id, position, "Threat log entry appended");
        Ok(entry)
    }

    fn entries(&self) -> Vec<Arc<ThreatLogEntry>> {
        self.state.lock().entries.clone()
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mshield_domain::threat::{Severity, ThreatStatus, ThreatType};

    fn entry(id: &str) -> ThreatLogEntry {
        ThreatLogEntry {
            id: id.to_owned(),
            timestamp: chrono::Utc::now(),
            sender: "alerts@bank.example".to_owned(),
            threat_type: ThreatType::Phishing,
            severity: Severity::High,
            status: ThreatStatus::Quarantined,
            confidence: 72.5,
        }
    }

    #[test]
    fn appends_in_order() -> Result<(), AuditError> {
        let log = InMemoryThreatLog::new();
        log.append(entry("TL-a"))?;
        log.append(entry("TL-b"))?;

        let ids: Vec<_> = log.entries().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, ["TL-a", "TL-b"]);
        assert_eq!(log.len(), 2);
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let log = InMemoryThreatLog::new();
        log.append(entry("TL-a")).expect("first append");

        let err = log.append(entry("TL-a")).expect_err("duplicate");
        assert_eq!(err.kind(), "duplicate");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let log = InMemoryThreatLog::from_config(&AuditConfig { capacity: Some(1) });
        log.append(entry("TL-a")).expect("first append");

        let err = log.append(entry("TL-b")).expect_err("full");
        assert!(matches!(err, AuditError::Full { capacity: 1, .. }));
        assert!(log.get("TL-b").is_none());
    }

    #[test]
    fn get_returns_shared_entry() {
        let log = InMemoryThreatLog::new();
        let appended = log.append(entry("TL-a")).expect("append");

        let found = log.get("TL-a").expect("present");
        assert!(Arc::ptr_eq(&appended, &found));
    }
}
