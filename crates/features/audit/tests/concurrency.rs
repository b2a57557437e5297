use chrono::Utc;
use mshield_audit::{InMemoryThreatLog, ThreatLogSink};
use mshield_domain::threat::{Severity, ThreatLogEntry, ThreatStatus, ThreatType};
use mshield_kernel::ids::{is_threat_log_id, threat_log_id};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn entry(sender: String) -> ThreatLogEntry {
    ThreatLogEntry {
        id: threat_log_id(),
        timestamp: Utc::now(),
        sender,
        threat_type: ThreatType::Spam,
        severity: Severity::Low,
        status: ThreatStatus::Allowed,
        confidence: 10.0,
    }
}

#[test]
fn concurrent_appends_produce_one_total_order() {
    let log = Arc::new(InMemoryThreatLog::new());
    let threads = 8;
    let per_thread = 100;

    let writers: Vec<_> = (0..threads)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..per_thread {
                    log.append(entry(format!("writer{t}-{i}@example.com"))).expect("append");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer panicked");
    }

    let entries = log.entries();
    assert_eq!(entries.len(), threads * per_thread);

    let ids: HashSet<_> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), entries.len(), "ids are unique");
    assert!(entries.iter().all(|e| is_threat_log_id(&e.id)));

    // Each writer's own entries keep their program order.
    for t in 0..threads {
        let prefix = format!("writer{t}-");
        let seen: Vec<usize> = entries
            .iter()
            .filter_map(|e| e.sender.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('@').next()?.parse().ok())
            .collect();
        assert_eq!(seen, (0..per_thread).collect::<Vec<_>>());
    }

    assert_eq!(log.entries(), entries, "snapshots are stable");
}

#[test]
fn sink_works_behind_a_trait_object() {
    let sink: Arc<dyn ThreatLogSink> = Arc::new(InMemoryThreatLog::with_capacity(4));
    assert!(sink.is_empty());

    sink.append(entry("a@example.com".to_owned())).expect("append");
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.entries()[0].record()[2], "a@example.com");
}
