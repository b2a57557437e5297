use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Category of a detected threat.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
pub enum ThreatType {
    Phishing,
    Malware,
    Spam,
    Unclassified,
}

/// Ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What the policy did with the message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
pub enum ThreatStatus {
    Blocked,
    Quarantined,
    Allowed,
}

/// One append-only audit record. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub severity: Severity,
    pub status: ThreatStatus,
    pub confidence: f64,
}

impl ThreatLogEntry {
    /// Column order used by every tabular export.
    pub const FIELDS: [&'static str; 7] =
        ["id", "timestamp", "sender", "type", "severity", "status", "confidence"];

    /// Renders the entry as strings in [`Self::FIELDS`] order.
    #[must_use]
    pub fn record(&self) -> [String; 7] {
        [
            self.id.clone(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.sender.clone(),
            self.threat_type.to_string(),
            self.severity.to_string(),
            self.status.to_string(),
            format!("{:.1}", self.confidence),
        ]
    }
}
