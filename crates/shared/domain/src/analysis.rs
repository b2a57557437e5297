use crate::risk::RiskFactors;
use serde::{Deserialize, Serialize};

/// Reputation assumed for a sender domain nobody knows anything about.
pub const UNKNOWN_REPUTATION: f64 = 0.5;

/// Signals extracted from a single message. Built per request and discarded after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub has_urgency_language: bool,
    /// Distinct urgency markers matched across subject and body.
    pub urgency_hits: u32,
    pub external_link_count: u32,
    /// Links to raw IP hosts, abused TLDs, or `data:`/`javascript:` URIs.
    pub suspicious_link_count: u32,
    /// Links whose path ends in an executable or archive payload.
    pub executable_link_count: u32,
    pub sender_domain: Option<String>,
    /// Always within `[0, 1]`.
    pub sender_domain_reputation: f64,
    pub reputation_known: bool,
    pub requests_personal_info: bool,
    pub personal_info_hits: u32,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            has_urgency_language: false,
            urgency_hits: 0,
            external_link_count: 0,
            suspicious_link_count: 0,
            executable_link_count: 0,
            sender_domain: None,
            sender_domain_reputation: UNKNOWN_REPUTATION,
            reputation_known: false,
            requests_personal_info: false,
            personal_info_hits: 0,
        }
    }
}

/// Per-dimension safety scores. Higher is safer; every value is within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub url_safety: f64,
    pub content_analysis: f64,
    pub sender_reputation: f64,
    pub overall: f64,
}

/// Outcome of scoring one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_phishing: bool,
    /// Certainty of the verdict, within `[0, 100]`.
    pub confidence: f64,
    pub risk_factors: RiskFactors,
    pub sub_scores: SubScores,
}
