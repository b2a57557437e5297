//! Turns analysis results into threat log entries.

use crate::error::{PhishingError, PhishingErrorExt};
use chrono::Utc;
use mshield_audit::ThreatLogSink;
use mshield_domain::analysis::AnalysisResult;
use mshield_domain::config::{PolicyConfig, ScoringConfig};
use mshield_domain::email::EmailMessage;
use mshield_domain::risk::RiskFactors;
use mshield_domain::threat::{Severity, ThreatLogEntry, ThreatStatus, ThreatType};
use mshield_kernel::ids::threat_log_id;
use std::sync::Arc;
use tracing::{debug, error};

/// Maps each risk factor to the threat category it indicates, in tie-break order.
const CATEGORIES: [(RiskFactors, ThreatType); 6] = [
    (RiskFactors::EXECUTABLE_LINK, ThreatType::Malware),
    (RiskFactors::SUSPICIOUS_LINK, ThreatType::Phishing),
    (RiskFactors::PERSONAL_INFO_REQUEST, ThreatType::Phishing),
    (RiskFactors::URGENT_LANGUAGE, ThreatType::Phishing),
    (RiskFactors::EXTERNAL_LINKS, ThreatType::Spam),
    (RiskFactors::LOW_SENDER_REPUTATION, ThreatType::Spam),
];

#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    config: PolicyConfig,
    scoring: ScoringConfig,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self { config: PolicyConfig::default(), scoring: ScoringConfig::default() }
    }
}

impl ClassificationPolicy {
    /// `scoring` supplies the weights used to find the dominant risk factor.
    pub fn new(config: PolicyConfig, scoring: ScoringConfig) -> Result<Self, PhishingError> {
        config.validate().map_err(PhishingError::invalid_config)?;
        scoring.validate().map_err(PhishingError::invalid_config)?;
        Ok(Self { config, scoring })
    }

    /// Builds the log entry for one analysed message without recording it.
    #[must_use]
    pub fn build_entry(&self, result: &AnalysisResult, message: &EmailMessage) -> ThreatLogEntry {
        ThreatLogEntry {
            id: threat_log_id(),
            timestamp: Utc::now(),
            sender: message.sender.trim().to_owned(),
            threat_type: self.threat_type(result),
            severity: self.severity(result),
            status: self.status(result),
            confidence: result.confidence,
        }
    }

    /// Builds the entry and appends it to `sink` exactly once.
    pub fn classify(
        &self,
        sink: &dyn ThreatLogSink,
        result: &AnalysisResult,
        message: &EmailMessage,
    ) -> Result<Arc<ThreatLogEntry>, PhishingError> {
        let entry = self.build_entry(result, message);
        let id = entry.id.clone();

        match sink.append(entry).context("Recording analysis") {
            Ok(entry) => {
                debug!(id = %entry.id, status = %entry.status, severity = %entry.severity, "Threat log entry recorded");
                Ok(entry)
            }
            Err(err) => {
                error!(%id, kind = err.kind(), error = %err, "Failed to record threat log entry");
                Err(err)
            }
        }
    }

    /// Confidence bands apply to phishing verdicts only; allowed mail is always `Low`.
    #[must_use]
    pub fn severity(&self, result: &AnalysisResult) -> Severity {
        if !result.is_phishing {
            return Severity::Low;
        }
        let bands = self.config.severity;
        match result.confidence {
            c if c >= bands.critical => Severity::Critical,
            c if c >= bands.high => Severity::High,
            c if c >= bands.medium => Severity::Medium,
            _ => Severity::Low,
        }
    }

    #[must_use]
    pub fn status(&self, result: &AnalysisResult) -> ThreatStatus {
        match (result.is_phishing, result.confidence >= self.config.block_threshold) {
            (true, true) => ThreatStatus::Blocked,
            (true, false) => ThreatStatus::Quarantined,
            (false, _) => ThreatStatus::Allowed,
        }
    }

    /// Category of the factor with the largest weighted penalty.
    #[must_use]
    pub fn threat_type(&self, result: &AnalysisResult) -> ThreatType {
        let mut dominant: Option<(f64, ThreatType)> = None;
        for (factor, category) in CATEGORIES {
            if !result.risk_factors.contains(factor) {
                continue;
            }
            let weight = self.contribution(factor, result);
            if dominant.is_none_or(|(best, _)| weight > best) {
                dominant = Some((weight, category));
            }
        }
        dominant.map_or(ThreatType::Unclassified, |(_, category)| category)
    }

    fn contribution(&self, factor: RiskFactors, result: &AnalysisResult) -> f64 {
        let s = &self.scoring;
        let total = s.weights.url + s.weights.content + s.weights.sender;
        let (weight, penalty) = match factor {
            f if f == RiskFactors::EXECUTABLE_LINK => (s.weights.url, s.executable_link_penalty),
            f if f == RiskFactors::SUSPICIOUS_LINK => (s.weights.url, s.suspicious_link_penalty),
            f if f == RiskFactors::EXTERNAL_LINKS => (s.weights.url, s.link_penalty),
            f if f == RiskFactors::URGENT_LANGUAGE => (s.weights.content, s.urgency_penalty),
            f if f == RiskFactors::PERSONAL_INFO_REQUEST => (s.weights.content, s.personal_info_penalty),
            f if f == RiskFactors::LOW_SENDER_REPUTATION => {
                (s.weights.sender, 100.0 - result.sub_scores.sender_reputation)
            }
            _ => (0.0, 0.0),
        };
        weight * penalty / total
    }
}
