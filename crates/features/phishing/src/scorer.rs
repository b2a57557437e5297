//! Deterministic risk scoring.
//!
//! Scores measure safety: `100` is clean, `0` is hostile. A message is phishing when its
//! weighted overall score falls strictly below the configured threshold.

use crate::error::PhishingError;
use mshield_domain::analysis::{AnalysisResult, FeatureVector, SubScores};
use mshield_domain::config::ScoringConfig;
use mshield_domain::risk::RiskFactors;

const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self { config: ScoringConfig::default() }
    }
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, PhishingError> {
        config.validate().map_err(PhishingError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    #[must_use]
    pub fn score(&self, features: &FeatureVector) -> AnalysisResult {
        let sub_scores = self.sub_scores(features);
        let threshold = self.config.phishing_threshold;
        let is_phishing = sub_scores.overall < threshold;

        let confidence = if is_phishing {
            (threshold - sub_scores.overall) / threshold * MAX_SCORE
        } else {
            (sub_scores.overall - threshold) / (MAX_SCORE - threshold) * MAX_SCORE
        };

        AnalysisResult {
            is_phishing,
            confidence: clamp_score(confidence),
            risk_factors: self.risk_factors(features),
            sub_scores,
        }
    }

    #[must_use]
    pub fn sub_scores(&self, features: &FeatureVector) -> SubScores {
        let c = &self.config;

        let links = f64::from(features.external_link_count.min(c.link_cap));
        let url_safety = clamp_score(
            MAX_SCORE
                - c.link_penalty * links
                - c.suspicious_link_penalty * f64::from(features.suspicious_link_count)
                - c.executable_link_penalty * f64::from(features.executable_link_count),
        );

        let content_analysis = clamp_score(
            MAX_SCORE
                - self.stepped(features.urgency_hits, c.urgency_penalty, c.urgency_step)
                - self.stepped(features.personal_info_hits, c.personal_info_penalty, c.personal_info_step),
        );

        let sender_reputation = clamp_score(MAX_SCORE * features.sender_domain_reputation);

        let w = c.weights;
        let overall = clamp_score(
            (w.url * url_safety + w.content * content_analysis + w.sender * sender_reputation)
                / (w.url + w.content + w.sender),
        );

        SubScores { url_safety, content_analysis, sender_reputation, overall }
    }

    #[must_use]
    pub fn risk_factors(&self, features: &FeatureVector) -> RiskFactors {
        let mut factors = RiskFactors::empty();
        factors.set(RiskFactors::URGENT_LANGUAGE, features.urgency_hits > 0 || features.has_urgency_language);
        factors.set(RiskFactors::EXTERNAL_LINKS, features.external_link_count > 0);
        factors.set(
            RiskFactors::LOW_SENDER_REPUTATION,
            features.sender_domain_reputation < self.config.low_reputation_threshold,
        );
        factors.set(
            RiskFactors::PERSONAL_INFO_REQUEST,
            features.personal_info_hits > 0 || features.requests_personal_info,
        );
        factors.set(RiskFactors::SUSPICIOUS_LINK, features.suspicious_link_count > 0);
        factors.set(RiskFactors::EXECUTABLE_LINK, features.executable_link_count > 0);
        factors
    }

    /// Base penalty for the first hit plus one step for each extra hit, up to the cap.
    fn stepped(&self, hits: u32, base: f64, step: f64) -> f64 {
        if hits == 0 {
            return 0.0;
        }
        let extra = (hits - 1).min(self.config.max_extra_hits);
        base + step * f64::from(extra)
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, MAX_SCORE) }
}
