//! Phishing risk scoring feature slice.
//!
//! ```text
//! EmailMessage -> FeatureExtractor -> FeatureVector -> RiskScorer -> AnalysisResult
//!                        |                                                |
//!               ReputationProvider                    ClassificationPolicy -> ThreatLogSink
//! ```
//!
//! Extraction and scoring are deterministic. The only suspending step is the sender
//! reputation lookup, which is bounded by a timeout and falls back to a neutral score.

mod error;
pub mod extractor;
pub mod policy;
pub mod reputation;
pub mod scorer;

pub use crate::error::{PhishingError, PhishingErrorExt};
pub use crate::extractor::{FeatureExtractor, sender_domain};
pub use crate::policy::ClassificationPolicy;
pub use crate::reputation::{ReputationError, ReputationErrorExt, ReputationProvider, StaticReputation};
pub use crate::scorer::RiskScorer;
