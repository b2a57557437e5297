//! # Domain Models
//!
//! Pure domain types shared by the scoring and encryption engines, plus the
//! configuration tree. Dependencies are limited to data crates (`serde`, `bitflags`,
//! `chrono`, `strum_macros`): no I/O, networking, or heavy logic.

pub mod analysis;
pub mod config;
pub mod email;
pub mod risk;
pub mod threat;

pub use analysis::{AnalysisResult, FeatureVector, SubScores};
pub use config::ShieldConfig;
pub use email::EmailMessage;
pub use risk::RiskFactors;
pub use threat::{Severity, ThreatLogEntry, ThreatStatus, ThreatType};
