use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration shared by both engines.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShieldConfigInner {
    pub scoring: ScoringConfig,
    pub policy: PolicyConfig,
    pub reputation: ReputationConfig,
    pub keyring: KeyringConfig,
    pub workers: WorkerConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ShieldConfig {
    #[serde(flatten, default)]
    inner: Arc<ShieldConfigInner>,
}

impl Deref for ShieldConfig {
    type Target = ShieldConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ShieldConfig {
    fn deref_mut(&mut self) -> &mut ShieldConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

impl ShieldConfig {
    /// Checks every section that carries numeric invariants.
    pub fn validate(&self) -> Result<(), String> {
        self.scoring.validate()?;
        self.policy.validate()?;
        self.reputation.validate()
    }
}

/// Relative weight of each sub-score in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub url: f64,
    pub content: f64,
    pub sender: f64,
}

/// Knobs of the risk scorer. Scores run from 0 (hostile) to 100 (safe).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// Messages scoring strictly below this are phishing.
    pub phishing_threshold: f64,
    /// Reputations strictly below this raise `low_sender_reputation`.
    pub low_reputation_threshold: f64,
    pub link_penalty: f64,
    /// Links beyond this count add no further penalty.
    pub link_cap: u32,
    pub suspicious_link_penalty: f64,
    pub executable_link_penalty: f64,
    pub urgency_penalty: f64,
    pub urgency_step: f64,
    pub personal_info_penalty: f64,
    pub personal_info_step: f64,
    /// Extra hits beyond the first that still add a step penalty.
    pub max_extra_hits: u32,
}

/// Confidence lower bounds of each severity band for phishing verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Phishing verdicts at or above this confidence are blocked, the rest quarantined.
    pub block_threshold: f64,
    pub severity: SeverityBands,
}

/// Static reputation table and lookup behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Score used when the provider has no opinion, fails, or times out.
    pub unknown_score: f64,
    pub lookup_timeout_ms: u64,
    /// Domain to score in `[0, 1]`. Subdomains inherit the closest listed parent.
    pub domains: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Whether raw private keys may leave the keyring as PEM.
    pub allow_private_export: bool,
}

/// Bounded pool for CPU-heavy jobs (key generation, encryption, decryption).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Concurrent jobs; `0` means available parallelism.
    pub threads: usize,
    /// Jobs allowed to wait for a free worker before new ones are rejected.
    pub queue_capacity: usize,
    pub job_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum retained entries; unbounded when absent.
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub name: String,
    pub level: String,
    pub console: bool,
    /// Directory for rolling log files; file output is disabled when absent.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
    pub env_filter: Option<String>,
}

// --- Validation ---

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        let ScoreWeights { url, content, sender } = self.weights;
        if [url, content, sender].iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("scoring weights must be finite and non-negative".to_owned());
        }
        if url + content + sender <= 0.0 {
            return Err("scoring weights must not all be zero".to_owned());
        }
        if !(self.phishing_threshold > 0.0 && self.phishing_threshold < 100.0) {
            return Err(format!(
                "phishing_threshold must lie strictly between 0 and 100, got {}",
                self.phishing_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.low_reputation_threshold) {
            return Err("low_reputation_threshold must lie within [0, 1]".to_owned());
        }
        let penalties = [
            self.link_penalty,
            self.suspicious_link_penalty,
            self.executable_link_penalty,
            self.urgency_penalty,
            self.urgency_step,
            self.personal_info_penalty,
            self.personal_info_step,
        ];
        if penalties.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err("scoring penalties must be finite and non-negative".to_owned());
        }
        Ok(())
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        let SeverityBands { critical, high, medium } = self.severity;
        if !(medium <= high && high <= critical) {
            return Err("severity bands must satisfy medium <= high <= critical".to_owned());
        }
        if [critical, high, medium, self.block_threshold].iter().any(|v| !(0.0..=100.0).contains(v))
        {
            return Err("policy thresholds must lie within [0, 100]".to_owned());
        }
        Ok(())
    }
}

impl ReputationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.unknown_score) {
            return Err("reputation.unknown_score must lie within [0, 1]".to_owned());
        }
        if let Some((domain, _)) =
            self.domains.iter().find(|(_, score)| !(0.0..=1.0).contains(*score))
        {
            return Err(format!("reputation score for '{domain}' must lie within [0, 1]"));
        }
        Ok(())
    }
}

// --- Default ---

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { url: 0.3, content: 0.4, sender: 0.3 }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            phishing_threshold: 70.0,
            low_reputation_threshold: 0.4,
            link_penalty: 35.0,
            link_cap: 3,
            suspicious_link_penalty: 25.0,
            executable_link_penalty: 40.0,
            urgency_penalty: 40.0,
            urgency_step: 10.0,
            personal_info_penalty: 30.0,
            personal_info_step: 10.0,
            max_extra_hits: 3,
        }
    }
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self { critical: 95.0, high: 85.0, medium: 60.0 }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { block_threshold: 85.0, severity: SeverityBands::default() }
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self { unknown_score: 0.5, lookup_timeout_ms: 250, domains: BTreeMap::new() }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { threads: 0, queue_capacity: 1024, job_timeout_ms: 10_000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "mshield".to_owned(),
            level: "info".to_owned(),
            console: true,
            directory: None,
            json: false,
            max_files: 7,
            env_filter: None,
        }
    }
}
