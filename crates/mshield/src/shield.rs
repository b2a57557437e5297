use crate::error::ShieldError;
use crate::stats::{Counters, ShieldStats};
use mshield_audit::{InMemoryThreatLog, ThreatLogSink};
use mshield_domain::analysis::AnalysisResult;
use mshield_domain::config::ShieldConfig;
use mshield_domain::email::EmailMessage;
use mshield_domain::threat::{ThreatLogEntry, ThreatStatus};
use mshield_phishing::{ClassificationPolicy, FeatureExtractor, ReputationProvider, RiskScorer, StaticReputation};
use mshield_runtime::WorkerPool;
use mshield_vault::prelude::*;
use mshield_vault::Zeroizing;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of [`Shield::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub analysis: AnalysisResult,
    /// Id of the threat log entry, or `None` when the log refused it.
    pub log_id: Option<String>,
}

/// A fluent builder for [`Shield`].
#[must_use = "builders do nothing unless you call .build()"]
pub struct ShieldBuilder<R = StaticReputation> {
    config: ShieldConfig,
    reputation: Option<R>,
    threat_log: Option<Arc<dyn ThreatLogSink>>,
    keyring: Option<Keyring>,
}

impl Default for ShieldBuilder<StaticReputation> {
    fn default() -> Self {
        Self { config: ShieldConfig::default(), reputation: None, threat_log: None, keyring: None }
    }
}

impl<R> fmt::Debug for ShieldBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShieldBuilder")
            .field("config", &self.config)
            .field("custom_reputation", &self.reputation.is_some())
            .field("custom_threat_log", &self.threat_log.is_some())
            .finish_non_exhaustive()
    }
}

impl<R> ShieldBuilder<R> {
    pub fn config(mut self, config: ShieldConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the configured static reputation table with another provider.
    pub fn reputation<P: ReputationProvider>(self, provider: P) -> ShieldBuilder<P> {
        ShieldBuilder {
            config: self.config,
            reputation: Some(provider),
            threat_log: self.threat_log,
            keyring: self.keyring,
        }
    }

    pub fn threat_log(mut self, sink: Arc<dyn ThreatLogSink>) -> Self {
        self.threat_log = Some(sink);
        self
    }

    /// Shares an existing keyring instead of creating one from the configuration.
    pub fn keyring(mut self, keyring: Keyring) -> Self {
        self.keyring = Some(keyring);
        self
    }
}

impl ShieldBuilder<StaticReputation> {
    /// Builds with the static reputation table from the configuration.
    pub fn build(self) -> Result<Shield<StaticReputation>, ShieldError> {
        let provider = match &self.reputation {
            Some(provider) => provider.clone(),
            None => StaticReputation::from_config(&self.config.reputation),
        };
        self.finish(provider)
    }
}

impl<R: ReputationProvider> ShieldBuilder<R> {
    /// Builds with the provider passed to [`ShieldBuilder::reputation`].
    pub fn build_with_provider(mut self) -> Result<Shield<R>, ShieldError> {
        let provider = self.reputation.take().ok_or_else(|| ShieldError::Config {
            message: "no reputation provider supplied".into(),
            context: None,
        })?;
        self.finish(provider)
    }

    fn finish(self, provider: R) -> Result<Shield<R>, ShieldError> {
        let config = self.config;
        config.validate().map_err(|message| ShieldError::Config { message: message.into(), context: None })?;

        let scorer = RiskScorer::new(config.scoring.clone())?;
        let policy = ClassificationPolicy::new(config.policy.clone(), config.scoring.clone())?;
        let extractor = FeatureExtractor::new(provider, &config.reputation);
        let threat_log = self
            .threat_log
            .unwrap_or_else(|| Arc::new(InMemoryThreatLog::from_config(&config.audit)));
        let keyring = self.keyring.unwrap_or_else(|| Keyring::from_config(&config.keyring));
        let pool = WorkerPool::from_config(&config.workers);

        info!(
            workers = pool.size(),
            queue_capacity = config.workers.queue_capacity,
            phishing_threshold = config.scoring.phishing_threshold,
            "Shield initialized"
        );

        Ok(Shield {
            inner: Arc::new(ShieldInner {
                extractor,
                scorer,
                policy,
                threat_log,
                keyring,
                pool,
                counters: Counters::default(),
            }),
        })
    }
}

struct ShieldInner<R> {
    extractor: FeatureExtractor<R>,
    scorer: RiskScorer,
    policy: ClassificationPolicy,
    threat_log: Arc<dyn ThreatLogSink>,
    keyring: Keyring,
    pool: WorkerPool,
    counters: Counters,
}

/// Both engines behind one cheaply cloneable handle.
///
/// Scoring runs on the calling task. Key generation, encryption and decryption run on
/// the bounded worker pool and fail with [`ShieldError::Worker`] when it is saturated or
/// a job exceeds its timeout.
pub struct Shield<R = StaticReputation> {
    inner: Arc<ShieldInner<R>>,
}

impl<R> Clone for Shield<R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R> fmt::Debug for Shield<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shield")
            .field("keyring", &self.inner.keyring)
            .field("pool", &self.inner.pool)
            .field("threat_log_len", &self.inner.threat_log.len())
            .finish_non_exhaustive()
    }
}

impl Shield<StaticReputation> {
    pub fn builder() -> ShieldBuilder<StaticReputation> {
        ShieldBuilder::default()
    }

    pub fn from_config(config: ShieldConfig) -> Result<Self, ShieldError> {
        Self::builder().config(config).build()
    }
}

impl<R: ReputationProvider> Shield<R> {
    /// Scores a message and records exactly one threat log entry for it.
    ///
    /// A threat log failure is logged and reported as `log_id: None`; the analysis is
    /// still returned.
    pub async fn analyze(&self, message: &EmailMessage) -> Verdict {
        let inner = &self.inner;
        let features = inner.extractor.extract(message).await;
        let analysis = inner.scorer.score(&features);

        let log_id = inner
            .policy
            .classify(inner.threat_log.as_ref(), &analysis, message)
            .ok()
            .map(|entry| entry.id.clone());

        self.count_analysis(&analysis);
        debug!(
            phishing = analysis.is_phishing,
            overall = analysis.sub_scores.overall,
            confidence = analysis.confidence,
            factors = %analysis.risk_factors,
            log_id = log_id.as_deref().unwrap_or("-"),
            "Message analyzed"
        );

        Verdict { analysis, log_id }
    }

    /// Generates key material on the worker pool and registers it once complete.
    ///
    /// If the caller stops waiting, the generated material is dropped unregistered.
    pub async fn generate_key(&self, algorithm: KeyAlgorithm) -> Result<KeyHandle, ShieldError> {
        let material = self.inner.pool.run(move || KeyMaterial::generate(algorithm)).await??;
        let handle = self.inner.keyring.insert(material)?;
        Counters::bump(&self.inner.counters.keys_generated);
        Ok(handle)
    }

    pub async fn encrypt(
        &self,
        plaintext: impl Into<Vec<u8>>,
        recipient: &KeyId,
    ) -> Result<EncryptedEnvelope, ShieldError> {
        let plaintext = Zeroizing::new(plaintext.into());
        let keyring = self.inner.keyring.clone();
        let recipient = recipient.clone();

        let envelope = self.inner.pool.run(move || keyring.encrypt(&plaintext, &recipient)).await??;
        Counters::bump(&self.inner.counters.messages_encrypted);
        Ok(envelope)
    }

    pub async fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        key: &KeyId,
    ) -> Result<Zeroizing<Vec<u8>>, ShieldError> {
        let keyring = self.inner.keyring.clone();
        let envelope = envelope.clone();
        let key = key.clone();

        let plaintext = self.inner.pool.run(move || keyring.decrypt(&envelope, &key)).await??;
        Counters::bump(&self.inner.counters.messages_decrypted);
        Ok(plaintext)
    }

    pub fn export_public_key(&self, key: &KeyId) -> Result<String, ShieldError> {
        Ok(self.inner.keyring.export_public_key(key)?)
    }

    pub fn export_private_key(&self, key: &KeyId) -> Result<Zeroizing<String>, ShieldError> {
        Ok(self.inner.keyring.export_private_key(key)?)
    }

    /// Exports the private key and revokes it in one step; counts as a revocation.
    pub fn export_private_key_and_forget(&self, key: &KeyId) -> Result<Zeroizing<String>, ShieldError> {
        let pem = self.inner.keyring.export_private_key_and_forget(key)?;
        Counters::bump(&self.inner.counters.keys_revoked);
        Ok(pem)
    }

    pub fn import_public_key(&self, pem: &str) -> Result<KeyHandle, ShieldError> {
        Ok(self.inner.keyring.import_public_key(pem)?)
    }

    pub fn revoke_key(&self, key: &KeyId) -> Result<(), ShieldError> {
        self.inner.keyring.revoke(key)?;
        Counters::bump(&self.inner.counters.keys_revoked);
        Ok(())
    }

    #[must_use]
    pub fn keys(&self) -> Vec<KeyHandle> {
        self.inner.keyring.list()
    }

    #[must_use]
    pub fn keyring(&self) -> &Keyring {
        &self.inner.keyring
    }

    #[must_use]
    pub fn workers(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Every threat log entry in insertion order.
    #[must_use]
    pub fn threat_log(&self) -> Vec<Arc<ThreatLogEntry>> {
        self.inner.threat_log.entries()
    }

    #[must_use]
    pub fn stats(&self) -> ShieldStats {
        self.inner.counters.snapshot()
    }

    fn count_analysis(&self, analysis: &AnalysisResult) {
        let counters = &self.inner.counters;
        Counters::bump(&counters.emails_scanned);
        if !analysis.is_phishing {
            return;
        }
        Counters::bump(&counters.phishing_detected);
        match self.inner.policy.status(analysis) {
            ThreatStatus::Blocked => Counters::bump(&counters.blocked),
            ThreatStatus::Quarantined => Counters::bump(&counters.quarantined),
            ThreatStatus::Allowed => warn!("Phishing verdict mapped to an allowed status"),
        }
    }
}
