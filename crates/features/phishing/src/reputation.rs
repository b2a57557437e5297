//! Sender domain reputation.
//!
//! Scores run from `0.0` (known bad) to `1.0` (fully trusted). A provider answers
//! `Ok(None)` when it has no opinion; the extractor then falls back to the configured
//! unknown score.

use fxhash::FxHashMap;
use mshield_domain::config::ReputationConfig;
use std::borrow::Cow;
use std::future::Future;

#[mshield_derive::mshield_error]
pub enum ReputationError {
    #[error("Reputation source unavailable{}: {message}", format_context(context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Reputation lookup failed{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// External collaborator that rates sender domains.
pub trait ReputationProvider: Send + Sync {
    /// `domain` is lowercased and has no trailing dot.
    fn lookup(&self, domain: &str) -> impl Future<Output = Result<Option<f64>, ReputationError>> + Send;
}

/// Fixed domain table with parent-domain inheritance.
///
/// `mail.example.com` resolves to the entry for `example.com` unless it has its own.
#[derive(Debug, Clone, Default)]
pub struct StaticReputation {
    domains: FxHashMap<String, f64>,
}

impl StaticReputation {
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let domains = entries
            .into_iter()
            .map(|(domain, score)| (normalize(domain.as_ref()), score.clamp(0.0, 1.0)))
            .filter(|(domain, score)| !domain.is_empty() && score.is_finite())
            .collect();
        Self { domains }
    }

    #[must_use]
    pub fn from_config(config: &ReputationConfig) -> Self {
        Self::new(config.domains.iter().map(|(domain, score)| (domain, *score)))
    }

    /// Closest listed ancestor of `domain`, including `domain` itself.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> Option<f64> {
        let domain = normalize(domain);
        let mut candidate = domain.as_str();
        loop {
            if let Some(score) = self.domains.get(candidate) {
                return Some(*score);
            }
            let (_, parent) = candidate.split_once('.')?;
            candidate = parent;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }
}

impl ReputationProvider for StaticReputation {
    async fn lookup(&self, domain: &str) -> Result<Option<f64>, ReputationError> {
        Ok(self.resolve(domain))
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
