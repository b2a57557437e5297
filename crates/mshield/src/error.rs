use mshield_phishing::PhishingError;
use mshield_runtime::PoolError;
use mshield_vault::VaultError;
use std::borrow::Cow;

#[mshield_derive::mshield_error]
pub enum ShieldError {
    #[error("Key operation failed{}: {source}", format_context(context))]
    Vault { source: VaultError, context: Option<Cow<'static, str>> },

    /// The worker pool rejected, timed out, or lost the job.
    #[error("Worker failure{}: {source}", format_context(context))]
    Worker { source: PoolError, context: Option<Cow<'static, str>> },

    #[error("Scoring engine failure{}: {source}", format_context(context))]
    Phishing { source: PhishingError, context: Option<Cow<'static, str>> },

    #[error("Invalid configuration{}: {message}", format_context(context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Shield error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
