use mshield_audit::AuditError;
use std::borrow::Cow;

/// Scoring slice error type.
#[mshield_derive::mshield_error]
pub enum PhishingError {
    /// Rejected scoring or policy configuration.
    #[error("Invalid scoring configuration{}: {message}", format_context(context))]
    InvalidConfig { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The threat log refused the entry.
    #[error("Threat log rejected entry{}: {source}", format_context(context))]
    Sink { source: AuditError, context: Option<Cow<'static, str>> },

    #[error("Phishing engine error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl PhishingError {
    pub(crate) fn invalid_config(message: String) -> Self {
        Self::InvalidConfig { message: message.into(), context: None }
    }
}
