use std::borrow::Cow;

/// Audit slice error type.
#[mshield_derive::mshield_error]
pub enum AuditError {
    /// An entry with the same id was already appended.
    #[error("Duplicate threat log entry{}: {id}", format_context(context))]
    Duplicate { id: String, context: Option<Cow<'static, str>> },

    #[error("Threat log full{}: capacity {capacity}", format_context(context))]
    Full { capacity: usize, context: Option<Cow<'static, str>> },

    #[error("Audit error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
