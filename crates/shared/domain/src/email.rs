use serde::{Deserialize, Serialize};

/// An inbound message submitted for scoring. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self { sender: sender.into(), subject: subject.into(), body: body.into() }
    }

    /// Returns `true` when neither subject nor body carry any visible text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.subject.trim().is_empty() && self.body.trim().is_empty()
    }
}
