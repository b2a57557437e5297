//! Facade crate for `MailShield`.
//! Re-exports domain and kernel primitives and composes both engines into [`Shield`].
//! Keep this crate thin: it wires other crates together, business logic lives in the slices.
//!
//! ## Usage
//! ```rust
//! use mshield::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ShieldError> {
//! let shield = Shield::builder().build()?;
//!
//! let verdict = shield
//!     .analyze(&EmailMessage::new("a@b.example", "Hi", "URGENT: verify your account, click here"))
//!     .await;
//! assert!(verdict.log_id.is_some());
//!
//! let key = shield.generate_key(KeyAlgorithm::X25519).await?;
//! let envelope = shield.encrypt(b"hello".to_vec(), &key.id).await?;
//! assert_eq!(shield.decrypt(&envelope, &key.id).await?.as_slice(), b"hello");
//! # Ok(())
//! # }
//! ```

mod error;
mod shield;
mod stats;

pub use crate::error::{ShieldError, ShieldErrorExt};
pub use crate::shield::{Shield, ShieldBuilder, Verdict};
pub use crate::stats::ShieldStats;
pub use mshield_audit as audit;
pub use mshield_domain as domain;
pub use mshield_kernel as kernel;
pub use mshield_phishing as phishing;
pub use mshield_runtime as runtime;
pub use mshield_vault as vault;

pub mod prelude {
    pub use crate::error::ShieldError;
    pub use crate::shield::{Shield, Verdict};
    pub use crate::stats::ShieldStats;
    pub use mshield_domain::{AnalysisResult, EmailMessage, RiskFactors, ShieldConfig, ThreatLogEntry};
    pub use mshield_vault::{EncryptedEnvelope, KeyAlgorithm, KeyHandle, KeyId};
}
