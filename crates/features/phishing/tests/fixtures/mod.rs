#![allow(dead_code)]

use mshield_domain::config::ReputationConfig;
use mshield_domain::email::EmailMessage;
use mshield_phishing::{ReputationError, ReputationProvider};
use std::time::Duration;

pub const URGENT_PHISH: &str = "URGENT: verify your account, click here: http://bad.example";
pub const ORDER_SHIPPED: &str = "Thank you for your order, it has shipped";

#[must_use]
pub fn reputation_config() -> ReputationConfig {
    let mut config = ReputationConfig::default();
    config.domains.insert("shop.example".to_owned(), 0.95);
    config.domains.insert("spammy.example".to_owned(), 0.1);
    config
}

#[must_use]
pub fn urgent_phish() -> EmailMessage {
    EmailMessage::new("Security Team <security@unknown-sender.example>", "", URGENT_PHISH)
}

#[must_use]
pub fn order_shipped() -> EmailMessage {
    EmailMessage::new("Orders <orders@mail.shop.example>", "Your order", ORDER_SHIPPED)
}

/// Never answers within any sane timeout.
#[derive(Debug)]
pub struct StalledReputation;

impl ReputationProvider for StalledReputation {
    async fn lookup(&self, _domain: &str) -> Result<Option<f64>, ReputationError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Some(1.0))
    }
}

#[derive(Debug)]
pub struct BrokenReputation;

impl ReputationProvider for BrokenReputation {
    async fn lookup(&self, domain: &str) -> Result<Option<f64>, ReputationError> {
        Err(ReputationError::Unavailable { message: format!("no route for {domain}").into(), context: None })
    }
}
