use mshield_domain::config::LoggingConfig;
use mshield_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn init_twice_returns_subscriber_error() {
    let _logger = Logger::builder()
        .name("integration-init-twice")
        .level(LevelFilter::INFO)
        .init()
        .expect("first init should succeed");

    let config = LoggingConfig { name: "integration-init-twice-second".to_owned(), ..LoggingConfig::default() };
    let err = Logger::from_config(&config).expect_err("second init should fail");

    assert!(
        matches!(err, LoggerError::Subscriber { .. }),
        "expected subscriber error for second init"
    );
}

#[test]
fn unknown_level_is_rejected_before_install() {
    let config = LoggingConfig { level: "chatty".to_owned(), ..LoggingConfig::default() };
    let err = Logger::from_config(&config).expect_err("unknown level");
    assert_eq!(err.kind(), "invalid_configuration");
}
