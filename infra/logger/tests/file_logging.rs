use mshield_domain::config::LoggingConfig;
use mshield_logger::Logger;
use std::fs;
use tempfile::tempdir;

#[test]
fn file_logging_creates_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let config = LoggingConfig {
        name: "integration-file-logging".to_owned(),
        directory: Some(log_dir.clone()),
        max_files: 2,
        ..LoggingConfig::default()
    };

    let mut logger = Logger::from_config(&config)?;
    assert!(logger.guard().is_some(), "file output keeps a writer guard");

    tracing::info!("hello from integration test");
    assert!(logger.flush(), "first flush closes the writer");
    assert!(!logger.flush(), "nothing left to flush");
    assert!(logger.guard().is_none());

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            path.extension().and_then(|ext| ext.to_str()) == Some("log")
                && path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("integration-file-logging"))
        })
        .expect("log file should be created");

    assert!(fs::metadata(&log_file)?.len() > 0, "log file should not be empty");
    Ok(())
}
