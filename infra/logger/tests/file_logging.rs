use pgpack_logger::{LevelFilter, Logger};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn file_logging_writes_json_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("integration-file-logging")
        .console(false)
        .level(LevelFilter::INFO)
        .path(&log_dir)
        .json()
        .init()?;

    tracing::info!(scenario = "manual-1536", "scenario passed");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let content = fs::read_to_string(&log_file)?;
    let first = content.lines().next().expect("at least one line");
    let parsed: serde_json::Value = serde_json::from_str(first)?;
    assert_eq!(parsed["fields"]["message"], "scenario passed");
    assert_eq!(parsed["fields"]["scenario"], "manual-1536");
    Ok(())
}
