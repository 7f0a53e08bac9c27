use pgpack_logger::{LevelFilter, Logger, Stream};

#[test]
fn stderr_console_without_timestamps_has_no_guard() {
    let logger = Logger::builder()
        .name("integration-console-only")
        .stream(Stream::Stderr)
        .timestamps(false)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    tracing::info!("[AUTO-CONFIG] console smoke line");
    assert!(logger.guard().is_none(), "console-only logger should not create a file guard");
}
