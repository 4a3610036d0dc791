use pvault_logger::{LevelFilter, Logger};

#[test]
fn init_console_only_has_no_guard() {
    let logger = Logger::builder()
        .name("integration-console-only")
        .console(true)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(logger.guards().is_empty(), "console-only logger should not create a file guard");

    let err = Logger::builder()
        .name("integration-console-only-second")
        .init()
        .expect_err("second init should fail");
    assert!(matches!(err, pvault_logger::LoggerError::Subscriber { .. }));
}
