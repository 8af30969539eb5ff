//! Integration tests for logging functionality

use bazaar::config::LoggingConfig;
use bazaar::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_console_only_disables_file_output() {
    let config = LoggingConfig::console_only();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected() {
    let result = init_logging("verbose", &LoggingConfig::console_only());
    assert!(result.is_err());
}

#[test]
fn test_file_logging_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    assert!(!log_path.exists());

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    // Only this test installs a global subscriber in this binary
    let _guard = init_logging("debug", &config).unwrap();
    tracing::info!(table = "1688_orders", "Logging smoke test");

    assert!(log_path.is_dir());
}
