//! Tests for config module

use epgsync::config::Config;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_KEYS: &[&str] = &[
    "EPGSYNC_CRON",
    "EPGSYNC_MAX_CONCURRENT",
    "EPGSYNC_SERVER_ADDRESS",
    "EPGSYNC_DIRECTORY_URL",
    "EPGSYNC_GUIDE_URL",
    "EPGSYNC_REQUEST_TIMEOUT",
    "EPGSYNC_MAX_RETRIES",
    "EPGSYNC_RATE_LIMIT",
    "EPGSYNC_USER_AGENT",
    "EPGSYNC_LOG_LEVEL",
    "EPGSYNC_LOG_FORMAT",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_exists() {
    let config_path = std::path::Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
#[serial]
fn test_shipped_config_is_valid() {
    clear_env();
    let config = Config::load(Some(std::path::Path::new("config.toml"))).unwrap();
    assert_eq!(config.refresh.cron, "0 */6 * * *");
    assert_eq!(config.effective_concurrency(), 16);
}

#[test]
#[serial]
fn test_partial_file_uses_defaults() {
    clear_env();
    let file = write_config(
        r#"
[refresh]
max_concurrent = 4
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.refresh.max_concurrent, 4);
    assert_eq!(config.refresh.cron, "0 */6 * * *");
    assert_eq!(config.server.address, "0.0.0.0:8080");
    assert_eq!(config.logging.format, "text");
}

#[test]
#[serial]
fn test_zero_concurrency_resolves_to_ceiling() {
    clear_env();
    let file = write_config("[refresh]\nmax_concurrent = 0\n");
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.effective_concurrency(), 16);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = write_config(
        r#"
[refresh]
cron = "0 0 * * *"

[server]
address = "127.0.0.1:1"
"#,
    );

    std::env::set_var("EPGSYNC_CRON", "@every 15m");
    std::env::set_var("EPGSYNC_MAX_CONCURRENT", "40");
    std::env::set_var("EPGSYNC_LOG_FORMAT", "json");

    let result = Config::load(Some(file.path()));
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.refresh.cron, "@every 15m");
    assert_eq!(config.refresh.max_concurrent, 40);
    assert_eq!(config.effective_concurrency(), 16);
    assert_eq!(config.server.address, "127.0.0.1:1");
    assert_eq!(config.logging.format, "json");
}

#[test]
#[serial]
fn test_non_numeric_env_rejected() {
    clear_env();
    std::env::set_var("EPGSYNC_MAX_CONCURRENT", "lots");
    let result = Config::from_env();
    clear_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_invalid_cron_rejected() {
    clear_env();
    let file = write_config("[refresh]\ncron = \"every tuesday\"\n");
    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_guide_url_without_placeholder_rejected() {
    clear_env();
    let file = write_config("[source]\nguide_url = \"http://example.com/epg\"\n");
    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
fn test_malformed_toml_rejected() {
    let file = write_config("[refresh\ncron = ");
    assert!(Config::from_file(file.path()).is_err());
}
