use serial_test::serial;
use test_case::test_case;

use smart_kuku::config::{ConfigError, ServerConfig, DEFAULT_DATA_FILE};

const KEYS: [&str; 5] = [
    "SMART_KUKU_HOST",
    "SMART_KUKU_PORT",
    "SMART_KUKU_DATA_FILE",
    "SMART_KUKU_JWT_SECRET",
    "SMART_KUKU_ACCESS_TOKEN_TTL_SECS",
];

fn clear_env() {
    for key in KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.bind_address(), "0.0.0.0:8000");
    assert_eq!(config.data_file, DEFAULT_DATA_FILE);
    assert!(config.uses_dev_secret());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    std::env::set_var("SMART_KUKU_HOST", "127.0.0.1");
    std::env::set_var("SMART_KUKU_PORT", "9100");
    std::env::set_var("SMART_KUKU_JWT_SECRET", "a-long-production-secret");
    let config = ServerConfig::from_env().unwrap();
    clear_env();
    assert_eq!(config.bind_address(), "127.0.0.1:9100");
    assert!(!config.uses_dev_secret());
}

#[test_case("SMART_KUKU_PORT", "not-a-port" ; "unparsable port")]
#[test_case("SMART_KUKU_PORT", "0" ; "port zero")]
#[test_case("SMART_KUKU_JWT_SECRET", "short" ; "short secret")]
#[test_case("SMART_KUKU_ACCESS_TOKEN_TTL_SECS", "10" ; "access lifetime too short")]
#[serial]
fn invalid_environment_is_rejected(key: &str, value: &str) {
    clear_env();
    std::env::set_var(key, value);
    let result = ServerConfig::from_env();
    clear_env();
    assert!(matches!(
        result,
        Err(ConfigError::Parse { .. }) | Err(ConfigError::Validation(_))
    ));
}
