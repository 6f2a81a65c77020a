use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8000);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.data_dir, PathBuf::from("./.data"));
    assert_eq!(config.embedding_dimension, 1024);
    assert_eq!(config.max_embed_chars, 5500);
    assert_eq!(config.weakness_top_k, 2);
    assert!(config.hot_reload);
    assert!(config.embedding_api_key.is_none());
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8000");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_overrides() {
    let config = with_env_vars(
        &[
            ("TRIAGE_PORT", "9100"),
            ("TRIAGE_DATA_DIR", "/tmp/triage-data"),
            ("TRIAGE_EMBEDDING_DIMENSION", "768"),
            ("TRIAGE_WEAKNESS_MIN_FREQUENCY", "0.25"),
            ("TRIAGE_HOT_RELOAD", "false"),
        ],
        || Config::from_env().expect("should parse overrides"),
    );

    assert_eq!(config.port, 9100);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/triage-data"));
    assert_eq!(config.embedding_dimension, 768);
    assert_eq!(config.weakness_min_frequency, 0.25);
    assert!(!config.hot_reload);
}

#[test]
#[serial]
fn test_invalid_port_rejected() {
    let result = with_env_vars(&[("TRIAGE_PORT", "0")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidPort { .. })));

    let result = with_env_vars(&[("TRIAGE_PORT", "not-a-port")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::PortParseError { .. })));
}

#[test]
#[serial]
fn test_invalid_bind_addr_rejected() {
    let result = with_env_vars(&[("TRIAGE_BIND_ADDR", "999.0.0.1")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidBindAddr { .. })));
}

#[test]
fn test_validate_rejects_out_of_range_fractions() {
    let config = Config {
        weakness_min_frequency: 1.5,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            name: "weakness_min_frequency",
            ..
        })
    ));
}

#[test]
fn test_validate_accepts_defaults() {
    Config::default().validate().expect("defaults are valid");
}
