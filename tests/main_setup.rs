use serial_test::serial;
use std::{env, panic};
use vuln_lab::{
    AppConfig,
    config::{DEFAULT_BIND_ADDR, DEFAULT_DATABASE_URL, DEFAULT_PING_PROGRAM, Env},
};

const CONFIG_VARS: [&str; 4] = ["APP_ENV", "DATABASE_URL", "BIND_ADDR", "PING_PROGRAM"];

// --- Setup/Teardown Utilities ---

/// Runs `test` with the given variables set (and every other config variable
/// cleared), then restores the original environment.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(&[("APP_ENV", "production")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without DATABASE_URL"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(&[("APP_ENV", "local")], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    assert_eq!(config.ping_program, DEFAULT_PING_PROGRAM);
}

#[test]
#[serial]
fn test_app_config_reads_overrides() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "sqlite:///var/lib/lab/lab.db"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("PING_PROGRAM", "/usr/bin/ping"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.database_url, "sqlite:///var/lib/lab/lab.db");
    assert_eq!(config.bind_addr, "127.0.0.1:8080");
    assert_eq!(config.ping_program, "/usr/bin/ping");
}

#[test]
fn test_default_config_is_test_safe() {
    let config = AppConfig::default();
    assert_eq!(config.env, Env::Local);
    assert_eq!(config.ping_program, DEFAULT_PING_PROGRAM);
}
