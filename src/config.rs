use std::env;

/// AppConfig
///
/// Holds the lab's configuration. Loaded once at startup and shared read-only
/// through `AppState` via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string for the user store.
    pub database_url: String,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Echo-diagnostic program invoked by both ping handlers.
    pub ping_program: String,
    // Runtime environment marker. Selects the log format.
    pub env: Env,
}

/// Env
///
/// Runtime context: pretty logs and defaulted settings locally, JSON logs and
/// mandatory settings in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://lab.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_PING_PROGRAM: &str = "ping";

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for test scaffolding. No environment
    /// variables are read.
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            ping_program: DEFAULT_PING_PROGRAM.to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in `production` when `DATABASE_URL` is not set.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let database_url = match env {
            Env::Production => env::var("DATABASE_URL")
                .expect("FATAL: DATABASE_URL must be set in production."),
            Env::Local => {
                env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
            }
        };

        Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            ping_program: env::var("PING_PROGRAM")
                .unwrap_or_else(|_| DEFAULT_PING_PROGRAM.to_string()),
            env,
        }
    }
}
