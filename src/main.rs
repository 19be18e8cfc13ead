use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vuln_lab::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{self, RepositoryState, SqliteRepository},
};

/// main
///
/// Entry point for the lab server: Configuration, Logging, User Store, then the
/// HTTP server. Any failure before the listener is up is fatal and aborts the
/// process with a `FATAL:` message naming the variable to check.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // A `.env` in the working directory or a parent is optional. In production `DATABASE_URL`
    // must be set explicitly or `load()` panics.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins. The default keeps `vuln_lab` at debug so the interpolated
    // SQL text and the resolved actor of every request show up in the log.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vuln_lab=debug,tower_http=info,axum=trace".into());

    // 3. Log Format by Environment
    match config.env {
        // LOCAL: multi-line, human readable.
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        // PRODUCTION: one JSON object per event, span fields included.
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("vuln-lab starting in {:?} mode", config.env);

    // 4. User Store
    // Opens the SQLite file, creating it if missing, then re-runs the seed
    // script. Seeding is `INSERT OR IGNORE`, so users deleted during an earlier
    // run come back.
    let pool = repository::connect(&config.database_url)
        .await
        .expect("FATAL: Failed to open the SQLite user store. Check DATABASE_URL.");
    repository::init_db(&pool)
        .await
        .expect("FATAL: Failed to run the seed script.");

    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 5. Unified State Assembly and Server Startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
