#![allow(dead_code)]

use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use vuln_lab::{
    AppConfig, AppState, create_router,
    models::UserRow,
    repository::{self, RepositoryState, SqliteRepository},
};

pub const SEEDED: [&str; 4] = ["alice", "bob", "carol", "dave"];

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    // Keeps the database file alive for the lifetime of the test.
    pub dir: TempDir,
}

/// A freshly seeded SQLite file in its own temporary directory.
pub async fn seeded_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("lab.db").display());

    let pool = repository::connect(&url)
        .await
        .expect("Failed to open SQLite in tests");
    repository::init_db(&pool)
        .await
        .expect("Failed to seed SQLite in tests");

    (dir, pool)
}

/// Spawns the lab with `echo` standing in for `ping`, so the argument vector
/// the handlers build ends up in stdout.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig {
        ping_program: "echo".to_string(),
        ..AppConfig::default()
    })
    .await
}

pub async fn spawn_app_with(config: AppConfig) -> TestApp {
    let (dir, pool) = seeded_pool().await;

    let repo = Arc::new(SqliteRepository::new(pool.clone())) as RepositoryState;
    let router = create_router(AppState { repo, config });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
        dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Usernames currently in the store, read directly from the database.
    pub async fn usernames(&self) -> Vec<String> {
        sqlx::query_scalar::<_, String>("SELECT username FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    /// GET `{prefix}/sql/users?q=...`, sorted so results compare as sets.
    pub async fn search(&self, prefix: &str, q: &str) -> Vec<UserRow> {
        let response = self
            .client
            .get(self.url(&format!("{}/sql/users", prefix)))
            .query(&[("q", q)])
            .send()
            .await
            .expect("search request failed");
        assert_eq!(response.status(), 200, "search for {:?} under {}", q, prefix);

        let mut rows: Vec<UserRow> = response.json().await.unwrap();
        rows.sort();
        rows
    }

    /// GET `{prefix}/sql/users?q=...` without assuming a row shape.
    pub async fn search_raw(&self, prefix: &str, q: &str) -> (u16, serde_json::Value) {
        let response = self
            .client
            .get(self.url(&format!("{}/sql/users", prefix)))
            .query(&[("q", q)])
            .send()
            .await
            .expect("search request failed");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn delete_user(&self, prefix: &str, target: &str, actor: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .delete(self.url(&format!("{}/admin/delete", prefix)))
            .query(&[("user", target)]);
        if let Some(actor) = actor {
            request = request.header("X-User", actor);
        }
        request.send().await.expect("delete request failed")
    }
}
