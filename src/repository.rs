use crate::models::{RawUserRow, User, UserRow};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};

/// The bootstrap script: creates the `users` table and inserts the seed rows.
/// Idempotent, so it is safe to run on every start.
pub const SEED_SQL: &str = include_str!("../seed.sql");

/// Repository Trait
///
/// Contract for every operation the handlers perform against the user store.
/// The search and delete operations come in pairs: the `_interpolated` variant
/// splices caller input into the SQL text, the `_bound` variant keeps the SQL
/// text fixed and passes the input through a placeholder.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Looks up a single user by exact name. Used by the actor resolver.
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    /// `... WHERE username LIKE '%{filter}%'`, built with `format!`. Rows come
    /// back untyped because the filter decides what is actually selected.
    async fn search_users_interpolated(&self, filter: &str) -> Result<Vec<RawUserRow>, sqlx::Error>;

    /// `... WHERE username LIKE ? ESCAPE '\'` with the filter bound as a literal substring.
    async fn search_users_bound(&self, filter: &str) -> Result<Vec<UserRow>, sqlx::Error>;

    /// `DELETE ... WHERE username = '{username}'`. Returns rows affected.
    async fn delete_user_interpolated(&self, username: &str) -> Result<u64, sqlx::Error>;

    /// `DELETE ... WHERE username = ?`. Returns rows affected.
    async fn delete_user_bound(&self, username: &str) -> Result<u64, sqlx::Error>;
}

/// RepositoryState
///
/// The shared handle to the user store held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// connect
///
/// Opens the SQLite pool, creating the database file when it does not exist yet.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// init_db
///
/// Runs the bundled seed script against the pool.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SEED_SQL).execute(pool).await?;
    tracing::info!("user store seeded");
    Ok(())
}

/// like_pattern
///
/// Wraps `filter` in `%...%` after escaping the LIKE metacharacters, so the
/// bound pattern only ever matches `filter` as a literal substring.
pub fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for ch in filter.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// SqliteRepository
///
/// `Repository` backed by a SQLite pool. Each call checks out its own pooled
/// connection and returns it when the guard drops, on success and on error.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query_as::<_, User>("SELECT username, role FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await
    }

    /// search_users_interpolated
    ///
    /// **Injectable.** A quote in `filter` closes the string literal and the
    /// remainder is parsed as SQL, e.g. `x%' OR 1=1 --` returns every row and
    /// `x' UNION SELECT name, type, sql FROM sqlite_master --` dumps the schema.
    async fn search_users_interpolated(
        &self,
        filter: &str,
    ) -> Result<Vec<RawUserRow>, sqlx::Error> {
        let sql = format!("SELECT id, username, role FROM users WHERE username LIKE '%{filter}%'");
        tracing::debug!(%sql, "executing interpolated search");

        let mut conn = self.pool.acquire().await?;
        sqlx::query_as::<_, RawUserRow>(&sql).fetch_all(&mut *conn).await
    }

    async fn search_users_bound(&self, filter: &str) -> Result<Vec<UserRow>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, role FROM users WHERE username LIKE ? ESCAPE '\'",
        )
        .bind(like_pattern(filter))
        .fetch_all(&mut *conn)
        .await
    }

    /// delete_user_interpolated
    ///
    /// **Injectable.** `nobody' OR '1'='1` empties the table.
    async fn delete_user_interpolated(&self, username: &str) -> Result<u64, sqlx::Error> {
        let sql = format!("DELETE FROM users WHERE username = '{username}'");
        tracing::debug!(%sql, "executing interpolated delete");

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(&sql).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    async fn delete_user_bound(&self, username: &str) -> Result<u64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
