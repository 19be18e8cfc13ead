use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Row, TypeInfo, ValueRef, sqlite::SqliteRow};
use utoipa::ToSchema;

// --- User Store Schemas ---

/// Role
///
/// Privilege level of a user. Stored as lowercase text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// User
///
/// A row of the `users` table as read by the actor resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub username: String,
    pub role: Role,
}

/// UserRow
///
/// The listing shape returned by the bound search.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub role: String,
}

/// RawUserRow
///
/// The listing shape returned by the interpolated search. The caller controls
/// what that query selects, so each of the three columns is passed through as
/// whatever SQLite produced for it: `NULL` stays `null`, an integer stays a
/// number, a blob becomes an array of bytes. A `UNION SELECT` therefore shows
/// up in the response exactly as the database answered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawUserRow {
    #[schema(value_type = Object)]
    pub id: Value,
    #[schema(value_type = Object)]
    pub username: Value,
    #[schema(value_type = Object)]
    pub role: Value,
}

impl<'r> FromRow<'r, SqliteRow> for RawUserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: column_as_json(row, 0)?,
            username: column_as_json(row, 1)?,
            role: column_as_json(row, 2)?,
        })
    }
}

/// Decodes column `index` by the storage class of the value itself, not the
/// declared column type.
fn column_as_json(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match raw.type_info().name() {
        "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => Value::from(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

// --- Response Payloads ---

/// DeleteResponse
///
/// Echoes the requested target. Says nothing about whether a row was removed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: String,
}

/// LoadedResponse
///
/// Result of the unrestricted object loader: the type of whatever was built.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoadedResponse {
    pub loaded_type: String,
}

/// MessageEcho
///
/// Successful result of the schema-checked JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageEcho {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub msg: serde_json::Value,
}

/// ShellPingResponse
///
/// `exit_code` is null when the shell was terminated by a signal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShellPingResponse {
    pub exit_code: Option<i32>,
}

/// PingResponse
///
/// Exit status plus the first 200 characters of the diagnostic's stdout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub exit_code: Option<i32>,
    pub stdout: String,
}

/// RouteIndex
///
/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteIndex {
    pub ok: bool,
    pub routes: Vec<String>,
    pub tip: String,
}
