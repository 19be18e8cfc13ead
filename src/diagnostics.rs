use regex::Regex;
use std::{process::Stdio, sync::LazyLock};
use tokio::process::Command;

use crate::models::PingResponse;

/// Echo-count flag understood by the platform's `ping`.
pub const COUNT_FLAG: &str = if cfg!(windows) { "-n" } else { "-c" };

/// Command interpreter used by the shell-based invocations.
pub const SHELL: &str = if cfg!(windows) { "cmd" } else { "sh" };
pub const SHELL_FLAG: &str = if cfg!(windows) { "/C" } else { "-c" };

/// Longest stdout excerpt returned by [`exec_ping`], in characters.
pub const STDOUT_LIMIT: usize = 200;

/// Letters, digits, dot and hyphen; anchored on both ends.
static ALLOWED_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.\-]+$").expect("host allow-list pattern is valid")
});

pub fn is_allowed_host(host: &str) -> bool {
    ALLOWED_HOST.is_match(host)
}

/// shell_command_line
///
/// The single string handed to the shell by [`shell_ping`]. `host` is spliced
/// in as-is, so `;`, `&&`, `|`, `$(...)` and friends are interpreted.
pub fn shell_command_line(program: &str, host: &str) -> String {
    format!("{program} {COUNT_FLAG} 1 {host}")
}

/// shell_ping
///
/// **Injectable.** Runs [`shell_command_line`] through the platform shell with
/// inherited stdio and returns its exit code.
pub async fn shell_ping(program: &str, host: &str) -> std::io::Result<Option<i32>> {
    let line = shell_command_line(program, host);
    tracing::debug!(%line, "running diagnostic through the shell");

    let status = Command::new(SHELL).arg(SHELL_FLAG).arg(&line).status().await?;
    Ok(status.code())
}

/// exec_ping
///
/// Runs `program -c 1 <host>` directly, each piece its own argv entry, with no
/// shell in between. The caller must have checked `host` with
/// [`is_allowed_host`] first.
pub async fn exec_ping(program: &str, host: &str) -> std::io::Result<PingResponse> {
    let output = Command::new(program)
        .args([COUNT_FLAG, "1", host])
        .stdin(Stdio::null())
        .output()
        .await?;

    Ok(PingResponse {
        exit_code: output.status.code(),
        stdout: truncate_chars(&String::from_utf8_lossy(&output.stdout), STDOUT_LIMIT),
    })
}

/// truncate_chars
///
/// First `limit` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
