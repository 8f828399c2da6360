//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for shareward.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite (or other) database URL (default: `"sqlite://shareward.db"`).
    /// Supports any sqlx-compatible connection string.
    pub database_url: String,

    /// External program used to create/remove network shares
    /// (default: `"net"`). Point this at a stub script on dev boxes that
    /// cannot perform real share operations.
    pub share_tool: String,

    /// Seconds to wait for the share tool before treating the invocation as
    /// failed (default: 30).
    pub share_timeout_secs: u64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve Swagger UI at `/swagger-ui` (default: true). Disable in
    /// production with `SHAREWARD_ENABLE_SWAGGER=false`.
    pub enable_swagger: bool,

    /// Comma-separated CORS origin allowlist; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("SHAREWARD_BIND", "0.0.0.0:3000"),
            database_url: env_or("SHAREWARD_DATABASE_URL", "sqlite://shareward.db"),
            share_tool: env_or("SHAREWARD_SHARE_TOOL", "net"),
            share_timeout_secs: parse_env("SHAREWARD_SHARE_TIMEOUT_SECS", 30),
            log_level: env_or("SHAREWARD_LOG", "info"),
            log_json: std::env::var("SHAREWARD_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            enable_swagger: std::env::var("SHAREWARD_ENABLE_SWAGGER")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(true),
            cors_allowed_origins: std::env::var("SHAREWARD_CORS_ORIGINS").ok(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
