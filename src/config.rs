use anyhow::bail;
use serde::Deserialize;

/// Upper bound for `SESSION_LIFETIME_MINUTES`: one year.
pub const MAX_SESSION_LIFETIME_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_minutes: i64,
    pub secure_cookie: bool,
    /// Seconds between expired-session sweeps; 0 turns the sweeper off.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".into(),
            lifetime_minutes: 60 * 24,
            secure_cookie: false,
            cleanup_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    /// `LOG_FORMAT=json` switches the subscriber to JSON lines.
    pub json_logs: bool,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            get("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let defaults = SessionConfig::default();
        let session = SessionConfig {
            cookie_name: get("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            lifetime_minutes: session_lifetime(get("SESSION_LIFETIME_MINUTES"))?
                .unwrap_or(defaults.lifetime_minutes),
            secure_cookie: get("SESSION_COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(defaults.secure_cookie),
            cleanup_interval_secs: get("SESSION_CLEANUP_INTERVAL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.cleanup_interval_secs),
        };
        let max_connections = get("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let port = match get("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("APP_PORT must be a port number, got {v:?}"))?,
            None => 8080,
        };
        Ok(Self {
            database_url,
            max_connections,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            json_logs: get("LOG_FORMAT").is_some_and(|v| v == "json"),
            session,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Non-positive or unparsable values fall back to the default; values past
/// [`MAX_SESSION_LIFETIME_MINUTES`] stop startup.
fn session_lifetime(raw: Option<String>) -> anyhow::Result<Option<i64>> {
    let Some(minutes) = raw.and_then(|v| v.parse::<i64>().ok()).filter(|m| *m > 0) else {
        return Ok(None);
    };
    if minutes > MAX_SESSION_LIFETIME_MINUTES {
        bail!(
            "SESSION_LIFETIME_MINUTES must be at most {MAX_SESSION_LIFETIME_MINUTES}, got {minutes}"
        );
    }
    Ok(Some(minutes))
}
