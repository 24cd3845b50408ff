use crate::services::progress::DEFAULT_SAMPLE_INTERVAL;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which naming strategy new uploads use for their stored filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingKind {
    /// `<field>-<unix millis><.ext>`
    Timestamp,
    /// `<field>-<unix millis>-<counter><.ext>`
    Counter,
}

impl NamingKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "timestamp" => Some(Self::Timestamp),
            "counter" => Some(Self::Counter),
            _ => None,
        }
    }
}

/// Runtime configuration for the upload server
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage root holding every uploaded file (default: "uploads")
    pub upload_dir: PathBuf,

    /// URL prefix stored files are served under (default: "/uploads")
    pub public_path: String,

    /// Maximum request body size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// Progress sampling interval in milliseconds (default: 100)
    pub progress_interval_ms: u64,

    /// Events buffered per observer before a slow observer starts skipping (default: 64)
    pub event_buffer: usize,

    /// Naming strategy for stored uploads (default: timestamp)
    pub naming_strategy: NamingKind,

    /// Secret used to validate session tokens
    pub jwt_secret: String,

    /// Where unauthenticated callers are sent to sign in
    pub auth_entry_url: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            public_path: "/uploads".to_string(),
            max_file_size: 256 * 1024 * 1024, // 256 MB
            progress_interval_ms: DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
            event_buffer: 64,
            naming_strategy: NamingKind::Timestamp,
            jwt_secret: "secret".to_string(),
            auth_entry_url: "/auth/login".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            public_path: env::var("PUBLIC_PATH")
                .map(|v| normalize_prefix(&v))
                .unwrap_or(default.public_path),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            progress_interval_ms: env::var("PROGRESS_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.progress_interval_ms),

            event_buffer: env::var("EVENT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.event_buffer),

            naming_strategy: env::var("NAMING_STRATEGY")
                .ok()
                .and_then(|v| NamingKind::parse(&v))
                .unwrap_or(default.naming_strategy),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            auth_entry_url: env::var("AUTH_ENTRY_URL").unwrap_or(default.auth_entry_url),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config for local development and tests: fast sampling, collision-free naming
    pub fn development() -> Self {
        Self {
            progress_interval_ms: 10,
            naming_strategy: NamingKind::Counter,
            ..Self::default()
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.public_path, "/uploads");
        assert_eq!(config.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.naming_strategy, NamingKind::Timestamp);
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.naming_strategy, NamingKind::Counter);
        assert_eq!(config.progress_interval_ms, 10);
        assert_eq!(config.auth_entry_url, "/auth/login");
    }

    #[test]
    fn test_naming_kind_parse() {
        assert_eq!(NamingKind::parse("Counter"), Some(NamingKind::Counter));
        assert_eq!(NamingKind::parse(" timestamp "), Some(NamingKind::Timestamp));
        assert_eq!(NamingKind::parse("hash"), None);
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("files/"), "/files");
        assert_eq!(normalize_prefix("/static/uploads"), "/static/uploads");
    }
}
