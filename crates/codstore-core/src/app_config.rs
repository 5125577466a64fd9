use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Object storage (S3-compatible) settings. Present only when every field was
/// configured; a partial configuration degrades uploads to an error response.
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub public_base_url: String,
}

/// Application configuration, read once at startup and passed through
/// application state. Nothing re-reads the environment per request.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Shared secret for the `X-Admin-Key` header. `None` disables the admin
    /// auth check, which is only permitted in development.
    pub admin_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub cors_suffixes: Vec<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_ids: Vec<String>,
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    pub meta_test_event_code: Option<String>,
    pub cloudflare_api_token: Option<String>,
    pub cloudflare_zone_id: Option<String>,
    pub storage: Option<StorageConfig>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .field("access_key_id", &"[redacted]")
            .field("secret_access_key", &"[redacted]")
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("admin_key", &self.admin_key.as_ref().map(|_| "[redacted]"))
            .field("cors_origins", &self.cors_origins)
            .field("cors_suffixes", &self.cors_suffixes)
            .field(
                "telegram_token",
                &self.telegram_token.as_ref().map(|_| "[redacted]"),
            )
            .field("telegram_chat_ids", &self.telegram_chat_ids)
            .field("meta_pixel_id", &self.meta_pixel_id)
            .field(
                "meta_access_token",
                &self.meta_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("meta_test_event_code", &self.meta_test_event_code)
            .field(
                "cloudflare_api_token",
                &self.cloudflare_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("cloudflare_zone_id", &self.cloudflare_zone_id)
            .field("storage", &self.storage)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
