//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (`development`, `production`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

fn default_environment() -> String {
    "development".to_string()
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds an idle connection stays in the pool.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Seconds to wait when opening a connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_idle_timeout() -> u64 {
    20
}

fn default_connect_timeout() -> u64 {
    10
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session cookies.
    #[serde(default = "default_auth_secret")]
    pub secret: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_expiry")]
    pub session_expires_secs: u64,
    /// Age in seconds after which a resolved session gets its expiry extended.
    #[serde(default = "default_session_update_age")]
    pub session_update_age_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_auth_secret(),
            session_expires_secs: default_session_expiry(),
            session_update_age_secs: default_session_update_age(),
        }
    }
}

fn default_auth_secret() -> String {
    "dev-secret-change-in-production".to_string()
}

fn default_session_expiry() -> u64 {
    604_800 // 7 days
}

fn default_session_update_age() -> u64 {
    86_400 // 1 day
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

impl CorsConfig {
    /// Returns the configured origins, trimmed, with empty entries removed.
    #[must_use]
    pub fn origin_list(&self) -> Vec<String> {
        self.origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default level directive (`debug`, `info`, `warn`, `error`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Object bucket connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BucketSettings {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces.
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// Bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region (`auto` for R2).
        #[serde(default = "default_region")]
        region: String,
    },
    /// Azure Blob Storage.
    AzureBlob {
        /// Storage account name.
        account: String,
        /// Storage access key.
        access_key: String,
        /// Container name.
        container: String,
    },
}

fn default_region() -> String {
    "auto".to_string()
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root directory for the local filesystem backend.
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Public URL prefix for stored objects.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Object bucket; when present it replaces the local backend.
    #[serde(default)]
    pub bucket: Option<BucketSettings>,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            local_root: default_local_root(),
            public_url: None,
            bucket: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_local_root() -> String {
    "./storage".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
    /// `TIDEPOOL__SECTION__KEY` variables, then the plain deployment variables
    /// (`DATABASE_URL`, `CORS_ORIGINS`, `LOG_LEVEL`, `AUTH_SECRET`, `PORT`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let plain = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let config = config::Config::builder()
            .set_default("environment", run_mode.clone())?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TIDEPOOL").separator("__"))
            .set_override_option("database.url", plain("DATABASE_URL"))?
            .set_override_option("cors.origins", plain("CORS_ORIGINS"))?
            .set_override_option("log.level", plain("LOG_LEVEL"))?
            .set_override_option("auth.secret", plain("AUTH_SECRET"))?
            .set_override_option("server.port", plain("PORT"))?
            .build()?;

        config.try_deserialize()
    }

    /// Returns true when running in production mode.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
