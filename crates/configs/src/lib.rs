use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub asset_store: AssetStoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_acquire_timeout() -> u64 { 30 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

/// Object storage holding uploaded listing images.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetStoreConfig {
    #[serde(default = "default_asset_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_asset_folder")]
    pub folder: String,
    #[serde(default = "default_asset_timeout")]
    pub timeout_secs: u64,
    /// Largest request body accepted on listing forms, image included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_asset_base_url() -> String { "https://api.cloudinary.com".into() }
fn default_asset_folder() -> String { "wanderlust_DEV".into() }
fn default_asset_timeout() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

impl Default for AssetStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_asset_base_url(),
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: default_asset_folder(),
            timeout_secs: default_asset_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Config file location: `CONFIG_PATH` or `config.toml` in the working directory.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Build a config purely from environment variables, used when no file is present.
    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") { cfg.server.host = host; }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.asset_store.normalize_from_env();
        self.asset_store.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AssetStoreConfig {
    /// Credentials in the environment win over the file.
    pub fn normalize_from_env(&mut self) {
        if let Ok(v) = std::env::var("CLOUD_NAME") { self.cloud_name = v; }
        if let Ok(v) = std::env::var("CLOUD_API_KEY") { self.api_key = v; }
        if let Ok(v) = std::env::var("CLOUD_API_SECRET") { self.api_secret = v; }
        if self.folder.trim().is_empty() { self.folder = default_asset_folder(); }
        if self.timeout_secs == 0 { self.timeout_secs = default_asset_timeout(); }
        if self.max_upload_bytes == 0 { self.max_upload_bytes = default_max_upload_bytes(); }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cloud_name.trim().is_empty() {
            return Err(anyhow!("asset_store.cloud_name is empty; set it in config.toml or CLOUD_NAME"));
        }
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(anyhow!("asset_store credentials missing; set CLOUD_API_KEY and CLOUD_API_SECRET"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow!("asset_store.base_url must start with http(s)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 3000

            [database]
            url = "postgres://localhost/wanderlust"

            [asset_store]
            cloud_name = "demo"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.asset_store.folder, "wanderlust_DEV");
        assert_eq!(cfg.asset_store.base_url, "https://api.cloudinary.com");
        assert_eq!(cfg.asset_store.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn file_without_database_section_keeps_pool_defaults() {
        let mut cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 3000
            worker_threads = 8

            [asset_store]
            cloud_name = "demo"
            max_upload_bytes = 5242880
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database.min_connections, 2);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.database.acquire_timeout_secs, 30);

        // only the url is left for DATABASE_URL to fill in
        cfg.database.url = "postgres://localhost/wanderlust".into();
        assert!(cfg.database.validate().is_ok());
        assert_eq!(cfg.server.worker_threads, Some(8));
        assert_eq!(cfg.asset_store.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn database_validation_rejects_bad_scheme() {
        let db = DatabaseConfig {
            url: "mysql://localhost/x".into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 5,
            acquire_timeout_secs: 5,
            sqlx_logging: false,
        };
        assert!(db.validate().is_err());
    }

    #[test]
    fn asset_store_requires_credentials() {
        let mut asset = AssetStoreConfig { cloud_name: "demo".into(), ..Default::default() };
        assert!(asset.validate().is_err());
        asset.api_key = "key".into();
        asset.api_secret = "secret".into();
        assert!(asset.validate().is_ok());
    }
}
