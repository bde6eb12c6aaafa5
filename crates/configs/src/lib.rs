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
    pub auth: AuthConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
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
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_token_ttl() }
    }
}

fn default_token_ttl() -> i64 { 12 }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub geocoding_api_key: Option<String>,
    #[serde(default)]
    pub geocoding_base_url: Option<String>,
    #[serde(default)]
    pub cloudinary: Option<CloudinaryConfig>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_sms_sender")]
    pub sender: String,
}

fn default_sms_sender() -> String { "CLINIC".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self { dir: default_upload_dir(), max_bytes: default_upload_max_bytes() }
    }
}

fn default_upload_dir() -> String { "data/uploads".into() }
fn default_upload_max_bytes() -> usize { 10 * 1024 * 1024 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Config file if present, otherwise everything from the environment.
    pub fn load_or_env() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.integrations.normalize_from_env();
        self.uploads.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() { self.host = host; }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
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

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if self.jwt_secret.trim().is_empty() {
            self.jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
        }
        if self.token_ttl_hours <= 0 {
            self.token_ttl_hours = default_token_ttl();
        }
    }
}

impl IntegrationsConfig {
    pub fn normalize_from_env(&mut self) {
        if self.geocoding_api_key.is_none() {
            self.geocoding_api_key = std::env::var("GOOGLE_MAPS_API_KEY").ok().filter(|k| !k.trim().is_empty());
        }
        if self.cloudinary.is_none() {
            if let (Ok(cloud_name), Ok(api_key), Ok(api_secret)) = (
                std::env::var("CLOUDINARY_CLOUD_NAME"),
                std::env::var("CLOUDINARY_API_KEY"),
                std::env::var("CLOUDINARY_API_SECRET"),
            ) {
                self.cloudinary = Some(CloudinaryConfig { cloud_name, api_key, api_secret, folder: None });
            }
        }
        if self.sms.is_none() {
            if let (Ok(endpoint), Ok(api_key)) = (std::env::var("SMS_ENDPOINT"), std::env::var("SMS_API_KEY")) {
                let sender = std::env::var("SMS_SENDER").unwrap_or_else(|_| default_sms_sender());
                self.sms = Some(SmsConfig { endpoint, api_key, sender });
            }
        }
    }
}

impl UploadsConfig {
    fn validate(&self) -> Result<()> {
        if self.dir.trim().is_empty() {
            return Err(anyhow!("uploads.dir must not be empty"));
        }
        if self.max_bytes == 0 {
            return Err(anyhow!("uploads.max_bytes must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fills_defaults_for_missing_sections() {
        let cfg = parse("[database]\nurl = \"postgres://u:p@localhost/db\"\n").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.auth.token_ttl_hours, 12);
        assert_eq!(cfg.uploads.dir, "data/uploads");
        assert!(cfg.integrations.cloudinary.is_none());
    }

    #[test]
    fn parse_reads_integrations() {
        let raw = r#"
            [integrations]
            geocoding_api_key = "k"
            [integrations.cloudinary]
            cloud_name = "demo"
            api_key = "123"
            api_secret = "s"
            [integrations.sms]
            endpoint = "https://sms.example.com/send"
            api_key = "x"
        "#;
        let cfg = parse(raw).unwrap();
        assert_eq!(cfg.integrations.geocoding_api_key.as_deref(), Some("k"));
        assert_eq!(cfg.integrations.cloudinary.unwrap().cloud_name, "demo");
        assert_eq!(cfg.integrations.sms.unwrap().sender, "CLINIC");
    }

    #[test]
    fn database_validation_rejects_non_postgres_urls() {
        let db = DatabaseConfig { url: "mysql://localhost/db".into(), ..Default::default() };
        assert!(db.validate().is_err());
        let db = DatabaseConfig { url: "postgres://localhost/db".into(), ..Default::default() };
        assert!(db.validate().is_ok());
    }

    #[test]
    fn database_validation_checks_pool_bounds() {
        let db = DatabaseConfig {
            url: "postgres://localhost/db".into(),
            min_connections: 5,
            max_connections: 2,
            ..Default::default()
        };
        assert!(db.validate().is_err());
    }
}
