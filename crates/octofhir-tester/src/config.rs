use octofhir_core::is_valid_resource_type_name;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Downstream FHIR server the tester talks to
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub fhir: FhirSettings,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Client validations
        let base = url::Url::parse(&self.client.base_url)
            .map_err(|e| format!("client.base_url is not a valid URL: {e}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err("client.base_url must use http or https".into());
        }
        if self.client.timeout_ms == 0 {
            return Err("client.timeout_ms must be > 0".into());
        }
        if let Some(ClientAuth::Basic { username, .. }) = &self.client.auth
            && username.is_empty()
        {
            return Err("client.auth.username must not be empty".into());
        }
        if let Some(ClientAuth::Bearer { token }) = &self.client.auth
            && token.is_empty()
        {
            return Err("client.auth.token must not be empty".into());
        }
        // Resource type validation
        if let Some(bad) = self
            .fhir
            .extra_resource_types
            .iter()
            .find(|name| !is_valid_resource_type_name(name))
        {
            return Err(format!(
                "fhir.extra_resource_types contains invalid name '{bad}'"
            ));
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8090
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Downstream FHIR server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// FHIR base URL, e.g. `http://localhost:8080/fhir`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in milliseconds, covers connect and body
    #[serde(default = "default_client_timeout_ms")]
    pub timeout_ms: u64,
    /// Encoding requested through the Accept header
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub auth: Option<ClientAuth>,
}

fn default_base_url() -> String {
    "http://localhost:8080/fhir".into()
}
fn default_client_timeout_ms() -> u64 {
    30_000
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_client_timeout_ms(),
            encoding: Encoding::default(),
            auth: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Json,
    Xml,
}

impl Encoding {
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Json => "application/fhir+json",
            Self::Xml => "application/fhir+xml",
        }
    }
}

/// Credentials sent to the downstream server
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientAuth {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl std::fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FhirSettings {
    /// Resource types accepted in addition to the R4 set
    #[serde(default)]
    pub extra_resource_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiConfig {
    /// Drop cached page templates before every request. Development only.
    #[serde(default)]
    pub debug: bool,
    /// Read page templates from this directory instead of the embedded copies
    #[serde(default)]
    pub pages_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "octofhir-tester.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., OCTOFHIR_TESTER__CLIENT__BASE_URL=http://...
        builder = builder.add_source(
            Environment::with_prefix("OCTOFHIR_TESTER")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
