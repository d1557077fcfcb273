use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub intake: IntakeConfig,
    pub storage: StorageConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub name: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub max_image_bytes: usize,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Archive directory for normalized images and results. Archiving is off when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel("info".to_string())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let frontend_dir = match std::env::var("CARGO_MANIFEST_DIR") {
            Ok(manifest_dir) => PathBuf::from(format!("{}/../frontend/dist", manifest_dir)),
            Err(_) => PathBuf::from("/usr/src/app/frontend/dist"),
        };
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_dir,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            name: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_tokens: 2000,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024,
            max_dimension: 1024,
            jpeg_quality: 85,
            fetch_timeout_secs: 10,
        }
    }
}

impl IntakeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `APP_CONFIG`, then environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("APP_CONFIG") {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that parse but would make every request fail or degrade.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intake = &self.intake;
        let checks: [(&'static str, u64, bool); 6] = [
            ("intake.max_image_bytes", intake.max_image_bytes as u64, intake.max_image_bytes > 0),
            ("intake.max_dimension", intake.max_dimension.into(), intake.max_dimension > 0),
            (
                "intake.jpeg_quality",
                intake.jpeg_quality.into(),
                (1..=100).contains(&intake.jpeg_quality),
            ),
            (
                "intake.fetch_timeout_secs",
                intake.fetch_timeout_secs,
                intake.fetch_timeout_secs > 0,
            ),
            ("model.timeout_secs", self.model.timeout_secs, self.model.timeout_secs > 0),
            ("model.max_tokens", self.model.max_tokens.into(), self.model.max_tokens > 0),
        ];
        match checks.into_iter().find(|(_, _, ok)| !ok) {
            Some((key, value, _)) => Err(ConfigError::InvalidValue {
                key,
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_value("PORT", v)?;
        }
        if let Some(v) = lookup("FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.model.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.model.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.model.name = v;
        }
        if let Some(v) = lookup("MODEL_TIMEOUT_SECS") {
            self.model.timeout_secs = parse_value("MODEL_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("MODEL_MAX_TOKENS") {
            self.model.max_tokens = parse_value("MODEL_MAX_TOKENS", v)?;
        }
        if let Some(v) = lookup("MAX_IMAGE_BYTES") {
            self.intake.max_image_bytes = parse_value("MAX_IMAGE_BYTES", v)?;
        }
        if let Some(v) = lookup("MAX_IMAGE_DIMENSION") {
            self.intake.max_dimension = parse_value("MAX_IMAGE_DIMENSION", v)?;
        }
        if let Some(v) = lookup("JPEG_QUALITY") {
            self.intake.jpeg_quality = parse_value("JPEG_QUALITY", v)?;
        }
        if let Some(v) = lookup("FETCH_TIMEOUT_SECS") {
            self.intake.fetch_timeout_secs = parse_value("FETCH_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("DATA_DIR") {
            self.storage.data_dir = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = LogLevel(v.to_lowercase());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
