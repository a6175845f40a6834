use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://pneumonia-xray-classifier.onrender.com/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid base URL '{0}'")]
    BaseUrl(String),
    #[error("Invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Client settings. Timeouts are generous because the backend sleeps when idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cache_dir: PathBuf,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    /// Report predict timeouts with the cold-start hint instead of the generic network error.
    pub timeout_hint_on_predict: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 120,
            request_timeout_secs: 120,
            cache_dir: env::temp_dir().join("xray-client"),
            max_image_dimension: 2048,
            jpeg_quality: 85,
            timeout_hint_on_predict: false,
        }
    }
}

impl ClientConfig {
    /// Defaults, then the optional YAML file, then `XRAY_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("XRAY_BASE_URL") {
            self.base_url = value;
        }
        if let Some(value) = lookup("XRAY_CACHE_DIR") {
            self.cache_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("XRAY_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = parse_env("XRAY_CONNECT_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = lookup("XRAY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("XRAY_REQUEST_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = lookup("XRAY_MAX_IMAGE_DIMENSION") {
            self.max_image_dimension = parse_env("XRAY_MAX_IMAGE_DIMENSION", value)?;
        }
        if let Some(value) = lookup("XRAY_JPEG_QUALITY") {
            self.jpeg_quality = parse_env("XRAY_JPEG_QUALITY", value)?;
        }
        if let Some(value) = lookup("XRAY_TIMEOUT_HINT_ON_PREDICT") {
            self.timeout_hint_on_predict = parse_env("XRAY_TIMEOUT_HINT_ON_PREDICT", value)?;
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.base_url = normalize_base_url(&self.base_url)?.to_string();

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be between 1 and 100 (got {})",
                self.jpeg_quality
            )));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if self.max_image_dimension == 0 {
            return Err(ConfigError::Invalid(
                "max_image_dimension must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn base(&self) -> Result<Url, ConfigError> {
        normalize_base_url(&self.base_url)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}

// Endpoints are joined relative to the base, so it must end with a slash
// or the last path segment would be replaced.
fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|_| ConfigError::BaseUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::BaseUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
