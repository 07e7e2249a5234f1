use crate::error::{AppError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

const MAX_CONCURRENT_REQUESTS: usize = 64;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub contact: Option<ContactConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_predict_path")]
    pub predict_path: String,
    #[serde(default = "default_analysis_path")]
    pub analysis_path: String,
    #[serde(default = "default_stations_path")]
    pub stations_path: String,
    #[serde(default = "default_series_path")]
    pub series_path: String,
    #[serde(default = "default_alert_path")]
    pub alert_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts for transient failures. Zero means a failed call is final.
    #[serde(default)]
    pub retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            predict_path: default_predict_path(),
            analysis_path: default_analysis_path(),
            stations_path: default_stations_path(),
            series_path: default_series_path(),
            alert_path: default_alert_path(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_predict_path() -> String {
    "/predict".to_string()
}

fn default_analysis_path() -> String {
    "/stations".to_string()
}

fn default_stations_path() -> String {
    "/api/stations".to_string()
}

fn default_series_path() -> String {
    "/series".to_string()
}

fn default_alert_path() -> String {
    "/alert".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotatorConfig {
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MapConfig {
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            default_zoom: default_zoom(),
        }
    }
}

fn default_center() -> [f64; 2] {
    [19.07, 72.87]
}

fn default_zoom() -> u8 {
    7
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContactConfig {
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,
    pub access_key: String,
}

fn default_relay_endpoint() -> String {
    "https://api.web3forms.com/submit".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Load the file if it exists, otherwise run on built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        // An empty document deserializes to unit, not to an empty mapping
        let has_content = expanded.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        });
        let config: Config = if !has_content {
            Config::default()
        } else {
            serde_yaml::from_str(&expanded)
                .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Valid http(s) URLs for the API and the contact relay
    /// - Endpoint paths rooted at `/`
    /// - Positive timeout
    /// - Concurrency within 1..=64
    /// - Coordinates within range
    fn validate(&self) -> Result<()> {
        validate_http_url("api.base_url", &self.api.base_url)?;

        let paths = [
            ("predict_path", &self.api.predict_path),
            ("analysis_path", &self.api.analysis_path),
            ("stations_path", &self.api.stations_path),
            ("series_path", &self.api.series_path),
            ("alert_path", &self.api.alert_path),
        ];

        for (field_name, value) in &paths {
            if !value.starts_with('/') {
                return Err(AppError::Config(format!(
                    "api.{} must start with '/', got '{}'",
                    field_name, value
                )));
            }
        }

        if self.api.timeout_secs == 0 {
            return Err(AppError::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.api.retries > 5 {
            tracing::warn!(
                "api.retries of {} with exponential backoff can stall a cycle for minutes",
                self.api.retries
            );
        }

        let concurrency = self.annotator.max_concurrent_requests;
        if concurrency == 0 || concurrency > MAX_CONCURRENT_REQUESTS {
            return Err(AppError::Config(format!(
                "annotator.max_concurrent_requests must be between 1 and {}, got {}",
                MAX_CONCURRENT_REQUESTS, concurrency
            )));
        }

        let [lat, lng] = self.map.default_center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::Config(format!(
                "map.default_center [{}, {}] is not a valid latitude/longitude",
                lat, lng
            )));
        }

        if let Some(contact) = &self.contact {
            validate_http_url("contact.endpoint", &contact.endpoint)?;
            if contact.access_key.trim().is_empty() {
                return Err(AppError::Config(
                    "contact.access_key cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_http_url(field_name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).map_err(|e| {
        AppError::Config(format!("Invalid {} '{}': {}", field_name, value, e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::Config(format!(
            "{} must use http or https, got: {}",
            field_name, other
        ))),
    }
}

/// Replace `${VAR}` with its value. Comment lines are left untouched.
fn expand_env_vars(content: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid substitution pattern: {}", e)))?;

    let mut result = String::with_capacity(content.len());
    let mut missing_vars = Vec::new();

    for line in content.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut expanded = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    expanded = expanded.replace(&cap[0], &value);
                }
                Err(_) => {
                    missing_vars.push(var_name.to_string());
                }
            }
        }
        result.push_str(&expanded);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or set {} in your environment before running",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}
