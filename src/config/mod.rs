//! Configuration for the tracer provider and the object-storage output
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Duration fields use
//! Go-style duration strings (`300ms`, `5s`, `1m30s`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
fn expand_env_vars(s: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
        .expect("static regex");
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let full_match = cap.get(0).expect("capture 0 always present");
        let var_name = cap.get(1).expect("var name group").as_str();

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }
    result.push_str(&s[last_match..]);

    result
}

/// Custom deserializer for strings with environment variable expansion.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

// ============================================================================
// Duration Strings
// ============================================================================

/// Parse a Go-style duration string such as `300ms`, `5s`, `2m` or `1m30s`.
///
/// Supported units: `ns`, `us`, `ms`, `s`, `m`, `h`. Fractions are accepted
/// (`1.5s`), as is a bare `0`. An empty string is an error; callers that
/// treat absence as "no value" should skip the parse instead. Values that do
/// not fit in a [`Duration`] are an error, never a panic.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let s = value.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    // A bare "0" is the one unitless value the grammar allows.
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| format!("missing unit in duration '{value}'"))?;
        if number_len == 0 {
            return Err(format!("invalid duration '{value}'"));
        }
        let (number, tail) = rest.split_at(number_len);
        let amount: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{number}' in duration '{value}'"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let unit_secs = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(format!("unknown unit '{unit}' in duration '{value}'")),
        };
        let part = Duration::try_from_secs_f64(amount * unit_secs)
            .map_err(|_| format!("duration '{value}' is out of range"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| format!("duration '{value}' is out of range"))?;
        rest = next;
    }
    Ok(total)
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors. All of them are fatal to startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to parse {field} '{value}': {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to install tracer: {0}")]
    TracerInstall(String),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracer provider configuration. Absent means tracing degrades to no-op
    /// spans.
    #[serde(default)]
    pub tracer: Option<JaegerConfig>,

    /// Object-storage output configuration.
    #[serde(default)]
    pub output: ObjectStorageConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref tracer) = self.tracer {
            tracer.validate()?;
        }
        self.output.validate()?;
        Ok(())
    }
}

/// Jaeger tracer provider configuration.
///
/// A static span sample can be set anywhere between 0 and 1.
///
/// # Example
///
/// ```yaml
/// tracer:
///   agent_address: "localhost:6831"
///   service_name: "spanline"
///   span_sample: 1.0
///   flush_interval: "5s"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JaegerConfig {
    /// Address of the local Jaeger agent as `host:port`.
    /// Default: "localhost:6831"
    #[serde(
        default = "default_agent_address",
        deserialize_with = "deserialize_with_env"
    )]
    pub agent_address: String,

    /// Service name reported on every span. Supports `${VAR}` and
    /// `${VAR:-default}` expansion. Default: "spanline"
    #[serde(
        default = "default_service_name",
        deserialize_with = "deserialize_with_env"
    )]
    pub service_name: String,

    /// Static sampling probability in `[0, 1]`. Default: 1.0
    #[serde(default = "default_span_sample")]
    pub span_sample: f64,

    /// Optional reporter flush interval as a duration string.
    #[serde(default)]
    pub flush_interval: Option<String>,
}

impl Default for JaegerConfig {
    fn default() -> Self {
        Self {
            agent_address: default_agent_address(),
            service_name: default_service_name(),
            span_sample: default_span_sample(),
            flush_interval: None,
        }
    }
}

impl JaegerConfig {
    /// Validate field ranges and formats without installing anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.span_sample) {
            return Err(ConfigError::Validation(format!(
                "invalid span_sample {}: must be between 0.0 and 1.0",
                self.span_sample
            )));
        }
        if !self.agent_address.is_empty() && !self.agent_address.contains(':') {
            return Err(ConfigError::Validation(format!(
                "invalid agent_address '{}': expected host:port",
                self.agent_address
            )));
        }
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service_name cannot be empty".to_string(),
            ));
        }
        if let Some(ref interval) = self.flush_interval {
            parse_duration(interval).map_err(|reason| ConfigError::InvalidDuration {
                field: "flush_interval",
                value: interval.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

fn default_agent_address() -> String {
    "localhost:6831".to_string()
}

fn default_service_name() -> String {
    "spanline".to_string()
}

fn default_span_sample() -> f64 {
    1.0
}

/// Object-storage output configuration.
///
/// The `path` field is an interpolated string resolved per part; see
/// [`crate::output::interpolation`].
///
/// # Example
///
/// ```yaml
/// output:
///   bucket: "archive"
///   region: "us-east-1"
///   path: "${!count:files}-${!timestamp_unix_nano}.txt"
///   timeout: "5s"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Target bucket name.
    #[serde(default, deserialize_with = "deserialize_with_env")]
    pub bucket: String,

    /// Interpolated destination key for each uploaded part.
    #[serde(default = "default_object_path")]
    pub path: String,

    /// Content type set on uploaded objects.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Per-upload timeout as a duration string. Default: "5s"
    #[serde(default = "default_upload_timeout")]
    pub timeout: String,

    /// Bucket region.
    #[serde(default, deserialize_with = "deserialize_with_env")]
    pub region: String,

    /// Optional custom endpoint (e.g. a MinIO deployment).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Optional static credentials; the ambient provider chain is used when
    /// absent.
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            path: default_object_path(),
            content_type: default_content_type(),
            timeout: default_upload_timeout(),
            region: String::new(),
            endpoint: None,
            access_key: None,
            secret_key: None,
        }
    }
}

impl ObjectStorageConfig {
    /// Validate field formats. Bucket presence is checked at connect time,
    /// not here, so a config with an unused output section stays loadable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timeout.is_empty() {
            parse_duration(&self.timeout).map_err(|reason| ConfigError::InvalidDuration {
                field: "timeout",
                value: self.timeout.clone(),
                reason,
            })?;
        }
        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "invalid endpoint '{endpoint}': must start with http:// or https://"
                )));
            }
        }
        Ok(())
    }
}

fn default_object_path() -> String {
    "${!count:files}-${!timestamp_unix_nano}.txt".to_string()
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

fn default_upload_timeout() -> String {
    "5s".to_string()
}
