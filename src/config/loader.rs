//! Configuration loader with environment variable expansion

use std::path::Path;

use super::{expand_env_vars, Config, ConfigError};

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file, expanding `${VAR}` and
    /// `${VAR:-default}` placeholders before parsing, then validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("SPANLINE_LOADER_SVC", "loaded-service");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "tracer:\n  service_name: \"${{SPANLINE_LOADER_SVC}}\"\n  span_sample: 0.5\n"
        )
        .expect("write config");

        let config = ConfigLoader::load(file.path()).expect("load config");
        let tracer = config.tracer.expect("tracer section");
        assert_eq!(tracer.service_name, "loaded-service");
        assert_eq!(tracer.span_sample, 0.5);
        assert_eq!(tracer.agent_address, "localhost:6831");

        std::env::remove_var("SPANLINE_LOADER_SVC");
    }

    #[test]
    fn test_load_rejects_invalid_tracer_section() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "tracer:\n  flush_interval: \"not-a-duration\"\n").expect("write config");

        let err = ConfigLoader::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("flush_interval"));
    }
}
