//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl LoadConfig {
    /// Validate the load settings without a target section.
    pub fn validate(&self) -> Result<()> {
        validation::validate_load(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_in() {
        let config = Config::from_yaml(
            "target:\n  host: db.local\n  database: sales\n  user: etl\n",
        )
        .unwrap();
        assert_eq!(config.target.port, 3306);
        assert_eq!(config.target.ssl_mode, "prefer");
        assert_eq!(config.target.password, "");
        assert_eq!(config.load.batch_size, 1000);
        assert_eq!(config.load.max_placeholders, 65_535);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "target:\n  host: db.local\n  port: 3307\n  database: sales\n  user: etl\n  password: pw\nload:\n  batch_size: 250"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.port, 3307);
        assert_eq!(config.load.batch_size, 250);
        assert_eq!(config.target.display_target(), "etl@db.local:3307/sales");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/tabload.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("target: [unclosed"),
            Err(LoadError::Yaml(_))
        ));
    }

    #[test]
    fn test_validation_runs_on_parse() {
        let err = Config::from_yaml("target:\n  host: ''\n  database: d\n  user: u\n").unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }
}
