//! Configuration validation.

use super::{Config, LoadConfig};
use crate::error::{LoadError, Result};
use crate::loader::MYSQL_MAX_PLACEHOLDERS;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.target.host.is_empty() {
        return Err(LoadError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(LoadError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(LoadError::Config("target.user is required".into()));
    }
    if !config.target.r#type.eq_ignore_ascii_case("mysql") {
        return Err(LoadError::Config(format!(
            "target.type must be 'mysql', got '{}'",
            config.target.r#type
        )));
    }

    validate_load(&config.load)
}

/// Validate the load settings on their own. Dry runs have no target section.
pub fn validate_load(load: &LoadConfig) -> Result<()> {
    if load.batch_size == 0 {
        return Err(LoadError::Config("load.batch_size must be at least 1".into()));
    }
    if load.max_placeholders == 0 || load.max_placeholders > MYSQL_MAX_PLACEHOLDERS {
        return Err(LoadError::Config(format!(
            "load.max_placeholders must be between 1 and {}",
            MYSQL_MAX_PLACEHOLDERS
        )));
    }

    Ok(())
}
