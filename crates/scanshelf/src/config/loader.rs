use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.thumbnail.width == 0 || config.thumbnail.height == 0 {
        return Err(ConfigError::Validation {
            message: format!(
                "Thumbnail size must be non-zero, got {}x{}",
                config.thumbnail.width, config.thumbnail.height
            ),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be greater than 0".to_string(),
        });
    }

    let prefix = config.default_name_prefix.trim();
    if prefix.is_empty() {
        return Err(ConfigError::Validation {
            message: "default_name_prefix must not be empty".to_string(),
        });
    }
    if prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation {
            message: format!(
                "default_name_prefix must not contain path separators: {}",
                prefix
            ),
        });
    }

    Ok(())
}
