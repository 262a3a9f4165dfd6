use std::fs::File;

use crate::config::{data::SubmitConfig, errors::ConfigError};

/// Load and validate a [`SubmitConfig`] from a JSON file.
pub fn get_submit_config(config_path: &str) -> Result<SubmitConfig, ConfigError> {
    let f = match File::open(config_path) {
        Ok(f) => f,
        Err(_) => return Err(ConfigError::FileOpenError(config_path.to_string())),
    };

    let config: SubmitConfig = match serde_json::from_reader(f) {
        Ok(config) => config,
        Err(err) => {
            return Err(ConfigError::ParseError(err.to_string()));
        }
    };
    config.validate()?;

    Ok(config)
}
