use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;
use crate::configs::*;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
  #[serde(default)]
  pub logging: LoggingConfig,
  #[serde(default)]
  pub youtube: YouTubeConfig,
}

impl Config {
  /// Loads `path` when given, else `config.toml`, else `config.default.toml`,
  /// else the built-in defaults.
  pub fn load(path: Option<&Path>) -> AnyResult<Self> {
    let config_path = match path {
      Some(path) => path,
      None if Path::new("config.toml").exists() => Path::new("config.toml"),
      None if Path::new("config.default.toml").exists() => Path::new("config.default.toml"),
      None => return Ok(Self::default()),
    };

    let config_str = std::fs::read_to_string(config_path)
      .map_err(|e| format!("failed to read {}: {}", config_path.display(), e))?;

    Self::parse(&config_str).map_err(|e| format!("{}: {}", config_path.display(), e).into())
  }

  pub fn parse(config_str: &str) -> AnyResult<Self> {
    let config: Config = toml::from_str(config_str)?;
    Ok(config)
  }
}
