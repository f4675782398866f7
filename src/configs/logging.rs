use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
  pub level: Option<String>,
  pub filters: Option<String>,
  #[serde(default = "default_ansi")]
  pub ansi: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: None,
      filters: None,
      ansi: default_ansi(),
    }
  }
}

fn default_ansi() -> bool {
  true
}
