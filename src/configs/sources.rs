use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Endpoint templates, request headers and resolver switches for the video
/// platform. `{video_id}` and `{variant}` are substituted at request time.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YouTubeConfig {
  #[serde(default = "default_info_url")]
  pub info_url: String,
  #[serde(default = "default_watch_url")]
  pub watch_url: String,
  #[serde(default = "default_origin")]
  pub origin: String,
  #[serde(default = "default_info_variants")]
  pub info_variants: Vec<String>,
  #[serde(default = "default_user_agent")]
  pub user_agent: String,
  #[serde(default = "default_headers")]
  pub headers: BTreeMap<String, String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default)]
  pub cookie_file: Option<PathBuf>,
  #[serde(default = "default_probe_streams")]
  pub probe_streams: bool,
  #[serde(default)]
  pub include_adaptive: bool,
  #[serde(default = "default_max_call_depth")]
  pub max_call_depth: usize,
}

impl Default for YouTubeConfig {
  fn default() -> Self {
    Self {
      info_url: default_info_url(),
      watch_url: default_watch_url(),
      origin: default_origin(),
      info_variants: default_info_variants(),
      user_agent: default_user_agent(),
      headers: default_headers(),
      timeout_secs: default_timeout_secs(),
      cookie_file: None,
      probe_streams: default_probe_streams(),
      include_adaptive: false,
      max_call_depth: default_max_call_depth(),
    }
  }
}

impl YouTubeConfig {
  pub fn info_url_for(&self, video_id: &str, variant: &str) -> String {
    self
      .info_url
      .replace("{video_id}", video_id)
      .replace("{variant}", variant)
  }

  pub fn watch_url_for(&self, video_id: &str) -> String {
    self.watch_url.replace("{video_id}", video_id)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }

  /// Static request headers. The user agent is set on the client itself.
  pub fn header_map(&self) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(self.headers.len());
    for (name, value) in &self.headers {
      let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| format!("invalid header name {}: {}", name, e))?;
      let value =
        HeaderValue::from_str(value).map_err(|e| format!("invalid value for {}: {}", name, e))?;
      map.insert(name, value);
    }
    Ok(map)
  }
}

fn default_info_url() -> String {
  "https://www.youtube.com/get_video_info?&video_id={video_id}{variant}&ps=default&eurl=&gl=US&hl=en"
    .to_string()
}

fn default_watch_url() -> String {
  "https://www.youtube.com/watch?v={video_id}&gl=US&hl=en&has_verified=1".to_string()
}

fn default_origin() -> String {
  "https://www.youtube.com".to_string()
}

fn default_info_variants() -> Vec<String> {
  ["&el=embedded", "&el=detailpage", "&el=vevo", ""]
    .iter()
    .map(|v| v.to_string())
    .collect()
}

fn default_user_agent() -> String {
  crate::common::http::HttpClient::default_user_agent()
}

// No Accept-Encoding here: reqwest only decompresses when it negotiates the
// encoding itself.
fn default_headers() -> BTreeMap<String, String> {
  [
    ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
    ("Accept-Language", "en-us,en;q=0.5"),
    (
      "Accept",
      "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
  ]
  .iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_probe_streams() -> bool {
  true
}

fn default_max_call_depth() -> usize {
  50
}
