use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use super::error::ResolveError;
use crate::{
  common::{http::Transport, types::VideoId},
  configs::YouTubeConfig,
};

/// Decoded video-info payload. Only records with a non-empty `token` are
/// usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
  pub token: Option<String>,
  pub title: Option<String>,
  pub reason: Option<String>,
  pub status: Option<String>,
  /// `url_encoded_fmt_stream_map`
  pub stream_map: Option<String>,
  pub adaptive_fmts: Option<String>,
}

impl MetadataRecord {
  pub fn from_query(body: &str) -> Self {
    let mut record = Self::default();
    for (key, value) in parse_query(body) {
      let slot = match key.as_str() {
        "token" => &mut record.token,
        "title" => &mut record.title,
        "reason" => &mut record.reason,
        "status" => &mut record.status,
        "url_encoded_fmt_stream_map" => &mut record.stream_map,
        "adaptive_fmts" => &mut record.adaptive_fmts,
        _ => continue,
      };
      *slot = Some(value);
    }
    record
  }

  pub fn is_valid(&self) -> bool {
    self.token.as_deref().is_some_and(|t| !t.is_empty())
  }
}

/// Form-decodes `a=1&b=x+y`. Pairs that fail to decode are dropped; a
/// repeated key keeps its last value.
pub fn parse_query(input: &str) -> Vec<(String, String)> {
  let mut pairs: Vec<(String, String)> = Vec::new();

  for pair in input.split('&').filter(|p| !p.is_empty()) {
    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
    let (Some(key), Some(value)) = (form_decode(key), form_decode(value)) else {
      continue;
    };

    match pairs.iter_mut().find(|(k, _)| *k == key) {
      Some(existing) => existing.1 = value,
      None => pairs.push((key, value)),
    }
  }

  pairs
}

fn form_decode(raw: &str) -> Option<String> {
  let spaced = raw.replace('+', " ");
  urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

pub struct MetadataFetcher {
  transport: Arc<dyn Transport>,
  config: Arc<YouTubeConfig>,
  headers: HeaderMap,
}

impl MetadataFetcher {
  pub fn new(transport: Arc<dyn Transport>, config: Arc<YouTubeConfig>, headers: HeaderMap) -> Self {
    Self {
      transport,
      config,
      headers,
    }
  }

  /// Walks the configured variants in order and returns the first record
  /// carrying a token.
  pub async fn fetch(&self, video_id: &VideoId) -> Result<MetadataRecord, ResolveError> {
    let mut last_record: Option<MetadataRecord> = None;

    for variant in &self.config.info_variants {
      let url = self.config.info_url_for(video_id, variant);
      debug!("Fetching video info for {} (variant {:?})", video_id, variant);

      let res = match self.transport.get(&url, &self.headers).await {
        Ok(res) => res,
        Err(e) => {
          warn!("Video info variant {:?} failed for {}: {}", variant, video_id, e);
          continue;
        }
      };

      // error answers still carry `status=fail&reason=..`
      let record = MetadataRecord::from_query(&res.text());
      if record.is_valid() {
        debug!("Video info for {} resolved with variant {:?}", video_id, variant);
        return Ok(record);
      }

      if res.is_success() {
        debug!(
          "Video info variant {:?} for {} has no token (status {:?})",
          variant, video_id, record.status
        );
      } else {
        warn!(
          "Video info variant {:?} failed for {}: HTTP {} (reason {:?})",
          variant, video_id, res.status, record.reason
        );
      }
      last_record = Some(record);
    }

    match last_record.and_then(|r| r.reason) {
      Some(reason) => Err(ResolveError::UpstreamRejected(reason)),
      None => Err(ResolveError::UpstreamUnavailable),
    }
  }
}
