use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;

use super::error::ResolveError;
use crate::{
  common::{http::Transport, types::VideoId},
  configs::YouTubeConfig,
};

static PLAYER_JS_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?s)"assets"\s*:.+?"js"\s*:\s*("(?:[^"\\]|\\.)+")"#).unwrap());

static PLAYER_CONFIG_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"ytplayer\.config\s*=\s*\{").unwrap());

static SIGNATURE_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?:\bsignature\s*=\s*|"signature"\s*,\s*)([A-Za-z_$][\w$]*)\s*\("#).unwrap()
});

/// Watch-page and player-script lookups. Nothing is cached between calls.
pub struct PageScraper {
  transport: Arc<dyn Transport>,
  config: Arc<YouTubeConfig>,
  headers: HeaderMap,
}

impl PageScraper {
  pub fn new(transport: Arc<dyn Transport>, config: Arc<YouTubeConfig>, headers: HeaderMap) -> Self {
    Self {
      transport,
      config,
      headers,
    }
  }

  async fn fetch_text(&self, url: &str) -> Result<String, ResolveError> {
    let res = self
      .transport
      .get(url, &self.headers)
      .await?
      .error_for_status(url)?;
    Ok(res.text())
  }

  async fn watch_page(&self, video_id: &VideoId) -> Result<String, ResolveError> {
    let url = self.config.watch_url_for(video_id);
    debug!("Fetching watch page for {}", video_id);
    self.fetch_text(&url).await
  }

  pub async fn locate_player_script(&self, video_id: &VideoId) -> Result<String, ResolveError> {
    let page = self.watch_page(video_id).await?;
    let url = player_script_url(&page, &self.config.origin)?;
    debug!("Player script for {}: {}", video_id, url);
    Ok(url)
  }

  pub async fn fetch_player_script(&self, url: &str) -> Result<String, ResolveError> {
    let script = self.fetch_text(url).await?;
    debug!("Fetched player script ({} bytes)", script.len());
    Ok(script)
  }

  pub async fn extract_stream_map(&self, video_id: &VideoId) -> Result<String, ResolveError> {
    let page = self.watch_page(video_id).await?;
    stream_map_from_page(&page, self.config.include_adaptive)
  }

  pub fn locate_cipher_function_name(&self, script: &str) -> Result<String, ResolveError> {
    cipher_function_name(script)
  }
}

/// Absolute player-script URL from the watch page's `assets.js` entry.
pub fn player_script_url(page: &str, origin: &str) -> Result<String, ResolveError> {
  let literal = PLAYER_JS_RE
    .captures(page)
    .and_then(|caps| caps.get(1))
    .ok_or(ResolveError::PlayerScriptNotFound)?;

  let url: String =
    serde_json::from_str(literal.as_str()).map_err(|_| ResolveError::PlayerScriptNotFound)?;

  if url.starts_with("//") {
    Ok(format!("https:{}", url))
  } else if url.starts_with('/') {
    Ok(format!("{}{}", origin.trim_end_matches('/'), url))
  } else {
    Ok(url)
  }
}

/// `args.url_encoded_fmt_stream_map` of the `ytplayer.config` object, with
/// `args.adaptive_fmts` appended when requested.
pub fn stream_map_from_page(page: &str, include_adaptive: bool) -> Result<String, ResolveError> {
  let start = PLAYER_CONFIG_RE
    .find(page)
    .map(|m| m.end() - 1)
    .ok_or(ResolveError::PlayerConfigNotFound)?;
  let object = find_matching_brace(&page[start..]).ok_or(ResolveError::PlayerConfigNotFound)?;
  let config: Value = serde_json::from_str(object).map_err(|_| ResolveError::PlayerConfigNotFound)?;

  let args = config.get("args").ok_or(ResolveError::PlayerConfigNotFound)?;
  let mut stream_map = args
    .get("url_encoded_fmt_stream_map")
    .and_then(|v| v.as_str())
    .ok_or(ResolveError::PlayerConfigNotFound)?
    .to_string();

  if include_adaptive {
    if let Some(adaptive) = args
      .get("adaptive_fmts")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
    {
      if !stream_map.is_empty() {
        stream_map.push(',');
      }
      stream_map.push_str(adaptive);
    }
  }

  Ok(stream_map)
}

pub fn cipher_function_name(script: &str) -> Result<String, ResolveError> {
  SIGNATURE_CALL_RE
    .captures(script)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().to_string())
    .ok_or(ResolveError::SignatureFunctionNotFound)
}

/// Slice of `s` up to the brace closing its leading `{`, skipping braces
/// inside string literals.
pub fn find_matching_brace(s: &str) -> Option<&str> {
  if !s.starts_with('{') {
    return None;
  }
  let mut depth = 0i32;
  let mut in_string = false;
  let mut escape = false;
  for (i, ch) in s.char_indices() {
    if escape {
      escape = false;
      continue;
    }
    match ch {
      '\\' if in_string => escape = true,
      '"' => in_string = !in_string,
      '{' if !in_string => depth += 1,
      '}' if !in_string => {
        depth -= 1;
        if depth == 0 {
          return Some(&s[..=i]);
        }
      }
      _ => {}
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::common::http::testing::StubTransport;

  const WATCH_PAGE: &str = r#"<script>var ytplayer = ytplayer || {};ytplayer.config = {"assets":{"css":"/s/player.css","js":"\/s\/player\/abc\/base.js"},"args":{"title":"T {x}","url_encoded_fmt_stream_map":"itag=18&s=ABC","adaptive_fmts":"itag=137&sig=X"}};ytplayer.load = function(){};</script>"#;

  #[test]
  fn resolves_player_script_urls() {
    assert_eq!(
      player_script_url(WATCH_PAGE, "https://www.youtube.com").unwrap(),
      "https://www.youtube.com/s/player/abc/base.js"
    );
    assert_eq!(
      player_script_url(r#""assets": {"js": "//cdn.example/p.js"}"#, "https://o").unwrap(),
      "https://cdn.example/p.js"
    );
    assert_eq!(
      player_script_url(r#""assets":{"js":"https://x/p.js"}"#, "https://o").unwrap(),
      "https://x/p.js"
    );
    assert!(matches!(
      player_script_url("<html></html>", "https://o"),
      Err(ResolveError::PlayerScriptNotFound)
    ));
  }

  #[test]
  fn extracts_stream_map_from_config() {
    assert_eq!(stream_map_from_page(WATCH_PAGE, false).unwrap(), "itag=18&s=ABC");
    assert_eq!(
      stream_map_from_page(WATCH_PAGE, true).unwrap(),
      "itag=18&s=ABC,itag=137&sig=X"
    );
  }

  #[test]
  fn missing_or_broken_config_is_reported() {
    for page in [
      "<html></html>",
      "ytplayer.config = {\"args\":{",
      "ytplayer.config = {\"args\":{}}",
    ] {
      assert!(
        matches!(stream_map_from_page(page, false), Err(ResolveError::PlayerConfigNotFound)),
        "{}",
        page
      );
    }
  }

  #[test]
  fn finds_signature_function_name() {
    assert_eq!(
      cipher_function_name(r#"c&&(b=a.s,b=Xq(decodeURIComponent(b)),a.set("signature",Qo(b)))"#)
        .unwrap(),
      "Qo"
    );
    assert_eq!(
      cipher_function_name("e.url+=\"&\";e.signature=ab$(e.s);").unwrap(),
      "ab$"
    );
    assert!(matches!(
      cipher_function_name("var signatures=1;"),
      Err(ResolveError::SignatureFunctionNotFound)
    ));
  }

  #[test]
  fn brace_matching_skips_strings() {
    assert_eq!(
      find_matching_brace(r#"{"a":"}{","b":{"c":1}} tail"#),
      Some(r#"{"a":"}{","b":{"c":1}}"#)
    );
    assert_eq!(find_matching_brace(r#"{"a":"\"}"}x"#), Some(r#"{"a":"\"}"}"#));
    assert_eq!(find_matching_brace("{{}"), None);
    assert_eq!(find_matching_brace("x{}"), None);
  }

  #[tokio::test]
  async fn scraper_fetches_fresh_pages() {
    let config = YouTubeConfig::default();
    let watch = config.watch_url_for("vid");
    let stub = Arc::new(
      StubTransport::new()
        .with_page(watch.clone(), WATCH_PAGE)
        .with_page("https://www.youtube.com/s/player/abc/base.js", "var a=1;"),
    );
    let scraper = PageScraper::new(stub.clone(), Arc::new(config), HeaderMap::new());
    let id = VideoId::new("vid").unwrap();

    let url = scraper.locate_player_script(&id).await.unwrap();
    assert_eq!(scraper.fetch_player_script(&url).await.unwrap(), "var a=1;");
    assert_eq!(scraper.extract_stream_map(&id).await.unwrap(), "itag=18&s=ABC");
    assert_eq!(stub.requests(), vec![watch.clone(), url, watch]);
  }
}
