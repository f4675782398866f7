pub mod cipher;
pub mod error;
pub mod metadata;
pub mod resolver;
pub mod scraper;
pub mod stream;

pub use error::ResolveError;
pub use resolver::StreamResolver;
pub use stream::ResolvedStream;

use crate::common::types::VideoId;

/// Turns a watch URL or a bare id into a [`VideoId`].
///
/// Input that parses as an absolute URL with a host must carry a non-empty
/// `v` query value; anything else is taken verbatim.
pub fn normalize_identifier(input: &str) -> Result<VideoId, ResolveError> {
  let input = input.trim();
  let invalid = || ResolveError::InvalidIdentifier(input.to_string());

  match reqwest::Url::parse(input) {
    Ok(url) if url.has_host() => url
      .query_pairs()
      .find(|(key, _)| key == "v")
      .and_then(|(_, value)| VideoId::new(value.into_owned()))
      .ok_or_else(invalid),
    _ => VideoId::new(input).ok_or_else(invalid),
  }
}
