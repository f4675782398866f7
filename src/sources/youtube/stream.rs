use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::metadata::parse_query;

static OBFUSCATED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|[&,])s=").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
  Plain(String),
  Obfuscated(String),
  None,
}

/// One comma-separated entry of a stream map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
  pub itag: String,
  pub mime_type: Option<String>,
  pub quality: Option<String>,
  pub url: String,
  pub signature: Signature,
}

impl StreamDescriptor {
  /// `None` when the fragment lacks `itag` or `url`.
  pub fn parse(fragment: &str) -> Option<Self> {
    let mut itag = None;
    let mut mime_type = None;
    let mut quality = None;
    let mut quality_label = None;
    let mut url = None;
    let mut sig = None;
    let mut s = None;

    for (key, value) in parse_query(fragment) {
      match key.as_str() {
        "itag" => itag = Some(value),
        "type" => mime_type = Some(value),
        "quality" => quality = Some(value),
        "quality_label" => quality_label = Some(value),
        "url" => url = Some(value),
        "sig" => sig = Some(value),
        "s" => s = Some(value),
        _ => {}
      }
    }

    let signature = match (sig, s) {
      (Some(sig), _) => Signature::Plain(sig),
      (None, Some(s)) => Signature::Obfuscated(s),
      (None, None) => Signature::None,
    };

    Some(Self {
      itag: itag.filter(|i| !i.is_empty())?,
      mime_type: mime_type.filter(|m| !m.is_empty()),
      quality: quality.or(quality_label).filter(|q| !q.is_empty()),
      url: url.filter(|u| !u.is_empty())?,
      signature,
    })
  }

  /// MIME subtype without parameters: `video/mp4; codecs=".."` is `mp4`.
  pub fn extension(&self) -> String {
    self
      .mime_type
      .as_deref()
      .and_then(|m| m.split(';').next())
      .and_then(|m| m.split_once('/'))
      .map(|(_, sub)| sub.trim().to_string())
      .filter(|sub| !sub.is_empty())
      .unwrap_or_else(|| "unknown".to_string())
  }
}

/// A playable stream, ready for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
  pub itag: String,
  pub title: String,
  pub url: String,
  pub extension: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quality: Option<String>,
  pub label: String,
}

impl ResolvedStream {
  pub fn new(descriptor: &StreamDescriptor, title: &str, url: String) -> Self {
    let extension = descriptor.extension();
    let label = label(&descriptor.itag, &extension, descriptor.quality.as_deref());
    Self {
      itag: descriptor.itag.clone(),
      title: title.to_string(),
      url,
      extension,
      quality: descriptor.quality.clone(),
      label,
    }
  }
}

pub fn label(itag: &str, extension: &str, quality: Option<&str>) -> String {
  match quality {
    Some(quality) => format!("{} - {} - {}", itag, extension, quality),
    None => format!("{} - {}", itag, extension),
  }
}

pub fn append_signature(url: &str, signature: &str) -> String {
  let separator = if url.contains('?') { '&' } else { '?' };
  format!("{}{}signature={}", url, separator, signature)
}

/// True when any entry carries an `s=` (scrambled) signature.
pub fn is_obfuscated(stream_map: &str) -> bool {
  OBFUSCATED_RE.is_match(stream_map)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_plain_fragment() {
    let d = StreamDescriptor::parse(
      "itag=22&type=video%2Fmp4%3B+codecs%3D%22avc1%22&quality=hd720&url=https%3A%2F%2Fr.example%2Fv%3Fid%3D1&sig=ABC",
    )
    .unwrap();
    assert_eq!(d.itag, "22");
    assert_eq!(d.mime_type.as_deref(), Some("video/mp4; codecs=\"avc1\""));
    assert_eq!(d.url, "https://r.example/v?id=1");
    assert_eq!(d.signature, Signature::Plain("ABC".into()));
    assert_eq!(d.extension(), "mp4");
  }

  #[test]
  fn recognizes_obfuscated_and_unsigned() {
    let d = StreamDescriptor::parse("itag=18&url=http%3A%2F%2Fa&s=XYZ").unwrap();
    assert_eq!(d.signature, Signature::Obfuscated("XYZ".into()));
    assert_eq!(d.extension(), "unknown");

    let d = StreamDescriptor::parse("itag=18&url=http%3A%2F%2Fa").unwrap();
    assert_eq!(d.signature, Signature::None);
  }

  #[test]
  fn skips_fragments_without_itag_or_url() {
    assert!(StreamDescriptor::parse("url=http%3A%2F%2Fa&sig=1").is_none());
    assert!(StreamDescriptor::parse("itag=18&sig=1").is_none());
    assert!(StreamDescriptor::parse("itag=&url=http%3A%2F%2Fa").is_none());
  }

  #[test]
  fn quality_prefers_plain_field() {
    let d = StreamDescriptor::parse("itag=137&url=u&quality_label=1080p").unwrap();
    assert_eq!(d.quality.as_deref(), Some("1080p"));
    let d = StreamDescriptor::parse("itag=137&url=u&quality=hd1080&quality_label=1080p").unwrap();
    assert_eq!(d.quality.as_deref(), Some("hd1080"));
  }

  #[test]
  fn labels_and_signature_suffix() {
    assert_eq!(label("22", "mp4", Some("hd720")), "22 - mp4 - hd720");
    assert_eq!(label("140", "mp4", None), "140 - mp4");
    assert_eq!(append_signature("https://a/v?x=1", "S"), "https://a/v?x=1&signature=S");
    assert_eq!(append_signature("https://a/v", "S"), "https://a/v?signature=S");
  }

  #[test]
  fn detects_obfuscation_marker() {
    assert!(is_obfuscated("s=ABC&itag=18"));
    assert!(is_obfuscated("itag=18&s=ABC"));
    assert!(is_obfuscated("itag=22&sig=A,s=B&itag=18"));
    assert!(!is_obfuscated("itag=18&sig=ABC&url=x%26s%3D1"));
    assert!(!is_obfuscated("itag=18&as=1"));
  }
}
