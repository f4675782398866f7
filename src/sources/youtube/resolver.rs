use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::{debug, info, warn};

use super::{
  cipher::CipherInterpreter,
  error::ResolveError,
  metadata::MetadataFetcher,
  scraper::PageScraper,
  stream::{ResolvedStream, Signature, StreamDescriptor, append_signature, is_obfuscated},
};
use crate::{
  common::{
    cookies::load_cookie_jar,
    http::{ReqwestTransport, Transport},
    types::{AnyResult, VideoId},
  },
  configs::YouTubeConfig,
};

/// Player script plus the name of its signature function, loaded once per
/// resolution.
struct CipherContext {
  interpreter: CipherInterpreter,
  function: String,
}

pub struct StreamResolver {
  transport: Arc<dyn Transport>,
  config: Arc<YouTubeConfig>,
  headers: HeaderMap,
  metadata: MetadataFetcher,
  scraper: PageScraper,
}

impl StreamResolver {
  pub fn new(transport: Arc<dyn Transport>, config: YouTubeConfig) -> Result<Self, ResolveError> {
    let headers = config.header_map().map_err(ResolveError::InvalidHeader)?;
    let config = Arc::new(config);

    Ok(Self {
      metadata: MetadataFetcher::new(transport.clone(), config.clone(), headers.clone()),
      scraper: PageScraper::new(transport.clone(), config.clone(), headers.clone()),
      transport,
      config,
      headers,
    })
  }

  /// Builds the reqwest transport (with the cookie file, when configured)
  /// and the resolver on top of it.
  pub fn from_config(config: YouTubeConfig) -> AnyResult<Self> {
    let cookies = match &config.cookie_file {
      Some(path) => {
        let jar = load_cookie_jar(path)
          .map_err(|e| format!("failed to load cookie file {}: {}", path.display(), e))?;
        Some(jar)
      }
      None => None,
    };

    let transport = ReqwestTransport::build(&config.user_agent, config.timeout(), cookies)?;
    Ok(Self::new(Arc::new(transport), config)?)
  }

  pub async fn resolve(&self, video_id: &VideoId) -> Result<Vec<ResolvedStream>, ResolveError> {
    let record = self.metadata.fetch(video_id).await?;
    let title = record.title.clone().unwrap_or_default();

    let mut stream_map = record.stream_map.clone().unwrap_or_default();
    if self.config.include_adaptive {
      if let Some(adaptive) = record.adaptive_fmts.as_deref().filter(|a| !a.is_empty()) {
        if !stream_map.is_empty() {
          stream_map.push(',');
        }
        stream_map.push_str(adaptive);
      }
    }

    if is_obfuscated(&stream_map) {
      debug!("Stream map of {} carries scrambled signatures", video_id);
      stream_map = self.scraper.extract_stream_map(video_id).await?;
    }

    let mut cipher: Option<CipherContext> = None;
    let mut streams: Vec<ResolvedStream> = Vec::new();

    for fragment in stream_map.split(',').filter(|f| !f.trim().is_empty()) {
      let Some(descriptor) = StreamDescriptor::parse(fragment) else {
        warn!("Skipping stream entry of {} without itag or url", video_id);
        continue;
      };

      let url = match &descriptor.signature {
        Signature::Plain(sig) => append_signature(&descriptor.url, sig),
        Signature::Obfuscated(scrambled) => {
          let context = match cipher.take() {
            Some(context) => context,
            None => self.cipher_context(video_id).await?,
          };
          let context = cipher.insert(context);
          let sig = context
            .interpreter
            .decipher(&context.function, scrambled)?;
          append_signature(&descriptor.url, &sig)
        }
        Signature::None => descriptor.url.clone(),
      };

      if self.config.probe_streams {
        match self.transport.head(&url, &self.headers).await {
          Ok(403) => {
            warn!(
              "Dropping itag {} of {}: probe returned 403",
              descriptor.itag, video_id
            );
            continue;
          }
          Ok(status) => debug!("Probe of itag {} returned {}", descriptor.itag, status),
          Err(e) => debug!("Probe of itag {} failed, keeping it: {}", descriptor.itag, e),
        }
      }

      let stream = ResolvedStream::new(&descriptor, &title, url);
      match streams.iter_mut().find(|s| s.itag == stream.itag) {
        Some(existing) => *existing = stream,
        None => streams.push(stream),
      }
    }

    info!("Resolved {} streams for {}", streams.len(), video_id);
    Ok(streams)
  }

  async fn cipher_context(&self, video_id: &VideoId) -> Result<CipherContext, ResolveError> {
    let url = self.scraper.locate_player_script(video_id).await?;
    let script = self.scraper.fetch_player_script(&url).await?;
    let function = self.scraper.locate_cipher_function_name(&script)?;
    debug!("Signature function for {} is {}", video_id, function);

    Ok(CipherContext {
      interpreter: CipherInterpreter::new(script).with_max_depth(self.config.max_call_depth),
      function,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{common::http::testing::StubTransport, sources::youtube::cipher::CipherError};

  const PLAYER_JS: &str = concat!(
    r#"var x=1;c&&(b=a.s,a.set("signature",abc(b)));"#,
    r#"function abc(a){a=a.split("");a=b(a);return a.join("")}"#,
    "function b(a){a=a.reverse();return a}",
  );

  fn vid() -> VideoId {
    VideoId::new("vid").unwrap()
  }

  fn info_page(stream_map: &str) -> String {
    format!(
      "status=ok&token=t&title=My+Video&url_encoded_fmt_stream_map={}",
      urlencoding::encode(stream_map)
    )
  }

  fn stub_with_info(stream_map: &str) -> StubTransport {
    let config = YouTubeConfig::default();
    StubTransport::new().with_page(config.info_url_for("vid", "&el=embedded"), info_page(stream_map))
  }

  fn resolver(stub: Arc<StubTransport>, config: YouTubeConfig) -> StreamResolver {
    StreamResolver::new(stub, config).unwrap()
  }

  fn watch_page(stream_map: &str) -> String {
    format!(
      r#"<script>ytplayer.config = {{"assets":{{"js":"/s/player/base.js"}},"args":{{"url_encoded_fmt_stream_map":"{}"}}}};</script>"#,
      stream_map
    )
  }

  #[tokio::test]
  async fn plain_signatures_are_appended() {
    let map = concat!(
      "itag=22&type=video%2Fmp4&quality=hd720&url=https%3A%2F%2Fr.example%2Fv%3Fid%3D1&sig=AAA,",
      "itag=18&type=video%2F3gpp&url=https%3A%2F%2Fr.example%2Fw&sig=BBB",
    );
    let stub = Arc::new(stub_with_info(map));
    let streams = resolver(stub.clone(), YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].url, "https://r.example/v?id=1&signature=AAA");
    assert_eq!(streams[0].label, "22 - mp4 - hd720");
    assert_eq!(streams[0].title, "My Video");
    assert_eq!(streams[1].url, "https://r.example/w?signature=BBB");
    assert_eq!(streams[1].label, "18 - 3gpp");
    assert_eq!(stub.probed().len(), 2);
    assert_eq!(stub.requests().len(), 1);
  }

  #[tokio::test]
  async fn obfuscated_signatures_run_through_the_player_script() {
    let config = YouTubeConfig::default();
    let scrape_map = concat!(
      "itag=18&type=video%2Fmp4&url=https%3A%2F%2Fr.example%2Fv&s=XYZ,",
      "itag=22&url=https%3A%2F%2Fr.example%2Fx&s=ABC",
    );
    let stub = Arc::new(
      stub_with_info("itag=18&url=https%3A%2F%2Fr.example%2Fv&s=XYZ")
        .with_page(config.watch_url_for("vid"), watch_page(scrape_map))
        .with_page("https://www.youtube.com/s/player/base.js", PLAYER_JS),
    );

    let streams = resolver(stub.clone(), config).resolve(&vid()).await.unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].url, "https://r.example/v?signature=ZYX");
    assert_eq!(streams[0].extension, "mp4");
    assert_eq!(streams[1].url, "https://r.example/x?signature=CBA");

    let script_fetches = stub
      .requests()
      .iter()
      .filter(|u| u.ends_with("base.js"))
      .count();
    assert_eq!(script_fetches, 1);
  }

  #[tokio::test]
  async fn forbidden_streams_are_dropped() {
    let map = "itag=18&url=https%3A%2F%2Fr.example%2Fa&sig=1,itag=22&url=https%3A%2F%2Fr.example%2Fb&sig=2";
    let stub = Arc::new(stub_with_info(map).with_probe("https://r.example/a?signature=1", 403));

    let streams = resolver(stub, YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].itag, "22");
  }

  #[tokio::test]
  async fn other_probe_statuses_keep_the_stream() {
    let map = "itag=18&url=https%3A%2F%2Fr.example%2Fa&sig=1";
    let stub = Arc::new(stub_with_info(map).with_probe("https://r.example/a?signature=1", 404));

    let streams = resolver(stub, YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap();
    assert_eq!(streams.len(), 1);
  }

  #[tokio::test]
  async fn repeated_itag_overwrites_in_place() {
    let map = "itag=18&url=A&sig=1,itag=22&url=B&sig=2,itag=18&url=C&sig=3";
    let stub = Arc::new(stub_with_info(map));
    let streams = resolver(stub, YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap();

    let urls: Vec<_> = streams.iter().map(|s| (s.itag.as_str(), s.url.as_str())).collect();
    assert_eq!(urls, vec![("18", "C?signature=3"), ("22", "B?signature=2")]);
  }

  #[tokio::test]
  async fn probing_can_be_disabled() {
    let stub = Arc::new(stub_with_info("itag=18&url=A&sig=1,url=B,itag=5"));
    let config = YouTubeConfig {
      probe_streams: false,
      ..YouTubeConfig::default()
    };
    let streams = resolver(stub.clone(), config).resolve(&vid()).await.unwrap();
    assert_eq!(streams.len(), 1);
    assert!(stub.probed().is_empty());
  }

  #[tokio::test]
  async fn adaptive_formats_are_opt_in() {
    let config = YouTubeConfig::default();
    let body = format!(
      "{}&adaptive_fmts={}",
      info_page("itag=18&url=A&sig=1"),
      urlencoding::encode("itag=137&url=D&sig=4")
    );
    let stub = Arc::new(
      StubTransport::new().with_page(config.info_url_for("vid", "&el=embedded"), body),
    );

    let streams = resolver(stub.clone(), YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap();
    assert_eq!(streams.len(), 1);

    let config = YouTubeConfig {
      include_adaptive: true,
      ..YouTubeConfig::default()
    };
    let streams = resolver(stub, config).resolve(&vid()).await.unwrap();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[1].itag, "137");
  }

  #[tokio::test]
  async fn metadata_failure_propagates() {
    let stub = Arc::new(StubTransport::new());
    let err = resolver(stub, YouTubeConfig::default())
      .resolve(&vid())
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::UpstreamUnavailable));
  }

  #[tokio::test]
  async fn interpreter_errors_are_fatal() {
    let config = YouTubeConfig::default();
    let stub = Arc::new(
      stub_with_info("itag=18&url=https%3A%2F%2Fr.example%2Fv&s=XYZ")
        .with_page(
          config.watch_url_for("vid"),
          watch_page("itag=18&url=https%3A%2F%2Fr.example%2Fv&s=XYZ"),
        )
        .with_page(
          "https://www.youtube.com/s/player/base.js",
          r#"a.set("signature",qq(b));function qq(a){return a+1}"#,
        ),
    );

    let err = resolver(stub, config).resolve(&vid()).await.unwrap_err();
    assert!(matches!(
      err,
      ResolveError::Cipher(CipherError::UnsupportedConstruct(_))
    ));
  }

  #[tokio::test]
  async fn missing_player_script_is_reported() {
    let config = YouTubeConfig::default();
    let stub = Arc::new(
      stub_with_info("itag=18&url=u&s=XYZ").with_page(
        config.watch_url_for("vid"),
        r#"ytplayer.config = {"args":{"url_encoded_fmt_stream_map":"itag=18&url=u&s=XYZ"}};"#,
      ),
    );

    let err = resolver(stub, config).resolve(&vid()).await.unwrap_err();
    assert!(matches!(err, ResolveError::PlayerScriptNotFound));
  }

  #[test]
  fn invalid_headers_are_rejected() {
    let mut config = YouTubeConfig::default();
    config.headers.insert("bad header".into(), "x".into());
    let err = StreamResolver::new(Arc::new(StubTransport::new()), config)
      .err()
      .unwrap();
    assert!(matches!(err, ResolveError::InvalidHeader(_)));
  }
}
