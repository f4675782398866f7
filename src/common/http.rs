use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, cookie::Jar, header::HeaderMap};

use super::errors::TransportError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Raw response of a GET: status plus the (already decompressed) body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Bytes,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }

  pub fn error_for_status(self, url: &str) -> Result<Self, TransportError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(TransportError::Status {
        url: url.to_string(),
        status: self.status,
      })
    }
  }
}

/// The HTTP capability the resolver consumes. Implementations own their
/// timeout policy; a call never blocks past it.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, TransportError>;

  /// Lightweight reachability probe, returns the status code only.
  async fn head(&self, url: &str, headers: &HeaderMap) -> Result<u16, TransportError>;
}

pub struct HttpClient;

impl HttpClient {
  pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
  }

  pub fn new(
    user_agent: &str,
    timeout: Duration,
    cookies: Option<Arc<Jar>>,
  ) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
      .user_agent(user_agent)
      .timeout(timeout)
      .gzip(true)
      .deflate(true);

    if let Some(jar) = cookies {
      builder = builder.cookie_provider(jar);
    }

    builder.build()
  }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  pub fn build(
    user_agent: &str,
    timeout: Duration,
    cookies: Option<Arc<Jar>>,
  ) -> Result<Self, TransportError> {
    let client = HttpClient::new(user_agent, timeout, cookies)
      .map_err(|e| TransportError::Client(e.to_string()))?;
    Ok(Self::new(client))
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
    let res = self
      .client
      .get(url)
      .headers(headers.clone())
      .send()
      .await
      .map_err(|e| TransportError::request(url, e))?;

    let status = res.status().as_u16();
    let body = res
      .bytes()
      .await
      .map_err(|e| TransportError::request(url, e))?;

    tracing::trace!("GET {} -> {} ({} bytes)", url, status, body.len());
    Ok(HttpResponse { status, body })
  }

  async fn head(&self, url: &str, headers: &HeaderMap) -> Result<u16, TransportError> {
    let res = self
      .client
      .head(url)
      .headers(headers.clone())
      .send()
      .await
      .map_err(|e| TransportError::request(url, e))?;

    Ok(res.status().as_u16())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_outside_2xx_is_an_error() {
    let ok = HttpResponse::new(204, "");
    assert!(ok.error_for_status("http://a").is_ok());

    let err = HttpResponse::new(404, "gone")
      .error_for_status("http://a")
      .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
  }

  #[test]
  fn text_is_lossy() {
    let res = HttpResponse::new(200, vec![b'o', b'k', 0xff]);
    assert_eq!(res.text(), "ok\u{fffd}");
  }
}
