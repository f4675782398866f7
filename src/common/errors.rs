use thiserror::Error;

/// Failures raised by a [`Transport`](super::http::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  #[error("request to {url} returned status {status}")]
  Status { url: String, status: u16 },

  #[error("failed to build http client: {0}")]
  Client(String),
}

impl TransportError {
  pub fn request(url: &str, err: impl std::fmt::Display) -> Self {
    Self::Request {
      url: url.to_string(),
      message: err.to_string(),
    }
  }
}
