use thiserror::Error;

use super::cipher::CipherError;
use crate::common::errors::TransportError;

/// Why a single identifier could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("rejected by upstream: {0}")]
  UpstreamRejected(String),

  #[error("no metadata variant returned a token")]
  UpstreamUnavailable,

  #[error("player script url not found on watch page")]
  PlayerScriptNotFound,

  #[error("player config not found on watch page")]
  PlayerConfigNotFound,

  #[error("signature function not found in player script")]
  SignatureFunctionNotFound,

  #[error("cipher: {0}")]
  Cipher(#[from] CipherError),

  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error("invalid request header: {0}")]
  InvalidHeader(String),
}
