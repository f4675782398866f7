use thiserror::Error;

/// Failures of the signature interpreter. Every variant means the script
/// stepped outside the supported grammar or its value rules; nothing is
/// approximated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
  #[error("unbound variable `{0}`")]
  UnboundVariable(String),

  #[error("unsupported construct: {0}")]
  UnsupportedConstruct(String),

  #[error("function `{0}` not found in player script")]
  FunctionNotFound(String),

  #[error("call depth exceeded {0} frames")]
  RecursionLimitExceeded(usize),

  #[error("function `{0}` finished without returning a value")]
  MissingReturn(String),

  #[error("`{operation}` expects {expected}, got {found}")]
  TypeMismatch {
    operation: &'static str,
    expected: &'static str,
    found: &'static str,
  },

  #[error("index {index} out of range for length {len}")]
  IndexOutOfRange { index: i64, len: usize },

  #[error("modulo by zero")]
  DivisionByZero,
}

impl CipherError {
  pub(crate) fn unsupported(what: impl Into<String>) -> Self {
    Self::UnsupportedConstruct(what.into())
  }
}
