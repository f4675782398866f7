/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Platform-assigned video identifier (the `v=` value of a watch URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
  /// Returns `None` for empty or whitespace-only input.
  pub fn new(id: impl Into<String>) -> Option<Self> {
    let id = id.into();
    let trimmed = id.trim();
    if trimmed.is_empty() {
      return None;
    }
    Some(Self(trimmed.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::ops::Deref for VideoId {
  type Target = str;
  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl std::fmt::Display for VideoId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}
