//! Read-only loading of a Netscape-format `cookies.txt` into a reqwest jar.
//!
//! The file is never written back; the parent directory is created once at
//! setup so users can drop a cookie export next to the config.

use std::{fs, io, path::Path, sync::Arc};

use reqwest::{Url, cookie::Jar};

/// One `cookies.txt` line: `domain  flag  path  secure  expiry  name  value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieLine {
  pub domain: String,
  pub path: String,
  pub secure: bool,
  pub name: String,
  pub value: String,
}

impl CookieLine {
  fn as_set_cookie(&self) -> String {
    let mut s = format!(
      "{}={}; Domain={}; Path={}",
      self.name, self.value, self.domain, self.path
    );
    if self.secure {
      s.push_str("; Secure");
    }
    s
  }

  fn origin(&self) -> Option<Url> {
    let host = self.domain.trim_start_matches('.');
    let scheme = if self.secure { "https" } else { "http" };
    Url::parse(&format!("{}://{}{}", scheme, host, self.path)).ok()
  }
}

pub fn parse_cookie_file(content: &str) -> Vec<CookieLine> {
  let mut cookies = Vec::new();

  for line in content.lines() {
    let line = line.trim();
    let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);

    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 7 {
      continue;
    }

    cookies.push(CookieLine {
      domain: parts[0].to_string(),
      path: parts[2].to_string(),
      secure: parts[3].eq_ignore_ascii_case("TRUE"),
      name: parts[5].to_string(),
      value: parts[6].to_string(),
    });
  }

  cookies
}

/// Builds the jar handed to the transport. A missing file yields an empty jar.
pub fn load_cookie_jar(path: &Path) -> io::Result<Arc<Jar>> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let jar = Arc::new(Jar::default());

  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      tracing::debug!("cookie file {} not found, starting empty", path.display());
      return Ok(jar);
    }
    Err(e) => return Err(e),
  };

  let cookies = parse_cookie_file(&content);
  for cookie in &cookies {
    match cookie.origin() {
      Some(url) => jar.add_cookie_str(&cookie.as_set_cookie(), &url),
      None => tracing::warn!("skipping cookie {} with bad domain {}", cookie.name, cookie.domain),
    }
  }

  tracing::info!("loaded {} cookies from {}", cookies.len(), path.display());
  Ok(jar)
}
