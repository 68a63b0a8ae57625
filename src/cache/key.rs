//! Cache key derivation for requests.

use serde_json::Value;

/// Separator between the request URL and the key suffix.
const KEY_HASH_PARAM: &str = "?keyHash=";

/// Build the cache key for a request.
///
/// The "hash" is the plain concatenation `body + url + method`, appended to
/// the URL. It is deterministic but not collision resistant: distinct triples
/// whose concatenations coincide share a key. Keys written by earlier clients
/// use this exact layout, so it must not change.
///
/// - body (valid UTF-8), url and method: `url?keyHash=<body><url><method>`
/// - url and method only: `url?keyHash=<url><method>`
/// - otherwise: the url, or an empty string
pub fn build_key(url: Option<&str>, method: Option<&str>, body: Option<&[u8]>) -> String {
  let body_text = body.and_then(|b| std::str::from_utf8(b).ok());

  match (url, method, body_text) {
    (Some(url), Some(method), Some(body)) => {
      format!("{}{}{}{}{}", url, KEY_HASH_PARAM, body, url, method)
    }
    (Some(url), Some(method), None) => format!("{}{}{}{}", url, KEY_HASH_PARAM, url, method),
    (url, _, _) => url.unwrap_or_default().to_string(),
  }
}

/// Body text for a JSON request: the `"query"` string, or empty.
///
/// Query-style APIs post `{"query": ..., "variables": ...}`; only the query
/// text identifies the response, so callers key on this instead of the
/// serialized JSON.
pub fn build_body(body: Option<&Value>) -> String {
  body
    .and_then(|b| b.get("query"))
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}

/// A request as seen by the cache: only the parts that feed the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
  pub url: String,
  pub method: Option<String>,
  pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      method: None,
      body: None,
    }
  }

  pub fn with_method(mut self, method: impl Into<String>) -> Self {
    self.method = Some(method.into());
    self
  }

  pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.body = Some(body.into());
    self
  }

  /// Key under which this request's response is stored.
  pub fn cache_key(&self) -> String {
    build_key(
      Some(&self.url),
      self.method.as_deref(),
      self.body.as_deref(),
    )
  }
}
