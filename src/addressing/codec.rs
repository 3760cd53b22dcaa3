//! Bidirectional mapping between an encoded path segment and a target URL.

use std::fmt;
use std::ops::Deref;

use thiserror::Error;
use url::Url;

/// Failure to turn an encoded path segment into a [`TargetUrl`].
///
/// Always the client's fault; the interceptor answers with a 400.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty target")]
    Empty,

    #[error("invalid percent-escape at byte {0}")]
    InvalidEscape(usize),

    #[error("decoded target is not valid UTF-8")]
    InvalidUtf8,

    #[error("unparseable target URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// An absolute `http(s)://` URL a proxied request ultimately points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    /// Wrap an already-parsed URL, rejecting anything that is not http(s).
    pub fn new(url: Url) -> Result<Self, DecodeError> {
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(DecodeError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Parse a raw (already decoded) target, normalising missing schemes to https.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }

        let normalized = if has_http_scheme(raw) {
            raw.to_string()
        } else if raw.starts_with("//") {
            format!("https:{raw}")
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&normalized).map_err(|e| DecodeError::InvalidUrl(e.to_string()))?;
        Self::new(url)
    }

    /// Append a query string received on the proxy address itself.
    pub fn with_extra_query(mut self, query: &str) -> Self {
        if query.is_empty() {
            return self;
        }
        let merged = match self.0.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_string(),
        };
        self.0.set_query(Some(&merged));
        self
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

impl Deref for TargetUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Percent-encode an absolute URL for embedding in a single path segment.
pub fn encode(target: &Url) -> String {
    urlencoding::encode(target.as_str()).into_owned()
}

/// Decode a path segment produced by [`encode`] (or by any caller following
/// the address scheme) back into a [`TargetUrl`].
pub fn decode(segment: &str) -> Result<TargetUrl, DecodeError> {
    validate_escapes(segment)?;
    let decoded = urlencoding::decode(segment).map_err(|_| DecodeError::InvalidUtf8)?;
    TargetUrl::parse(&decoded)
}

/// `urlencoding::decode` passes malformed escapes through literally; a proxy
/// address with a dangling `%` is a client error instead.
fn validate_escapes(segment: &str) -> Result<(), DecodeError> {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .map(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .unwrap_or(false);
            if !valid {
                return Err(DecodeError::InvalidEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
