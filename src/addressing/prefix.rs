//! The fixed path namespace that marks proxy-addressed traffic.
//!
//! # Responsibilities
//! - Decide whether a request path is proxy traffic (prefix match, case-sensitive)
//! - Strip the prefix to expose the encoded target segment
//! - Build complete proxy addresses for rewritten references
//! - Recognise references that already point at the proxy

use url::Url;

use super::codec::encode;

/// Path prefix under which every proxied request lives, e.g. `/uv/service/`.
///
/// When a public origin is configured, addresses are absolute
/// (`https://proxy.example/uv/service/...`) so they keep pointing at the proxy
/// inside documents carrying an injected `<base>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPrefix {
    path: String,
    public_origin: Option<String>,
}

impl ProxyPrefix {
    /// Create a prefix. Leading and trailing slashes are enforced.
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            public_origin: None,
        }
    }

    /// Emit absolute addresses rooted at `origin` (scheme://host[:port]).
    pub fn with_public_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let trimmed = origin.trim_end_matches('/');
        self.public_origin = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn public_origin(&self) -> Option<&str> {
        self.public_origin.as_deref()
    }

    /// Returns the encoded target segment if `path` is proxy traffic.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.path.as_str())
    }

    /// Build `{origin?}{prefix}{encode(target)}`.
    pub fn address_for(&self, target: &Url) -> String {
        let encoded = encode(target);
        match &self.public_origin {
            Some(origin) => format!("{origin}{}{encoded}", self.path),
            None => format!("{}{encoded}", self.path),
        }
    }

    /// True if `reference` already routes through this proxy.
    pub fn is_proxied(&self, reference: &str) -> bool {
        if reference.starts_with(self.path.as_str()) {
            return true;
        }
        self.public_origin
            .as_deref()
            .and_then(|origin| reference.strip_prefix(origin))
            .map(|rest| rest.starts_with(self.path.as_str()))
            .unwrap_or(false)
    }
}

impl Default for ProxyPrefix {
    fn default() -> Self {
        Self::new("/uv/service/")
    }
}
