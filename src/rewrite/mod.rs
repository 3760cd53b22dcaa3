//! Response body rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse (body + content-type, final URL as base)
//!     → ContentRewriter::rewrite_body
//!         ├─ text/html        → html.rs  (base + hooks, href/src/action, inline CSS)
//!         ├─ text/css         → css.rs   (url(), @import)
//!         ├─ JavaScript       → hooks.rs (prologue, body verbatim)
//!         └─ anything else    → unchanged
//! ```
//!
//! # Design Decisions
//! - Regex passes over text, not a DOM; malformed markup degrades to "unchanged"
//! - Encoded or non-UTF-8 bodies are never touched
//! - Every reference funnels through `RewriteContext::proxy_reference` so HTML,
//!   CSS and the runtime hook agree on resolution and escaping

pub mod css;
pub mod hooks;
pub mod html;

use std::borrow::Cow;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use url::Url;

use crate::addressing::ProxyPrefix;
use crate::observability::metrics;

/// Everything a rewrite pass needs to turn a reference into a proxy address.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// The document's own URL; relative references resolve against it.
    pub base: &'a Url,
    pub prefix: &'a ProxyPrefix,
}

impl<'a> RewriteContext<'a> {
    pub fn new(base: &'a Url, prefix: &'a ProxyPrefix) -> Self {
        Self { base, prefix }
    }

    /// The proxy address for `raw`, or `None` when it must stay as written.
    ///
    /// Skips empty values, references that already point at the proxy, and
    /// anything that does not resolve to an http(s) URL.
    pub fn proxy_reference(&self, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() || self.prefix.is_proxied(value) {
            return None;
        }

        let absolute = self.base.join(value).ok()?;
        match absolute.scheme() {
            "http" | "https" => Some(self.prefix.address_for(&absolute)),
            _ => None,
        }
    }
}

/// ASCII case-insensitive scheme test on an already trimmed value.
pub(crate) fn has_scheme(value: &str, scheme: &str) -> bool {
    value
        .get(..scheme.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
}

/// Which sub-rewriter a response goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Script,
    Other,
}

impl ContentKind {
    /// Classify by content-type; parameters such as `charset` are ignored.
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Other;
        };
        let lowered = content_type.to_ascii_lowercase();
        let essence = lowered.split(';').next().unwrap_or_default().trim();

        if essence.contains("text/html") {
            Self::Html
        } else if essence.contains("text/css") {
            Self::Css
        } else if essence == "application/javascript" || essence == "text/javascript" {
            Self::Script
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Script => "script",
            Self::Other => "other",
        }
    }
}

/// Dispatches an upstream body to the matching sub-rewriter.
#[derive(Debug, Clone)]
pub struct ContentRewriter {
    inject_script_hooks: bool,
}

impl ContentRewriter {
    pub fn new(inject_script_hooks: bool) -> Self {
        Self {
            inject_script_hooks,
        }
    }

    /// Rewrite `body` for delivery to the browser.
    ///
    /// Returns the original bytes whenever the body is not something this
    /// proxy can safely rewrite.
    pub fn rewrite_body(&self, ctx: RewriteContext<'_>, headers: &HeaderMap, body: Bytes) -> Bytes {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let kind = ContentKind::classify(content_type);

        if kind == ContentKind::Other || (kind == ContentKind::Script && !self.inject_script_hooks) {
            return body;
        }

        if !is_identity_encoded(headers) {
            tracing::debug!(kind = kind.as_str(), base = %ctx.base, "Skipping rewrite of encoded body");
            return body;
        }

        let Ok(text) = std::str::from_utf8(&body) else {
            tracing::debug!(kind = kind.as_str(), base = %ctx.base, "Skipping rewrite of non-UTF-8 body");
            return body;
        };

        let rewritten = match kind {
            ContentKind::Html => Some(html::rewrite_html(text, ctx)),
            ContentKind::Css => match css::rewrite_css(text, ctx) {
                Cow::Owned(css) => Some(css),
                Cow::Borrowed(_) => None,
            },
            ContentKind::Script => Some(hooks::script_prologue(ctx, text)),
            ContentKind::Other => None,
        };

        metrics::record_rewrite(kind.as_str());

        match rewritten {
            Some(text) => Bytes::from(text),
            None => body,
        }
    }
}

fn is_identity_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .all(|value| {
            value
                .to_str()
                .map(|v| v.trim().is_empty() || v.trim().eq_ignore_ascii_case("identity"))
                .unwrap_or(false)
        })
}
