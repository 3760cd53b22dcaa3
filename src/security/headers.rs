//! Header sanitizing for both directions of a proxied exchange.
//!
//! # Responsibilities
//! - Outbound: drop browser-privileged (`sec-*`) and origin-revealing headers,
//!   hop-by-hop headers and credentials, then set a generic browser identity
//! - Inbound: drop every header that blocks framing or cross-origin reads,
//!   then grant permissive CORS
//!
//! # Design Decisions
//! - Removing CSP, XFO, COOP/COEP/CORP and HSTS is the point of the proxy:
//!   origin isolation is a non-goal for content the user chose to load
//! - Upstream cookies are never stored against the proxy origin
//! - `accept-encoding` is never forwarded so bodies arrive rewritable

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::SanitizerConfig;

/// Request headers that never reach the upstream.
const OUTBOUND_DROPPED: &[HeaderName] = &[
    header::ORIGIN,
    header::REFERER,
    header::HOST,
    header::COOKIE,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    header::CONTENT_LENGTH,
    header::ACCEPT_ENCODING,
];

/// Non-standard request headers that never reach the upstream.
const OUTBOUND_DROPPED_NAMES: &[&str] = &["keep-alive", "proxy-connection", "x-request-id"];

/// Prefix of browser-controlled request metadata (`sec-fetch-*`, `sec-ch-*`, ...).
const PRIVILEGED_PREFIX: &str = "sec-";

/// Response headers that would prevent framing or cross-origin reads.
const INBOUND_BLOCKING: &[HeaderName] = &[
    header::CONTENT_SECURITY_POLICY,
    header::CONTENT_SECURITY_POLICY_REPORT_ONLY,
    header::X_FRAME_OPTIONS,
    header::X_CONTENT_TYPE_OPTIONS,
    header::STRICT_TRANSPORT_SECURITY,
];

/// Blocking response headers without a constant in `http`.
const INBOUND_BLOCKING_NAMES: &[&str] = &[
    "permissions-policy",
    "cross-origin-embedder-policy",
    "cross-origin-opener-policy",
    "cross-origin-resource-policy",
];

/// Response headers that describe the upstream connection or body framing.
const INBOUND_HOP_BY_HOP: &[HeaderName] = &[
    header::SET_COOKIE,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

static WILDCARD: HeaderValue = HeaderValue::from_static("*");
static NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");

/// Rewrites header maps crossing the proxy boundary.
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    user_agent: HeaderValue,
    accept: HeaderValue,
    accept_language: HeaderValue,
}

impl HeaderSanitizer {
    /// Build from configuration. Values that are not valid header text fall
    /// back to the defaults (validation rejects them before this point).
    pub fn new(config: &SanitizerConfig) -> Self {
        let defaults = SanitizerConfig::default();
        let value = |configured: &str, fallback: &str| {
            HeaderValue::from_str(configured)
                .or_else(|_| HeaderValue::from_str(fallback))
                .unwrap_or_else(|_| HeaderValue::from_static("*/*"))
        };

        Self {
            user_agent: value(&config.user_agent, &defaults.user_agent),
            accept: value(&config.accept, &defaults.accept),
            accept_language: value(&config.accept_language, &defaults.accept_language),
        }
    }

    /// Headers to send upstream, derived from the client's request headers.
    pub fn outbound(&self, incoming: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(incoming.len() + 5);

        for (name, value) in incoming {
            if is_outbound_dropped(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        headers.insert(header::USER_AGENT, self.user_agent.clone());
        headers.insert(header::ACCEPT, self.accept.clone());
        headers.insert(header::ACCEPT_LANGUAGE, self.accept_language.clone());
        headers.insert(header::CACHE_CONTROL, NO_CACHE.clone());
        headers.insert(header::PRAGMA, NO_CACHE.clone());

        headers
    }

    /// Strip blocking headers from an upstream response and grant permissive CORS.
    pub fn inbound(&self, headers: &mut HeaderMap) {
        for name in INBOUND_BLOCKING.iter().chain(INBOUND_HOP_BY_HOP) {
            headers.remove(name);
        }
        for name in INBOUND_BLOCKING_NAMES {
            headers.remove(*name);
        }
        headers.remove("keep-alive");

        apply_cors(headers);
    }
}

/// Permissive CORS grant, also used on the proxy's own error responses.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, WILDCARD.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, WILDCARD.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, WILDCARD.clone());
    headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, WILDCARD.clone());
}

fn is_outbound_dropped(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    let raw = name.as_str();
    raw.starts_with(PRIVILEGED_PREFIX)
        || OUTBOUND_DROPPED.contains(name)
        || OUTBOUND_DROPPED_NAMES.contains(&raw)
}
