//! Request interception: decide what a request is, then serve it.
//!
//! # Data Flow
//! ```text
//! Request
//!     → classify(prefix, uri)
//!         ├─ PassThrough  → static directory or 404, request untouched
//!         ├─ Rejected     → 400 one-line diagnostic
//!         └─ Proxy(target)
//!               → request_prefix (origin the client used, unless configured)
//!               → HeaderSanitizer::outbound
//!               → OriginFetcher::fetch_upstream
//!               → HeaderSanitizer::inbound + ContentRewriter::rewrite_body
//!               → response (status mirrors upstream) | 500 error page
//! ```

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::uri::Authority;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;

use super::request::RequestIdExt;
use super::response;
use super::server::AppState;
use crate::addressing::{decode, DecodeError, ProxyPrefix, TargetUrl};
use crate::observability::metrics;
use crate::rewrite::RewriteContext;
use crate::upstream::OutboundRequest;

/// What the interceptor decided to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Outside the proxy prefix.
    PassThrough,
    /// Inside the prefix, but the target segment does not decode.
    Rejected(DecodeError),
    /// Inside the prefix with a usable target.
    Proxy(TargetUrl),
}

/// Classify a request purely from its path and query.
///
/// A query string on the proxy address belongs to the target; this is how
/// GET forms submitted to a rewritten `action` reach the upstream.
pub fn classify(prefix: &ProxyPrefix, uri: &Uri) -> Interception {
    let Some(segment) = prefix.strip(uri.path()) else {
        return Interception::PassThrough;
    };

    match decode(segment) {
        Ok(target) => match uri.query() {
            Some(query) => Interception::Proxy(target.with_extra_query(query)),
            None => Interception::Proxy(target),
        },
        Err(err) => Interception::Rejected(err),
    }
}

/// Fallback handler: every request not claimed by another route lands here.
pub async fn intercept(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let (response, outcome) = match classify(&state.prefix, request.uri()) {
        Interception::PassThrough => (pass_through(&state, request).await, "passthrough"),
        Interception::Rejected(err) => {
            tracing::info!(
                path = %request.uri().path(),
                error = %err,
                "Rejected undecodable proxy address"
            );
            (response::decode_error(&err), "rejected")
        }
        Interception::Proxy(target) => proxy(&state, target, request).await,
    };

    metrics::record_request(&method, response.status().as_u16(), outcome, start);
    response
}

async fn pass_through(state: &AppState, request: Request) -> Response {
    match state.static_files.clone() {
        Some(dir) => match dir.oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The prefix addresses in a proxied response are built with.
///
/// Rewritten documents carry a `<base>` pointing at the target, so a
/// prefix-relative address would resolve against the target's origin. Unless
/// a public origin is configured, addresses are rooted at the origin the
/// client used for this request.
fn request_prefix(state: &AppState, parts: &Parts) -> ProxyPrefix {
    let prefix = state.prefix.as_ref().clone();
    if prefix.public_origin().is_some() {
        return prefix;
    }
    match request_origin(parts, state.listener_scheme) {
        Some(origin) => prefix.with_public_origin(origin),
        None => prefix,
    }
}

/// `scheme://authority` from `Host` (or the URI authority on HTTP/2) and
/// `x-forwarded-proto`, falling back to the listener's own scheme.
fn request_origin(parts: &Parts, listener_scheme: &str) -> Option<String> {
    let authority = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Authority>().ok())
        .or_else(|| parts.uri.authority().cloned())?;
    if authority.as_str().contains('@') {
        return None;
    }

    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| listener_scheme.to_string());

    Some(format!("{scheme}://{authority}"))
}

async fn proxy(state: &AppState, target: TargetUrl, request: Request) -> (Response, &'static str) {
    let request_id = request.request_id().to_string();
    let (parts, body) = request.into_parts();
    let prefix = request_prefix(state, &parts);

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::info!(request_id = %request_id, error = %err, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE.into_response(), "rejected");
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        target = %target,
        strategy = %state.fetcher.strategy(),
        "Proxying request"
    );

    let outbound = OutboundRequest {
        headers: state.sanitizer.outbound(&parts.headers),
        target,
        method: parts.method,
        body,
    };

    let upstream = match state.fetcher.fetch_upstream(outbound).await {
        Ok(upstream) => upstream,
        Err(err) => {
            tracing::warn!(
                request_id = %request_id,
                target = %err.target_url,
                error = %err,
                "Upstream fetch failed"
            );
            metrics::record_upstream_error(state.fetcher.strategy().as_str());
            return (response::fetch_error(&err, state.error_page), "failed");
        }
    };

    let mut headers = upstream.headers;
    state.sanitizer.inbound(&mut headers);

    let ctx = RewriteContext::new(&upstream.final_url, &prefix);
    let body = state.rewriter.rewrite_body(ctx, &headers, upstream.body);

    tracing::debug!(
        request_id = %request_id,
        status = upstream.status.as_u16(),
        final_url = %upstream.final_url,
        strategy = %upstream.strategy,
        bytes = body.len(),
        "Proxied response ready"
    );

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    (response, "proxied")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(raw: &str) -> Uri {
        raw.parse().unwrap()
    }

    #[test]
    fn test_outside_prefix_passes_through() {
        let prefix = ProxyPrefix::default();
        assert_eq!(classify(&prefix, &uri("/index.html")), Interception::PassThrough);
        assert_eq!(classify(&prefix, &uri("/uv/service")), Interception::PassThrough);
        assert_eq!(classify(&prefix, &uri("/UV/service/x")), Interception::PassThrough);
    }

    #[test]
    fn test_proxy_address_decodes() {
        let prefix = ProxyPrefix::default();
        match classify(&prefix, &uri("/uv/service/https%3A%2F%2Fsite.example%2Fpage")) {
            Interception::Proxy(target) => assert_eq!(target.as_str(), "https://site.example/page"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_trailing_percent_is_rejected() {
        let prefix = ProxyPrefix::default();
        assert!(matches!(
            classify(&prefix, &uri("/uv/service/https%3A%2F%2Fsite.example%")),
            Interception::Rejected(DecodeError::InvalidEscape(_))
        ));
        assert!(matches!(
            classify(&prefix, &uri("/uv/service/")),
            Interception::Rejected(DecodeError::Empty)
        ));
    }

    #[test]
    fn test_query_is_carried_to_target() {
        let prefix = ProxyPrefix::default();
        match classify(&prefix, &uri("/uv/service/https%3A%2F%2Fsite.example%2Fsearch?q=rust")) {
            Interception::Proxy(target) => {
                assert_eq!(target.as_str(), "https://site.example/search?q=rust")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn parts(host: Option<&str>, forwarded_proto: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/uv/service/x");
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        if let Some(proto) = forwarded_proto {
            builder = builder.header("x-forwarded-proto", proto);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_request_origin_from_host() {
        assert_eq!(
            request_origin(&parts(Some("proxy.local:8080"), None), "http"),
            Some("http://proxy.local:8080".to_string())
        );
        assert_eq!(
            request_origin(&parts(Some("proxy.local"), None), "https"),
            Some("https://proxy.local".to_string())
        );
        assert_eq!(request_origin(&parts(None, None), "http"), None);
        assert_eq!(request_origin(&parts(Some("user@evil.example"), None), "http"), None);
        assert_eq!(request_origin(&parts(Some("bad host/"), None), "http"), None);
    }

    #[test]
    fn test_request_origin_honours_forwarded_proto() {
        assert_eq!(
            request_origin(&parts(Some("proxy.example"), Some("HTTPS, http")), "http"),
            Some("https://proxy.example".to_string())
        );
        assert_eq!(
            request_origin(&parts(Some("proxy.example"), Some("gopher")), "http"),
            Some("http://proxy.example".to_string())
        );
    }

    #[test]
    fn test_h2_authority_is_used_without_host() {
        let parts = axum::http::Request::builder()
            .uri("https://proxy.example/uv/service/x")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert_eq!(
            request_origin(&parts, "https"),
            Some("https://proxy.example".to_string())
        );
    }
}
