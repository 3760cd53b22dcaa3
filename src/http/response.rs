//! Diagnostic responses for requests the proxy cannot serve.
//!
//! # Responsibilities
//! - 400 for proxy addresses that do not decode
//! - 500 for upstream failures, as plain text or a styled page
//!
//! # Design Decisions
//! - Error responses carry the same permissive CORS headers as proxied content
//! - Everything echoed into HTML is escaped; the target comes from the client

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::addressing::DecodeError;
use crate::config::ErrorPageFormat;
use crate::security::headers::apply_cors;
use crate::upstream::FetchError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// 400 with a one-line diagnostic. The request is never retried.
pub fn decode_error(err: &DecodeError) -> Response {
    build(
        StatusCode::BAD_REQUEST,
        TEXT_PLAIN,
        format!("Invalid URL encoding: {err}"),
    )
}

/// 500 describing why the upstream could not be fetched.
pub fn fetch_error(err: &FetchError, format: ErrorPageFormat) -> Response {
    match format {
        ErrorPageFormat::Plain => build(
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_PLAIN,
            plain_page(err),
        ),
        ErrorPageFormat::Html => build(
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_HTML,
            html_page(err),
        ),
    }
}

fn plain_page(err: &FetchError) -> String {
    format!("Proxy Error: {}\n\nTarget URL: {}", err.message, err.target_url)
}

fn html_page(err: &FetchError) -> String {
    let target = html_escape::encode_text(&err.target_url);
    let message = html_escape::encode_text(&err.message);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Unable to load page</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #0f172a; color: #e2e8f0; margin: 0; padding: 3rem 1rem; }}
main {{ max-width: 40rem; margin: 0 auto; background: #1e293b; border-radius: 12px; padding: 2rem; }}
h1 {{ margin-top: 0; font-size: 1.5rem; color: #f87171; }}
code {{ display: block; word-break: break-all; background: #0f172a; padding: 0.75rem; border-radius: 6px; }}
li {{ margin: 0.25rem 0; }}
button {{ margin-top: 1.5rem; padding: 0.6rem 1.4rem; border: 0; border-radius: 6px; background: #3b82f6; color: #fff; font-size: 1rem; cursor: pointer; }}
</style>
</head>
<body>
<main>
<h1>Unable to load page</h1>
<p>The proxy could not retrieve:</p>
<code>{target}</code>
<p><strong>Reason:</strong> {message}</p>
<h2>Things to try</h2>
<ul>
<li>Check the address for typos.</li>
<li>The site may be down or blocking automated requests. Try again later.</li>
<li>Some sites only work when visited directly.</li>
</ul>
<button type="button" onclick="history.back()">Go back</button>
</main>
</body>
</html>
"#
    )
}

fn build(status: StatusCode, content_type: &'static str, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    apply_cors(headers);
    response
}
