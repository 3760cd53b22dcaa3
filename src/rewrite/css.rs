//! CSS reference rewriting: `url(...)` functions and `@import` strings.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{has_scheme, RewriteContext};

static URL_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*["']?([^)"']+)["']?\s*\)"#).expect("valid CSS url() regex")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s+["']([^"']+)["']"#).expect("valid CSS @import regex")
});

/// Schemes that never become proxied fetches from a stylesheet.
const SKIPPED: &[&str] = &["data:", "blob:"];

/// Rewrite every `url(...)` and `@import "..."` in a stylesheet.
///
/// Returns the input borrowed when nothing changed.
pub fn rewrite_css<'a>(css: &'a str, ctx: RewriteContext<'_>) -> Cow<'a, str> {
    let with_urls = URL_FN_RE.replace_all(css, |caps: &Captures| {
        match address(&caps[1], ctx) {
            Some(address) => format!("url(\"{address}\")"),
            None => caps[0].to_string(),
        }
    });

    let imports = match IMPORT_RE.replace_all(&with_urls, |caps: &Captures| {
        match address(&caps[1], ctx) {
            Some(address) => format!("@import \"{address}\""),
            None => caps[0].to_string(),
        }
    }) {
        Cow::Owned(rewritten) => Some(rewritten),
        Cow::Borrowed(_) => None,
    };

    match imports {
        Some(rewritten) => Cow::Owned(rewritten),
        None => with_urls,
    }
}

fn address(raw: &str, ctx: RewriteContext<'_>) -> Option<String> {
    let value = raw.trim();
    if SKIPPED.iter().any(|scheme| has_scheme(value, scheme)) {
        return None;
    }
    ctx.proxy_reference(value)
}
