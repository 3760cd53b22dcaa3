//! HTML rewriting.
//!
//! # Responsibilities
//! - Rewrite `href` on `a`/`area`/`link`, `src` on embedded assets, `action` on `form`
//! - Route inline `<style>` bodies and `style` attributes through the CSS rewriter
//! - Insert `<base>` and the network hook right after the opening `<head>`
//!
//! Attribute values are entity-decoded before resolution and re-escaped for
//! the quote style they were written in. Values the passes decline to touch
//! keep their original bytes.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{css, has_scheme, hooks, RewriteContext};

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<(?:a|area|link)\b[^>]*?\shref\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid href regex")
});

static SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(<(?:script|img|iframe|embed|video|audio|source)\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
    )
    .expect("valid src regex")
});

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<form\b[^>]*?\saction\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid action regex")
});

static STYLE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("valid style block regex")
});

static STYLE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<[a-z][a-z0-9-]*\b[^>]*?\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid style attribute regex")
});

static HEAD_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("valid head regex"));

static HTML_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html(?:\s[^>]*)?>").expect("valid html regex"));

static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype[^>]*>").expect("valid doctype regex"));

const HREF_SKIP: &[&str] = &["javascript:", "#", "data:", "mailto:"];
const SRC_SKIP: &[&str] = &["data:", "blob:"];
const ACTION_SKIP: &[&str] = &["javascript:"];

/// Rewrite an HTML document so every reference goes back through the proxy.
pub fn rewrite_html(html: &str, ctx: RewriteContext<'_>) -> String {
    let rewritten = rewrite_references(html, ctx);
    inject_head(&rewritten, ctx)
}

/// All reference passes, without head injection.
fn rewrite_references(html: &str, ctx: RewriteContext<'_>) -> String {
    let html = rewrite_attribute(html, &HREF_RE, HREF_SKIP, ctx);
    let html = rewrite_attribute(&html, &SRC_RE, SRC_SKIP, ctx);
    let html = rewrite_attribute(&html, &ACTION_RE, ACTION_SKIP, ctx);
    let html = rewrite_style_blocks(&html, ctx);
    let html = rewrite_style_attributes(&html, ctx);
    html.into_owned()
}

fn rewrite_attribute<'h>(
    html: &'h str,
    regex: &Regex,
    skip: &[&str],
    ctx: RewriteContext<'_>,
) -> Cow<'h, str> {
    regex.replace_all(html, |caps: &Captures| {
        let (raw, quote) = attribute_value(caps);
        match reference_address(raw, skip, ctx) {
            Some(address) => format!("{}{}", &caps[1], quoted(&address, quote)),
            None => caps[0].to_string(),
        }
    })
}

/// The raw attribute value and the quote character it was written with.
fn attribute_value<'c>(caps: &Captures<'c>) -> (&'c str, Option<char>) {
    if let Some(m) = caps.get(2) {
        (m.as_str(), Some('"'))
    } else if let Some(m) = caps.get(3) {
        (m.as_str(), Some('\''))
    } else {
        (caps.get(4).map(|m| m.as_str()).unwrap_or_default(), None)
    }
}

fn reference_address(raw: &str, skip: &[&str], ctx: RewriteContext<'_>) -> Option<String> {
    let decoded = html_escape::decode_html_entities(raw);
    let value = decoded.trim();
    if skip.iter().any(|scheme| has_scheme(value, scheme)) {
        return None;
    }
    ctx.proxy_reference(value)
}

/// Re-escape `value` for its quote style; unquoted values gain double quotes.
fn quoted(value: &str, quote: Option<char>) -> String {
    match quote {
        Some('\'') => format!("'{}'", html_escape::encode_single_quoted_attribute(value)),
        _ => format!("\"{}\"", html_escape::encode_double_quoted_attribute(value)),
    }
}

fn rewrite_style_blocks<'h>(html: &'h str, ctx: RewriteContext<'_>) -> Cow<'h, str> {
    STYLE_BLOCK_RE.replace_all(html, |caps: &Captures| {
        match css::rewrite_css(&caps[2], ctx) {
            Cow::Owned(rewritten) => format!("{}{}{}", &caps[1], rewritten, &caps[3]),
            Cow::Borrowed(_) => caps[0].to_string(),
        }
    })
}

fn rewrite_style_attributes<'h>(html: &'h str, ctx: RewriteContext<'_>) -> Cow<'h, str> {
    STYLE_ATTR_RE.replace_all(html, |caps: &Captures| {
        let (raw, quote) = attribute_value(caps);
        let decoded = html_escape::decode_html_entities(raw);
        match css::rewrite_css(&decoded, ctx) {
            Cow::Owned(rewritten) => format!("{}{}", &caps[1], quoted(&rewritten, quote)),
            Cow::Borrowed(_) => caps[0].to_string(),
        }
    })
}

/// Insert `<base>` + hook after `<head>`, creating the head when it is missing.
fn inject_head(html: &str, ctx: RewriteContext<'_>) -> String {
    let block = hooks::head_block(ctx);

    if let Some(head) = HEAD_OPEN_RE.find(html) {
        return splice(html, head.end(), &block);
    }

    let wrapped = format!("<head>{block}</head>");
    match HTML_OPEN_RE.find(html).or_else(|| DOCTYPE_RE.find(html)) {
        Some(anchor) => splice(html, anchor.end(), &wrapped),
        None => splice(html, 0, &wrapped),
    }
}

fn splice(html: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    out
}
