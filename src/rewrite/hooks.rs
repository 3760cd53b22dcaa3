//! Network hook injection.
//!
//! Static rewriting only sees references present verbatim in a document.
//! The script emitted here wraps the page's own network primitives (`fetch`,
//! `XMLHttpRequest.prototype.open`, `window.open`) so URLs built at runtime are
//! routed through the proxy with the same resolution and escaping rules.
//!
//! The script is an IIFE guarded by a non-enumerable marker on the global
//! object; a second copy in the same realm returns before wrapping anything.

use std::sync::LazyLock;

use regex::Regex;

use super::RewriteContext;

/// Global property marking an installed hook.
pub const INSTALL_MARKER: &str = "__rewriteProxyHooks";

const HOOK_TEMPLATE: &str = r#"(function () {
  var g = typeof globalThis !== 'undefined' ? globalThis : self;
  if (g[__MARKER__]) { return; }
  try { Object.defineProperty(g, __MARKER__, { value: true }); } catch (e) { g[__MARKER__] = true; }
  var PREFIX = __PREFIX__;
  var BASE = __BASE__;
  var ORIGIN = __ORIGIN__;
  if (ORIGIN === null) {
    ORIGIN = (g.location && g.location.origin && g.location.origin !== 'null') ? g.location.origin : '';
  }
  function encode(value) {
    return encodeURIComponent(value).replace(/[!'()*]/g, function (c) {
      return '%' + c.charCodeAt(0).toString(16).toUpperCase();
    });
  }
  function isProxied(url) {
    return url.indexOf(PREFIX) === 0 || (ORIGIN !== '' && url.indexOf(ORIGIN + PREFIX) === 0);
  }
  function route(url) {
    if (typeof url !== 'string') { return url; }
    var scheme = url.trim().slice(0, 5).toLowerCase();
    if (scheme === 'data:' || scheme === 'blob:' || isProxied(url)) { return url; }
    try {
      var absolute = new URL(url, BASE);
      if (absolute.protocol !== 'http:' && absolute.protocol !== 'https:') { return url; }
      return ORIGIN + PREFIX + encode(absolute.href);
    } catch (e) {
      return url;
    }
  }
  if (typeof g.fetch === 'function') {
    var originalFetch = g.fetch;
    g.fetch = function (input, init) {
      return originalFetch.call(g, route(input), init);
    };
  }
  if (g.XMLHttpRequest && g.XMLHttpRequest.prototype) {
    var originalOpen = g.XMLHttpRequest.prototype.open;
    g.XMLHttpRequest.prototype.open = function (method, url) {
      var args = Array.prototype.slice.call(arguments);
      args[1] = route(url);
      return originalOpen.apply(this, args);
    };
  }
  if (typeof g.open === 'function' && g.document) {
    var originalWindowOpen = g.open;
    g.open = function (url) {
      var args = Array.prototype.slice.call(arguments);
      if (url) { args[0] = route(url); }
      return originalWindowOpen.apply(g, args);
    };
  }
})();
"#;

/// The hook script for documents based at `ctx.base`.
pub fn hook_script(ctx: RewriteContext<'_>) -> String {
    let origin = match ctx.prefix.public_origin() {
        Some(origin) => js_string(origin),
        None => "null".to_string(),
    };

    // The base comes from upstream, so it is substituted last.
    HOOK_TEMPLATE
        .replace("__MARKER__", &js_string(INSTALL_MARKER))
        .replace("__PREFIX__", &js_string(ctx.prefix.as_str()))
        .replace("__ORIGIN__", &origin)
        .replace("__BASE__", &js_string(ctx.base.as_str()))
}

/// `<base>` element plus inline hook, inserted right after `<head>`.
pub fn head_block(ctx: RewriteContext<'_>) -> String {
    format!(
        "<base href=\"{}\"><script>{}</script>",
        html_escape::encode_double_quoted_attribute(ctx.base.as_str()),
        hook_script(ctx)
    )
}

/// Leading `"use strict";`-style directives, optionally preceded by comments.
/// Only semicolon-terminated literals count, so `"a".length` is never split.
static DIRECTIVE_PROLOGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:(?:\s|/\*(?s:.)*?\*/|//[^\n]*)*(?:"[^"\\\r\n]*"|'[^'\\\r\n]*')\s*;)+"#)
        .expect("valid directive prologue regex")
});

/// Hook injected into a JavaScript response; the body itself is left verbatim.
///
/// The hook goes after any directive prologue so a leading `"use strict"`
/// still applies to the original body.
pub fn script_prologue(ctx: RewriteContext<'_>, body: &str) -> String {
    let hook = hook_script(ctx);
    let split = DIRECTIVE_PROLOGUE.find(body).map_or(0, |m| m.end());

    let mut out = String::with_capacity(hook.len() + body.len());
    out.push_str(&body[..split]);
    out.push_str(&hook);
    out.push_str(&body[split..]);
    out
}

/// A JavaScript string literal that is also safe inside an inline `<script>`.
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::ProxyPrefix;
    use url::Url;

    fn base() -> Url {
        Url::parse("https://site.example/dir/page.html").unwrap()
    }

    #[test]
    fn test_script_embeds_prefix_and_base() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let script = hook_script(RewriteContext::new(&base, &prefix));

        assert!(script.contains(r#"var PREFIX = "/uv/service/";"#));
        assert!(script.contains(r#"var BASE = "https://site.example/dir/page.html";"#));
        assert!(script.contains("var ORIGIN = null;"));
    }

    #[test]
    fn test_script_wraps_all_three_primitives() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let script = hook_script(RewriteContext::new(&base, &prefix));

        assert!(script.contains("g.fetch = function"));
        assert!(script.contains("XMLHttpRequest.prototype.open = function"));
        assert!(script.contains("g.open = function"));
    }

    #[test]
    fn test_script_is_guarded_against_double_install() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let script = hook_script(RewriteContext::new(&base, &prefix));

        let guard = script.find("if (g[\"__rewriteProxyHooks\"]) { return; }").unwrap();
        let first_wrap = script.find("originalFetch").unwrap();
        assert!(guard < first_wrap);
    }

    #[test]
    fn test_public_origin_is_embedded() {
        let prefix = ProxyPrefix::default().with_public_origin("https://proxy.example");
        let base = base();
        let script = hook_script(RewriteContext::new(&base, &prefix));
        assert!(script.contains(r#"var ORIGIN = "https://proxy.example";"#));
    }

    #[test]
    fn test_literals_cannot_close_the_script_element() {
        assert_eq!(js_string("a</script>b"), r#""a<\/script>b""#);
        assert_eq!(js_string("quote\"here"), r#""quote\"here""#);
    }

    #[test]
    fn test_head_block_starts_with_base() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let block = head_block(RewriteContext::new(&base, &prefix));

        assert!(block.starts_with(r#"<base href="https://site.example/dir/page.html"><script>"#));
        assert!(block.ends_with("</script>"));
    }

    #[test]
    fn test_js_escaping_matches_address_codec() {
        // encodeURIComponent leaves A-Za-z0-9 and -_.!~*'() alone; the hook
        // then escapes !'()* so the unreserved set matches the codec exactly.
        for byte in 0x20u8..0x7f {
            let c = byte as char;
            let uri_component_keeps = c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c);
            let hook_keeps = uri_component_keeps && !"!'()*".contains(c);
            let codec_keeps = urlencoding::encode(&c.to_string()) == c.to_string();
            assert_eq!(hook_keeps, codec_keeps, "escaping differs for {c:?}");
        }
    }

    #[test]
    fn test_prologue_keeps_body_verbatim() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let body = "console.log('hi');";
        let out = script_prologue(RewriteContext::new(&base, &prefix), body);
        assert!(out.ends_with(body));
        assert!(out.starts_with("(function () {"));
    }

    #[test]
    fn test_prologue_goes_after_use_strict() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let ctx = RewriteContext::new(&base, &prefix);

        let out = script_prologue(ctx, "\"use strict\";\nx = 1;");
        assert!(out.starts_with("\"use strict\";(function () {"));
        assert!(out.ends_with("})();\n\nx = 1;"));

        let bundled = "/*! lib v1 */\n'use strict'; 'use asm';\nrun();";
        let out = script_prologue(ctx, bundled);
        assert!(out.starts_with("/*! lib v1 */\n'use strict'; 'use asm';(function () {"));
        assert!(out.ends_with("\nrun();"));
    }

    #[test]
    fn test_string_expression_is_not_a_directive() {
        let prefix = ProxyPrefix::default();
        let base = base();
        let body = "\"abc\".length;";
        let out = script_prologue(RewriteContext::new(&base, &prefix), body);
        assert!(out.starts_with("(function () {"));
        assert!(out.ends_with(body));
    }
}
