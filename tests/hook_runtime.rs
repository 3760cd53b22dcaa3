//! Runs the injected network hook under Node and checks that URLs built at
//! runtime land on the same proxy address as statically rewritten ones.
//!
//! Skipped when `node` is not on PATH.

use std::io::Write;
use std::process::{Command, Stdio};

use rewrite_proxy::rewrite::hooks::{hook_script, INSTALL_MARKER};
use rewrite_proxy::rewrite::RewriteContext;
use rewrite_proxy::ProxyPrefix;
use serde_json::Value;
use url::Url;

const PAGE_ORIGIN: &str = "http://proxy.test:8080";

const INPUTS: [&str; 5] = [
    "/x?a=1&b=(2)",
    "rel/y.js",
    "//cdn.example/z",
    "https://o.example/a b!*'",
    "café",
];

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Stub browser globals, install the hook twice, then call every wrapped
/// primitive once per input and report what reached the originals.
fn harness(hook: &str) -> String {
    let inputs = serde_json::to_string(&INPUTS).unwrap();
    let marker = serde_json::to_string(INSTALL_MARKER).unwrap();
    let origin = serde_json::to_string(PAGE_ORIGIN).unwrap();
    format!(
        r#"
var calls = {{ fetch: [], xhr: [], open: [] }};
globalThis.location = {{ origin: {origin} }};
globalThis.document = {{}};
globalThis.fetch = function (input) {{ calls.fetch.push(input); }};
globalThis.XMLHttpRequest = function () {{}};
globalThis.XMLHttpRequest.prototype.open = function (method, url) {{ calls.xhr.push(url); }};
globalThis.open = function (url) {{ calls.open.push(url); }};
{hook}
var installed = {{ fetch: globalThis.fetch, xhr: XMLHttpRequest.prototype.open, open: globalThis.open }};
{hook}
{inputs}.forEach(function (input) {{
  globalThis.fetch(input);
  new XMLHttpRequest().open('GET', input);
  globalThis.open(input);
}});
process.stdout.write(JSON.stringify({{
  calls: calls,
  rewrapped: globalThis.fetch !== installed.fetch
    || XMLHttpRequest.prototype.open !== installed.xhr
    || globalThis.open !== installed.open,
  enumerable: Object.keys(globalThis).indexOf({marker}) !== -1
}}));
"#
    )
}

fn run_node(source: &str) -> Value {
    let mut child = Command::new("node")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(source.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "node failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_hook_matches_static_rewriting() {
    if !node_available() {
        eprintln!("node not found; skipping hook runtime check");
        return;
    }

    let prefix = ProxyPrefix::default();
    let base = Url::parse("https://site.example/dir/page.html").unwrap();
    let ctx = RewriteContext::new(&base, &prefix);

    let report = run_node(&harness(&hook_script(ctx)));

    let expected: Vec<Value> = INPUTS
        .iter()
        .map(|input| {
            let address = ctx.proxy_reference(input).unwrap();
            Value::String(format!("{PAGE_ORIGIN}{address}"))
        })
        .collect();

    for primitive in ["fetch", "xhr", "open"] {
        assert_eq!(
            report["calls"][primitive].as_array().unwrap(),
            &expected,
            "{primitive} routed differently from static rewriting"
        );
    }
}

#[test]
fn test_hook_installs_once() {
    if !node_available() {
        eprintln!("node not found; skipping hook runtime check");
        return;
    }

    let prefix = ProxyPrefix::default();
    let base = Url::parse("https://site.example/").unwrap();
    let report = run_node(&harness(&hook_script(RewriteContext::new(&base, &prefix))));

    assert_eq!(report["rewrapped"], false);
    assert_eq!(report["enumerable"], false);
    assert_eq!(report["calls"]["fetch"].as_array().unwrap().len(), INPUTS.len());
}

#[test]
fn test_hook_uses_public_origin_when_configured() {
    if !node_available() {
        eprintln!("node not found; skipping hook runtime check");
        return;
    }

    let prefix = ProxyPrefix::default().with_public_origin("https://proxy.example");
    let base = Url::parse("https://site.example/dir/page.html").unwrap();
    let ctx = RewriteContext::new(&base, &prefix);

    let report = run_node(&harness(&hook_script(ctx)));
    let first = report["calls"]["fetch"][0].as_str().unwrap();
    assert_eq!(Some(first.to_string()), ctx.proxy_reference(INPUTS[0]));
}
