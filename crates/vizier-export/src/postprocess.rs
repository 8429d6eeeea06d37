//! Text fix-ups applied around rendering.

use std::sync::LazyLock;

use regex::Regex;

/// Embedded visualizations write into iframes through the parent document,
/// which sandboxed viewers block. Rewriting to `srcdoc=` keeps them working.
const IFRAME_WRITE: &str = "contentWindow.document.write";
const IFRAME_SRCDOC: &str = "srcdoc=";

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07").expect("valid ANSI pattern")
});

/// Apply the post-render substitutions to exported HTML.
pub fn postprocess_html(html: &str) -> String {
    html.replace(IFRAME_WRITE, IFRAME_SRCDOC)
}

/// Remove terminal color and cursor sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
