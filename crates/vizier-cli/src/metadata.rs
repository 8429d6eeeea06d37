//! Pipeline UI metadata describing a rendered visualization.
//!
//! Pipeline frontends read this file to find the `web-app` output a step
//! produced.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UiMetadata {
    pub outputs: Vec<UiOutput>,
}

#[derive(Debug, Serialize)]
pub struct UiOutput {
    /// `local` when `source` is a file path, `inline` when it is the HTML.
    pub storage: &'static str,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl UiMetadata {
    /// Metadata for HTML written to `path`.
    pub fn for_file(path: &Path) -> Self {
        Self::web_app("local", path.display().to_string())
    }

    /// Metadata embedding the HTML itself.
    pub fn inline(html: &str) -> Self {
        Self::web_app("inline", html.to_string())
    }

    fn web_app(storage: &'static str, source: String) -> Self {
        Self {
            outputs: vec![UiOutput {
                storage,
                source,
                kind: "web-app",
            }],
        }
    }

    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write UI metadata to {}", path.display()))?;
        Ok(())
    }
}
