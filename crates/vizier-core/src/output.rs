//! Captured cell outputs.
//!
//! Shapes follow the Jupyter nbformat v4 output types so that the kernel
//! driver can emit them directly and executed documents can be written out
//! as `.ipynb` without conversion.

use serde::{Deserialize, Serialize};

/// A single output produced while executing a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type")]
pub enum CellOutput {
    /// Standard output/error
    #[serde(rename = "stream")]
    Stream { name: String, text: String },

    /// Value of the cell's trailing expression
    #[serde(rename = "execute_result")]
    ExecuteResult {
        execution_count: Option<u32>,
        data: OutputData,
        #[serde(default)]
        metadata: serde_json::Value,
    },

    /// Rich display data
    #[serde(rename = "display_data")]
    DisplayData {
        data: OutputData,
        #[serde(default)]
        metadata: serde_json::Value,
    },

    /// Error output
    #[serde(rename = "error")]
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

impl CellOutput {
    /// Build a stdout stream output.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::Stream {
            name: "stdout".to_string(),
            text: text.into(),
        }
    }

    /// Build an error output.
    pub fn error(ename: impl Into<String>, evalue: impl Into<String>, traceback: Vec<String>) -> Self {
        Self::Error {
            ename: ename.into(),
            evalue: evalue.into(),
            traceback,
        }
    }

    /// Build a display-data output.
    pub fn display(data: OutputData) -> Self {
        Self::DisplayData {
            data,
            metadata: serde_json::json!({}),
        }
    }

    /// Whether this output records an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Output data with multiple representations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    /// Plain text
    #[serde(rename = "text/plain", default, skip_serializing_if = "Option::is_none")]
    pub text_plain: Option<String>,

    /// HTML
    #[serde(rename = "text/html", default, skip_serializing_if = "Option::is_none")]
    pub text_html: Option<String>,

    /// Markdown
    #[serde(rename = "text/markdown", default, skip_serializing_if = "Option::is_none")]
    pub text_markdown: Option<String>,

    /// PNG image (base64)
    #[serde(rename = "image/png", default, skip_serializing_if = "Option::is_none")]
    pub image_png: Option<String>,

    /// JPEG image (base64)
    #[serde(rename = "image/jpeg", default, skip_serializing_if = "Option::is_none")]
    pub image_jpeg: Option<String>,

    /// SVG image
    #[serde(rename = "image/svg+xml", default, skip_serializing_if = "Option::is_none")]
    pub image_svg: Option<String>,

    /// JavaScript
    #[serde(rename = "application/javascript", default, skip_serializing_if = "Option::is_none")]
    pub application_javascript: Option<String>,

    /// JSON data
    #[serde(rename = "application/json", default, skip_serializing_if = "Option::is_none")]
    pub application_json: Option<serde_json::Value>,
}

impl OutputData {
    /// Plain-text only data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_plain: Some(text.into()),
            ..Default::default()
        }
    }

    /// HTML data with a plain-text fallback.
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            text_html: Some(html.into()),
            text_plain: Some("[HTML Output]".to_string()),
            ..Default::default()
        }
    }
}
