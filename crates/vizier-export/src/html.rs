//! HTML export of executed documents.

use serde::Serialize;
use vizier_core::{CellOutput, CodeCell, Document, Error, OutputData};

use crate::error::ExportResult;
use crate::postprocess::{postprocess_html, strip_ansi};
use crate::templates::{TemplateKind, TemplateSet};

const PAGE_TITLE: &str = "Visualization";

/// Renders executed documents to HTML.
#[derive(Debug)]
pub struct HtmlExporter {
    templates: TemplateSet,
    kind: TemplateKind,
}

impl HtmlExporter {
    /// Create an exporter rendering with `kind` from `templates`.
    pub fn new(templates: TemplateSet, kind: TemplateKind) -> Self {
        Self { templates, kind }
    }

    /// Create an exporter using the built-in templates.
    pub fn builtin(kind: TemplateKind) -> ExportResult<Self> {
        Ok(Self::new(TemplateSet::builtin()?, kind))
    }

    /// Template kind in use.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Render every cell of an executed document, inputs and outputs, in
    /// document order.
    ///
    /// The same document always produces the same string.
    pub fn export(&self, doc: &Document) -> ExportResult<String> {
        if !doc.is_executed() {
            return Err(Error::NotExecuted.into());
        }

        let context = PageContext {
            title: PAGE_TITLE,
            cells: doc.cells().iter().map(CellView::from_cell).collect(),
        };
        let html = self.templates.render(self.kind, &context)?;
        Ok(postprocess_html(&html))
    }
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'a str,
    cells: Vec<CellView<'a>>,
}

#[derive(Serialize)]
struct CellView<'a> {
    prompt: String,
    source: &'a str,
    outputs: Vec<OutputView<'a>>,
}

impl<'a> CellView<'a> {
    fn from_cell(cell: &'a CodeCell) -> Self {
        let prompt = cell
            .execution_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| " ".to_string());
        Self {
            prompt,
            source: &cell.source,
            outputs: cell.outputs.iter().filter_map(OutputView::from_output).collect(),
        }
    }
}

/// One renderable output, already reduced to its preferred representation.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutputView<'a> {
    Stream { name: &'a str, text: &'a str },
    Javascript { code: &'a str },
    Html { html: &'a str },
    Svg { svg: &'a str },
    Image { format: &'static str, data: String },
    Markdown { text: &'a str },
    Json { json: String },
    Text { text: &'a str },
    Error { traceback: String },
}

impl<'a> OutputView<'a> {
    fn from_output(output: &'a CellOutput) -> Option<Self> {
        match output {
            CellOutput::Stream { name, text } => Some(Self::Stream { name, text }),
            CellOutput::ExecuteResult { data, .. } | CellOutput::DisplayData { data, .. } => {
                Self::from_data(data)
            }
            CellOutput::Error {
                ename,
                evalue,
                traceback,
            } => {
                let text = if traceback.is_empty() {
                    format!("{}: {}", ename, evalue)
                } else {
                    traceback.join("\n")
                };
                Some(Self::Error {
                    traceback: strip_ansi(&text),
                })
            }
        }
    }

    /// Pick the richest representation a browser can show.
    fn from_data(data: &'a OutputData) -> Option<Self> {
        if let Some(code) = &data.application_javascript {
            return Some(Self::Javascript { code });
        }
        if let Some(html) = &data.text_html {
            return Some(Self::Html { html });
        }
        if let Some(svg) = &data.image_svg {
            return Some(Self::Svg { svg });
        }
        if let Some(png) = &data.image_png {
            return Some(Self::Image {
                format: "png",
                data: clean_base64(png),
            });
        }
        if let Some(jpeg) = &data.image_jpeg {
            return Some(Self::Image {
                format: "jpeg",
                data: clean_base64(jpeg),
            });
        }
        if let Some(text) = &data.text_markdown {
            return Some(Self::Markdown { text });
        }
        if let Some(json) = &data.application_json {
            let json = serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
            return Some(Self::Json { json });
        }
        data.text_plain.as_deref().map(|text| Self::Text { text })
    }
}

/// Keep only base64 alphabet characters so the payload can be written into
/// an attribute unescaped. Notebook files may wrap payloads across lines.
fn clean_base64(data: &str) -> String {
    data.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect()
}
