//! Render command implementation for Vizier CLI.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use vizier_core::{ExecutionStatus, ParameterSet};
use vizier_export::{Exporter, ExporterConfig, JupyterNotebook, script_path};

use crate::colors;
use crate::metadata::UiMetadata;
use crate::progress::ProgressCallback;

/// What to render and where the results go.
pub struct RenderRequest {
    pub kind: String,
    pub arguments: String,
    pub input_path: Option<String>,
    pub output: Option<PathBuf>,
    pub ui_metadata: Option<PathBuf>,
    pub save_notebook: Option<PathBuf>,
    pub strict: bool,
}

/// Render one visualization.
///
/// Everything that can be checked without an interpreter is checked before
/// the kernel starts.
pub fn execute(
    request: &RenderRequest,
    types_dir: &Path,
    config: ExporterConfig,
    verbose: bool,
) -> anyhow::Result<()> {
    let script = script_path(types_dir, &request.kind)?;
    if !script.is_file() {
        anyhow::bail!(
            "Visualization type '{}' not found: {} does not exist",
            request.kind,
            script.display()
        );
    }

    let mut params = ParameterSet::from_json(&request.arguments)
        .context("--arguments must be a JSON object")?;
    if let Some(input_path) = &request.input_path {
        params.insert("input_path", input_path.as_str());
    }

    eprintln!(
        "\n{}Vizier{} - rendering {}{}{}",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        request.kind,
        colors::RESET
    );

    let start = Instant::now();
    let mut exporter = Exporter::new(config)?.with_callback(ProgressCallback::new(verbose));
    let rendered = exporter.render(&params, &script)?;
    exporter.shutdown();

    match &request.output {
        Some(path) => {
            fs::write(path, &rendered.html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}  ◆ HTML:{} {}",
                colors::CYAN,
                colors::RESET,
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.html.as_bytes())?;
            stdout.flush()?;
        }
    }

    if let Some(path) = &request.ui_metadata {
        let metadata = match &request.output {
            Some(output) => UiMetadata::for_file(output),
            None => UiMetadata::inline(&rendered.html),
        };
        metadata.write_to_file(path)?;
        tracing::info!("Wrote UI metadata to {}", path.display());
    }

    if let Some(path) = &request.save_notebook {
        JupyterNotebook::from_document(&rendered.document).write_to_file(path)?;
        eprintln!(
            "{}  ◆ Notebook:{} {}",
            colors::CYAN,
            colors::RESET,
            path.display()
        );
    }

    let elapsed = start.elapsed();
    match &rendered.status {
        ExecutionStatus::Succeeded => {
            eprintln!(
                "\n{}Rendered{} in {:.2}s",
                colors::GREEN,
                colors::RESET,
                elapsed.as_secs_f64()
            );
        }
        ExecutionStatus::Failed { cell, .. } => {
            eprintln!(
                "\n{}Rendered with errors{} (stopped at cell {}) in {:.2}s",
                colors::YELLOW,
                colors::RESET,
                cell,
                elapsed.as_secs_f64()
            );
        }
    }

    if request.strict {
        rendered.status.into_result()?;
    }

    Ok(())
}
