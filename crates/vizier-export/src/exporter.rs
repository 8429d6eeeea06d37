//! The exporter: one kernel session plus everything needed to turn a
//! visualization request into HTML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vizier_core::{
    CodeCell, Document, Error, ExecutePreprocessor, ExecutionCallback, ExecutionStatus,
    KernelConfig, KernelSession, ParameterQuoting, ParameterSet,
};

use crate::error::ExportResult;
use crate::html::HtmlExporter;
use crate::templates::{TemplateKind, TemplateSet};

/// Default per-cell timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Per-cell execution timeout.
    pub timeout: Duration,
    /// Template to render with.
    pub template: TemplateKind,
    /// Directory with `basic.html`/`full.html` overriding the built-in templates.
    pub templates_dir: Option<PathBuf>,
    /// Directory cells execute in. Defaults to the current directory.
    pub working_dir: Option<PathBuf>,
    /// Interpreter settings.
    pub kernel: KernelConfig,
    /// Run an empty cell at startup so the first request is not slow.
    pub warm_up: bool,
    /// Clear interpreter state before each document.
    pub isolate: bool,
    /// How parameter values are written into the generated cell.
    pub quoting: ParameterQuoting,
    /// Keep executing after a cell raises.
    pub allow_errors: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            template: TemplateKind::Full,
            templates_dir: None,
            working_dir: None,
            kernel: KernelConfig::default(),
            warm_up: true,
            isolate: false,
            quoting: ParameterQuoting::Verbatim,
            allow_errors: false,
        }
    }
}

/// Result of rendering one visualization.
#[derive(Debug)]
pub struct Rendered {
    /// Exported HTML.
    pub html: String,
    /// How execution went.
    pub status: ExecutionStatus,
    /// The executed document, for saving alongside the HTML.
    pub document: Document,
}

/// Owns a kernel session and renders documents through it.
///
/// The session is started once in [`Exporter::new`] and reused for every
/// document until [`Exporter::shutdown`] or drop.
pub struct Exporter {
    config: ExporterConfig,
    kernel: KernelSession,
    preprocessor: ExecutePreprocessor,
    html: HtmlExporter,
}

impl Exporter {
    /// Load templates and start the kernel.
    ///
    /// Templates are loaded first so a bad template directory fails without
    /// starting an interpreter.
    pub fn new(config: ExporterConfig) -> ExportResult<Self> {
        let templates = match &config.templates_dir {
            Some(dir) => TemplateSet::from_dir(dir)?,
            None => TemplateSet::builtin()?,
        };
        let html = HtmlExporter::new(templates, config.template);

        let mut kernel = KernelSession::start(config.kernel.clone())?;
        tracing::info!(
            "Started Python {} kernel (pid {})",
            kernel.version().unwrap_or("?"),
            kernel.pid().unwrap_or_default()
        );
        if config.warm_up {
            kernel.warm_up()?;
        }

        let preprocessor =
            ExecutePreprocessor::new(config.timeout).allow_errors(config.allow_errors);

        Ok(Self {
            config,
            kernel,
            preprocessor,
            html,
        })
    }

    /// Report per-cell progress to `callback`.
    pub fn with_callback(mut self, callback: impl ExecutionCallback + 'static) -> Self {
        self.preprocessor = self.preprocessor.with_callback(callback);
        self
    }

    /// Exporter configuration.
    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Process ID of the kernel, if running.
    pub fn kernel_pid(&self) -> Option<u32> {
        self.kernel.pid()
    }

    /// Assemble the standard two-cell document: the parameter assignments,
    /// then the script. `params` is also bound as `variables`.
    ///
    /// Fails with `NotFound` before anything runs if the script is missing.
    pub fn build_document(&self, params: &ParameterSet, script: &Path) -> ExportResult<Document> {
        let script_cell = CodeCell::from_file(script)?;

        let mut doc = match &self.config.working_dir {
            Some(dir) => Document::with_working_dir(dir),
            None => Document::new(),
        };
        doc.bind_variables(params.clone())
            .append(CodeCell::from_parameters(params, self.config.quoting))
            .append(script_cell);
        Ok(doc)
    }

    /// Execute `doc` on the shared session.
    pub fn execute(&mut self, doc: &mut Document) -> ExportResult<ExecutionStatus> {
        self.ensure_kernel()?;
        if self.config.isolate {
            self.kernel.reset()?;
        }

        let status = self.preprocessor.preprocess(doc, &mut self.kernel)?;
        match &status {
            ExecutionStatus::Succeeded => tracing::debug!("Executed {} cells", doc.len()),
            ExecutionStatus::Failed { cell, failure } => {
                tracing::info!("Execution stopped at cell {}: {:?}", cell, failure)
            }
        }
        Ok(status)
    }

    /// Execute `doc` and export it to HTML.
    pub fn generate_html(&mut self, doc: &mut Document) -> ExportResult<String> {
        self.execute(doc)?;
        self.html.export(doc)
    }

    /// Build, execute and export a visualization script with `params`.
    pub fn render(&mut self, params: &ParameterSet, script: &Path) -> ExportResult<Rendered> {
        let mut document = self.build_document(params, script)?;
        let status = self.execute(&mut document)?;
        let html = self.html.export(&document)?;
        Ok(Rendered {
            html,
            status,
            document,
        })
    }

    /// Stop the kernel. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.kernel.shutdown();
    }

    /// Restart the kernel if it died since the last request.
    fn ensure_kernel(&mut self) -> ExportResult<()> {
        if !self.kernel.is_alive() {
            tracing::warn!("Kernel is not running, restarting");
            self.kernel.restart()?;
            if self.config.warm_up {
                self.kernel.warm_up()?;
            }
        }
        Ok(())
    }
}

/// Path of the script for visualization type `name` under `types_dir`.
///
/// Names are bare file stems; anything that could leave `types_dir` is
/// rejected.
pub fn script_path(types_dir: &Path, name: &str) -> ExportResult<PathBuf> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..");
    if invalid {
        return Err(Error::InvalidParameters(format!("invalid visualization type: {:?}", name)).into());
    }
    Ok(types_dir.join(format!("{}.py", name)))
}
