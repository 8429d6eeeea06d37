//! Vizier CLI - render Python visualization scripts to HTML.

mod colors;
mod metadata;
mod progress;
mod render;
mod serve;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use vizier_core::{KernelConfig, ParameterQuoting};
use vizier_export::{ExporterConfig, TemplateKind};

#[derive(Parser)]
#[command(name = "vizier")]
#[command(about = "Render Python visualization scripts to HTML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one visualization
    Render {
        /// Type of visualization (script name without .py)
        #[arg(long = "type", default_value = "roc_curve")]
        kind: String,

        /// JSON object of arguments bound before the script runs
        #[arg(long, default_value = "{}")]
        arguments: String,

        /// Input path, made available to the script as `input_path`
        #[arg(long)]
        input_path: Option<String>,

        /// Write HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write pipeline UI metadata describing the output
        #[arg(long)]
        ui_metadata: Option<PathBuf>,

        /// Also save the executed document as .ipynb
        #[arg(long)]
        save_notebook: Option<PathBuf>,

        /// Exit with an error if any cell fails or times out
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        exporter: ExporterArgs,
    },

    /// Serve visualizations over HTTP
    Serve {
        /// Host address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8888")]
        port: u16,

        #[command(flatten)]
        exporter: ExporterArgs,
    },
}

/// Options shared by every command that runs a kernel.
#[derive(Args)]
struct ExporterArgs {
    /// Directory holding <type>.py visualization scripts
    #[arg(long, env = "VIZIER_TYPES_DIR", default_value = "visualizations")]
    types_dir: PathBuf,

    /// Output template: basic or full
    #[arg(long, default_value = "full")]
    template: TemplateKind,

    /// Directory with basic.html and full.html replacing the built-in templates
    #[arg(long, env = "VIZIER_TEMPLATES_DIR")]
    templates_dir: Option<PathBuf>,

    /// Per-cell timeout in seconds
    #[arg(long, default_value = "100")]
    timeout: u64,

    /// Python interpreter to run cells with
    #[arg(long, env = "VIZIER_PYTHON")]
    python: Option<PathBuf>,

    /// Keep running later cells after one raises
    #[arg(long)]
    allow_errors: bool,

    /// Clear interpreter state before each document
    #[arg(long)]
    isolate: bool,

    /// Write parameters as escaped string literals
    #[arg(long)]
    escape_parameters: bool,

    /// Skip the warm-up execution at startup
    #[arg(long)]
    no_warm_up: bool,
}

impl ExporterArgs {
    fn to_config(&self) -> ExporterConfig {
        let quoting = if self.escape_parameters {
            ParameterQuoting::Escaped
        } else {
            ParameterQuoting::Verbatim
        };

        ExporterConfig {
            timeout: Duration::from_secs(self.timeout),
            template: self.template,
            templates_dir: self.templates_dir.clone(),
            working_dir: None,
            kernel: KernelConfig {
                python: self.python.clone(),
                ..Default::default()
            },
            warm_up: !self.no_warm_up,
            isolate: self.isolate,
            quoting,
            allow_errors: self.allow_errors,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Render {
            kind,
            arguments,
            input_path,
            output,
            ui_metadata,
            save_notebook,
            strict,
            exporter,
        } => {
            let request = render::RenderRequest {
                kind,
                arguments,
                input_path,
                output,
                ui_metadata,
                save_notebook,
                strict,
            };
            let types_dir = exporter.types_dir.clone();
            let config = exporter.to_config();
            let verbose = cli.verbose;
            // Kernel IPC blocks, keep it off the async workers
            tokio::task::spawn_blocking(move || {
                render::execute(&request, &types_dir, config, verbose)
            })
            .await??;
        }

        Commands::Serve {
            host,
            port,
            exporter,
        } => {
            serve::execute(&host, port, &exporter.types_dir, exporter.to_config()).await?;
        }
    }

    Ok(())
}
