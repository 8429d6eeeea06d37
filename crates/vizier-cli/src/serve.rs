//! Serve command implementation for Vizier CLI.

use std::path::Path;

use vizier_export::{Exporter, ExporterConfig};
use vizier_server::ServerConfig;

use crate::colors;

/// Start the visualization server.
pub async fn execute(
    host: &str,
    port: u16,
    types_dir: &Path,
    config: ExporterConfig,
) -> anyhow::Result<()> {
    if !types_dir.is_dir() {
        anyhow::bail!("Visualization types directory not found: {}", types_dir.display());
    }

    println!(
        "\n{}Vizier Server{} - Visualization Renderer",
        colors::BOLD,
        colors::RESET
    );
    println!("{}", "─".repeat(50));
    println!(
        "{}  ◆ Types:{} {}",
        colors::CYAN,
        colors::RESET,
        types_dir.display()
    );
    println!(
        "{}  ◆ Template:{} {} {}(timeout {}s){}",
        colors::CYAN,
        colors::RESET,
        config.template,
        colors::DIM,
        config.timeout.as_secs(),
        colors::RESET
    );

    let exporter = tokio::task::spawn_blocking(move || Exporter::new(config)).await??;

    let server_config = ServerConfig {
        host: host.to_string(),
        port,
        types_dir: types_dir.to_path_buf(),
    };

    println!(
        "{}  ◆ Server:{} http://{}:{}",
        colors::CYAN,
        colors::RESET,
        server_config.host,
        server_config.port
    );
    println!("{}", "─".repeat(50));
    println!("{}Press Ctrl+C to stop{}", colors::GREEN, colors::RESET);
    println!();

    vizier_server::serve(exporter, server_config).await?;

    Ok(())
}
