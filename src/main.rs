use std::path::PathBuf;

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use pgsql_lsp::Backend;

#[derive(Parser)]
#[command(name = "pgsql-lsp")]
#[command(version, about = "Language server for PostgreSQL functions and procedures")]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. `info`, `pgsql_lsp=debug`)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Configuration file, overriding the workspace and user config files
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(|client| Backend::with_config_path(client, cli.config.clone()));
    Server::new(stdin, stdout, socket).serve(service).await;
}
