//! SCL Language Server
//!
//! A Language Server Protocol implementation for the SCL step language.
//!
//! # Usage
//!
//! ```bash
//! scl-lsp --stdio
//! scl-lsp --stdio --config ./scl.toml
//! scl-lsp --print-config
//! ```
//!
//! The server communicates over stdin/stdout using the LSP protocol. Logs go
//! to stderr and follow `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use scl_core::{core_store, SclConfig};
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod backend;
mod convert;


use backend::SclBackend;

#[derive(Debug, Parser)]
#[command(name = "scl-lsp", version, about = "SCL language server")]
struct Args {
    /// Use stdin/stdout for communication (required to serve)
    #[arg(long)]
    stdio: bool,

    /// Config file; defaults to scl.toml in the working directory
    #[arg(long, env = "SCL_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = SclConfig::builder()
        .config_path(args.config.clone())
        .build()
        .context("failed to load configuration")?;

    if args.print_config {
        let text = config.to_toml().context("failed to render configuration")?;
        print!("{}", text);
        return Ok(());
    }

    if !args.stdio {
        Args::command()
            .print_help()
            .context("failed to print usage")?;
        std::process::exit(1);
    }

    let store = Arc::new(core_store());
    info!(steps = store.factories().count(), "starting language server");

    // Create the LSP service
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| SclBackend::new(client, store, config));

    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
