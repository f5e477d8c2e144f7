use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use client::{apply_overrides, load_config, run, Args, Config};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut cfg, &args);
    info!(?cfg, "Client config loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run(args, cfg))
}
