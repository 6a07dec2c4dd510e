#![recursion_limit = "256"]

mod application;
mod cli;
mod data;
mod domain;
mod infra;
mod ml;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("mnist_tracker=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    Cli::parse().run()
}
