//! DCN training driver binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deepctr_cli::{run, Cli};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("deepctr=info".parse()?))
        .init();

    let cli = Cli::parse();
    run(cli)
}
