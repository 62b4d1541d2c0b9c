use clap::Parser;
use tracing_subscriber::EnvFilter;

use consult_admin::cli::{self, Cli};

const DEFAULT_FILTER: &str = "consult_admin=info";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    cli::run(Cli::parse()).await
}
