use anyhow::Result;
use clap::Parser;
use docqa_cli::commands::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    commands::run(Cli::parse()).await
}
