use clap::Parser;
use smart_wallet_scripts::{cli::Cli, errors::ScriptError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    dotenvy::dotenv().ok();
    let Cli { network, command } = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    command.run(network).await
}
