use clap::Parser;
use mononoke::config::Config;
use mononoke::service::accounts::MemoryAccountStore;
use mononoke::service::engine::Engine;
use mononoke::utils::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};

#[derive(Debug, Parser)]
#[command(name = "mononoke", version, about = "Login and game-server handoff service")]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long)]
    log_level: Option<Level>,

    /// Prints an example configuration and exits
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.print_config {
        print!("{}", Config::example_config());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mononoke: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("mononoke: {e}");
        return ExitCode::FAILURE;
    }

    let store = Arc::new(MemoryAccountStore::from_config(&config.accounts));
    let engine = match Engine::bind(&config, store).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to start listeners");
            return ExitCode::FAILURE;
        }
    };

    match engine.run().await {
        Ok(reason) => {
            info!(%reason, "Stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Engine failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> mononoke::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate_strict()?;
    Ok(config)
}
