use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use log::{debug, info};
use std::path::Path;
use std::process::ExitCode;

mod cli;

use cli::commands::{Services, login_command, track_command, wait_command};
use cli::{Cli, Commands};
use compute_cli::config::Config;

fn init_logger(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("compute_cli=info"));
    if let Some(path) = log_file {
        // Truncate on each run
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logger(cli.log_file.as_deref())?;
    info!("Starting compute-cli");

    let mut config = Config::load(cli.config.as_deref())?;
    debug!("Loaded config: {:?}", config);

    if config.needs_password() && std::io::stdin().is_terminal() {
        let username = config.auth.username.clone().unwrap_or_default();
        config.auth.password = Some(cli::ui::prompt_password(&username)?);
    }

    let services = Services::from_config(&config)?;

    match cli.command {
        Commands::Login(args) => login_command(args, &services).await,
        Commands::Track(args) => track_command(args, &services).await,
        Commands::Wait(args) => wait_command(args, &services).await,
    }
}
