use anyhow::{Context, Result};
use clap::Parser;
use tether_config::TetherConfig;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use tether_cli::{
    cli::{Cli, Commands},
    commands,
    context::AppContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| TetherConfig::default_path().filter(|p| p.exists()));
    let mut config = TetherConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(vault) = &cli.vault {
        config = config.with_vault_path(vault.clone());
    }

    // --log-level wins over -v, which wins over the config file
    let level = match cli.log_level {
        Some(level) => level.into(),
        None if cli.verbose => LevelFilter::DEBUG,
        None => config
            .logging
            .level
            .as_deref()
            .and_then(|l| l.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::WARN),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Using config {:?}", config_path);
    let ctx = AppContext::open(config, config_path).await?;

    match cli.command {
        Commands::List { doc } => commands::list::execute(&ctx, doc, cli.format).await?,
        Commands::Download { doc, urls, referer } => {
            commands::download::execute(&ctx, doc, urls, referer, cli.format).await?
        }
        Commands::Retry { doc, referer } => commands::retry::execute(&ctx, doc, referer, cli.format).await?,
        Commands::Revert { doc } => commands::revert::execute(&ctx, doc, cli.format).await?,
        Commands::DeleteLocal { doc, yes } => commands::delete::execute(&ctx, doc, yes, cli.format).await?,
        Commands::Forget { doc } => commands::forget::execute(&ctx, doc, cli.format).await?,
        Commands::Prune => commands::prune::execute(&ctx, cli.format).await?,
        Commands::Config(cmd) => commands::config::execute(&ctx, cmd, cli.format).await?,
        Commands::Watch => commands::watch::execute(&ctx).await?,
    }

    Ok(())
}
