use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::cli::{ConfigCommands, OutputFormat};
use crate::context::AppContext;

/// Execute config subcommand
pub async fn execute(ctx: &AppContext, cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(ctx, format),
        ConfigCommands::AssetsDir { dir } => {
            ctx.manager.set_custom_assets_dir(&dir).await?;
            let dir = ctx.manager.settings().custom_assets_dir;
            if dir.is_empty() {
                println!("{} Downloads go to the default attachment location", "Success:".green().bold());
            } else {
                println!("{} Downloads go to {}", "Success:".green().bold(), dir.yellow());
            }
            Ok(())
        }
        ConfigCommands::AutoDelete { state } => {
            let enabled: bool = state.into();
            ctx.manager.set_auto_delete_images(enabled).await?;
            println!(
                "{} Auto-delete of images with their note is {}",
                "Success:".green().bold(),
                if enabled { "on".green() } else { "off".red() }
            );
            Ok(())
        }
    }
}

/// Show the effective configuration and the settings stored with the mappings
fn show(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let settings = ctx.manager.settings();
    let config_file = ctx
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    match format {
        OutputFormat::Json => {
            let value = json!({
                "configFile": config_file,
                "stateFile": ctx.state_file.display().to_string(),
                "config": serde_json::to_value(&ctx.config)?,
                "settings": {
                    "customAssetsDir": settings.custom_assets_dir,
                    "autoDeleteImages": settings.auto_delete_images,
                },
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            println!("{} {}", "Config file:".bold(), config_file);
            println!("{} {}", "State file:".bold(), ctx.state_file.display());
            println!();
            println!("{}", toml_display(&ctx.config)?);
            println!("{}", "[settings]".bold());
            println!("custom_assets_dir = {:?}", settings.custom_assets_dir);
            println!("auto_delete_images = {}", settings.auto_delete_images);
        }
    }
    Ok(())
}

fn toml_display(config: &tether_config::TetherConfig) -> Result<String> {
    Ok(config.to_toml_string()?)
}
