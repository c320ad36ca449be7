use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::output;

/// Execute delete-local command
pub async fn execute(ctx: &AppContext, doc: String, yes: bool, format: OutputFormat) -> Result<()> {
    let key = ctx.doc_key(&doc)?;

    if !yes && !confirm(&key).await? {
        println!("{}", "Aborted".yellow());
        return Ok(());
    }

    let summary = ctx.manager.delete_local_images(&key).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output::delete_json(&key, &summary))?);
        }
        OutputFormat::Table => {
            for path in &summary.kept_shared {
                println!("  {} {} (used by another note)", "kept".yellow(), path);
            }
            for path in &summary.kept_referenced {
                println!("  {} {} (still embedded in the note)", "kept".yellow(), path);
            }
            for path in &summary.failed {
                println!("  {} {}", "not deleted".red(), path);
            }
        }
    }
    Ok(())
}

async fn confirm(key: &str) -> Result<bool> {
    let prompt = format!("Revert {} to remote URLs and delete its downloaded images?", key);
    let answer = tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
    })
    .await??;
    Ok(answer)
}
