use anyhow::Result;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::output;

/// Execute list command
pub async fn execute(ctx: &AppContext, doc: String, format: OutputFormat) -> Result<()> {
    let key = ctx.doc_key(&doc)?;
    let entries = ctx.manager.list_images(&key).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output::images_json(&key, &entries))?);
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("{}", format!("No remote images in {}", key).dimmed());
            } else {
                println!("{}", output::images_table(&entries));
            }
        }
    }

    Ok(())
}
