use anyhow::Result;

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::output;

/// Execute forget command
///
/// The note is usually gone already, so the key is used as given.
pub async fn execute(ctx: &AppContext, doc: String, format: OutputFormat) -> Result<()> {
    let key = ctx.doc_key(&doc)?;
    let summary = ctx.manager.on_document_deleted(&key).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output::delete_json(&key, &summary))?);
        }
        OutputFormat::Table => {
            println!("Forgot {}", key);
        }
    }
    Ok(())
}
