use anyhow::Result;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::context::AppContext;

/// Execute revert command
pub async fn execute(ctx: &AppContext, doc: String, format: OutputFormat) -> Result<()> {
    let key = ctx.doc_key(&doc)?;
    let summary = ctx.manager.revert_to_remote(&key).await?;

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "document": key, "replaced": summary.replaced }))?
        );
    }
    Ok(())
}
