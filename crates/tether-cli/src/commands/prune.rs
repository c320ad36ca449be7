use anyhow::Result;

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::output;

/// Execute prune command
pub async fn execute(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let report = ctx.manager.prune().await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&output::prune_json(&report))?);
    }
    Ok(())
}
