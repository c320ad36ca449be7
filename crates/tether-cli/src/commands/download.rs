use anyhow::Result;
use tether_core::{DownloadSummary, RefererMode};

use crate::cli::{OutputFormat, RefererArgs};
use crate::context::AppContext;
use crate::output;

/// How the flags translate into a referer mode
pub fn referer_mode(args: &RefererArgs) -> RefererMode {
    match (&args.referer, args.quick) {
        (Some(referer), _) => RefererMode::Explicit(referer.trim().to_string()),
        (None, true) => RefererMode::Quick,
        (None, false) => RefererMode::Interactive,
    }
}

/// Execute download command
pub async fn execute(
    ctx: &AppContext,
    doc: String,
    urls: Vec<String>,
    referer: RefererArgs,
    format: OutputFormat,
) -> Result<()> {
    let key = ctx.doc_key(&doc)?;
    let mode = referer_mode(&referer);

    let summary = if urls.is_empty() {
        ctx.manager.download_all(&key, mode).await?
    } else {
        ctx.manager.download_selected(&key, &urls, mode).await?
    };

    print_summary(&summary, format)
}

pub(crate) fn print_summary(summary: &DownloadSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output::download_json(summary))?);
        }
        OutputFormat::Table => {
            if !summary.outcomes.is_empty() {
                println!("{}", output::download_table(summary));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_modes() {
        let args = RefererArgs::default();
        assert_eq!(referer_mode(&args), RefererMode::Interactive);

        let args = RefererArgs {
            quick: true,
            referer: None,
        };
        assert_eq!(referer_mode(&args), RefererMode::Quick);

        let args = RefererArgs {
            quick: false,
            referer: Some(" https://blog.example.com/ ".to_string()),
        };
        assert_eq!(
            referer_mode(&args),
            RefererMode::Explicit("https://blog.example.com/".to_string())
        );
    }
}
