use colored::Colorize;
use tether_core::{DownloadStatus, Notice, Notifier};

/// Prints notices to stderr so command output on stdout stays machine readable
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl TerminalNotifier {
    pub fn new() -> Self {
        Self
    }
}

/// One line of user-facing text for a notice
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Processing { doc } => format!("{} {}", "Processing".cyan().bold(), doc),
        Notice::Downloaded { doc, count } => format!(
            "{} Downloaded {} images for {}",
            "Success:".green().bold(),
            count,
            doc
        ),
        Notice::DownloadFailed { url, reason } => {
            format!("  {} {} ({})", "✗".red(), url, reason.dimmed())
        }
        Notice::RefererLikelyWrong { url } => format!(
            "{} {} did not return an image, check the referer",
            "Hint:".yellow().bold(),
            url
        ),
        Notice::Reverted { doc, count } => format!(
            "{} Reverted {} images to remote URLs in {}",
            "Success:".green().bold(),
            count,
            doc
        ),
        Notice::NothingToRevert { doc } => format!(
            "{} No downloaded images are referenced in {}",
            "Note:".yellow().bold(),
            doc
        ),
        Notice::LocalImagesDeleted {
            doc,
            replaced,
            deleted,
        } => format!(
            "{} Replaced {} image references and deleted {} local files for {}",
            "Success:".green().bold(),
            replaced,
            deleted,
            doc
        ),
        Notice::AssociatedImagesDeleted { doc, deleted } => format!(
            "{} Deleted {} images associated with {}",
            "Success:".green().bold(),
            deleted,
            doc
        ),
        Notice::Pruned { documents, assets } => format!(
            "{} Removed {} missing notes and {} missing images from the mappings",
            "Pruned:".green().bold(),
            documents,
            assets
        ),
        Notice::Error(message) => format!("{} {}", "Error:".red().bold(), message),
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}", render_notice(&notice));
    }

    fn status_changed(&self, _doc_key: &str, url: &str, status: DownloadStatus) {
        // failures arrive as notices with their reason
        if status == DownloadStatus::Success {
            eprintln!("  {} {}", "✓".green(), url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_mention_their_subject() {
        colored::control::set_override(false);

        let text = render_notice(&Notice::Downloaded {
            doc: "notes/a.md".to_string(),
            count: 3,
        });
        assert_eq!(text, "Success: Downloaded 3 images for notes/a.md");

        let text = render_notice(&Notice::RefererLikelyWrong {
            url: "https://x.com/a.png".to_string(),
        });
        assert!(text.starts_with("Hint:"));
        assert!(text.contains("https://x.com/a.png"));
    }
}
