use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Input};
use tether_core::RefererPrompt;
use tracing::{debug, warn};

/// Asks for a referer on the terminal.
///
/// An empty answer proceeds without a header. A closed or non-interactive
/// terminal cancels the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompt;

impl DialoguerPrompt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RefererPrompt for DialoguerPrompt {
    async fn request_referer(&self, doc_key: &str) -> Option<String> {
        let prompt = format!("Referer for images in {} (empty for none)", doc_key);
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await;

        match answer {
            Ok(Ok(referer)) => Some(referer.trim().to_string()),
            Ok(Err(e)) => {
                debug!("Referer prompt closed: {}", e);
                None
            }
            Err(e) => {
                warn!("Referer prompt task failed: {}", e);
                None
            }
        }
    }
}
