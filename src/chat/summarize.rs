use itertools::Itertools;
use tracing::debug;

use crate::chat::prompts;
use crate::config::Config;
use crate::database::VectorStore;
use crate::gemini::{ChatMessage, GeminiClient};
use crate::{PdfChatError, Result};

/// Upper bound on the combined text handed to the summarizer, in characters.
/// Leaves headroom under the model's context window for the instructions.
const MAX_SUMMARY_INPUT_CHARS: usize = 400_000;

/// Summarizes everything currently in the store as one document.
pub struct Summarizer<'a> {
    config: &'a Config,
    client: &'a GeminiClient,
    store: &'a VectorStore,
}

impl<'a> Summarizer<'a> {
    #[inline]
    pub fn new(config: &'a Config, client: &'a GeminiClient, store: &'a VectorStore) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Joins every stored segment in insertion order with single spaces and
    /// asks the model for a summary. Fails before any model call when the
    /// store is empty or the combined text exceeds the input budget.
    #[inline]
    pub async fn summarize(&self) -> Result<String> {
        let segments = self.store.all_segments().await?;
        if segments.is_empty() {
            return Err(PdfChatError::NotFound(
                "The store has no segments to summarize. Ingest a document first".to_string(),
            ));
        }

        let full_text = segments.iter().map(|s| s.content.as_str()).join(" ");
        let chars = full_text.chars().count();
        if chars > MAX_SUMMARY_INPUT_CHARS {
            return Err(PdfChatError::InputTooLarge(format!(
                "Combined document text is {chars} characters; the summarizer accepts at most {MAX_SUMMARY_INPUT_CHARS}"
            )));
        }

        debug!(
            segments = segments.len(),
            chars, "Summarizing stored documents"
        );

        let system = prompts::summary_system_prompt(&self.config.chat.language);
        let request = format!("Summarize the following document:\n\n{full_text}");
        self.client.generate(&system, &[ChatMessage::user(request)])
    }
}
