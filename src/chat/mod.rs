// Chat module
// History-aware retrieval and grounded answering over the vector store

#[cfg(test)]
mod tests;

pub mod history;
pub mod prompts;
pub mod summarize;

pub use history::{ChatHistory, ChatTurn};
pub use summarize::Summarizer;

use itertools::Itertools;
use tracing::debug;

use crate::Result;
use crate::config::Config;
use crate::database::VectorStore;
use crate::gemini::{ChatMessage, GeminiClient};

/// Most segments ever handed to the answering model. Stores smaller than
/// this contribute everything they hold.
const MAX_RETRIEVED_SEGMENTS: usize = 20;

/// Answer produced for one question.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    /// The query text that was embedded for retrieval. Matches the question
    /// verbatim on the first turn; later turns carry the rewritten form.
    pub retrieval_query: String,
    /// Retrieved segments in rank order.
    pub sources: Vec<SourceRef>,
}

/// Where a retrieved segment came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
    pub similarity: f32,
}

/// Retrieval-augmented answering over every ingested document.
pub struct RagChain<'a> {
    config: &'a Config,
    client: &'a GeminiClient,
    store: &'a VectorStore,
}

impl<'a> RagChain<'a> {
    #[inline]
    pub fn new(config: &'a Config, client: &'a GeminiClient, store: &'a VectorStore) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Answers a question against the store.
    ///
    /// With history present the question is first rewritten into a
    /// standalone retrieval query; a rewrite failure fails the whole turn
    /// and the original question is never embedded as a fallback. The
    /// caller records the exchange in its history only after Ok.
    #[inline]
    pub async fn ask(&self, question: &str, history: &ChatHistory) -> Result<ChatAnswer> {
        let retrieval_query = if history.is_empty() {
            question.to_string()
        } else {
            self.rewrite_question(question, history)?
        };

        debug!(query = %retrieval_query, "Embedding retrieval query");
        let query_vector = self.client.embed(&retrieval_query)?;

        let stored = self.store.count().await?;
        let limit = retrieval_limit(stored);
        let results = self.store.search(&query_vector, limit).await?;

        let context = results
            .iter()
            .map(|result| result.metadata.content.as_str())
            .join("\n\n");

        let system = prompts::qa_system_prompt(&self.config.chat.language, &context);
        let mut messages = history.to_messages();
        messages.push(ChatMessage::user(question));
        let answer = self.client.generate(&system, &messages)?;

        let sources = results
            .iter()
            .map(|result| SourceRef {
                source: result.metadata.source.clone(),
                page: result.metadata.page,
                similarity: result.similarity_score,
            })
            .collect();

        Ok(ChatAnswer {
            answer,
            retrieval_query,
            sources,
        })
    }

    fn rewrite_question(&self, question: &str, history: &ChatHistory) -> Result<String> {
        debug!("Rewriting follow-up question into a standalone query");

        let mut messages = history.to_messages();
        messages.push(ChatMessage::user(question));
        let rewritten = self
            .client
            .generate(prompts::REWRITE_SYSTEM_PROMPT, &messages)?;

        let rewritten = rewritten.trim().to_string();
        debug!(query = %rewritten, "Rewrote question");
        Ok(rewritten)
    }
}

/// Number of segments to retrieve: the whole store, capped. An empty store
/// still asks for the cap and simply gets nothing back.
fn retrieval_limit(stored: u64) -> usize {
    if stored == 0 {
        MAX_RETRIEVED_SEGMENTS
    } else {
        stored.min(MAX_RETRIEVED_SEGMENTS as u64) as usize
    }
}
