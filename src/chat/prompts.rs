//! Prompt templates for retrieval and answering.

/// Instruction for condensing a follow-up question into a standalone
/// retrieval query. The model must not answer, only reformulate.
pub const REWRITE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question which can \
be understood without the chat history. Do NOT answer the question, just reformulate it if \
needed and otherwise return it as is.";

/// System prompt for answering from retrieved segments. Keeps the model
/// inside the supplied context and fixes the response language.
pub fn qa_system_prompt(language: &str, context: &str) -> String {
    format!(
        "You are an assistant answering questions about uploaded documents. Answer using \
         only the retrieved context below. If the context does not contain the answer, say \
         that the documents do not cover it. Do not invent information. Always answer in \
         {language}.\n\nContext:\n{context}"
    )
}

/// System prompt for whole-store summarization.
pub fn summary_system_prompt(language: &str) -> String {
    format!(
        "You produce summaries of uploaded documents. Follow these instructions:\n\
         1. Identify the main topics and the purpose of the document.\n\
         2. Capture the key points, findings and conclusions.\n\
         3. Keep the order in which topics appear.\n\
         4. Be concise; do not copy long passages verbatim.\n\
         5. Write the summary in {language}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_prompt_embeds_context_and_language() {
        let prompt = qa_system_prompt("English", "Segment one.\n\nSegment two.");

        assert!(prompt.contains("Context:\nSegment one.\n\nSegment two."));
        assert!(prompt.contains("answer in English"));
    }

    #[test]
    fn summary_prompt_fixes_language() {
        let prompt = summary_system_prompt("German");

        assert!(prompt.contains("in German."));
        assert!(prompt.starts_with("You produce summaries"));
    }

    #[test]
    fn rewrite_prompt_forbids_answering() {
        assert!(REWRITE_SYSTEM_PROMPT.contains("Do NOT answer"));
    }
}
