use crate::gemini::ChatMessage;

/// One remembered turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTurn {
    User(String),
    Assistant(String),
}

/// In-memory conversation history for one chat session.
///
/// Grows by exactly one exchange per successful answer; a failed turn
/// leaves it untouched. Nothing is persisted across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Records a completed question and answer exchange.
    #[inline]
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn::User(question.into()));
        self.turns.push(ChatTurn::Assistant(answer.into()));
    }

    /// Forgets the whole conversation.
    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The history as wire messages, oldest first.
    #[inline]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| match turn {
                ChatTurn::User(text) => ChatMessage::user(text.clone()),
                ChatTurn::Assistant(text) => ChatMessage::model(text.clone()),
            })
            .collect()
    }
}
