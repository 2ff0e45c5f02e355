use std::sync::Arc;

/// The bot's opening line in every new conversation.
pub const GREETING_TEXT: &str = "Hello! How can I help you today?";

/// A single chat turn. Never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    is_bot: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_bot: false,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_bot: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }
}

/// Ordered chat history for the current session.
///
/// The sequence is shared and never mutated in place: [`Conversation::append`]
/// builds a new one, so any snapshot a renderer holds stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Arc<[Message]>,
}

impl Conversation {
    /// A conversation holding only the greeting.
    pub fn new() -> Self {
        Self {
            messages: Arc::from(vec![Message::bot(GREETING_TEXT)]),
        }
    }

    #[must_use]
    pub fn append(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(message);

        Self {
            messages: Arc::from(messages),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
