use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::conversation_state::{Conversation, Message};
use super::visibility::Visibility;
use crate::chat_client::{ChatTransport, QueryError, QueryResponse};

/// Shown in place of a reply whenever a query fails, whatever the cause.
pub const FALLBACK_TEXT: &str = "Error connecting to server.";

/// What [`ChatWidget::submit`] did with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input was blank; nothing happened.
    Ignored,
    /// Another query is still in flight; nothing happened.
    Busy,
    /// The message was appended and its query started.
    Accepted,
}

/// How a query ended, as far as the user can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Answered,
    Unreachable,
}

/// The query task of an accepted submission. Dropping it aborts the task, so
/// a discarded widget never receives a late reply.
struct InFlight {
    handle: JoinHandle<Result<QueryResponse, QueryError>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

enum Phase {
    Idle,
    Awaiting(InFlight),
}

pub struct ChatWidget {
    transport: Arc<dyn ChatTransport>,
    visibility: Visibility,
    conversation: Conversation,
    draft: String,
    phase: Phase,
}

impl ChatWidget {
    /// Mount a widget: collapsed, seeded with the greeting, nothing pending.
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            visibility: Visibility::default(),
            conversation: Conversation::new(),
            draft: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn open(&mut self) -> bool {
        self.visibility.open()
    }

    pub fn close(&mut self) -> bool {
        self.visibility.close()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// True while a submitted query has not settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    /// Submit whatever is in the draft. The draft is kept if the submission
    /// is not accepted.
    pub fn submit_draft(&mut self) -> SubmitOutcome {
        let draft = std::mem::take(&mut self.draft);
        let outcome = self.submit(&draft);
        if outcome != SubmitOutcome::Accepted {
            self.draft = draft;
        }
        outcome
    }

    /// Append `raw` as a user message and start its query.
    ///
    /// Must be called within a tokio runtime. The reply is only applied by a
    /// later call to [`ChatWidget::settle`].
    pub fn submit(&mut self, raw: &str) -> SubmitOutcome {
        if raw.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        if self.is_pending() {
            debug!("Rejecting submission while a query is in flight");
            return SubmitOutcome::Busy;
        }

        self.conversation = self.conversation.append(Message::user(raw));
        self.draft.clear();

        let transport = Arc::clone(&self.transport);
        let message = raw.to_string();
        let handle = tokio::spawn(async move { transport.query(&message).await });
        self.phase = Phase::Awaiting(InFlight { handle });

        SubmitOutcome::Accepted
    }

    /// Wait for the in-flight query and append its reply, or the fallback
    /// text if it failed. Returns `None` if nothing was pending.
    ///
    /// The pending state is cleared before awaiting, so it is clear on every
    /// exit path. If this future is dropped early the query is aborted and
    /// no reply is appended.
    pub async fn settle(&mut self) -> Option<Settlement> {
        let Phase::Awaiting(mut in_flight) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return None;
        };

        let (reply, settlement) = match (&mut in_flight.handle).await {
            Ok(Ok(response)) => (Message::bot(response.answer), Settlement::Answered),
            Ok(Err(err)) => {
                warn!(error = %err, "Chat query failed");
                (Message::bot(FALLBACK_TEXT), Settlement::Unreachable)
            }
            Err(err) => {
                warn!(error = %err, "Chat query task did not complete");
                (Message::bot(FALLBACK_TEXT), Settlement::Unreachable)
            }
        };

        self.conversation = self.conversation.append(reply);
        Some(settlement)
    }
}
