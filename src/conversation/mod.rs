//! Conversation Engine
//!
//! Owns the chat transcript for the active dataset and enforces single-flight
//! querying: at most one question is outstanding at a time, and every accepted
//! question produces exactly one bot reply.
//!
//! A submission is split in two halves so the network call can run on another
//! task:
//!
//! ```text
//! begin_submit ──► PendingQuery ──► Gateway::query ──► settle
//!   (user msg,                                          (bot msg,
//!    pending = true)                                     pending = false)
//! ```
//!
//! Each `PendingQuery` captures the conversation generation. [`ConversationEngine::clear`]
//! bumps the generation, so a reply that settles after a reset is dropped
//! instead of landing in the new transcript.

use crate::gateway::Gateway;
use crate::models::QueryReply;
use crate::types::{GatewayResult, StructuredAnswer};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Shown in place of an answer when the query call itself failed.
pub const QUERY_FAILED_TEXT: &str =
    "Sorry, I encountered an error while processing your question. Please try again.";

/// Suggestions attached to the greeting of every new dataset.
pub const EXAMPLE_QUESTIONS: [&str; 5] = [
    "What are the average values in my dataset?",
    "Show me the correlation between columns",
    "What are the maximum and minimum values?",
    "How many rows are in my dataset?",
    "Are there any missing values?",
];

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique and increasing in creation order.
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub structured_answer: Option<StructuredAnswer>,
    pub generated_code: Option<String>,
    /// Only set on the greeting.
    pub example_suggestions: Option<Vec<String>>,
    /// The query call failed; `text` is [`QUERY_FAILED_TEXT`].
    pub is_error: bool,
    /// Gateway message for a failed call.
    pub error_detail: Option<String>,
    /// Backend verdict for query replies; `Some(false)` means it could not answer.
    pub succeeded: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn blank(id: u64, role: Role, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            role,
            text,
            structured_answer: None,
            generated_code: None,
            example_suggestions: None,
            is_error: false,
            error_detail: None,
            succeeded: None,
            created_at,
        }
    }

    pub fn is_greeting(&self) -> bool {
        self.example_suggestions.is_some()
    }
}

/// Transcript plus the single-flight flag
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub pending: bool,
}

/// Ticket for a question whose reply has not arrived yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    generation: u64,
    pub dataset_id: String,
    pub question: String,
}

impl PendingQuery {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What [`ConversationEngine::settle`] did with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// A bot message was appended and `pending` cleared.
    Applied,
    /// The conversation was cleared since the question was asked.
    Discarded,
}

#[derive(Debug, Default)]
pub struct ConversationEngine {
    state: ConversationState,
    next_id: u64,
    generation: u64,
    draft: String,
}

impl ConversationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text waiting in the input box.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Copy an example question into the draft. Nothing is submitted.
    pub fn select_example(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Suggestions of the most recent greeting, if any.
    pub fn example_suggestions(&self) -> &[String] {
        self.state
            .messages
            .iter()
            .rev()
            .find_map(|m| m.example_suggestions.as_deref())
            .unwrap_or(&[])
    }

    /// Append the greeting that opens a new dataset's conversation.
    pub fn seed_greeting(&mut self, filename: &str, examples: &[&str]) {
        let mut message = self.new_message(
            Role::Bot,
            format!(
                "Great! I've analyzed your file \"{}\". You can now ask me questions about your data. Here are some examples:",
                filename
            ),
        );
        message.example_suggestions = Some(examples.iter().map(|e| e.to_string()).collect());
        self.state.messages.push(message);
    }

    /// Accept a question: append the user message and mark the conversation
    /// pending.
    ///
    /// The text is stored and sent as typed; whitespace only matters for
    /// the blank check. Returns `None` without touching anything when the
    /// text is blank or a question is already outstanding.
    pub fn begin_submit(&mut self, dataset_id: &str, question: &str) -> Option<PendingQuery> {
        if question.trim().is_empty() {
            return None;
        }
        if self.state.pending {
            debug!("Rejected submission while a query is pending");
            return None;
        }

        let message = self.new_message(Role::User, question.to_string());
        self.state.messages.push(message);
        self.state.pending = true;
        self.draft.clear();

        info!(
            "Query submitted for dataset {} (generation {})",
            dataset_id, self.generation
        );

        Some(PendingQuery {
            generation: self.generation,
            dataset_id: dataset_id.to_string(),
            question: question.to_string(),
        })
    }

    /// Apply the outcome of a query started by [`Self::begin_submit`].
    pub fn settle(&mut self, query: PendingQuery, result: GatewayResult<QueryReply>) -> Settled {
        if query.generation != self.generation {
            debug!(
                "Discarding reply for generation {} (current {})",
                query.generation, self.generation
            );
            return Settled::Discarded;
        }

        let message = match result {
            Ok(reply) => {
                let mut message = self.new_message(Role::Bot, reply.explanation);
                message.structured_answer = reply.answer;
                message.generated_code = reply.generated_code;
                message.succeeded = Some(reply.succeeded);
                message
            }
            Err(err) => {
                warn!("Query for dataset {} failed: {}", query.dataset_id, err);
                let mut message = self.new_message(Role::Bot, QUERY_FAILED_TEXT.to_string());
                message.is_error = true;
                message.error_detail = Some(err.message().to_string());
                message.succeeded = Some(false);
                message
            }
        };

        self.state.messages.push(message);
        self.state.pending = false;
        Settled::Applied
    }

    /// Submit and wait for the reply in one step.
    ///
    /// Returns `None` if the submission was rejected.
    pub async fn submit(
        &mut self,
        gateway: &dyn Gateway,
        dataset_id: &str,
        text: &str,
    ) -> Option<Settled> {
        let query = self.begin_submit(dataset_id, text)?;
        let result = gateway.query(&query.dataset_id, &query.question).await;
        Some(self.settle(query, result))
    }

    /// Drop the transcript. Replies still in flight become stale.
    pub fn clear(&mut self) {
        self.state.messages.clear();
        self.state.pending = false;
        self.draft.clear();
        self.generation += 1;
    }

    fn new_message(&mut self, role: Role, text: String) -> Message {
        self.next_id += 1;
        // Keep timestamps ordered even if the clock steps back
        let now = Utc::now();
        let created_at = match self.state.messages.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        Message::blank(self.next_id, role, text, created_at)
    }
}
