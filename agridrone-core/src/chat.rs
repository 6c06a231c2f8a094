//! Conversation state for the assistant widget.
//!
//! History is append-only and starts with a greeting. A send is split in two
//! halves, [`ChatSession::begin_send`] and [`ChatSession::finish_send`], so the
//! in-flight guard holds even when the caller drives the request itself.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    api::AgriApi,
    error::{RequestError, ValidationError},
    location::LocationSource,
    model::{ChatReply, ChatRequest, Coordinates, Message},
};

pub const GREETING: &str = "Hello! I'm your agricultural assistant. I can help you with crop recommendations, farming advice, and answer questions about agriculture. What would you like to know?";

pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

pub const QUICK_QUESTIONS: [&str; 4] = [
    "What crops are best for my area?",
    "How to prevent crop diseases?",
    "When is the best time to plant tomatoes?",
    "What is precision agriculture?",
];

#[derive(Debug)]
pub struct ChatSession {
    api: Arc<dyn AgriApi>,
    messages: Vec<Message>,
    input: String,
    sending: bool,
    location: Option<Coordinates>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn AgriApi>) -> Self {
        Self {
            api,
            messages: vec![Message::assistant(GREETING)],
            input: String::new(),
            sending: false,
            location: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Whether the send control is enabled for the current input.
    pub fn can_send(&self) -> bool {
        !self.sending && !self.input.trim().is_empty()
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    pub fn set_location(&mut self, location: Option<Coordinates>) {
        self.location = location;
    }

    /// One best-effort lookup. Absence is not an error.
    pub async fn locate(&mut self, source: &dyn LocationSource) {
        match source.current_position().await {
            Some(coords) => {
                debug!(latitude = coords.latitude, longitude = coords.longitude, "chat location acquired");
                self.location = Some(coords);
            }
            None => debug!("location access denied or unavailable"),
        }
    }

    /// Back to a fresh conversation. Location is kept.
    pub fn reset(&mut self) {
        self.messages = vec![Message::assistant(GREETING)];
        self.input.clear();
        self.sending = false;
    }

    /// Send whatever is in the input box.
    pub async fn submit_input(&mut self) -> Result<(), ValidationError> {
        let text = std::mem::take(&mut self.input);
        let result = self.send_message(&text).await;
        if result.is_err() {
            self.input = text;
        }
        result
    }

    pub async fn send_message(&mut self, text: &str) -> Result<(), ValidationError> {
        let request = self.begin_send(text)?;
        let reply = self.api.chat(&request).await;
        self.finish_send(reply);
        Ok(())
    }

    /// Fill the input with canned question `index` and send it.
    pub async fn ask_quick(&mut self, index: usize) -> Result<(), ValidationError> {
        let question = QUICK_QUESTIONS
            .get(index)
            .ok_or(ValidationError::UnknownQuickQuestion(index))?;
        self.set_input(*question);
        self.submit_input().await
    }

    /// Validate, append the user turn, and enter the sending state.
    pub fn begin_send(&mut self, text: &str) -> Result<ChatRequest, ValidationError> {
        if self.sending {
            return Err(ValidationError::RequestPending);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        self.messages.push(Message::user(text));
        self.input.clear();
        self.sending = true;

        Ok(ChatRequest {
            message: text.to_string(),
            location: self.location.map(|c| c.describe()),
        })
    }

    /// Append the assistant turn for a finished request and return to idle.
    pub fn finish_send(&mut self, reply: Result<ChatReply, RequestError>) {
        let content = match reply {
            Ok(reply) => reply.response,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                err.user_message(FALLBACK_REPLY)
            }
        };

        self.messages.push(Message::assistant(content));
        self.sending = false;
    }
}
