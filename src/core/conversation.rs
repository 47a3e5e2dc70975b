//! The conversation reducer.
//!
//! [`Conversation`] owns the ordered message list of one chat session and is
//! the only place messages are mutated. A send is split in two halves:
//! [`Conversation::begin_send`] records the turn and hands back what the
//! stream service needs, and [`Conversation::apply`] folds every message the
//! service emits into the in-flight assistant reply.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::chat_stream::StreamMessage;
use super::error::ChatError;
use super::locale::Locale;
use super::message::{Message, MessageId, MessageStatus};
use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("a reply is already streaming")]
    Busy,
}

/// Everything the stream service needs to run one request.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
    pub assistant_id: MessageId,
    /// Prior turns followed by the new prompt, oldest first.
    pub history: Vec<ChatMessage>,
}

impl PendingSend {
    pub fn prompt(&self) -> &str {
        self.history
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

/// Result of folding one stream message into the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The message belonged to a stale stream or changed nothing.
    Ignored,
    /// The in-flight reply changed.
    Updated,
    /// The reply reached a terminal status and the request is over.
    Finished(MessageStatus),
}

#[derive(Debug)]
struct InFlight {
    stream_id: u64,
    assistant_index: usize,
    cancel_token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    in_flight: Option<InFlight>,
    last_stream_id: u64,
    locale: Locale,
}

impl Conversation {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// True exactly while a send is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_stream_id(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|in_flight| in_flight.stream_id)
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id() == Some(stream_id)
    }

    /// The assistant reply currently being streamed, if any.
    pub fn in_flight_message(&self) -> Option<&Message> {
        let in_flight = self.in_flight.as_ref()?;
        self.messages.get(in_flight.assistant_index)
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }

    /// Records a new turn: the user's prompt and an empty streaming reply.
    ///
    /// Sends never overlap; a second call while one is in flight is refused
    /// with [`SendError::Busy`] and leaves the conversation unchanged.
    pub fn begin_send(&mut self, prompt: &str) -> Result<PendingSend, SendError> {
        if prompt.trim().is_empty() {
            return Err(SendError::EmptyPrompt);
        }
        if self.in_flight.is_some() {
            return Err(SendError::Busy);
        }

        let mut history = self.api_history();
        history.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        self.messages.push(Message::user(prompt));
        let assistant = Message::assistant_placeholder();
        let assistant_id = assistant.id();
        self.messages.push(assistant);

        self.last_stream_id += 1;
        let stream_id = self.last_stream_id;
        let cancel_token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            stream_id,
            assistant_index: self.messages.len() - 1,
            cancel_token: cancel_token.clone(),
        });
        debug!(stream_id, %assistant_id, "send started");

        Ok(PendingSend {
            stream_id,
            cancel_token,
            assistant_id,
            history,
        })
    }

    /// Folds one stream message into the in-flight reply. Messages tagged
    /// with any other stream id are ignored.
    pub fn apply(&mut self, message: StreamMessage, stream_id: u64) -> Applied {
        if !self.is_current_stream(stream_id) {
            return Applied::Ignored;
        }

        match message {
            StreamMessage::Chunk(text) => self.append_chunk(&text),
            StreamMessage::Done | StreamMessage::End => self.complete(),
            StreamMessage::Error(error) => self.fail(&error),
        }
    }

    /// Detaches the in-flight reply and cancels its request. The reply keeps
    /// whatever it had received and its status is left untouched.
    pub fn abort(&mut self) -> Option<MessageId> {
        let in_flight = self.in_flight.take()?;
        in_flight.cancel_token.cancel();
        let id = self
            .messages
            .get(in_flight.assistant_index)
            .map(Message::id);
        debug!(stream_id = in_flight.stream_id, "send aborted");
        id
    }

    fn append_chunk(&mut self, text: &str) -> Applied {
        if text.is_empty() {
            return Applied::Ignored;
        }
        let Some(message) = self.in_flight_message_mut() else {
            return Applied::Ignored;
        };
        match message.append(text) {
            Ok(()) => Applied::Updated,
            Err(err) => {
                debug!(error = %err, "dropping chunk for settled message");
                Applied::Ignored
            }
        }
    }

    fn complete(&mut self) -> Applied {
        let produced_text = self
            .in_flight_message()
            .is_some_and(|message| !message.content().is_empty());
        if !produced_text {
            return self.fail(&ChatError::EmptyResponse);
        }
        self.settle(|message, _| message.transition(MessageStatus::Complete))
    }

    fn fail(&mut self, error: &ChatError) -> Applied {
        debug!(kind = error.kind(), error = %error, "send failed");
        self.settle(|message, locale| message.fail_with(locale.error_text(error)))
    }

    fn settle<F>(&mut self, update: F) -> Applied
    where
        F: FnOnce(&mut Message, Locale) -> Result<(), super::message::LifecycleError>,
    {
        let Some(in_flight) = self.in_flight.take() else {
            return Applied::Ignored;
        };
        let locale = self.locale;
        let Some(message) = self.messages.get_mut(in_flight.assistant_index) else {
            return Applied::Ignored;
        };
        if let Err(err) = update(message, locale) {
            debug!(error = %err, "in-flight message was already settled");
        }
        Applied::Finished(message.status())
    }

    fn in_flight_message_mut(&mut self) -> Option<&mut Message> {
        let index = self.in_flight.as_ref()?.assistant_index;
        self.messages.get_mut(index)
    }

    /// Prior turns worth sending back: settled user and assistant messages
    /// with text. Failed and aborted replies are left out.
    fn api_history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.status() == MessageStatus::Complete && !m.content().is_empty())
            .map(|m| ChatMessage {
                role: m.role().as_str().to_string(),
                content: m.content().to_string(),
            })
            .collect()
    }
}
