use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::backend::Backend;
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::conversation::{Applied, Conversation, SendError};
use crate::core::message::MessageStatus;

/// How a call to [`ChatSession::send_message`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Cancels whatever request the owning session has in flight when invoked.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Returns whether there was a request to abort.
    pub fn abort(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    fn arm(&self, token: CancellationToken) {
        *self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
    }

    fn disarm(&self) {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

/// One chat session: the conversation plus the machinery that streams
/// replies into it.
pub struct ChatSession {
    conversation: Conversation,
    client: reqwest::Client,
    backend: Backend,
    service: ChatStreamService,
    rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    abort: AbortHandle,
}

impl ChatSession {
    pub fn new(client: reqwest::Client, backend: Backend, conversation: Conversation) -> Self {
        let (service, rx) = ChatStreamService::new();
        Self {
            conversation,
            client,
            backend,
            service,
            rx,
            abort: AbortHandle::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs()))
            .build()?;
        Ok(Self::new(
            client,
            Backend::from_config(config),
            Conversation::new(config.locale()),
        ))
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Sends `prompt` and streams the reply into the conversation, calling
    /// `on_update` after every change that was applied.
    pub async fn send_message<F>(
        &mut self,
        prompt: &str,
        mut on_update: F,
    ) -> Result<SendOutcome, SendError>
    where
        F: FnMut(&Conversation),
    {
        let pending = self.conversation.begin_send(prompt)?;
        let stream_id = pending.stream_id;
        let token = pending.cancel_token.clone();
        on_update(&self.conversation);

        self.abort.arm(token.clone());
        self.service.spawn_stream(StreamParams {
            client: self.client.clone(),
            backend: self.backend.clone(),
            api_messages: pending.history,
            cancel_token: token.clone(),
            stream_id,
        });

        let conversation = &mut self.conversation;
        let rx = &mut self.rx;
        let outcome = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    conversation.abort();
                    on_update(conversation);
                    break SendOutcome::Cancelled;
                }
                received = rx.recv() => {
                    let (message, id) = received.unwrap_or((StreamMessage::End, stream_id));
                    match conversation.apply(message, id) {
                        Applied::Ignored => {}
                        Applied::Updated => on_update(conversation),
                        Applied::Finished(status) => {
                            on_update(conversation);
                            break match status {
                                MessageStatus::Complete => SendOutcome::Completed,
                                _ => SendOutcome::Failed,
                            };
                        }
                    }
                }
            }
        };

        self.abort.disarm();
        debug!(stream_id, ?outcome, "send finished");
        Ok(outcome)
    }
}
