//! Chat/Query Pipeline
//!
//! Sends a text or recorded question to HQ and keeps the running transcript.
//! The visitor's message is appended before the network call starts, so it is
//! on screen even when the call is slow or fails.

use crate::capture::EncodedAudio;
use hq_core::error::HqError;
use hq_core::model::{Message, Transcript};
use hq_core::remote::{AskRequest, RemoteService};
use hq_core::view::View;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Transcript entry standing in for a recorded question.
pub const AUDIO_PLACEHOLDER: &str = "Sending audio...";
/// Question label sent alongside a recording.
pub const AUDIO_QUESTION_LABEL: &str = "Audio Query";
pub const NO_RESPONSE: &str = "No response";
pub const CONNECTION_ERROR: &str = "Error connecting to HQ.";

/// A single question. Exactly one form is ever sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Text(String),
    Audio(EncodedAudio),
}

pub struct ChatPipeline {
    remote: Arc<dyn RemoteService>,
    view: Arc<dyn View>,
    transcript: Mutex<Transcript>,
}

impl ChatPipeline {
    pub fn new(remote: Arc<dyn RemoteService>, view: Arc<dyn View>) -> Self {
        Self {
            remote,
            view,
            transcript: Mutex::new(Transcript::new()),
        }
    }

    /// Trims typed input and sends it. Blank input is ignored.
    pub async fn send_text(&self, raw: &str) -> Option<Message> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(self.send_query(Query::Text(text.to_string())).await)
    }

    /// Appends the visitor message, asks HQ and appends the reply.
    ///
    /// Never fails: transport errors become a system message.
    pub async fn send_query(&self, query: Query) -> Message {
        let (visitor, request) = match query {
            Query::Text(text) => (
                Message::visitor(text.clone()),
                AskRequest {
                    question: Some(text),
                    audio: None,
                },
            ),
            Query::Audio(audio) => (
                Message::visitor(AUDIO_PLACEHOLDER),
                AskRequest {
                    question: Some(AUDIO_QUESTION_LABEL.to_string()),
                    audio: Some(audio.into_string()),
                },
            ),
        };
        self.append(visitor);

        let reply = match self.remote.ask(request).await {
            Ok(response) => response
                .answer
                .filter(|answer| !answer.trim().is_empty())
                .unwrap_or_else(|| NO_RESPONSE.to_string()),
            Err(HqError::MalformedResponse(reason)) => {
                warn!(%reason, "Unreadable answer from HQ");
                NO_RESPONSE.to_string()
            }
            Err(e) => {
                error!(error = %e, "Ask failed");
                CONNECTION_ERROR.to_string()
            }
        };
        info!(reply_len = reply.len(), "Answer received");
        self.append(Message::system(reply))
    }

    /// Snapshot of the transcript so far.
    pub fn transcript(&self) -> Vec<Message> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .messages()
            .to_vec()
    }

    fn append(&self, message: Message) -> Message {
        let mut transcript = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
        // Rendered under the lock so the view sees transcript order.
        let stored = transcript.push(message);
        self.view.append_message(stored);
        stored.clone()
    }
}
