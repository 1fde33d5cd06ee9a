//! Conversation feed state.

use serde::Serialize;

use crate::alert::Alert;
use crate::client::ClientError;
use crate::model::{ChatResponse, UserPromptRequest};

/// One question and its (possibly partial) answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBlock {
    pub user_prompt_request: UserPromptRequest,
    pub user_prompt_response: ChatResponse,
    #[serde(skip)]
    pub error_message: Option<String>,
}

impl MessageBlock {
    pub fn new(request: UserPromptRequest) -> Self {
        Self {
            user_prompt_request: request,
            user_prompt_response: ChatResponse::default(),
            error_message: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.user_prompt_response.generation_completed
    }
}

/// The turns of the current chat, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ChatFeed {
    blocks: Vec<MessageBlock>,
}

impl ChatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn for `request`.
    pub fn push(&mut self, request: UserPromptRequest) -> &MessageBlock {
        self.blocks.push(MessageBlock::new(request));
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn blocks(&self) -> &[MessageBlock] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&MessageBlock> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Store the outcome of the last turn.
    ///
    /// Returns the alert to show, if any. A "new chat" abort only produces
    /// the alert; the feed is about to be cleared. A decode failure drops
    /// the partial answer since it cannot be trusted. Other failures keep
    /// what was received and attach an error message.
    pub fn record_turn(
        &mut self,
        response: ChatResponse,
        outcome: Result<(), ClientError>,
    ) -> Option<Alert> {
        let err = match outcome {
            Ok(()) => {
                match self.blocks.last_mut() {
                    Some(block) => block.user_prompt_response = response,
                    None => log::warn!("completed turn recorded on an empty feed"),
                }
                return None;
            }
            Err(err) => err,
        };

        let alert = Alert::from(&err);
        if err.is_user_reset() {
            return Some(alert);
        }

        let Some(block) = self.blocks.last_mut() else {
            log::warn!("turn outcome recorded on an empty feed: {err}");
            return Some(alert);
        };
        block.user_prompt_response = match err {
            ClientError::Decode(_) => ChatResponse::default(),
            _ => response,
        };
        block.user_prompt_response.generation_completed = true;
        block.error_message = Some(format!("{}: {}", alert.title, alert.description));
        Some(alert)
    }
}
