//! Folding stream events into caller-owned state.

use crate::decoder::{StreamDecodeError, StreamEvent};
use crate::model::{ChatEvent, ChatResponse, UploadEvent, UploadStatus};

/// State that stream events are folded into, one event at a time.
pub trait Accumulator {
    /// Typed form of the events this accumulator understands.
    type Event: TryFrom<StreamEvent, Error = StreamDecodeError>;

    fn fold(&mut self, event: Self::Event);

    /// Called once when the stream ends normally.
    fn complete(&mut self) {}
}

impl Accumulator for ChatResponse {
    type Event = ChatEvent;

    fn fold(&mut self, event: ChatEvent) {
        match event {
            // Last sources event wins
            ChatEvent::Sources(sources) => self.sources = sources,
            ChatEvent::Content(delta) => self.content.push_str(&delta),
            ChatEvent::Other(kind) => log::debug!("ignoring chat event `{kind}`"),
        }
    }

    fn complete(&mut self) {
        self.generation_completed = true;
    }
}

impl Accumulator for UploadStatus {
    type Event = UploadEvent;

    fn fold(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::Progress { message } => self.message = Some(message),
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}
