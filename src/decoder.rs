//! Incremental decoding of chunked event streams.
//!
//! The backend pushes JSON-encoded events over a plain chunked HTTP body,
//! separated by a fixed marker. Two framings are in use:
//!
//! ```text
//! {"event": "uploadFeedback", "data": {"message": "..."}}\n
//! {"event": "sources", "data": {"sources": [...]}}$$$\n
//! ```
//!
//! Chunk boundaries carry no meaning: a chunk may hold several events, or
//! end in the middle of one. [`StreamEventDecoder`] buffers the trailing
//! fragment until the next chunk (or the end of the stream) completes it.

use serde_json::Value;
use thiserror::Error;

use crate::client::ClientError;

/// Separator used by newline-delimited JSON streams (upload progress).
pub const NEWLINE_SEPARATOR: &str = "\n";

/// Separator used by the chat message stream.
pub const CHAT_EVENT_SEPARATOR: &str = "$$$\n";

/// Event kind given to events that carry no `event` field.
pub const DEFAULT_EVENT_KIND: &str = "message";

/// Errors raised while turning stream text into events.
#[derive(Error, Debug)]
pub enum StreamDecodeError {
    #[error("malformed stream event {fragment:?}: {source}")]
    Malformed {
        fragment: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload for `{kind}` event: {source}")]
    Schema {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stream is not valid UTF-8")]
    InvalidUtf8,

    #[error("decoder is already {0:?}")]
    Closed(DecoderState),
}

/// Event separator for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separator(String);

impl Separator {
    /// Create a custom separator. Empty separators are rejected.
    pub fn new(separator: impl Into<String>) -> Result<Self, ClientError> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(ClientError::Config(
                "stream separator must not be empty".to_string(),
            ));
        }
        Ok(Self(separator))
    }

    /// One event per line.
    pub fn newline() -> Self {
        Self(NEWLINE_SEPARATOR.to_string())
    }

    /// Events terminated by `$$$\n`.
    pub fn chat_marker() -> Self {
        Self(CHAT_EVENT_SEPARATOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self::newline()
    }
}

/// A single decoded event.
///
/// `kind` is taken from the `event` field and `payload` from the `data`
/// field. Objects without a `data` field keep their remaining fields as
/// the payload; non-object values become the payload as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub kind: String,
    pub payload: Value,
}

impl StreamEvent {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Split a decoded JSON value into kind and payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                let kind = match map.remove("event") {
                    Some(Value::String(kind)) => kind,
                    _ => DEFAULT_EVENT_KIND.to_string(),
                };
                let payload = match map.remove("data") {
                    Some(data) => data,
                    None => Value::Object(map),
                };
                Self { kind, payload }
            }
            other => Self::new(DEFAULT_EVENT_KIND, other),
        }
    }
}

/// Lifecycle of a decoder.
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    Reading,
    Emitting,
    Completed,
    Failed,
}

impl DecoderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DecoderState::Completed | DecoderState::Failed)
    }
}

/// Splits incoming text chunks into [`StreamEvent`]s.
///
/// Events are returned in arrival order. Incomplete trailing fragments are
/// kept until a later chunk completes them, or until [`finish`] parses
/// whatever is left.
///
/// [`finish`]: StreamEventDecoder::finish
#[derive(Debug)]
pub struct StreamEventDecoder {
    separator: Separator,
    buffer: String,
    // No separator starts before this offset of `buffer`.
    scanned: usize,
    // Bytes of a UTF-8 sequence cut by a chunk boundary.
    partial_char: Vec<u8>,
    state: DecoderState,
}

impl StreamEventDecoder {
    pub fn new(separator: Separator) -> Self {
        Self {
            separator,
            buffer: String::new(),
            scanned: 0,
            partial_char: Vec::new(),
            state: DecoderState::Idle,
        }
    }

    pub fn separator(&self) -> &Separator {
        &self.separator
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// The incomplete fragment waiting for more data.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Feed raw bytes from the transport.
    ///
    /// Multi-byte characters split across chunks are reassembled before
    /// the text reaches the event splitter.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, StreamDecodeError> {
        self.ensure_open()?;
        self.partial_char.extend_from_slice(chunk);

        let text = match std::str::from_utf8(&self.partial_char) {
            Ok(text) => {
                let text = text.to_owned();
                self.partial_char.clear();
                text
            }
            Err(err) if err.error_len().is_none() => {
                let tail = self.partial_char.split_off(err.valid_up_to());
                let head = std::mem::replace(&mut self.partial_char, tail);
                match String::from_utf8(head) {
                    Ok(text) => text,
                    Err(_) => return Err(self.fail(StreamDecodeError::InvalidUtf8)),
                }
            }
            Err(_) => return Err(self.fail(StreamDecodeError::InvalidUtf8)),
        };

        self.feed(&text)
    }

    /// Feed the next text chunk and return every event it completes.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<StreamEvent>, StreamDecodeError> {
        self.ensure_open()?;
        self.state = DecoderState::Reading;
        self.buffer.push_str(chunk);

        let separator = self.separator.as_str();
        let found = self.buffer[self.scanned..]
            .rfind(separator)
            .map(|i| i + self.scanned);
        let complete: Option<String> =
            found.map(|last| self.buffer.drain(..last + separator.len()).collect());
        self.scanned = self.rescan_from();

        let Some(complete) = complete else {
            return Ok(Vec::new());
        };

        let parsed: Result<Vec<_>, _> = complete
            .split(separator)
            .filter(|piece| !piece.trim().is_empty())
            .map(parse_event)
            .collect();

        match parsed {
            Ok(events) => {
                if !events.is_empty() {
                    log::debug!("decoded {} stream event(s)", events.len());
                    self.state = DecoderState::Emitting;
                }
                Ok(events)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Signal the end of the stream.
    ///
    /// A non-blank leftover fragment is parsed as the final event; a blank
    /// one is dropped. The decoder is `Completed` afterwards.
    pub fn finish(&mut self) -> Result<Option<StreamEvent>, StreamDecodeError> {
        self.ensure_open()?;
        if !self.partial_char.is_empty() {
            return Err(self.fail(StreamDecodeError::InvalidUtf8));
        }

        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        let event = if rest.trim().is_empty() {
            None
        } else {
            match parse_event(&rest) {
                Ok(event) => Some(event),
                Err(err) => return Err(self.fail(err)),
            }
        };

        self.state = DecoderState::Completed;
        Ok(event)
    }

    fn ensure_open(&self) -> Result<(), StreamDecodeError> {
        if self.state.is_terminal() {
            return Err(StreamDecodeError::Closed(self.state));
        }
        Ok(())
    }

    /// Where the next separator search starts: a separator cut by the end
    /// of the buffer can begin at most `len - 1` bytes from the end.
    fn rescan_from(&self) -> usize {
        let mut offset = self
            .buffer
            .len()
            .saturating_sub(self.separator.as_str().len() - 1);
        while !self.buffer.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    fn fail(&mut self, err: StreamDecodeError) -> StreamDecodeError {
        self.state = DecoderState::Failed;
        self.scanned = 0;
        self.buffer.clear();
        self.partial_char.clear();
        err
    }
}

fn parse_event(fragment: &str) -> Result<StreamEvent, StreamDecodeError> {
    serde_json::from_str::<Value>(fragment)
        .map(StreamEvent::from_value)
        .map_err(|source| StreamDecodeError::Malformed {
            fragment: fragment.to_string(),
            source,
        })
}
