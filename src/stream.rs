//! Event streams over HTTP response bodies.
//!
//! Adapts a byte stream into a stream of [`StreamEvent`]s using a
//! [`StreamEventDecoder`], and makes event streams cancellable.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

use crate::client::ClientError;
use crate::decoder::{Separator, StreamEvent, StreamEventDecoder};
use crate::session::CancelHandle;

/// Extension trait for `reqwest::Response` to read its body as events.
///
/// # Example
/// ```ignore
/// use caradoc::decoder::Separator;
/// use caradoc::stream::EventStreamExt;
///
/// let response = client.post(url).send().await?;
/// let mut events = response.events(Separator::chat_marker());
/// while let Some(event) = events.next().await {
///     println!("{:?}", event?);
/// }
/// ```
pub trait EventStreamExt {
    /// Convert the response body into a stream of decoded events.
    fn events(self, separator: Separator) -> impl Stream<Item = Result<StreamEvent, ClientError>> + Send;
}

impl EventStreamExt for reqwest::Response {
    fn events(self, separator: Separator) -> impl Stream<Item = Result<StreamEvent, ClientError>> + Send {
        decode_stream(self.bytes_stream(), separator)
    }
}

/// Decode a stream of byte chunks into events.
///
/// The returned stream ends after the first error: a transport failure or a
/// decode failure is yielded once and nothing follows it.
pub fn decode_stream<S, B, E>(
    byte_stream: S,
    separator: Separator,
) -> impl Stream<Item = Result<StreamEvent, ClientError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ClientError> + Send,
{
    stream::unfold(
        (
            Box::pin(byte_stream),
            StreamEventDecoder::new(separator),
            VecDeque::new(),
            false,
        ),
        |(mut byte_stream, mut decoder, mut ready, mut finished)| async move {
            loop {
                if let Some(event) = ready.pop_front() {
                    return Some((Ok(event), (byte_stream, decoder, ready, finished)));
                }
                if finished {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => match decoder.feed_bytes(chunk.as_ref()) {
                        Ok(events) => ready.extend(events),
                        Err(err) => {
                            return Some((Err(err.into()), (byte_stream, decoder, ready, true)));
                        }
                    },
                    Some(Err(err)) => {
                        return Some((Err(err.into()), (byte_stream, decoder, ready, true)));
                    }
                    None => {
                        // End of body: flush the trailing fragment
                        finished = true;
                        match decoder.finish() {
                            Ok(Some(event)) => ready.push_back(event),
                            Ok(None) => {}
                            Err(err) => {
                                return Some((Err(err.into()), (byte_stream, decoder, ready, true)));
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Stop an event stream as soon as `cancel` fires.
///
/// After cancellation the stream yields one `ClientError::Aborted` and ends;
/// the inner stream (and the response body behind it) is dropped with it.
pub fn abortable<S>(
    events: S,
    cancel: CancelHandle,
) -> impl Stream<Item = Result<StreamEvent, ClientError>> + Send
where
    S: Stream<Item = Result<StreamEvent, ClientError>> + Send + 'static,
{
    stream::unfold(
        (Box::pin(events), cancel, false),
        |(mut events, cancel, done)| async move {
            if done {
                return None;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = events.next() => Some(item),
            };

            match next {
                None => Some((Err(cancel.abort_error()), (events, cancel, true))),
                Some(Some(_)) if cancel.is_cancelled() => {
                    Some((Err(cancel.abort_error()), (events, cancel, true)))
                }
                Some(Some(item)) => {
                    let done = item.is_err();
                    Some((item, (events, cancel, done)))
                }
                Some(None) => None,
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Severity;
    use crate::decoder::StreamDecodeError;
    use crate::session::{AbortReason, AbortTrigger};
    use bytes::Bytes;
    use serde_json::json;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, ClientError>> + Send {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, ClientError>(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_decode_stream_across_chunks() {
        let events: Vec<_> = decode_stream(
            chunks(&[
                "{\"event\":\"sources\",\"data\":{\"sources\":[]}}$$$\n{\"event\":\"con",
                "tent\",\"data\":{\"content\":\"Hi\"}}$",
                "$$\n",
            ]),
            Separator::chat_marker(),
        )
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events[0].kind, "sources");
        assert_eq!(events[1].kind, "content");
        assert_eq!(events[1].payload, json!({"content": "Hi"}));
    }

    #[tokio::test]
    async fn test_decode_stream_flushes_trailing_event() {
        let events: Vec<_> = decode_stream(chunks(&["{\"a\":1}\n{\"b\":", "2}"]), Separator::newline())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].as_ref().unwrap().payload, json!({"b": 2}));
    }

    #[tokio::test]
    async fn test_decode_stream_stops_after_malformed_event() {
        let events: Vec<_> = decode_stream(chunks(&["{\"a\":1}\n{oops}\n", "{\"b\":2}\n"]), Separator::newline())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(ClientError::Decode(StreamDecodeError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_decode_stream_forwards_transport_errors() {
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"a\":1}\n")),
            Err(ClientError::Config("connection reset".to_string())),
            Ok(Bytes::from_static(b"{\"b\":2}\n")),
        ]);
        let events: Vec<_> = decode_stream(failing, Separator::newline()).collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_abortable_stops_on_cancel() {
        let cancel = CancelHandle::new();
        let reason = AbortReason::new("Stopped", "stop", Severity::Info, AbortTrigger::FormSubmitCancelButton);
        let trigger = cancel.clone();

        let events = stream::iter((0..5).map(|i| Ok::<_, ClientError>(StreamEvent::new("content", json!(i)))));
        let events = events.inspect(move |item| {
            if let Ok(event) = item {
                if event.payload == json!(1) {
                    trigger.cancel(reason.clone());
                }
            }
        });

        let collected: Vec<_> = abortable(events, cancel).collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected[0].is_ok());
        match &collected[1] {
            Err(ClientError::Aborted(reason)) => assert_eq!(reason.title, "Stopped"),
            other => panic!("unexpected item: {other:?}"),
        }
    }
}
