//! Cancellable streamed exchanges.
//!
//! A [`StreamSession`] owns the accumulator for one streamed request and
//! runs the single reading loop that folds events into it. Cancellation goes
//! through a [`CancelHandle`] that is created before the request starts and
//! can be cloned to whoever needs to stop it.

use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

use crate::alert::Severity;
use crate::client::ClientError;
use crate::decoder::StreamEvent;
use crate::fold::Accumulator;

/// The user action that cancelled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortTrigger {
    /// "New chat" while a request is in flight
    ResetButton,
    /// Stop button on the message form
    FormSubmitCancelButton,
    /// Cancel button on a running upload
    FilesUploadCancelButton,
    /// Removing the attached files during generation
    ClearAttachedFilesButton,
    /// Closing the dialog that started the upload
    ModalClosed,
    Other,
}

/// Why a request was cancelled, with the wording shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub trigger: AbortTrigger,
}

impl AbortReason {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        trigger: AbortTrigger,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            trigger,
        }
    }

    pub fn chat_reset_during_generation() -> Self {
        Self::new(
            "New chat",
            "Response generation was interrupted.",
            Severity::Warning,
            AbortTrigger::ResetButton,
        )
    }

    pub fn chat_reset_during_upload() -> Self {
        Self::new(
            "New chat",
            "File upload was interrupted.",
            Severity::Warning,
            AbortTrigger::ResetButton,
        )
    }

    pub fn generation_stopped() -> Self {
        Self::new(
            "Stopped",
            "Response generation was interrupted.",
            Severity::Info,
            AbortTrigger::FormSubmitCancelButton,
        )
    }

    pub fn upload_cancelled() -> Self {
        Self::new(
            "Upload interrupted",
            "File upload was interrupted.",
            Severity::Info,
            AbortTrigger::FilesUploadCancelButton,
        )
    }

    pub fn attached_files_cleared() -> Self {
        Self::new(
            "Files removed",
            "Response generation was interrupted.",
            Severity::Warning,
            AbortTrigger::ClearAttachedFilesButton,
        )
    }

    pub fn upload_dialog_closed() -> Self {
        Self::new(
            "Upload interrupted",
            "File upload was interrupted.",
            Severity::Info,
            AbortTrigger::ModalClosed,
        )
    }
}

impl Default for AbortReason {
    fn default() -> Self {
        Self::new(
            "Aborted",
            "The request was aborted.",
            Severity::Warning,
            AbortTrigger::Other,
        )
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// How a handle was closed. Only the first close counts.
#[derive(Debug)]
enum Closed {
    Cancelled(AbortReason),
    Finished,
}

/// Cancellation handle shared between a session and its owner.
///
/// Cancelling is idempotent: the first reason wins and later calls are
/// no-ops. Once the session has finished, cancelling is a no-op too.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
    closed: Arc<OnceLock<Closed>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel with a reason. Returns `false` if already cancelled or if the
    /// session has finished.
    pub fn cancel(&self, reason: AbortReason) -> bool {
        let first = self.closed.set(Closed::Cancelled(reason)).is_ok();
        if first {
            self.token.cancel();
            log::debug!("stream cancelled: {}", self.abort_reason());
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&AbortReason> {
        match self.closed.get() {
            Some(Closed::Cancelled(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Resolves once the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Mark the session as over. Later cancels are no-ops.
    pub(crate) fn close(&self) {
        let _ = self.closed.set(Closed::Finished);
    }

    fn abort_reason(&self) -> AbortReason {
        self.reason().cloned().unwrap_or_default()
    }

    pub(crate) fn abort_error(&self) -> ClientError {
        ClientError::Aborted(self.abort_reason())
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// One streamed request and the accumulator its events are folded into.
///
/// # Example
/// ```no_run
/// use caradoc::client::CaradocClient;
/// use caradoc::model::ChatResponse;
/// use caradoc::session::{AbortReason, StreamSession};
///
/// # async fn run(client: CaradocClient, request: caradoc::model::UserPromptRequest) {
/// let mut session = StreamSession::new(ChatResponse::default());
/// let stop = session.cancel_handle().clone();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     stop.cancel(AbortReason::generation_stopped());
/// });
///
/// match client.send_message(&request, &mut session).await {
///     Ok(()) => println!("{}", session.accumulator().content),
///     Err(err) => eprintln!("{err}"),
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct StreamSession<A> {
    cancel: CancelHandle,
    accumulator: A,
    state: SessionState,
    events_folded: usize,
}

impl<A: Accumulator> StreamSession<A> {
    pub fn new(accumulator: A) -> Self {
        Self::with_cancel_handle(accumulator, CancelHandle::new())
    }

    pub fn with_cancel_handle(accumulator: A, cancel: CancelHandle) -> Self {
        Self {
            cancel,
            accumulator,
            state: SessionState::Pending,
            events_folded: 0,
        }
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Cancel the session. A no-op once it has finished or was cancelled.
    pub fn cancel(&self, reason: AbortReason) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.cancel.cancel(reason)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn events_folded(&self) -> usize {
        self.events_folded
    }

    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    pub fn into_accumulator(self) -> A {
        self.accumulator
    }

    /// Fold every event of `events` into the accumulator, in order.
    ///
    /// Returns once the stream ends (the accumulator is then completed),
    /// fails, or the session is cancelled. No event is folded after
    /// cancellation.
    pub async fn run<S>(&mut self, events: S) -> Result<(), ClientError>
    where
        S: Stream<Item = Result<StreamEvent, ClientError>>,
    {
        if self.state != SessionState::Pending {
            return Err(ClientError::SessionFinished);
        }
        self.state = SessionState::Streaming;
        futures::pin_mut!(events);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = events.next() => Some(item),
            };
            let Some(item) = next else {
                return Err(self.abandon(self.cancel.abort_error()));
            };
            if self.cancel.is_cancelled() {
                return Err(self.abandon(self.cancel.abort_error()));
            }

            match item {
                Some(Ok(event)) => {
                    let event = A::Event::try_from(event).map_err(|err| self.abandon(err.into()))?;
                    self.accumulator.fold(event);
                    self.events_folded += 1;
                }
                Some(Err(err)) => return Err(self.abandon(err)),
                None => {
                    self.accumulator.complete();
                    self.state = SessionState::Completed;
                    self.cancel.close();
                    log::info!("stream completed after {} event(s)", self.events_folded);
                    return Ok(());
                }
            }
        }
    }

    /// Mark the session as failed (or cancelled, for aborts) and hand the
    /// error back.
    pub(crate) fn abandon(&mut self, err: ClientError) -> ClientError {
        self.state = if err.is_aborted() {
            SessionState::Cancelled
        } else {
            SessionState::Failed
        };
        self.cancel.close();
        log::warn!("stream session ended early: {err}");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatResponse, UploadStatus};
    use futures::stream;
    use serde_json::json;

    fn content(text: &str) -> Result<StreamEvent, ClientError> {
        Ok(StreamEvent::new("content", json!({"content": text})))
    }

    #[tokio::test]
    async fn test_run_folds_in_order_and_completes() {
        let mut session = StreamSession::new(ChatResponse::default());
        let events = stream::iter(vec![
            Ok(StreamEvent::new(
                "sources",
                json!({"sources": [{"id": "1", "content": "c", "score": 0.5, "file": {"name": "a.pdf", "type": "pdf"}}]}),
            )),
            content("Hello"),
            content(" world"),
        ]);

        session.run(events).await.unwrap();

        assert!(session.is_completed());
        assert_eq!(session.events_folded(), 3);
        let response = session.accumulator();
        assert_eq!(response.content, "Hello world");
        assert_eq!(response.sources.len(), 1);
        assert!(response.generation_completed);
    }

    #[tokio::test]
    async fn test_cancel_after_two_events() {
        let mut session = StreamSession::new(ChatResponse::default());
        let handle = session.cancel_handle().clone();

        let events = stream::iter(["a", "b", "c", "d", "e"]).enumerate().map(move |(i, text)| {
            if i == 2 {
                handle.cancel(AbortReason::generation_stopped());
            }
            content(text)
        });

        let err = session.run(events).await.unwrap_err();
        assert!(matches!(err, ClientError::Aborted(ref reason) if reason.trigger == AbortTrigger::FormSubmitCancelButton));
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(session.events_folded(), 2);
        assert_eq!(session.accumulator().content, "ab");
        assert!(!session.accumulator().generation_completed);

        // Cancelling again is a no-op
        assert!(!session.cancel(AbortReason::chat_reset_during_generation()));
        assert!(!session.cancel_handle().cancel(AbortReason::default()));
        assert_eq!(
            session.cancel_handle().reason().unwrap().trigger,
            AbortTrigger::FormSubmitCancelButton
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let mut session = StreamSession::new(UploadStatus::default());
        assert!(session.cancel(AbortReason::upload_cancelled()));

        let err = session.run(stream::pending::<Result<StreamEvent, ClientError>>()).await.unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(session.events_folded(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let mut session = StreamSession::new(ChatResponse::default());
        session.run(stream::iter(vec![content("x")])).await.unwrap();

        assert!(!session.cancel(AbortReason::generation_stopped()));
        assert!(!session.cancel_handle().is_cancelled());
        assert!(matches!(
            session.run(stream::empty::<Result<StreamEvent, ClientError>>()).await,
            Err(ClientError::SessionFinished)
        ));
    }

    #[tokio::test]
    async fn test_shared_handle_is_inert_after_completion() {
        let mut session = StreamSession::new(ChatResponse::default());
        let handle = session.cancel_handle().clone();
        session.run(stream::empty::<Result<StreamEvent, ClientError>>()).await.unwrap();

        assert!(!handle.cancel(AbortReason::generation_stopped()));
        assert!(!handle.is_cancelled());
        assert!(handle.reason().is_none());
    }

    #[tokio::test]
    async fn test_shared_handle_is_inert_after_failure() {
        let mut session = StreamSession::new(ChatResponse::default());
        let handle = session.cancel_handle().clone();
        let events = stream::iter(vec![Err(ClientError::Config("connection reset".to_string()))]);

        assert!(session.run(events).await.is_err());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!handle.cancel(AbortReason::chat_reset_during_generation()));
        assert!(handle.reason().is_none());
    }

    #[tokio::test]
    async fn test_schema_error_fails_session() {
        let mut session = StreamSession::new(ChatResponse::default());
        let events = stream::iter(vec![Ok(StreamEvent::new("content", json!({"content": 42})))]);

        let err = session.run(events).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }
}
