//! Client for the document-chat API and its error types.

use futures::Stream;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::case::to_camel_case;
use crate::decoder::{Separator, StreamDecodeError, StreamEvent};
use crate::http::{add_extra_headers, build_http_client, check_status};
use crate::options::ClientOptions;
use crate::session::{AbortReason, AbortTrigger, CancelHandle};
use crate::stream::{abortable, EventStreamExt};
use crate::validation::ValidationErrors;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Aborted(AbortReason),

    #[error("Stream decode error: {0}")]
    Decode(#[from] StreamDecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream session already finished")]
    SessionFinished,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the request was cancelled by starting a new chat.
    ///
    /// Such aborts are reported to the user but never written into the
    /// conversation feed, which is about to be cleared anyway.
    pub fn is_user_reset(&self) -> bool {
        matches!(self, ClientError::Aborted(reason) if reason.trigger == AbortTrigger::ResetButton)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ClientError::Aborted(_))
    }
}

/// HTTP client for the chat, collections and settings endpoints.
///
/// Endpoint methods live in [`crate::api`].
///
/// # Example
/// ```no_run
/// use caradoc::client::CaradocClient;
/// use caradoc::options::ClientOptions;
///
/// # async fn run() -> Result<(), caradoc::ClientError> {
/// let client = CaradocClient::new(ClientOptions::new("http://localhost:8000"))?;
/// let workflows = client.workflows().await?;
/// println!("{workflows:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CaradocClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl CaradocClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self { http, options })
    }

    /// Build a client from `CARADOC_API_URL` / `CARADOC_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientOptions::from_env()?)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        add_extra_headers(request, &self.options.extra_headers)
    }

    /// Send a request and decode its JSON body with camel-cased keys.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = check_status(request.send().await?).await?;
        let value: Value = response.json().await?;
        Ok(serde_json::from_value(to_camel_case(value))?)
    }

    /// Send a request whose response body is irrelevant.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Send a request and expose its body as a cancellable event stream.
    ///
    /// Cancelling `cancel` while the request is in flight drops it; after
    /// that the stream yields a single `Aborted` error and ends.
    pub(crate) async fn send_streaming(
        &self,
        request: RequestBuilder,
        separator: Separator,
        cancel: &CancelHandle,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ClientError>> + Send, ClientError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            response = request.send() => Some(response),
        };
        let Some(response) = response else {
            return Err(cancel.abort_error());
        };

        let response = check_status(response?).await?;
        Ok(abortable(response.events(separator), cancel.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Severity;

    #[test]
    fn test_url_joins_paths() {
        let client = CaradocClient::new(ClientOptions::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(client.url("/chat/message"), "http://localhost:8000/api/chat/message");
        assert_eq!(client.url("collections/"), "http://localhost:8000/api/collections/");
    }

    #[test]
    fn test_user_reset_detection() {
        assert!(ClientError::Aborted(AbortReason::chat_reset_during_generation()).is_user_reset());
        assert!(!ClientError::Aborted(AbortReason::generation_stopped()).is_user_reset());
        assert!(!ClientError::Config("x".to_string()).is_user_reset());

        let reason = AbortReason::new("t", "m", Severity::Info, AbortTrigger::Other);
        assert!(ClientError::Aborted(reason).is_aborted());
    }
}
