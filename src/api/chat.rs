//! Chat endpoints: streamed answers, per-chat file uploads and feedback.

use futures::Stream;
use nonempty::NonEmpty;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::Serialize;

use crate::api::files_form;
use crate::case::to_snake_case;
use crate::client::{CaradocClient, ClientError};
use crate::decoder::{Separator, StreamEvent};
use crate::feed::MessageBlock;
use crate::http::EVENT_STREAM;
use crate::model::{ChatResponse, UploadStatus, UserFeedback, UserPromptRequest};
use crate::session::{CancelHandle, StreamSession};
use crate::token::UploadToken;
use crate::validation::UploadFile;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest<'a> {
    user_prompt_request: &'a UserPromptRequest,
    user_prompt_response: &'a ChatResponse,
    user_feedback: UserFeedback,
}

#[derive(Serialize)]
struct ClearRequest<'a> {
    token: &'a UploadToken,
}

impl CaradocClient {
    /// Raw event stream of an answer.
    pub async fn message_stream(
        &self,
        request: &UserPromptRequest,
        cancel: &CancelHandle,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ClientError>> + Send, ClientError> {
        let body = to_snake_case(serde_json::to_value(request)?);
        log::debug!("sending chat message in {:?} mode", request.mode);

        let request = self
            .request(Method::POST, "/chat/message")
            .header(ACCEPT, EVENT_STREAM)
            .json(&body);
        self.send_streaming(request, Separator::chat_marker(), cancel)
            .await
    }

    /// Ask a question and fold the streamed answer into `session`.
    pub async fn send_message(
        &self,
        request: &UserPromptRequest,
        session: &mut StreamSession<ChatResponse>,
    ) -> Result<(), ClientError> {
        let cancel = session.cancel_handle().clone();
        match self.message_stream(request, &cancel).await {
            Ok(events) => session.run(events).await,
            Err(err) => Err(session.abandon(err)),
        }
    }

    /// Raw progress stream of a chat file upload.
    pub async fn chat_upload_stream(
        &self,
        token: &UploadToken,
        files: &NonEmpty<UploadFile>,
        cancel: &CancelHandle,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ClientError>> + Send, ClientError> {
        let form = files_form(files)?.text("token", token.to_string());
        log::debug!("uploading {} file(s) for chat", files.len());

        let request = self
            .request(Method::POST, "/chat/upload")
            .header(ACCEPT, EVENT_STREAM)
            .multipart(form);
        self.send_streaming(request, Separator::newline(), cancel)
            .await
    }

    /// Upload files for file-mode answers, folding progress into `session`.
    pub async fn upload_chat_files(
        &self,
        token: &UploadToken,
        files: &NonEmpty<UploadFile>,
        session: &mut StreamSession<UploadStatus>,
    ) -> Result<(), ClientError> {
        let cancel = session.cancel_handle().clone();
        match self.chat_upload_stream(token, files, &cancel).await {
            Ok(events) => session.run(events).await,
            Err(err) => Err(session.abandon(err)),
        }
    }

    /// Drop the files uploaded under `token`.
    pub async fn clear_uploaded_files(&self, token: &UploadToken) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, "/chat/upload/clear")
            .json(&ClearRequest { token });
        self.send_empty(request).await
    }

    pub async fn send_feedback(
        &self,
        block: &MessageBlock,
        feedback: UserFeedback,
    ) -> Result<(), ClientError> {
        let body = to_snake_case(serde_json::to_value(FeedbackRequest {
            user_prompt_request: &block.user_prompt_request,
            user_prompt_response: &block.user_prompt_response,
            user_feedback: feedback,
        })?);
        let request = self.request(Method::POST, "/chat/feedback").json(&body);
        self.send_empty(request).await
    }
}
