use caradoc::client::{CaradocClient, ClientError};
use caradoc::feed::{ChatFeed, MessageBlock};
use caradoc::model::{AnswerMode, ChatResponse, UploadStatus, UserFeedback};
use caradoc::options::ClientOptions;
use caradoc::session::{SessionState, StreamSession};
use caradoc::token::UploadToken;
use caradoc::validation::{ChatForm, CollectionChoice, UploadFile};
use nonempty::nonempty;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CaradocClient {
    CaradocClient::new(ClientOptions::new(server.uri())).unwrap()
}

fn chat_form() -> ChatForm {
    ChatForm {
        workflow: "Classic".to_string(),
        mode: Some(AnswerMode::Collection),
        collection: Some(CollectionChoice {
            id: "66a1".to_string(),
            name: "handbook".to_string(),
        }),
        attached_files: vec![],
        message: "How many vacation days do I get?".to_string(),
    }
}

fn chat_body() -> String {
    let events = [
        json!({"event": "sources", "data": {"sources": [{
            "id": "s1",
            "content": "Employees get 25 days.",
            "score": 0.91,
            "file": {"name": "handbook.pdf", "type": "pdf", "page_number": 12}
        }]}}),
        json!({"event": "content", "data": {"content": "You get "}}),
        json!({"event": "content", "data": {"content": "25 days."}}),
    ];
    events.iter().map(|e| format!("{e}$$$\n")).collect()
}

#[tokio::test]
async fn test_send_message_folds_streamed_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/message"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({
            "workflow": "Classic",
            "mode": "collection",
            "collection_id": "66a1",
            "collection_name": "handbook",
            "index": "66a1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(chat_body(), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let request = chat_form().into_request(&UploadToken::generate()).unwrap();
    let mut session = StreamSession::new(ChatResponse::default());

    client.send_message(&request, &mut session).await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.events_folded(), 3);
    let response = session.accumulator();
    assert_eq!(response.content, "You get 25 days.");
    assert_eq!(response.sources[0].file.page_number, Some(12));
    assert!(response.generation_completed);
}

#[tokio::test]
async fn test_malformed_stream_discards_partial_answer() {
    let server = MockServer::start().await;
    let body = format!(
        "{}$$$\n{{\"event\": \"content\", \"data\":",
        json!({"event": "content", "data": {"content": "partial"}})
    );
    Mock::given(method("POST"))
        .and(path("/chat/message"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client(&server);
    let request = chat_form().into_request(&UploadToken::generate()).unwrap();
    let mut feed = ChatFeed::new();
    feed.push(request.clone());

    let mut session = StreamSession::new(ChatResponse::default());
    let outcome = client.send_message(&request, &mut session).await;
    assert!(matches!(outcome, Err(ClientError::Decode(_))));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.accumulator().content, "partial");

    let alert = feed.record_turn(session.into_accumulator(), outcome).unwrap();
    assert_eq!(alert.description, "Processing the response failed.");
    let block = feed.last().unwrap();
    assert_eq!(block.user_prompt_response.content, "");
    assert!(block.error_message.is_some());
}

#[tokio::test]
async fn test_api_error_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/message"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Unknown workflow"})))
        .mount(&server)
        .await;

    let client = client(&server);
    let request = chat_form().into_request(&UploadToken::generate()).unwrap();
    let mut session = StreamSession::new(ChatResponse::default());

    let err = client.send_message(&request, &mut session).await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Unknown workflow");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_invalid_form_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let form = ChatForm {
        mode: Some(AnswerMode::File),
        ..chat_form()
    };
    let mut session = StreamSession::new(ChatResponse::default());

    let result: Result<(), ClientError> = async {
        let request = form.into_request(&UploadToken::generate())?;
        client.send_message(&request, &mut session).await
    }
    .await;

    let Err(ClientError::Validation(errors)) = result else {
        panic!("expected a validation error");
    };
    assert!(errors.for_field("files").is_some());
    assert_eq!(session.state(), SessionState::Pending);
}

#[tokio::test]
async fn test_chat_upload_reports_latest_progress() {
    let server = MockServer::start().await;
    let token = UploadToken::parse("abcdefghijklmnop-ABCDEFGHIJKLMNOP").unwrap();
    let body = [
        json!({"event": "uploadFeedback", "data": {"message": "Fetching files..."}}),
        json!({"event": "uploadFeedback", "data": {"message": "Formatting files..."}}),
    ]
    .iter()
    .map(|e| format!("{e}\n"))
    .collect::<String>();

    Mock::given(method("POST"))
        .and(path("/chat/upload"))
        .and(body_string_contains("abcdefghijklmnop-ABCDEFGHIJKLMNOP"))
        .and(body_string_contains("filename=\"notes.md\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let files = nonempty![UploadFile::new("notes.md", "# Notes").unwrap()];
    let mut session = StreamSession::new(UploadStatus::preparing());

    client.upload_chat_files(&token, &files, &mut session).await.unwrap();

    let status = session.accumulator();
    assert_eq!(status.message.as_deref(), Some("Formatting files..."));
    assert!(status.completed);
}

#[tokio::test]
async fn test_clear_and_feedback() {
    let server = MockServer::start().await;
    let token = UploadToken::parse("abcdefghijklmnop-ABCDEFGHIJKLMNOP").unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/upload/clear"))
        .and(body_partial_json(json!({"token": "abcdefghijklmnop-ABCDEFGHIJKLMNOP"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/feedback"))
        .and(body_partial_json(json!({
            "user_feedback": 1,
            "user_prompt_request": {"collection_id": "66a1"},
            "user_prompt_response": {"content": "25 days.", "generation_completed": true}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.clear_uploaded_files(&token).await.unwrap();

    let mut block = MessageBlock::new(chat_form().into_request(&token).unwrap());
    block.user_prompt_response = ChatResponse {
        content: "25 days.".to_string(),
        generation_completed: true,
        ..Default::default()
    };
    client.send_feedback(&block, UserFeedback::Up).await.unwrap();
}
