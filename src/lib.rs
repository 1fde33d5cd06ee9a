//! # caradoc - Streaming client for a document-chat API
//!
//! Talks to a retrieval-augmented chat backend whose answers and upload
//! progress arrive as framed JSON events over a single HTTP response body.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental event decoding with configurable separators
//! - Cancellable streamed sessions folding events into typed state
//! - Recursive snake_case / camelCase key translation
//! - Collections, settings and feedback endpoints
//! - Form validation before any request is sent
//!
//! ## Architecture
//!
//! Bytes flow through three layers:
//!
//! 1. **`StreamEventDecoder`** turns arbitrary chunks into `StreamEvent`s
//! 2. **`StreamSession`** runs the single reading loop, converts events to
//!    typed `ChatEvent`s / `UploadEvent`s and folds them into an
//!    `Accumulator`
//! 3. **`CancelHandle`** stops a session from anywhere, with a reason
//!
//! ## Example
//! ```no_run
//! use caradoc::client::CaradocClient;
//! use caradoc::model::{AnswerMode, ChatResponse};
//! use caradoc::session::StreamSession;
//! use caradoc::token::UploadToken;
//! use caradoc::validation::{ChatForm, CollectionChoice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CaradocClient::from_env()?;
//!     let token = UploadToken::generate();
//!
//!     let request = ChatForm {
//!         workflow: "Classic".to_string(),
//!         mode: Some(AnswerMode::Collection),
//!         collection: Some(CollectionChoice {
//!             id: "66a1".to_string(),
//!             name: "handbook".to_string(),
//!         }),
//!         attached_files: vec![],
//!         message: "What does the handbook say about remote work?".to_string(),
//!     }
//!     .into_request(&token)?;
//!
//!     let mut session = StreamSession::new(ChatResponse::default());
//!     client.send_message(&request, &mut session).await?;
//!     println!("{}", session.accumulator().content);
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod api;
pub mod case;
pub mod client;
pub mod decoder;
pub mod feed;
pub mod fold;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod stream;
pub mod token;
pub mod validation;

// Re-exports for convenience
pub use client::{CaradocClient, ClientError};
pub use decoder::{Separator, StreamDecodeError, StreamEvent, StreamEventDecoder};
pub use fold::Accumulator;
pub use model::{ChatEvent, ChatResponse, UploadEvent, UploadStatus};
pub use session::{AbortReason, CancelHandle, StreamSession};
