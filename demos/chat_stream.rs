//! Ask a question against a collection and print the streamed answer.
//!
//! Run with:
//! ```bash
//! export CARADOC_API_URL="http://localhost:8000"
//! RUST_LOG=caradoc=debug cargo run --example chat_stream -- <collection-id> "your question"
//! ```
//!
//! Press Ctrl-C while the answer is streaming to stop it.

use caradoc::alert::Alert;
use caradoc::client::CaradocClient;
use caradoc::feed::ChatFeed;
use caradoc::model::{AnswerMode, ChatResponse};
use caradoc::session::{AbortReason, StreamSession};
use caradoc::token::UploadToken;
use caradoc::validation::{ChatForm, CollectionChoice};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let collection_id = args.next().ok_or("usage: chat_stream <collection-id> <question>")?;
    let message = args.collect::<Vec<_>>().join(" ");

    let client = CaradocClient::from_env()?;
    let settings = client.settings().await?;
    let workflow = settings
        .workflows
        .first()
        .cloned()
        .ok_or("the backend offers no workflow")?;
    let collection = settings
        .collections
        .iter()
        .find(|c| c.id == collection_id)
        .ok_or("unknown collection")?;
    println!("Using workflow {workflow} on collection {}", collection.name);

    let token = UploadToken::generate();
    let request = ChatForm {
        workflow,
        mode: Some(AnswerMode::Collection),
        collection: Some(CollectionChoice {
            id: collection.id.clone(),
            name: collection.name.clone(),
        }),
        attached_files: vec![],
        message,
    }
    .into_request(&token)?;

    let mut feed = ChatFeed::new();
    feed.push(request.clone());

    let mut session = StreamSession::new(ChatResponse::default());
    let stop = session.cancel_handle().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel(AbortReason::generation_stopped());
        }
    });

    let outcome = client.send_message(&request, &mut session).await;
    let events = session.events_folded();
    if let Some(Alert { title, description, .. }) = feed.record_turn(session.into_accumulator(), outcome) {
        eprintln!("[{title}] {description}");
    }

    if let Some(block) = feed.last() {
        let response = &block.user_prompt_response;
        println!("{}", response.content);
        println!("--- {} source(s), {events} event(s)", response.sources.len());
        for source in &response.sources {
            match source.file.page_number {
                Some(page) => println!("  {} (p. {page})", source.file.name),
                None => println!("  {}", source.file.name),
            }
        }
    }
    Ok(())
}
