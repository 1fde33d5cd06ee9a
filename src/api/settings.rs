//! Settings endpoints.

use reqwest::Method;

use crate::client::{CaradocClient, ClientError};
use crate::model::CollectionSummary;

/// What the chat form needs before a question can be asked.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub workflows: Vec<String>,
    pub collections: Vec<CollectionSummary>,
}

impl CaradocClient {
    /// Names of the answer workflows the backend offers.
    pub async fn workflows(&self) -> Result<Vec<String>, ClientError> {
        self.send_json(self.request(Method::GET, "/settings/workflows"))
            .await
    }

    /// Workflows and collections, fetched concurrently.
    pub async fn settings(&self) -> Result<Settings, ClientError> {
        let (workflows, collections) = futures::try_join!(self.workflows(), self.collections())?;
        Ok(Settings {
            workflows,
            collections,
        })
    }
}
