//! Collection management endpoints.

use futures::Stream;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::Serialize;

use crate::api::files_form;
use crate::client::{CaradocClient, ClientError};
use crate::decoder::{Separator, StreamEvent};
use crate::http::EVENT_STREAM;
use crate::model::{Collection, CollectionList, CollectionSummary, UploadStatus};
use crate::session::{CancelHandle, StreamSession};
use crate::validation::CollectionUpload;

#[derive(Serialize)]
struct NameRequest<'a> {
    name: &'a str,
}

fn collection_path(id: &str) -> String {
    format!("/collections/{id}")
}

fn file_path(collection_id: &str, file_id: &str) -> String {
    format!("/collections/{collection_id}/files/{file_id}")
}

impl CaradocClient {
    pub async fn collections(&self) -> Result<Vec<CollectionSummary>, ClientError> {
        let list: CollectionList = self
            .send_json(self.request(Method::GET, "/collections/"))
            .await?;
        Ok(list.data)
    }

    /// A collection with its files.
    pub async fn collection(&self, id: &str) -> Result<Collection, ClientError> {
        self.send_json(self.request(Method::GET, &collection_path(id)))
            .await
    }

    pub async fn create_collection(&self, name: &str) -> Result<Collection, ClientError> {
        let request = self
            .request(Method::POST, "/collections/")
            .json(&NameRequest { name });
        self.send_json(request).await
    }

    pub async fn rename_collection(&self, id: &str, name: &str) -> Result<Collection, ClientError> {
        let request = self
            .request(Method::PATCH, &collection_path(id))
            .json(&NameRequest { name });
        self.send_json(request).await
    }

    pub async fn delete_collection(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &collection_path(id)))
            .await
    }

    /// Raw progress stream of a collection upload.
    pub async fn collection_upload_stream(
        &self,
        upload: &CollectionUpload,
        cancel: &CancelHandle,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ClientError>> + Send, ClientError> {
        let form = files_form(&upload.files)?.text("preprocessed", upload.preprocessed.to_string());
        log::debug!(
            "uploading {} file(s) to collection {}",
            upload.files.len(),
            upload.collection_id
        );

        let path = format!("{}/files/upload", collection_path(&upload.collection_id));
        let request = self
            .request(Method::POST, &path)
            .header(ACCEPT, EVENT_STREAM)
            .multipart(form);
        self.send_streaming(request, Separator::newline(), cancel)
            .await
    }

    /// Add files to a collection, folding ingestion progress into `session`.
    pub async fn upload_collection_files(
        &self,
        upload: &CollectionUpload,
        session: &mut StreamSession<UploadStatus>,
    ) -> Result<(), ClientError> {
        let cancel = session.cancel_handle().clone();
        match self.collection_upload_stream(upload, &cancel).await {
            Ok(events) => session.run(events).await,
            Err(err) => Err(session.abandon(err)),
        }
    }

    pub async fn delete_file(&self, collection_id: &str, file_id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &file_path(collection_id, file_id)))
            .await
    }

    /// Where a collection file can be downloaded from.
    pub fn file_download_url(&self, collection_id: &str, file_id: &str) -> String {
        self.url(&file_path(collection_id, file_id))
    }
}
