//! Endpoint methods on [`CaradocClient`](crate::client::CaradocClient).

pub mod chat;
pub mod collections;
pub mod evaluation;
pub mod settings;

pub use settings::Settings;

use nonempty::NonEmpty;
use reqwest::multipart::{Form, Part};

use crate::client::ClientError;
use crate::validation::UploadFile;

/// Multipart form with one `files` part per file.
pub(crate) fn files_form(files: &NonEmpty<UploadFile>) -> Result<Form, ClientError> {
    files.iter().try_fold(Form::new(), |form, file| -> Result<Form, ClientError> {
        let part = Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())?;
        Ok(form.part("files", part))
    })
}
