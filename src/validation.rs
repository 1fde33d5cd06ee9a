//! Input validation for chat and collection forms.
//!
//! Everything here runs before a request is built; a failed validation
//! never reaches the network.

use bytes::Bytes;
use itertools::Itertools;
use nonempty::NonEmpty;
use std::path::Path;
use thiserror::Error;

use crate::client::ClientError;
use crate::model::{AnswerMode, EvaluationRequest, UserPromptRequest, DEFAULT_EVALUATION_PRECISION};
use crate::token::UploadToken;

pub const REQUIRED_FIELD_MESSAGE: &str = "This field is required.";

/// File types accepted for upload, by content type.
pub const ACCEPTED_FILE_TYPES: &[(&str, &[&str])] = &[
    ("application/pdf", &["pdf"]),
    ("application/vnd.oasis.opendocument.text", &["odt"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("text/plain", &["txt"]),
    ("text/markdown", &["md"]),
    ("text/html", &["html", "htm"]),
    ("text/csv", &["csv"]),
];

/// Content type of an accepted file name, by extension.
pub fn accepted_content_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_FILE_TYPES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(content_type, _)| *content_type)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, REQUIRED_FIELD_MESSAGE)
    }
}

/// Every problem found in one form, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.iter().join("; "))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

fn unsupported_type(name: &str) -> ValidationError {
    ValidationError::new("files", format!("unsupported file type: {name}"))
}

/// A file ready to be sent in a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    content_type: &'static str,
    contents: Bytes,
}

impl UploadFile {
    /// Wrap file contents, rejecting unsupported file types.
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let name = name.into();
        let content_type = accepted_content_type(&name).ok_or_else(|| unsupported_type(&name))?;
        Ok(Self {
            name,
            content_type,
            contents: contents.into(),
        })
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Config(format!("not a file path: {}", path.display())))?
            .to_string();
        // Check the type before reading the whole file
        if accepted_content_type(&name).is_none() {
            return Err(ClientError::Validation(unsupported_type(&name).into()));
        }
        let contents = tokio::fs::read(path).await?;
        log::debug!("read {} ({} bytes)", path.display(), contents.len());
        Ok(Self::new(name, contents).map_err(ValidationErrors::from)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }
}

/// A collection picked in the chat form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChoice {
    pub id: String,
    pub name: String,
}

/// The chat message form.
#[derive(Debug, Clone, Default)]
pub struct ChatForm {
    pub workflow: String,
    pub mode: Option<AnswerMode>,
    pub collection: Option<CollectionChoice>,
    /// Names of the files already uploaded for this chat
    pub attached_files: Vec<String>,
    pub message: String,
}

impl ChatForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.workflow.is_empty() {
            errors.push(ValidationError::required("workflow"));
        }
        match self.mode {
            None => errors.push(ValidationError::required("mode")),
            Some(AnswerMode::Collection) if self.collection.is_none() => {
                errors.push(ValidationError::required("collectionId"));
            }
            Some(AnswerMode::File) if self.attached_files.is_empty() => {
                errors.push(ValidationError::new("files", "Selecting files is required."));
            }
            Some(_) => {}
        }
        if self.message.is_empty() {
            errors.push(ValidationError::required("message"));
        }

        ValidationErrors(errors).into_result()
    }

    /// Validate and build the request sent to the chat endpoint.
    ///
    /// The retrieval index is the collection id in collection mode and the
    /// upload token in file mode.
    pub fn into_request(self, token: &UploadToken) -> Result<UserPromptRequest, ValidationErrors> {
        self.validate()?;
        let mode = self.mode.unwrap_or(AnswerMode::Collection);

        let (index, collection_id, collection_name) = match (mode, self.collection) {
            (AnswerMode::Collection, Some(collection)) => {
                (collection.id.clone(), Some(collection.id), Some(collection.name))
            }
            _ => (token.to_string(), None, None),
        };

        Ok(UserPromptRequest {
            workflow: self.workflow,
            mode,
            collection_id,
            collection_name,
            index,
            message: self.message,
            token: token.clone(),
        })
    }
}

/// Files to add to a collection, after validation.
#[derive(Debug, Clone)]
pub struct CollectionUpload {
    pub collection_id: String,
    pub files: NonEmpty<UploadFile>,
    pub preprocessed: bool,
}

/// The "add files to a collection" form.
#[derive(Debug, Clone, Default)]
pub struct AddFilesForm {
    pub collection_id: String,
    pub files: Vec<UploadFile>,
    pub preprocessed: bool,
}

impl AddFilesForm {
    pub fn validate(self) -> Result<CollectionUpload, ValidationErrors> {
        let mut errors = Vec::new();
        if self.collection_id.is_empty() {
            errors.push(ValidationError::required("collectionId"));
        }
        let files = NonEmpty::from_vec(self.files);
        if files.is_none() {
            errors.push(ValidationError::new("files", "Add at least one file."));
        }

        match files {
            Some(files) if errors.is_empty() => Ok(CollectionUpload {
                collection_id: self.collection_id,
                files,
                preprocessed: self.preprocessed,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

/// The create / rename collection form.
#[derive(Debug, Clone, Default)]
pub struct CollectionForm {
    pub name: String,
}

impl CollectionForm {
    /// `existing` are the names already taken.
    pub fn validate<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push(ValidationError::required("name"));
        } else if existing.into_iter().any(|name| name == self.name) {
            errors.push(ValidationError::new("name", "This collection already exists."));
        }
        ValidationErrors(errors).into_result()
    }
}

/// The "evaluate a workflow on a collection" form.
#[derive(Debug, Clone, Default)]
pub struct EvaluationForm {
    pub collection_id: String,
    pub workflow: String,
}

impl EvaluationForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if self.collection_id.is_empty() {
            errors.push(ValidationError::required("collectionId"));
        }
        if self.workflow.is_empty() {
            errors.push(ValidationError::required("workflow"));
        }
        ValidationErrors(errors).into_result()
    }

    pub fn into_request(self) -> Result<EvaluationRequest, ValidationErrors> {
        self.validate()?;
        Ok(EvaluationRequest {
            workflow: self.workflow,
            index: self.collection_id,
            precision: DEFAULT_EVALUATION_PRECISION,
        })
    }
}
