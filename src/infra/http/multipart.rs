//! Multipart chat submission parsing.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::{Field, MultipartError};
use futures::StreamExt;
use tracing::{debug, error};

use crate::{
    application::error::HttpError,
    domain::chat::{ChatPrompt, UploadedFile},
    infra::uploads::{UploadStorage, UploadStorageError},
};

const SOURCE_BASE: &str = "infra::http::multipart";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub(super) enum UploadPayloadError {
    PayloadTooLarge,
    InvalidFormData,
    Read { detail: String },
    Storage(UploadStorageError),
}

impl UploadPayloadError {
    pub(super) fn into_http(self, limit_bytes: u64) -> HttpError {
        match self {
            UploadPayloadError::PayloadTooLarge => HttpError::new(
                SOURCE_BASE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body is too large",
                format!("request exceeds {limit_bytes} bytes"),
            ),
            UploadPayloadError::InvalidFormData => HttpError::new(
                SOURCE_BASE,
                StatusCode::BAD_REQUEST,
                "Form data was invalid",
                "multipart payload could not be parsed",
            ),
            UploadPayloadError::Read { detail } => HttpError::new(
                SOURCE_BASE,
                StatusCode::BAD_REQUEST,
                "Form data could not be read",
                detail,
            ),
            UploadPayloadError::Storage(UploadStorageError::PayloadTooLarge { source }) => {
                HttpError::new(
                    SOURCE_BASE,
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body is too large",
                    source.to_string(),
                )
            }
            UploadPayloadError::Storage(err) => HttpError::from_error(
                SOURCE_BASE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload could not be stored",
                &err,
            ),
        }
    }
}

impl From<MultipartError> for UploadPayloadError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        error!(
            target = SOURCE_BASE,
            status = status.as_u16(),
            error = %err,
            "failed to read multipart payload"
        );
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => UploadPayloadError::PayloadTooLarge,
            StatusCode::BAD_REQUEST => UploadPayloadError::InvalidFormData,
            _ => UploadPayloadError::Read {
                detail: err.to_string(),
            },
        }
    }
}

/// Read the optional `message` and `file` parts of a chat submission.
///
/// The file is streamed to storage as soon as its part arrives. Unknown parts
/// are skipped; a file part without a filename counts as no file.
pub(super) async fn read_chat_prompt(
    multipart: &mut Multipart,
    storage: &UploadStorage,
) -> Result<ChatPrompt, UploadPayloadError> {
    let mut message: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("message") => {
                message = Some(field.text().await?);
            }
            Some("file") if file.is_none() => {
                file = store_file(field, storage).await?;
            }
            _ => continue,
        }
    }

    Ok(ChatPrompt::new(message, file))
}

async fn store_file(
    field: Field,
    storage: &UploadStorage,
) -> Result<Option<UploadedFile>, UploadPayloadError> {
    let Some(original_name) = field
        .file_name()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
    else {
        debug!(target = SOURCE_BASE, "file part without filename ignored");
        return Ok(None);
    };

    let mime_type = field
        .content_type()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

    let stream = field.map(|result| {
        result.map_err(|err| {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                UploadStorageError::PayloadTooLarge {
                    source: Box::new(err),
                }
            } else {
                UploadStorageError::PayloadStream {
                    source: Box::new(err),
                }
            }
        })
    });

    let stored = storage
        .store_stream(&original_name, stream)
        .await
        .map_err(UploadPayloadError::Storage)?;

    debug!(
        target = SOURCE_BASE,
        stored_path = %stored.stored_path,
        size_bytes = stored.size_bytes,
        "stored chat attachment"
    );

    Ok(Some(UploadedFile {
        original_name,
        mime_type,
        size_bytes: stored.size_bytes,
        stored_path: stored.stored_path,
    }))
}
