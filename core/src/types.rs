//! Domain DTOs and the result envelope for the crop API.
//!
//! # Design
//! Detection records are opaque: the client passes them through as
//! `serde_json::Value` and never reconstructs a schema for them. The only
//! fields the client reads itself are `status` and `message` from the root
//! endpoint.
//!
//! `ApiResult` is what every `CropApi` operation returns. It serializes to
//! `{"success": true, ...payload}` or `{"success": false, "error": "..."}`.

use std::path::Path;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiError;

/// A single analysis record as returned by the server. Opaque to the client.
pub type Detection = Value;

/// Fields extracted from `GET /`, kept with whatever JSON type the server
/// used. Missing and `null` fields are `None` and left out of the envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl ServiceStatus {
    /// `status`, when the server sent it as a string.
    pub fn status_str(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    pub fn message_str(&self) -> Option<&str> {
        self.message.as_ref().and_then(Value::as_str)
    }
}

/// Success payload of the data-bearing operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload<T> {
    pub data: T,
}

/// An image to submit for analysis.
///
/// Contents are not inspected; type and size validation belong to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub crop_name: Option<String>,
}

impl ImageUpload {
    pub fn new(file: impl Into<Vec<u8>>) -> Self {
        Self {
            file: file.into(),
            file_name: "image.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            crop_name: None,
        }
    }

    /// Read an image from disk, taking the file name and a content type
    /// guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::read(path)?;
        let mut upload = Self::new(file);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            upload.file_name = name.to_string();
        }
        upload.content_type = content_type_for(path).to_string();
        Ok(upload)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_crop_name(mut self, crop_name: impl Into<String>) -> Self {
        self.crop_name = Some(crop_name.into());
        self
    }

    /// The crop name to send, if any. Empty names count as absent.
    pub fn crop_name(&self) -> Option<&str> {
        self.crop_name.as_deref().filter(|name| !name.is_empty())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Uniform outcome of a `CropApi` operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Failure(ApiError),
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            ApiResult::Success(payload) => Some(payload),
            ApiResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiResult::Success(_) => None,
            ApiResult::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            ApiResult::Success(payload) => Ok(payload),
            ApiResult::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, ApiError>> for ApiResult<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(payload) => ApiResult::Success(payload),
            Err(err) => ApiResult::Failure(err),
        }
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T> {
    success: bool,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Serialize)]
struct FailureEnvelope {
    success: bool,
    error: String,
}

impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResult::Success(payload) => SuccessEnvelope {
                success: true,
                payload,
            }
            .serialize(serializer),
            ApiResult::Failure(err) => FailureEnvelope {
                success: false,
                error: err.to_string(),
            }
            .serialize(serializer),
        }
    }
}
