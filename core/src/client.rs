//! Stateless HTTP request builder and response parser for the crop API.
//!
//! # Design
//! `CropApiClient` holds only the immutable `ClientConfig`. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. The round-trip itself is
//! executed elsewhere (`CropApi` over reqwest, or an FFI host), so request and
//! response shaping live in exactly one place.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::types::{Detection, ImageUpload, Payload, ServiceStatus};

/// Everything except RFC 3986 unreserved characters is escaped, so a
/// detection id always lands in a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Synchronous, stateless client for the crop API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct CropApiClient {
    config: ClientConfig,
}

impl CropApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn api_url(&self) -> &str {
        self.config.api_url()
    }

    pub fn build_check_status(&self) -> HttpRequest {
        HttpRequest::get(format!("{}/", self.config.base_url()))
    }

    pub fn build_analyze_image(&self, upload: &ImageUpload) -> HttpRequest {
        self.build_analyze_image_with(MultipartForm::new(), upload)
    }

    /// Like `build_analyze_image`, but encodes into the given (empty) form,
    /// which fixes the multipart boundary.
    pub fn build_analyze_image_with(
        &self,
        form: MultipartForm,
        upload: &ImageUpload,
    ) -> HttpRequest {
        let mut form = form.file(
            "file",
            &upload.file_name,
            &upload.content_type,
            upload.file.clone(),
        );
        if let Some(crop_name) = upload.crop_name() {
            form = form.text("crop_name", crop_name);
        }
        HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/upload", self.config.api_url()),
            headers: vec![("content-type".to_string(), form.content_type())],
            body: Some(form.encode()),
        }
    }

    pub fn build_get_history(&self) -> HttpRequest {
        HttpRequest::get(format!("{}/history", self.config.api_url()))
    }

    pub fn build_get_detection(&self, detection_id: &str) -> HttpRequest {
        let id = utf8_percent_encode(detection_id, PATH_SEGMENT);
        HttpRequest::get(format!("{}/detections/{id}", self.config.api_url()))
    }

    /// The status code is deliberately not checked here: any completed
    /// request with a JSON object body counts. `status` and `message` are
    /// copied as the server sent them, whatever their JSON type.
    pub fn parse_check_status(&self, response: HttpResponse) -> Result<ServiceStatus, ApiError> {
        let body: Value = serde_json::from_str(&response.body)?;
        let Value::Object(mut fields) = body else {
            return Err(ApiError::Parse("expected a JSON object".to_string()));
        };
        Ok(ServiceStatus {
            status: fields.remove("status").filter(|v| !v.is_null()),
            message: fields.remove("message").filter(|v| !v.is_null()),
        })
    }

    pub fn parse_analyze_image(
        &self,
        response: HttpResponse,
    ) -> Result<Payload<Detection>, ApiError> {
        parse_data(response)
    }

    /// `data` is whatever JSON the server returned, normally an array of
    /// detections in server order.
    pub fn parse_get_history(
        &self,
        response: HttpResponse,
    ) -> Result<Payload<Detection>, ApiError> {
        parse_data(response)
    }

    pub fn parse_get_detection(
        &self,
        response: HttpResponse,
    ) -> Result<Payload<Detection>, ApiError> {
        parse_data(response)
    }
}

impl Default for CropApiClient {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

/// Map non-2xx responses to `HttpStatus` before the body is looked at.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_data(response: HttpResponse) -> Result<Payload<Detection>, ApiError> {
    check_status(&response)?;
    let data = serde_json::from_str(&response.body)?;
    Ok(Payload { data })
}
