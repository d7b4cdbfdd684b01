//! Client for the crop disease detection API.
//!
//! # Overview
//! Four operations: service status, image upload and analysis, detection
//! history, and single detection lookup. `CropApi` runs them asynchronously
//! over reqwest and always returns an `ApiResult`, never an unhandled error.
//!
//! # Design
//! - `CropApiClient` is stateless and does no I/O: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`. The FFI crate drives
//!   the same pairs, so both consumption modes behave identically.
//! - Detection records are opaque `serde_json::Value`s.
//! - `ApiError` separates transport, HTTP status and parse failures while its
//!   `Display` output is the envelope's `error` string.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod types;

pub use api::CropApi;
pub use client::CropApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::{FormPart, MultipartForm};
pub use types::{ApiResult, Detection, ImageUpload, Payload, ServiceStatus};
