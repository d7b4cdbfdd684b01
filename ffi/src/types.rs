//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! tagged enums with explicit discriminants. Detection payloads stay opaque
//! and cross the boundary as JSON text. Conversion functions live here to
//! keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use crop_api_core::{ApiError, ApiResult, HttpMethod, ServiceStatus};
use serde::Serialize;
use serde_json::Value;

/// Opaque handle to a `CropApiClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiCropClient {
    pub(crate) inner: crop_api_core::CropApiClient,
}

/// Allocate a C string, dropping interior NULs rather than failing.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    let cleaned = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(cleaned).unwrap_or_default().into_raw()
}

/// Strings cross as their text; any other JSON value crosses as JSON.
fn status_field(value: Option<Value>) -> *mut c_char {
    match value {
        None => std::ptr::null_mut(),
        Some(Value::String(s)) => c_string(s),
        Some(other) => c_string(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `crop_build_*` functions. The C caller sends `body_len` bytes from
/// `body` (null when there is no body) and passes the response back through
/// `crop_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: crop_api_core::HttpRequest) -> *mut Self {
        let url = c_string(req.url);

        let (body, body_len) = match req.body {
            Some(bytes) => {
                let boxed = bytes.into_boxed_slice();
                let len = boxed.len();
                (Box::into_raw(boxed) as *mut u8, len)
            }
            None => (std::ptr::null_mut(), 0),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
            body_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request and passes a
/// pointer to a `crop_parse_*` function. The FFI layer reads but does not
/// free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiCropResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    HttpStatus = 2,
    Parse = 3,
    Panic = 4,
    NullArg = 5,
}

/// Tag that tells `crop_free_result` what `FfiCropResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is an `FfiServiceStatus*`.
    Status = 1,
    /// `data` is a NUL-terminated JSON document (`char*`).
    Json = 2,
}

/// Fields from the status endpoint. Either pointer may be null when the
/// server omitted the field or sent `null`. A string field holds its text; a
/// field of any other JSON type holds that value serialized as JSON. The
/// `envelope` of the enclosing result keeps the original types.
#[repr(C)]
pub struct FfiServiceStatus {
    pub status: *mut c_char,
    pub message: *mut c_char,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload (tagged by `data_tag`). On failure `error_code`
/// describes the category, `error_message` is a human-readable C string, and
/// `data` is null. `envelope` always holds the same outcome as JSON:
/// `{"success":true,...}` or `{"success":false,"error":"..."}`.
#[repr(C)]
pub struct FfiCropResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
    pub envelope: *mut c_char,
}

fn envelope_json<T: Serialize>(result: &ApiResult<T>) -> *mut c_char {
    match serde_json::to_string(result) {
        Ok(json) => c_string(json),
        Err(_) => std::ptr::null_mut(),
    }
}

fn failure_envelope(message: &str) -> *mut c_char {
    c_string(serde_json::json!({ "success": false, "error": message }).to_string())
}

impl FfiCropResult {
    /// Build a success result carrying an `FfiServiceStatus`.
    pub(crate) fn ok_status(status: ServiceStatus) -> *mut Self {
        let envelope = envelope_json(&ApiResult::Success(status.clone()));
        let ffi_status = Box::new(FfiServiceStatus {
            status: status_field(status.status),
            message: status_field(status.message),
        });
        Box::into_raw(Box::new(FfiCropResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag: FfiDataTag::Status,
            data: Box::into_raw(ffi_status) as *mut c_void,
            envelope,
        }))
    }

    /// Build a success result carrying an opaque JSON payload.
    pub(crate) fn ok_json<T: Serialize>(payload: crop_api_core::Payload<T>) -> *mut Self {
        let data = match serde_json::to_string(&payload.data) {
            Ok(json) => c_string(json),
            Err(e) => return Self::from_error(ApiError::Parse(e.to_string())),
        };
        let envelope = envelope_json(&ApiResult::Success(payload));
        Box::into_raw(Box::new(FfiCropResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag: FfiDataTag::Json,
            data: data as *mut c_void,
            envelope,
        }))
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (error_code, http_status) = match &err {
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0u16),
            ApiError::HttpStatus { status, .. } => (FfiErrorCode::HttpStatus, *status),
            ApiError::Parse(_) => (FfiErrorCode::Parse, 0),
        };
        let envelope = envelope_json(&ApiResult::<()>::Failure(err.clone()));
        Box::into_raw(Box::new(FfiCropResult {
            error_code,
            error_message: c_string(err.to_string()),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
            envelope,
        }))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::bare_error(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::bare_error(FfiErrorCode::Panic, msg)
    }

    fn bare_error(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiCropResult {
            error_code,
            error_message: c_string(msg),
            http_status: 0,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
            envelope: failure_envelope(msg),
        }))
    }
}
