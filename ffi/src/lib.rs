//! C-ABI wrapper around `crop-api-core`.
//!
//! # Overview
//! Exposes the four crop API operations through `extern "C"` functions so any
//! language with a C FFI can build requests and interpret responses without
//! driving an async runtime. The host executes the HTTP round-trip.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `crop_build_*` / `crop_parse_*` mirror the core API 1:1.
//! - A single `FfiCropResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly; `envelope` carries the
//!   same outcome as `{"success": ...}` JSON.
//! - The C caller owns all returned pointers and must call the matching
//!   `crop_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use crop_api_core::{ApiError, HttpResponse, ImageUpload};

use types::*;

/// Read a nullable C string. Invalid UTF-8 is replaced rather than rejected.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn opt_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url`. A null `base_url` selects the
/// public default endpoint.
///
/// Returns null if an internal panic occurs.
/// The caller must free the returned pointer with `crop_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn crop_client_new(base_url: *const c_char) -> *mut FfiCropClient {
    catch_unwind(|| {
        let client = match unsafe { opt_str(base_url) } {
            Some(url) => crop_api_core::CropApiClient::new(&url),
            None => crop_api_core::CropApiClient::default(),
        };
        Box::into_raw(Box::new(FfiCropClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `crop_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn crop_client_free(client: *mut FfiCropClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Return the derived `{base_url}/api` prefix as a newly allocated string.
///
/// Returns null if `client` is null. Free with `crop_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn crop_client_api_url(client: *const FfiCropClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        c_string(client.inner.api_url())
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the request for the service status check (`GET /`).
///
/// Returns null if `client` is null.
/// The caller must free the returned pointer with `crop_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn crop_build_check_status(client: *const FfiCropClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_check_status())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the multipart upload request for an image.
///
/// `file_name`, `content_type` and `crop_name` may be null. A null or empty
/// `crop_name` leaves the field out of the form. Returns null if `client` is
/// null, or if `file` is null while `file_len` is non-zero.
#[unsafe(no_mangle)]
pub extern "C" fn crop_build_analyze_image(
    client: *const FfiCropClient,
    file: *const u8,
    file_len: usize,
    file_name: *const c_char,
    content_type: *const c_char,
    crop_name: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() || (file.is_null() && file_len > 0) {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let bytes = if file_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(file, file_len) }.to_vec()
        };

        let mut upload = ImageUpload::new(bytes);
        if let Some(name) = unsafe { opt_str(file_name) } {
            upload = upload.with_file_name(name);
        }
        if let Some(ct) = unsafe { opt_str(content_type) } {
            upload = upload.with_content_type(ct);
        }
        if let Some(crop) = unsafe { opt_str(crop_name) } {
            upload = upload.with_crop_name(crop);
        }
        FfiHttpRequest::from_core(client.inner.build_analyze_image(&upload))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request for the detection history.
///
/// Returns null if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn crop_build_get_history(client: *const FfiCropClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_get_history())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request for a single detection. The id is percent-encoded into
/// one path segment.
///
/// Returns null if `client` or `detection_id` is null.
#[unsafe(no_mangle)]
pub extern "C" fn crop_build_get_detection(
    client: *const FfiCropClient,
    detection_id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(id) = (unsafe { opt_str(detection_id) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_get_detection(&id))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// treated as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body: unsafe { opt_str(resp.body) }.unwrap_or_default(),
    }
}

/// Shared null checks and panic guard for the `crop_parse_*` functions.
fn parse_with(
    name: &'static str,
    client: *const FfiCropClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&crop_api_core::CropApiClient, HttpResponse) -> *mut FfiCropResult
        + std::panic::UnwindSafe,
) -> *mut FfiCropResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCropResult::null_arg("client");
        }
        if response.is_null() {
            return FfiCropResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        parse(&client.inner, ffi_response_to_core(resp))
    })
    .unwrap_or_else(|_| FfiCropResult::panic(&format!("panic in {name}")))
}

/// Parse the response of `crop_build_check_status`.
///
/// Returns a result with `data_tag = Status` on success. The HTTP status code
/// is not checked; only the JSON body matters.
#[unsafe(no_mangle)]
pub extern "C" fn crop_parse_check_status(
    client: *const FfiCropClient,
    response: *const FfiHttpResponse,
) -> *mut FfiCropResult {
    parse_with("crop_parse_check_status", client, response, |c, resp| {
        match c.parse_check_status(resp) {
            Ok(status) => FfiCropResult::ok_status(status),
            Err(e) => FfiCropResult::from_error(e),
        }
    })
}

/// Parse the response of `crop_build_analyze_image`.
///
/// Returns a result with `data_tag = Json` on success.
#[unsafe(no_mangle)]
pub extern "C" fn crop_parse_analyze_image(
    client: *const FfiCropClient,
    response: *const FfiHttpResponse,
) -> *mut FfiCropResult {
    parse_with("crop_parse_analyze_image", client, response, |c, resp| {
        match c.parse_analyze_image(resp) {
            Ok(payload) => FfiCropResult::ok_json(payload),
            Err(e) => FfiCropResult::from_error(e),
        }
    })
}

/// Parse the response of `crop_build_get_history`.
///
/// Returns a result with `data_tag = Json` (normally a JSON array) on success.
#[unsafe(no_mangle)]
pub extern "C" fn crop_parse_get_history(
    client: *const FfiCropClient,
    response: *const FfiHttpResponse,
) -> *mut FfiCropResult {
    parse_with("crop_parse_get_history", client, response, |c, resp| {
        match c.parse_get_history(resp) {
            Ok(payload) => FfiCropResult::ok_json(payload),
            Err(e) => FfiCropResult::from_error(e),
        }
    })
}

/// Parse the response of `crop_build_get_detection`.
///
/// Returns a result with `data_tag = Json` on success.
#[unsafe(no_mangle)]
pub extern "C" fn crop_parse_get_detection(
    client: *const FfiCropClient,
    response: *const FfiHttpResponse,
) -> *mut FfiCropResult {
    parse_with("crop_parse_get_detection", client, response, |c, resp| {
        match c.parse_get_detection(resp) {
            Ok(payload) => FfiCropResult::ok_json(payload),
            Err(e) => FfiCropResult::from_error(e),
        }
    })
}

/// Wrap a host-side transport failure (DNS, refused connection, timeout) in
/// the same result envelope the parse functions return.
#[unsafe(no_mangle)]
pub extern "C" fn crop_transport_failure(message: *const c_char) -> *mut FfiCropResult {
    catch_unwind(|| {
        let message =
            unsafe { opt_str(message) }.unwrap_or_else(|| "transport failure".to_string());
        FfiCropResult::from_error(ApiError::Transport(message))
    })
    .unwrap_or_else(|_| FfiCropResult::panic("panic in crop_transport_failure"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `crop_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn crop_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            let body = std::ptr::slice_from_raw_parts_mut(req.body, req.body_len);
            drop(unsafe { Box::from_raw(body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiCropResult` returned by any `crop_parse_*` function or
/// `crop_transport_failure`. Safe to call with null. Uses `data_tag` to
/// determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn crop_free_result(result: *mut FfiCropResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.envelope.is_null() {
            drop(unsafe { CString::from_raw(result.envelope) });
        }
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Status => {
                    let status = unsafe { Box::from_raw(result.data as *mut FfiServiceStatus) };
                    if !status.status.is_null() {
                        drop(unsafe { CString::from_raw(status.status) });
                    }
                    if !status.message.is_null() {
                        drop(unsafe { CString::from_raw(status.message) });
                    }
                }
                FfiDataTag::Json => {
                    drop(unsafe { CString::from_raw(result.data as *mut c_char) });
                }
                FfiDataTag::None => {}
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn crop_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
