//! Async facade that executes `CropApiClient` requests over reqwest.
//!
//! Every operation returns an `ApiResult`; transport, status and parse errors
//! are all folded into `ApiResult::Failure` here and never escape.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::client::CropApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ApiResult, Detection, ImageUpload, Payload, ServiceStatus};

/// Crop disease detection API client.
///
/// Cheap to clone; clones share the underlying connection pool. Calls on one
/// instance may run concurrently.
#[derive(Debug, Clone)]
pub struct CropApi {
    client: CropApiClient,
    http: Client,
}

impl CropApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            client: CropApiClient::with_config(config),
            http,
        })
    }

    /// Client against the public deployment.
    pub fn default_endpoint() -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    pub async fn check_status(&self) -> ApiResult<ServiceStatus> {
        let request = self.client.build_check_status();
        let result = match self.execute(request).await {
            Ok(response) => self.client.parse_check_status(response),
            Err(err) => Err(err),
        };
        finish("check_status", result)
    }

    pub async fn analyze_image(&self, upload: &ImageUpload) -> ApiResult<Payload<Detection>> {
        let request = self.client.build_analyze_image(upload);
        let result = match self.execute(request).await {
            Ok(response) => self.client.parse_analyze_image(response),
            Err(err) => Err(err),
        };
        finish("analyze_image", result)
    }

    pub async fn get_history(&self) -> ApiResult<Payload<Detection>> {
        let request = self.client.build_get_history();
        let result = match self.execute(request).await {
            Ok(response) => self.client.parse_get_history(response),
            Err(err) => Err(err),
        };
        finish("get_history", result)
    }

    pub async fn get_detection(&self, detection_id: &str) -> ApiResult<Payload<Detection>> {
        let request = self.client.build_get_detection(detection_id);
        let result = match self.execute(request).await {
            Ok(response) => self.client.parse_get_detection(response),
            Err(err) => Err(err),
        };
        finish("get_detection", result)
    }

    /// Run one request and collect the response as plain data.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Transport(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Transport(format!("invalid header value: {e}")))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        // A non-2xx status is already known once the head arrives; losing the
        // body after that must not turn it into a transport failure.
        let body = if status.is_success() {
            response.text().await?
        } else {
            response.text().await.unwrap_or_default()
        };
        let status = status.as_u16();

        debug!(status, url = %request.url, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn finish<T>(operation: &'static str, result: Result<T, ApiError>) -> ApiResult<T> {
    if let Err(err) = &result {
        warn!(operation, kind = ?err.kind(), error = %err, "request failed");
    }
    result.into()
}
