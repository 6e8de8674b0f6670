//! HTTP transport: one request, one response, no retries.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Url};
use tracing::debug;

use crate::error::StoreError;
use crate::protocol::{ApiRequest, ApiResponse, UPLOAD_FIELD};

/// Performs a single round trip to the file API.
///
/// `Err` means the request never completed. Any HTTP status, including
/// 4xx/5xx, comes back as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, StoreError>;
}

/// reqwest-backed transport rooted at the API base URL
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, StoreError> {
        let url = request.url(&self.base)?;
        let method = request.method();
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        let builder = match request {
            ApiRequest::Upload(file) => {
                let part = Part::bytes(file.data.to_vec()).file_name(file.name);
                builder.multipart(Form::new().part(UPLOAD_FIELD, part))
            }
            ApiRequest::Download { .. } => {
                builder.header(header::ACCEPT, "application/octet-stream")
            }
            ApiRequest::Delete { .. } | ApiRequest::ViewableUrl { .. } => builder,
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;

        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}
