use bytes::Bytes;
use reqwest::{Method, Url};
use serde::Deserialize;

use crate::error::StoreError;
use crate::files::UploadFile;

// --- Endpoints (relative to the API base) ---

/// Collection prefix for every file endpoint
pub const FILES_PATH: &str = "api/files";

/// Multipart upload endpoint
pub const UPLOAD_PATH: &str = "api/files/upload";

/// Path segment preceding the object name for viewable URLs
pub const URL_SEGMENT: &str = "url";

/// Multipart field carrying the file content
pub const UPLOAD_FIELD: &str = "file";

/// Check that `name` can stand as one path segment: non-empty and not a
/// dot-segment, which URL normalization would collapse into the parent.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    match name {
        "" => Err(StoreError::Validation("file name must not be empty".to_string())),
        "." | ".." => Err(StoreError::Validation(format!("invalid file name {:?}", name))),
        _ => Ok(()),
    }
}

/// One request to the file API. Each store operation issues exactly one.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    Upload(UploadFile),
    Download { name: String },
    Delete { name: String },
    ViewableUrl { name: String },
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::Upload(_) => Method::POST,
            ApiRequest::Download { .. } | ApiRequest::ViewableUrl { .. } => Method::GET,
            ApiRequest::Delete { .. } => Method::DELETE,
        }
    }

    /// Object name this request targets
    pub fn name(&self) -> &str {
        match self {
            ApiRequest::Upload(file) => &file.name,
            ApiRequest::Download { name }
            | ApiRequest::Delete { name }
            | ApiRequest::ViewableUrl { name } => name,
        }
    }

    /// Resolve the endpoint against `base`. The object name is pushed as a
    /// single path segment, so `/` and `?` in a name are percent-encoded.
    pub fn url(&self, base: &Url) -> Result<Url, StoreError> {
        validate_name(self.name())?;
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::Validation(format!("invalid server URL: {}", base))
            })?;
            segments.pop_if_empty();
            match self {
                ApiRequest::Upload(_) => {
                    segments.extend(UPLOAD_PATH.split('/'));
                }
                ApiRequest::Download { name } | ApiRequest::Delete { name } => {
                    segments.extend(FILES_PATH.split('/'));
                    segments.push(name);
                }
                ApiRequest::ViewableUrl { name } => {
                    segments.extend(FILES_PATH.split('/'));
                    segments.push(URL_SEGMENT);
                    segments.push(name);
                }
            }
        }
        Ok(url)
    }
}

/// Raw HTTP response as seen by the store
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim())
            .is_some_and(|ct| ct == "application/json" || ct.ends_with("+json"))
    }

    /// Turn a non-2xx response into a `StoreError::Server`, pulling the
    /// optional `message` field out of a JSON body.
    pub fn error_for_status(self) -> Result<Self, StoreError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.message);
        Err(StoreError::Server {
            status: self.status,
            message,
        })
    }

    /// Body of a viewable-URL response. A JSON string literal is decoded,
    /// anything else is returned as sent.
    pub fn into_url_string(self) -> Result<String, StoreError> {
        if self.is_json() {
            if let Ok(url) = serde_json::from_slice::<String>(&self.body) {
                return Ok(url);
            }
        }
        let status = self.status;
        String::from_utf8(self.body.to_vec()).map_err(|_| StoreError::InvalidResponse {
            status,
            reason: "viewable URL body is not valid UTF-8".to_string(),
        })
    }
}

/// Optional JSON body on failure responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    fn url_of(req: &ApiRequest) -> String {
        req.url(&base()).unwrap().to_string()
    }

    #[test]
    fn test_endpoint_paths() {
        let upload = ApiRequest::Upload(UploadFile::new("report.pdf", b"x".to_vec()));
        assert_eq!(upload.method(), Method::POST);
        assert_eq!(url_of(&upload), "http://localhost:8080/api/files/upload");

        let download = ApiRequest::Download { name: "report.pdf".to_string() };
        assert_eq!(download.method(), Method::GET);
        assert_eq!(url_of(&download), "http://localhost:8080/api/files/report.pdf");

        let delete = ApiRequest::Delete { name: "report.pdf".to_string() };
        assert_eq!(delete.method(), Method::DELETE);
        assert_eq!(url_of(&delete), "http://localhost:8080/api/files/report.pdf");

        let view = ApiRequest::ViewableUrl { name: "report.pdf".to_string() };
        assert_eq!(view.method(), Method::GET);
        assert_eq!(url_of(&view), "http://localhost:8080/api/files/url/report.pdf");
    }

    #[test]
    fn test_base_with_prefix() {
        let base = Url::parse("https://files.example.com/storage").unwrap();
        let req = ApiRequest::Download { name: "a.txt".to_string() };
        assert_eq!(
            req.url(&base).unwrap().as_str(),
            "https://files.example.com/storage/api/files/a.txt"
        );
    }

    #[test]
    fn test_name_is_one_segment() {
        let req = ApiRequest::Delete { name: "dir/my file?.txt".to_string() };
        assert_eq!(url_of(&req), "http://localhost:8080/api/files/dir%2Fmy%20file%3F.txt");

        let req = ApiRequest::Download { name: "..txt".to_string() };
        assert_eq!(url_of(&req), "http://localhost:8080/api/files/..txt");
    }

    #[test]
    fn test_dot_segment_names_rejected() {
        for name in [".", ".."] {
            let requests = [
                ApiRequest::Download { name: name.to_string() },
                ApiRequest::Delete { name: name.to_string() },
                ApiRequest::ViewableUrl { name: name.to_string() },
            ];
            for req in requests {
                match req.url(&base()) {
                    Err(StoreError::Validation(msg)) => assert!(msg.contains(name)),
                    other => panic!("{:?} resolved to {:?}", req, other),
                }
            }
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("report.pdf").is_ok());
        assert!(validate_name("...").is_ok());
        assert!(matches!(validate_name(""), Err(StoreError::Validation(_))));
        assert!(matches!(validate_name(".."), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_error_message_from_json_body() {
        let resp = ApiResponse::json(404, &br#"{"message":"not found"}"#[..]);
        match resp.error_for_status() {
            Err(StoreError::Server { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message.as_deref(), Some("not found"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_error_without_body() {
        let resp = ApiResponse::new(500, "Internal Server Error");
        match resp.error_for_status() {
            Err(StoreError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_success_passes_through() {
        let resp = ApiResponse::new(204, Bytes::new());
        assert!(resp.error_for_status().is_ok());
    }

    #[test]
    fn test_url_body_verbatim() {
        let body = "http://localhost:4566/my-bucket/a.jpg?X-Amz-Signature=abc";
        let resp = ApiResponse::new(200, body);
        assert_eq!(resp.into_url_string().unwrap(), body);
    }

    #[test]
    fn test_url_body_json_string() {
        let body = &br#""http://localhost:4566/my-bucket/a.jpg""#[..];
        let resp = ApiResponse::json(200, body);
        assert_eq!(resp.into_url_string().unwrap(), "http://localhost:4566/my-bucket/a.jpg");
    }

    #[test]
    fn test_url_body_not_utf8() {
        let resp = ApiResponse::new(200, &b"\xff\xfe\x00"[..]);
        match resp.into_url_string() {
            Err(StoreError::InvalidResponse { status, .. }) => assert_eq!(status, 200),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
