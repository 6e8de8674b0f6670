use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::FileStore;

/// Outcome of a user-triggered action, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    /// Viewable URL, set by a successful `View`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl OperationResult {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.to_string(),
            url: None,
        }
    }
}

/// Per-file action offered next to each listed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Download,
    Delete,
    View,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileAction::Download => "download",
            FileAction::Delete => "delete",
            FileAction::View => "view",
        };
        f.write_str(s)
    }
}

impl FileAction {
    /// Question asked before running the action
    pub fn confirm_prompt(&self, name: &str) -> String {
        format!("Are you sure you want to {} the file \"{}\"?", self, name)
    }

    /// Run the action against `store`.
    pub async fn perform(&self, store: &FileStore, name: &str) -> OperationResult {
        match self {
            FileAction::Download => {
                if store.download(name).await {
                    OperationResult::new(true, "File downloaded successfully!")
                } else {
                    OperationResult::new(false, "Failed to download file.")
                }
            }
            FileAction::Delete => {
                if store.delete(name).await {
                    OperationResult::new(true, "File deleted successfully!")
                } else {
                    OperationResult::new(false, "Failed to delete file.")
                }
            }
            // An empty URL has nothing to open.
            FileAction::View => match store.resolve_viewable_url(name).await {
                Some(url) if !url.is_empty() => OperationResult {
                    url: Some(url),
                    ..OperationResult::new(true, "File opened in new tab.")
                },
                _ => OperationResult::new(false, "Failed to get file URL."),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreError;
    use crate::files::StaticFileSource;
    use crate::protocol::{ApiRequest, ApiResponse};
    use crate::transport::Transport;

    /// Answers every request with the same status and body
    struct FixedTransport {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, StoreError> {
            Ok(ApiResponse::new(self.status, self.body))
        }
    }

    struct NullSink;

    impl crate::files::DownloadSink for NullSink {
        fn save(&self, _name: &str, _data: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn store(status: u16, body: &'static str) -> FileStore {
        FileStore::new(
            Box::new(FixedTransport { status, body }),
            Box::new(StaticFileSource),
            Box::new(NullSink),
        )
    }

    #[test]
    fn test_confirm_prompt() {
        assert_eq!(
            FileAction::Delete.confirm_prompt("data.csv"),
            "Are you sure you want to delete the file \"data.csv\"?"
        );
    }

    #[tokio::test]
    async fn test_download_messages() {
        let ok = FileAction::Download.perform(&store(200, "bytes"), "a.txt").await;
        assert_eq!(ok, OperationResult::new(true, "File downloaded successfully!"));

        let failed = FileAction::Download.perform(&store(404, ""), "a.txt").await;
        assert_eq!(failed, OperationResult::new(false, "Failed to download file."));
    }

    #[tokio::test]
    async fn test_delete_messages() {
        let ok = FileAction::Delete.perform(&store(204, ""), "a.txt").await;
        assert!(ok.success);
        assert_eq!(ok.message, "File deleted successfully!");

        let failed = FileAction::Delete.perform(&store(500, ""), "a.txt").await;
        assert_eq!(failed.message, "Failed to delete file.");
    }

    #[tokio::test]
    async fn test_view_carries_url() {
        let url = "http://localhost:4566/my-bucket/a.jpg?sig=1";
        let ok = FileAction::View.perform(&store(200, url), "a.jpg").await;
        assert!(ok.success);
        assert_eq!(ok.message, "File opened in new tab.");
        assert_eq!(ok.url.as_deref(), Some(url));

        let failed = FileAction::View.perform(&store(403, ""), "a.jpg").await;
        assert_eq!(failed, OperationResult::new(false, "Failed to get file URL."));
    }

    #[tokio::test]
    async fn test_view_with_empty_url_fails() {
        let store = store(200, "");
        let result = FileAction::View.perform(&store, "a.jpg").await;
        assert_eq!(result, OperationResult::new(false, "Failed to get file URL."));
        assert!(result.url.is_none());
        // The request itself succeeded, so the store keeps no error.
        assert!(store.last_error().is_none());
    }
}
