use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::files::{validate_listing, DownloadSink, FileEntry, FileSource, Listing, UploadFile};
use crate::protocol::{validate_name, ApiRequest};
use crate::transport::Transport;

pub const UPLOAD_ERROR: &str = "Error uploading file";
pub const DOWNLOAD_ERROR: &str = "Error downloading file";
pub const DELETE_ERROR: &str = "Error deleting file";
pub const URL_ERROR: &str = "Error getting file URL";
pub const REFRESH_ERROR: &str = "Error fetching files";

/// Observable state of a [`FileStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub files: Vec<FileEntry>,
    /// True while an operation is in flight
    pub busy: bool,
    /// Message of the last failed operation, cleared when the next one starts
    pub last_error: Option<String>,
}

/// Client-side state container for file operations against the blob store.
///
/// Operations never return `Err`: failures show up as `false`/`None` plus
/// `last_error`. Overlapping calls are queued and run one at a time.
pub struct FileStore {
    transport: Box<dyn Transport>,
    source: Box<dyn FileSource>,
    sink: Box<dyn DownloadSink>,
    state: watch::Sender<StoreState>,
    op_lock: Mutex<()>,
}

/// Clears `busy` when dropped, whether the operation finished, failed,
/// panicked or was cancelled.
struct BusyGuard<'a> {
    state: &'a watch::Sender<StoreState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.busy = false);
    }
}

impl FileStore {
    pub fn new(
        transport: Box<dyn Transport>,
        source: Box<dyn FileSource>,
        sink: Box<dyn DownloadSink>,
    ) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            transport,
            source,
            sink,
            state,
            op_lock: Mutex::new(()),
        }
    }

    /// Seed the held files, e.g. from a configured catalog.
    pub fn with_files(self, files: Vec<FileEntry>) -> Result<Self, StoreError> {
        validate_listing(&files)?;
        self.state.send_modify(|s| s.files = files);
        Ok(self)
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn files(&self) -> Vec<FileEntry> {
        self.state.borrow().files.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    fn begin(&self) -> BusyGuard<'_> {
        self.state.send_modify(|s| {
            s.busy = true;
            s.last_error = None;
        });
        BusyGuard { state: &self.state }
    }

    fn fail(&self, op: &str, err: &StoreError, default: &str) {
        error!("{} failed: {}", op, err);
        let message = err.user_message(default);
        self.state.send_modify(|s| s.last_error = Some(message));
    }

    /// Upload `file`; on success the file list is refreshed.
    pub async fn upload(&self, file: UploadFile) -> bool {
        let _op = self.op_lock.lock().await;
        let _busy = self.begin();

        info!("upload: {} ({} bytes)", file.name, file.data.len());
        let result = async {
            validate_name(&file.name)?;
            self.transport
                .send(ApiRequest::Upload(file))
                .await?
                .error_for_status()?;
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("upload complete");
                self.refresh_locked().await;
                true
            }
            Err(e) => {
                self.fail("upload", &e, UPLOAD_ERROR);
                false
            }
        }
    }

    /// Fetch `name` and hand its bytes to the download sink.
    pub async fn download(&self, name: &str) -> bool {
        let _op = self.op_lock.lock().await;
        let _busy = self.begin();

        info!("download: {}", name);
        let result = async {
            validate_name(name)?;
            let resp = self
                .transport
                .send(ApiRequest::Download {
                    name: name.to_string(),
                })
                .await?
                .error_for_status()?;
            self.sink
                .save(name, &resp.body)
                .map_err(|e| StoreError::Save {
                    name: name.to_string(),
                    reason: format!("{:#}", e),
                })?;
            Ok::<usize, StoreError>(resp.body.len())
        }
        .await;

        match result {
            Ok(len) => {
                info!("download complete: {} ({} bytes)", name, len);
                true
            }
            Err(e) => {
                self.fail("download", &e, DOWNLOAD_ERROR);
                false
            }
        }
    }

    /// Delete `name` server-side; on success the file list is refreshed.
    pub async fn delete(&self, name: &str) -> bool {
        let _op = self.op_lock.lock().await;
        let _busy = self.begin();

        info!("delete: {}", name);
        let result = async {
            validate_name(name)?;
            self.transport
                .send(ApiRequest::Delete {
                    name: name.to_string(),
                })
                .await?
                .error_for_status()?;
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("deleted {}", name);
                self.refresh_locked().await;
                true
            }
            Err(e) => {
                self.fail("delete", &e, DELETE_ERROR);
                false
            }
        }
    }

    /// URL for viewing `name` directly, typically pre-signed and short-lived.
    pub async fn resolve_viewable_url(&self, name: &str) -> Option<String> {
        let _op = self.op_lock.lock().await;
        let _busy = self.begin();

        info!("viewable url: {}", name);
        let result = async {
            validate_name(name)?;
            self.transport
                .send(ApiRequest::ViewableUrl {
                    name: name.to_string(),
                })
                .await?
                .error_for_status()?
                .into_url_string()
        }
        .await;

        match result {
            Ok(url) => Some(url),
            Err(e) => {
                self.fail("viewable url", &e, URL_ERROR);
                None
            }
        }
    }

    /// Re-populate the held files from the listing source.
    pub async fn refresh(&self) -> bool {
        let _op = self.op_lock.lock().await;
        let _busy = self.begin();
        self.refresh_locked().await
    }

    // Caller holds `op_lock` and the busy guard.
    async fn refresh_locked(&self) -> bool {
        let result = match self.source.list().await {
            Ok(Listing::Snapshot(files)) => validate_listing(&files).map(|_| Some(files)),
            Ok(Listing::Unchanged) => Ok(None),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(files)) => {
                info!("file list refreshed ({} files)", files.len());
                self.state.send_modify(|s| s.files = files);
                true
            }
            Ok(None) => true,
            Err(e) => {
                warn!("keeping {} held files", self.state.borrow().files.len());
                self.fail("refresh", &e, REFRESH_ERROR);
                false
            }
        }
    }
}
