//! Client for a blob-store file API: upload, download, delete and
//! viewable-URL resolution behind a single observable state container.

pub mod actions;
pub mod config;
pub mod error;
pub mod files;
pub mod protocol;
pub mod store;
pub mod transport;

pub use actions::{FileAction, OperationResult};
pub use error::StoreError;
pub use files::{DirectorySink, FileEntry, StaticFileSource, UploadFile};
pub use store::{FileStore, StoreState};
pub use transport::HttpTransport;
