use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;

/// A known object in the store. `name` is the primary key; `size` and
/// `last_modified` are display strings only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: String,
    pub last_modified: String,
}

impl FileEntry {
    pub fn new(
        name: impl Into<String>,
        size: impl Into<String>,
        last_modified: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            last_modified: last_modified.into(),
        }
    }

    /// Listing shown when no catalog is configured.
    pub fn demo_catalog() -> Vec<FileEntry> {
        vec![
            FileEntry::new("example1.jpg", "1.2 MB", "2023-10-15"),
            FileEntry::new("document.pdf", "3.5 MB", "2023-10-14"),
            FileEntry::new("data.csv", "0.8 MB", "2023-10-13"),
        ]
    }
}

/// Check the listing invariants: every name non-empty and unique.
pub fn validate_listing(files: &[FileEntry]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(files.len());
    for entry in files {
        if entry.name.is_empty() {
            return Err(StoreError::Listing("entry with empty name".to_string()));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(StoreError::Listing(format!("duplicate name {}", entry.name)));
        }
    }
    Ok(())
}

/// A named binary payload to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a local file; the upload name is the file name without directories.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read file {}", path.display()))?;
        Ok(Self::new(name, data))
    }
}

/// Where downloaded bytes end up
pub trait DownloadSink: Send + Sync {
    fn save(&self, name: &str, data: &[u8]) -> Result<()>;
}

/// Writes downloads into a directory, one file per object name.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target path for `name`. Only the final path component is kept so a
    /// name like `../x` cannot escape the directory.
    pub fn target_path(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .with_context(|| format!("cannot derive a file name from {:?}", name))?;
        Ok(self.dir.join(file_name))
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, name: &str, data: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create download dir {}", self.dir.display()))?;
        let path = self.target_path(name)?;
        std::fs::write(&path, data)
            .with_context(|| format!("failed to write file {}", path.display()))?;
        info!("saved {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}

/// Result of asking the listing source for files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// No authoritative listing available; keep what is held.
    Unchanged,
    /// Full replacement of the held files.
    Snapshot(Vec<FileEntry>),
}

/// Authoritative source of the file list behind `refresh()`
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn list(&self) -> Result<Listing, StoreError>;
}

/// Placeholder source: the server exposes no listing endpoint, so refresh
/// keeps the held files and always succeeds.
// TODO: replace with a call to a real list endpoint once the server defines one
pub struct StaticFileSource;

#[async_trait]
impl FileSource for StaticFileSource {
    async fn list(&self) -> Result<Listing, StoreError> {
        debug!("no listing endpoint, keeping current files");
        Ok(Listing::Unchanged)
    }
}
