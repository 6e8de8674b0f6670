use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::files::FileEntry;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the file API (e.g., http://localhost:8080)
    pub server_url: String,

    /// Directory downloads are written to (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Files to show until the server offers a listing endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<FileEntry>>,
}

impl ClientConfig {
    /// `config.json` under the platform config dir, or a file in the
    /// working directory when no home directory can be resolved.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "filedeck", "filedeck")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("filedeck-config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("cannot open config file {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not a valid config file", path.display()))
    }

    /// Like `load`, but a missing file yields the default config.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        info!("loading config from {}", path.display());
        Self::load(path)
    }

    /// Write the config as pretty JSON, creating missing parent dirs.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(self).context("cannot encode config")?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write config file {}", path.display()))
    }

    /// Parsed API base URL, always ending in `/`
    pub fn api_base(&self) -> Result<Url> {
        let raw = self.server_url.trim();
        if raw.is_empty() {
            anyhow::bail!("server URL is not set");
        }
        let mut url =
            Url::parse(raw).with_context(|| format!("invalid server URL {}", raw))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server URL must be http or https, got {}", url.scheme());
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Configured catalog, or the demo listing when none is set
    pub fn catalog(&self) -> Vec<FileEntry> {
        self.catalog
            .clone()
            .unwrap_or_else(FileEntry::demo_catalog)
    }
}
