use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use filedeck_core::config::ClientConfig;
use filedeck_core::{
    DirectorySink, FileAction, FileEntry, FileStore, HttpTransport, StaticFileSource, UploadFile,
};

#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(about = "Upload, download and manage files in a remote blob store")]
#[command(version)]
struct Cli {
    /// Server URL (e.g., http://localhost:8080)
    #[arg(long, env = "FILEDECK_SERVER_URL", global = true)]
    server_url: Option<String>,

    /// Path to config file
    #[arg(long, env = "FILEDECK_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Directory downloads are saved to
    #[arg(long, env = "FILEDECK_DOWNLOAD_DIR", global = true)]
    download_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "FILEDECK_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show known files
    List,
    /// Upload a local file
    Upload {
        path: PathBuf,
    },
    /// Download a file into the download directory
    Download {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Delete a file from the store
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Print a viewable (pre-signed) URL for a file
    View {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Write a config file with the given options
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(ClientConfig::default_path);

    let mut config = ClientConfig::load_or_default(&config_path)?;

    // CLI args override config file
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = Some(dir);
    }

    if let Commands::Init = cli.command {
        if config.server_url.is_empty() {
            config.server_url = "http://localhost:8080".to_string();
        }
        config.api_base()?;
        config.save(&config_path)?;
        println!("config written to {}", config_path.display());
        return Ok(());
    }

    let base = config
        .api_base()
        .context("server URL is required (--server-url or config file)")?;

    let store = FileStore::new(
        Box::new(HttpTransport::new(base)),
        Box::new(StaticFileSource),
        Box::new(DirectorySink::new(config.download_dir())),
    )
    .with_files(config.catalog())
    .context("invalid catalog in config")?;
    watch_state(&store);

    match cli.command {
        Commands::List => {
            if !store.refresh().await {
                anyhow::bail!(store.last_error().unwrap_or_default());
            }
            print_files(&store.files());
            Ok(())
        }
        Commands::Upload { path } => {
            if !path.is_file() {
                anyhow::bail!("{} is not a file", path.display());
            }
            let file = UploadFile::from_path(&path).await?;
            let name = file.name.clone();
            if store.upload(file).await {
                println!("File uploaded successfully! ({})", name);
                Ok(())
            } else {
                anyhow::bail!(store.last_error().unwrap_or_default());
            }
        }
        Commands::Download { name, yes } => {
            run_action(&store, FileAction::Download, &name, yes).await
        }
        Commands::Delete { name, yes } => {
            run_action(&store, FileAction::Delete, &name, yes).await
        }
        Commands::View { name, yes } => run_action(&store, FileAction::View, &name, yes).await,
        Commands::Init => Ok(()),
    }
}

async fn run_action(store: &FileStore, action: FileAction, name: &str, yes: bool) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("file name is required");
    }
    if !yes && !confirm(&action.confirm_prompt(name))? {
        println!("Cancelled.");
        return Ok(());
    }

    let result = action.perform(store, name).await;
    if !result.success {
        match store.last_error() {
            Some(err) => anyhow::bail!("{} {}", result.message, err),
            None => anyhow::bail!(result.message),
        }
    }

    println!("{}", result.message);
    if let Some(url) = result.url {
        println!("{}", url);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Log busy transitions as the store publishes them
fn watch_state(store: &FileStore) {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut busy = rx.borrow_and_update().busy;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if state.busy != busy {
                busy = state.busy;
                debug!("store {}", if busy { "busy" } else { "idle" });
            }
        }
    });
}

fn print_files(files: &[FileEntry]) {
    if files.is_empty() {
        println!("No files found.");
        return;
    }

    let headers = ["File Name", "Size", "Last Modified"];
    let name_w = files.iter().map(|f| f.name.len()).max().unwrap_or(0).max(headers[0].len());
    let size_w = files.iter().map(|f| f.size.len()).max().unwrap_or(0).max(headers[1].len());

    println!("{:<name_w$}  {:<size_w$}  {}", headers[0], headers[1], headers[2]);
    for f in files {
        println!("{:<name_w$}  {:<size_w$}  {}", f.name, f.size, f.last_modified);
    }
}
