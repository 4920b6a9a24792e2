//! Sealdrop command-line client
//!
//! Exit codes: 0 success, 2 authentication failure, 3 storage failure,
//! 1 anything else.

use clap::{Parser, Subcommand};
use sealdrop_client::{ApiClient, ClientError, ClientStore, Config};
use sealdrop_crypto::filecrypto::{decrypt_metadata, FileMetadata};
use sealdrop_crypto::share::receive_share;
use sealdrop_crypto::b64_decode;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sealdrop")]
#[command(about = "End-to-end encrypted file sharing client")]
#[command(version)]
struct Cli {
    /// Gateway base URL
    #[arg(long, default_value = "http://localhost:8080", env = "SEALDROP_SERVER")]
    server: String,

    /// PEM CA bundle for TLS verification
    #[arg(long, env = "SEALDROP_CA_BUNDLE")]
    ca_bundle: Option<PathBuf>,

    /// Path of the local encrypted store
    #[arg(long, default_value = "sealdrop-store.json", env = "SEALDROP_STORE")]
    store: PathBuf,

    /// Enable debug logging
    #[arg(short, long, env = "SEALDROP_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and a fresh identity bundle
    Register {
        username: String,
        password: String,
    },
    /// Verify the password unlocks the local store
    Login {
        password: String,
    },
    /// Wipe in-RAM secrets; the encrypted store stays on disk
    Logout,
    /// Re-wrap the master key under a new password
    ChangePassword {
        password: String,
        new_password: String,
    },
    /// Encrypt and upload a file
    Upload {
        path: PathBuf,
        /// MIME type recorded in the encrypted metadata
        #[arg(long, default_value = "application/octet-stream")]
        file_type: String,
        password: String,
    },
    /// Download, verify, and decrypt a file
    Download {
        file_id: u64,
        /// Output path; defaults to the original filename
        #[arg(short, long)]
        output: Option<PathBuf>,
        password: String,
    },
    /// List visible files
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        password: String,
    },
    /// Share a file with another user
    Share {
        file_id: u64,
        recipient: String,
        password: String,
    },
    /// Revoke a previously granted share
    Revoke {
        file_id: u64,
        recipient: String,
        password: String,
    },
    /// Delete an owned file
    Delete {
        file_id: u64,
        password: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sealdrop_client={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn unlock(store: &ClientStore, password: &str) -> Result<(), ClientError> {
    let username = store.username().ok_or(ClientError::NotLoggedIn)?;
    store.login(&username, password)
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut config = Config::new(cli.server).with_store_path(cli.store.clone());
    if let Some(ca) = cli.ca_bundle {
        config = config.with_ca_bundle(ca);
    }
    let store = ClientStore::open(&cli.store)?;
    let api = ApiClient::new(config)?;

    match cli.command {
        Command::Register { username, password } => {
            api.register(&store, &username, &password).await?;
            println!("Registered {username}");
        }
        Command::Login { password } => {
            unlock(&store, &password)?;
            println!("Login OK");
        }
        Command::Logout => {
            store.logout();
            println!("Logged out");
        }
        Command::ChangePassword {
            password,
            new_password,
        } => {
            unlock(&store, &password)?;
            store.change_password(&new_password)?;
            println!("Password changed");
        }
        Command::Upload {
            path,
            file_type,
            password,
        } => {
            unlock(&store, &password)?;
            let content = std::fs::read(&path)
                .map_err(sealdrop_client::StorageError::IoFailed)?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let metadata = FileMetadata::for_content(filename, &content, file_type);
            let file_id = api.upload(&store, &content, &metadata).await?;
            println!("Uploaded as file {file_id}");
        }
        Command::Download {
            file_id,
            output,
            password,
        } => {
            unlock(&store, &password)?;
            let (content, metadata) = api.download(&store, file_id).await?;
            let target = output.unwrap_or_else(|| PathBuf::from(&metadata.original_filename));
            std::fs::write(&target, &content)
                .map_err(sealdrop_client::StorageError::IoFailed)?;
            println!("Downloaded {} ({} bytes)", target.display(), content.len());
        }
        Command::List { page, password } => {
            unlock(&store, &password)?;
            let listing = api.list(&store, page).await?;
            for item in &listing.file_data {
                match describe(&store, item) {
                    Some(line) => println!("{line}"),
                    None => println!("{:>6}  (metadata unavailable)", item.file_id),
                }
            }
            if listing.has_next_page {
                println!("-- more on page {} --", page + 1);
            }
        }
        Command::Share {
            file_id,
            recipient,
            password,
        } => {
            unlock(&store, &password)?;
            api.share(&store, file_id, &recipient).await?;
            println!("Shared file {file_id} with {recipient}");
        }
        Command::Revoke {
            file_id,
            recipient,
            password,
        } => {
            unlock(&store, &password)?;
            api.revoke(&store, file_id, &recipient).await?;
            println!("Revoked {recipient}'s access to file {file_id}");
        }
        Command::Delete { file_id, password } => {
            unlock(&store, &password)?;
            api.delete(&store, file_id).await?;
            println!("Deleted file {file_id}");
        }
    }
    Ok(())
}

// Decrypt one listing row with whichever secrets are available: the local
// map for owned files, the share grant for received ones.
fn describe(
    store: &ClientStore,
    item: &sealdrop_proto::FileMetadataListItem,
) -> Option<String> {
    let enc_metadata = b64_decode(&item.metadata).ok()?;
    let data = match store.get_file(item.file_id) {
        Some(data) => data,
        None => {
            let grant = item.shared_access.as_ref()?.to_grant().ok()?;
            store
                .with_unlocked(|view| receive_share(&grant, view.bundle, item.file_id, ""))
                .ok()?
                .ok()?
        }
    };
    let metadata = decrypt_metadata(&enc_metadata, &data.mek, &data.metadata_nonce).ok()?;
    let marker = if item.is_owner { "" } else { " (shared with you)" };
    Some(format!(
        "{:>6}  {}  {} bytes  {}{}",
        item.file_id,
        metadata.original_filename,
        metadata.file_size_bytes,
        item.upload_ts,
        marker
    ))
}
