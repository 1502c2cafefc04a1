use anyhow::{Context, Result};
use clap::Parser;
use listing_ingest::bootstrap::setup::{initialize_folder, initialize_logger};
use listing_ingest::{
    Condition, EntryState, HttpObjectStorage, IngestConfig, ListingForm, TokenSession,
    UploadQueue, assemble_payload,
};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Post a marketplace listing: compress and upload the images one at a time,
/// then assemble the final payload and print it as JSON.
#[derive(Parser, Debug)]
#[command(name = "listing-ingest")]
struct Cli {
    /// Image files in display order; the first becomes the cover.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    #[arg(long)]
    title: String,

    #[arg(long)]
    category: String,

    /// One of: new, like-new, used, for-parts.
    #[arg(long, default_value = "used")]
    condition: Condition,

    /// Price in the smallest currency unit.
    #[arg(long)]
    price: u64,

    #[arg(long, default_value_t = false)]
    negotiable: bool,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    phone: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logger();
    let cli = Cli::parse();

    let config = IngestConfig::load()?;
    initialize_folder(&config.preview_dir)?;

    let storage = HttpObjectStorage::new(&config.storage_endpoint);
    let session = TokenSession::new(config.session_token.clone());
    let queue = Arc::new(UploadQueue::new(storage, session, config.queue_settings()));

    for path in &cli.images {
        let bytes = std::fs::read(path).context(format!("failed to read {:?}", path))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        queue.add(&file_name, bytes).await?;
    }

    info!("uploading {} image(s)...", cli.images.len());
    queue.settle().await;

    let form = ListingForm {
        title: cli.title,
        category: cli.category,
        condition: cli.condition,
        price: cli.price,
        negotiable: cli.negotiable,
        description: cli.description,
        city: cli.city,
        contact_phone: cli.phone,
    };

    match assemble_payload(&form, &queue.snapshot()) {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(gate) => {
            error!("submission refused: {gate}");
            for entry in queue.snapshot() {
                if let EntryState::Error { message } = &entry.state {
                    error!("  '{}': {}", entry.file_name, message);
                }
            }
            std::process::exit(1);
        }
    }
}
