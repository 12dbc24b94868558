//! Seed utility: create a demo session with a numbered lineup
//!
//! Usage:
//!   seed-lineup --data-folder ./data --title "Friday drop" --entries 12

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "seed-lineup")]
#[command(about = "Create a demo session and lineup for showcue")]
struct Args {
    /// Data folder containing the showcue database
    #[arg(short, long, env = "SHOWCUE_DATA_FOLDER")]
    data_folder: Option<String>,

    /// Session title
    #[arg(short, long, default_value = "Demo broadcast")]
    title: String,

    /// Number of lineup entries to create
    #[arg(short, long, default_value = "10")]
    entries: u32,

    /// Image count per entry
    #[arg(short, long, default_value = "3")]
    images: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_folder = showcue_common::config::resolve_data_folder(
        args.data_folder.as_deref(),
        "SHOWCUE_DATA_FOLDER",
    )
    .context("Failed to resolve data folder")?;
    let db_path = showcue_common::config::database_path(&data_folder);

    let pool = showcue_common::db::open_database(&db_path)
        .await
        .context("Failed to open database")?;

    let session = showcue_common::db::insert_session(&pool, &args.title).await?;
    for n in 1..=args.entries {
        showcue_common::db::insert_lineup_entry(
            &pool,
            session,
            n,
            &format!("demo-item-{:03}", n),
            args.images,
        )
        .await?;
    }

    info!(
        "Seeded session {} ({} entries, {} images each)",
        session, args.entries, args.images
    );
    println!("{}", session);
    Ok(())
}
