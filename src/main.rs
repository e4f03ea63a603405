//! Weavery - engagement graph and feed engine
//!
//! The binary prepares storage (connects, applies every schema's indexes)
//! and optionally runs the orphan sweep. Serving traffic is the embedding
//! application's job; this crate is the engine underneath it.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weavery::{
    config::Args,
    db::{Collections, MongoClient},
    engine::Engine,
    services::{InMemoryMediaStore, RecordingMailer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("weavery={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Weavery - engagement engine");
    info!(
        "  commit {} built {}",
        option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
    );
    info!("======================================");
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("Operation timeout: {}ms", args.op_timeout_ms);
    info!(
        "Recommendations: {}",
        if args.recommend_verified_only {
            "verified profiles only"
        } else {
            "all profiles"
        }
    );
    info!("======================================");

    // Connect and apply every schema's indexes
    let client = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };
    let collections = match Collections::open(&client).await {
        Ok(collections) => collections,
        Err(e) => {
            error!("Failed to open collections: {}", e);
            std::process::exit(1);
        }
    };
    info!("Collections opened, indexes ensured");

    // Local collaborators; real deployments embed the crate and supply
    // their own MediaStore/Mailer.
    let engine = Engine::new(
        collections,
        Arc::new(InMemoryMediaStore::new()),
        Arc::new(RecordingMailer::new()),
        args.policy(),
    );

    if args.sweep_orphans {
        let removed = engine.sweep_orphans().await?;
        info!(removed, "orphan sweep complete");
    }

    info!("Storage ready");
    Ok(())
}
