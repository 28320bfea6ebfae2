use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod cors;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use config::{AppConfig, Command, PopulateArgs};
use services::{
    drs_service::{DrsService, DrsSettings},
    events::EventPublisher,
    object_store::{S3Config, S3ObjectStore},
    populate,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    // --- Logging setup (RUST_LOG wins over the configured level) ---
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting drs-server with config: {:?}", cfg.redacted());

    // --- Initialize SQLite connection ---
    let db = db::connect(&cfg.database_url).await?;

    if command == Command::Migrate {
        db::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize core service ---
    let store = S3ObjectStore::new(S3Config::from(&cfg))?;
    let events = EventPublisher::new(cfg.topic_name.clone());
    let service = DrsService::new(
        db.clone(),
        Arc::new(store),
        events,
        DrsSettings {
            drs_path: cfg.drs_path.clone(),
            s3_url: cfg.s3_url.clone(),
            s3_public_url: cfg.s3_public_url.clone(),
            presign_expiry: cfg.presign_expiry(),
        },
    );

    match command {
        Command::Populate(args) => run_populate(&service, args).await,
        Command::Cleanup { prefix } => {
            let deleted = service.delete_objects(prefix.as_deref()).await?;
            tracing::info!(deleted, "Cleanup complete.");
            Ok(())
        }
        Command::Serve | Command::Migrate => serve(&cfg, service).await,
    }
}

async fn run_populate(service: &DrsService, args: PopulateArgs) -> Result<()> {
    let entries = match (&args.dir, &args.manifest) {
        (Some(dir), _) => populate::scan_directory(dir, &args.key_prefix)
            .await
            .with_context(|| format!("scanning {}", dir.display()))?,
        (None, Some(manifest)) => populate::read_manifest(manifest).await?,
        (None, None) => anyhow::bail!("populate needs --dir or --manifest"),
    };

    let report = populate::populate(service, entries, args.upload).await?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        uploaded = report.uploaded,
        "Populate complete."
    );
    Ok(())
}

async fn serve(cfg: &AppConfig, service: DrsService) -> Result<()> {
    let _notifications = service.events.spawn_logger();

    // --- Build router ---
    let app: Router = routes::routes::routes(&cfg.api_route)
        .layer(cors::cors_layer(cfg))
        .with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
