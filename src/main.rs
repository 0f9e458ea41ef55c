// src/main.rs

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use firmirror::cli::{Cli, Commands, RefreshArgs};
use firmirror::config::FileConfig;
use firmirror::storage::{LocalStorage, S3Settings, S3Storage, Storage};
use firmirror::sync::FirmwareSyncer;
use firmirror::tools;
use firmirror::vendors::{DellVendor, HpeVendor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh(args) => refresh(args).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "firmirror", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Build the configuration from the optional file and the flags
fn load_config(args: &RefreshArgs) -> Result<FileConfig> {
    let mut config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn create_storage(config: &FileConfig) -> Result<Arc<dyn Storage>> {
    let s3 = &config.storage.s3;
    if s3.enabled {
        let storage = S3Storage::new(S3Settings {
            bucket: s3.bucket.clone(),
            prefix: s3.prefix.clone(),
            region: s3.region.clone(),
            endpoint: s3.endpoint.clone(),
        })
        .context("Failed to create S3 storage backend")?;
        info!("Using S3 storage backend: {}", storage.name());
        return Ok(Arc::new(storage));
    }

    let Some(output_dir) = &config.storage.output_dir else {
        bail!("Output directory is required when using local storage");
    };
    let storage = LocalStorage::new(output_dir).context("Failed to create local storage backend")?;
    info!("Using local filesystem storage: {}", output_dir.display());
    Ok(Arc::new(storage))
}

fn register_vendors(syncer: &mut FirmwareSyncer, config: &FileConfig) -> Result<()> {
    let hpe = &config.vendors.hpe;
    if hpe.enabled {
        for generation in &hpe.gens {
            let repo = HpeVendor::repo_for_generation(generation);
            let mut vendor = HpeVendor::new(&repo)?;
            if let Some(base) = &hpe.base_url {
                vendor = vendor.with_base_url(format!("{}/{}", base.trim_end_matches('/'), repo));
            }
            syncer.register_vendor(format!("hpe-{generation}"), Arc::new(vendor));
        }
    }

    let dell = &config.vendors.dell;
    if dell.enabled {
        let mut vendor = DellVendor::new(dell.machine_ids.clone())?;
        if let Some(base) = &dell.base_url {
            vendor = vendor.with_base_url(base.clone());
        }
        syncer.register_vendor("dell", Arc::new(vendor));
    }

    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = terminate.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("Received shutdown signal, finishing current firmware");
        token.cancel();
    });
}

async fn refresh(args: RefreshArgs) -> Result<()> {
    let config = load_config(&args)?;
    let sync_config = config.to_sync_config();

    tools::check_available([sync_config.cabinet_tool.as_str(), sync_config.jcat_tool.as_str()])?;

    let storage = create_storage(&config)?;
    let mut syncer = FirmwareSyncer::new(sync_config, storage);
    register_vendors(&mut syncer, &config)?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    // Without the previous index every firmware would be republished
    syncer
        .load_metadata()
        .await
        .context("Failed to load existing metadata")?;

    let summary = syncer.run(&cancel).await;

    info!("Saving repository metadata");
    syncer.save_metadata().await.context("Failed to save metadata")?;

    for report in &summary.reports {
        info!("{}", report);
    }
    for (vendor, message) in &summary.failed_vendors {
        error!("Vendor {} failed: {}", vendor, message);
    }
    info!(
        "Done: {} processed, {} skipped, {} failed, {} vendors failed{}",
        summary.processed(),
        summary.skipped(),
        summary.failed(),
        summary.failed_vendors.len(),
        if summary.cancelled { " (interrupted)" } else { "" }
    );

    Ok(())
}
