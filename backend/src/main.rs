//! Report Generation service entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use report_generation_backend::api::{self, AppState};
use report_generation_backend::cli::{Cli, Command, MigrateAction, ServeArgs};
use report_generation_backend::config::Config;
use report_generation_backend::db::{self, migrations};
use report_generation_backend::logging;
use report_generation_backend::services::{cache::RedisCache, metrics_service, scheduler_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init(config.log_format);

    match cli.command() {
        Command::Serve(args) => serve(config, args).await,
        Command::Migrate { action } => migrate(config, action).await,
    }
}

async fn serve(mut config: Config, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    if config.migrations_dir.exists() {
        migrations::MigrationService::new(
            pool.clone(),
            config.database.backend(),
            &config.migrations_dir,
        )
        .upgrade(migrations::HEAD)
        .await
        .context("Failed to apply migrations")?;
    } else {
        tracing::warn!(
            dir = %config.migrations_dir.display(),
            "Migrations directory not found, skipping schema upgrade"
        );
    }

    let cache = Arc::new(RedisCache::new(config.redis_url.clone()));
    let metrics = metrics_service::install_recorder();
    let state = Arc::new(AppState::new(config.clone(), pool, cache, metrics)?);

    // Redis being down degrades the dashboard but must not block startup
    let redis = state.cache.health_check().await;
    if redis.is_healthy() {
        tracing::info!("Successfully connected to Redis");
    } else {
        tracing::warn!("Redis connection failed: {}", redis.message);
    }

    scheduler_service::spawn_all(state.clone());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Report Generation service listening on {}", listener.local_addr()?);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down application...");
    Ok(())
}

async fn migrate(config: Config, action: MigrateAction) -> anyhow::Result<()> {
    let dir = config.migrations_dir.clone();

    if let MigrateAction::Revision {
        message,
        autogenerate,
    } = &action
    {
        let revision = migrations::revision(&dir, message, *autogenerate).await?;
        println!("Created {}", revision.up_path.display());
        println!("Created {}", revision.down_path.display());
        return Ok(());
    }

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let service = migrations::MigrationService::new(pool, config.database.backend(), &dir);

    match action {
        MigrateAction::Upgrade { revision } => {
            let applied = service.upgrade(&revision).await?;
            println!("Applied {} migration(s)", applied.len());
        }
        MigrateAction::Downgrade { revision } => {
            let reverted = service.downgrade(revision).await?;
            println!("Reverted {} migration(s)", reverted.len());
        }
        MigrateAction::Current => {
            let applied = service.current().await?;
            match applied.last() {
                Some(head) => {
                    for rev in &applied {
                        println!("{} {}", rev.version, rev.description);
                    }
                    println!("Current: {}", head.version);
                }
                None => println!("No migrations applied"),
            }
        }
        MigrateAction::Revision { .. } => {}
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
