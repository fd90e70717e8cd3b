use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use ecr_tag_webhook::adapters::{create_webhook_router, EcrRegistry, SsmParameterStore};
use ecr_tag_webhook::utils::logger;
use ecr_tag_webhook::{AdmissionPipeline, CliConfig};
use std::sync::Arc;
use std::time::Duration;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_server_logger(&cli.log_level, cli.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ecr-tag-webhook");
    tracing::debug!("CLI config: {:?}", cli);

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(category = ?e.category(), "configuration validation failed: {}", e);
            std::process::exit(1);
        }
    };
    let listen_addr = cli.listen_addr()?;
    let tls_files = cli.tls_files()?;

    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .load()
        .await;
    let registry = EcrRegistry::new(aws_sdk_ecr::Client::new(&aws));
    let parameters = SsmParameterStore::new(aws_sdk_ssm::Client::new(&aws));

    let pipeline = Arc::new(AdmissionPipeline::new(registry, parameters, &settings));
    let router = create_webhook_router(pipeline);

    match tls_files {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .with_context(|| format!("failed to load TLS material from {}", cert.display()))?;
            let handle = Handle::new();
            tokio::spawn(shutdown_on_signal(handle.clone()));
            tracing::info!(%listen_addr, "webhook listening with TLS");

            axum_server::bind_rustls(listen_addr, tls)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .context("webhook server failed")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(listen_addr)
                .await
                .with_context(|| format!("failed to bind {listen_addr}"))?;
            tracing::warn!(%listen_addr, "webhook listening without TLS");

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("webhook server failed")?;
        }
    }

    tracing::info!("webhook stopped");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

// Kubernetes stops pods with SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
