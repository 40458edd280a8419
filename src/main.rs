//! Eventi Gare payments server.
//!
//! Loads configuration, restores the ledger snapshot and serves the
//! registration, checkout and webhook endpoints.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventi_gare::adapters::{
    app_router, FileSnapshotRepository, HttpSettings, InMemoryEventCatalog, MockCheckoutGateway,
    PaymentsAppState, SequenceNumberAssigner, SponsorSettings, StripeCheckoutGateway,
    StripeConfig, TracingEventPublisher,
};
use eventi_gare::application::PaymentLedger;
use eventi_gare::config::{AppConfig, PaymentConfig, ServerConfig};
use eventi_gare::ports::{CheckoutGateway, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);

    info!("Starting Eventi Gare payments server");
    config.validate()?;
    info!(
        environment = ?config.server.environment,
        snapshot = %config.storage.snapshot_path.display(),
        catalog = %config.storage.event_catalog_path.display(),
        "Configuration loaded"
    );

    let catalog = Arc::new(InMemoryEventCatalog::from_json_file(&config.storage.event_catalog_path).await?);
    info!(events = catalog.len(), "Event catalog loaded");

    let repository = Arc::new(FileSnapshotRepository::new(&config.storage.snapshot_path));
    let ledger = Arc::new(
        PaymentLedger::load(
            repository,
            Arc::new(TracingEventPublisher::new()),
            Arc::new(SystemClock),
        )
        .await?,
    );

    let report = ledger.sweep().await?;
    if !report.is_empty() {
        info!(?report, "Expired sessions swept at startup");
    }

    let numbers = Arc::new(SequenceNumberAssigner::seeded_from(
        catalog.clone(),
        &*ledger.current()?,
    ));

    let state = PaymentsAppState {
        ledger,
        catalog,
        numbers,
        gateway: build_gateway(&config.payment),
        redirects: config.checkout.participant_policy(),
        sponsor_redirects: config.checkout.sponsor_policy(),
        pricing: config.payment.pricing(),
        sponsor: SponsorSettings {
            activation_amount: config.sponsor.activation_amount,
            currency: config.sponsor.currency,
        },
    };

    let app = app_router(
        state,
        &HttpSettings {
            cors_origins: config.server.allowed_origins(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        },
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if server.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_gateway(payment: &PaymentConfig) -> Arc<dyn CheckoutGateway> {
    match (&payment.stripe_secret_key, payment.use_mock_gateway) {
        (Some(key), false) => {
            if payment.is_live_mode() {
                info!("Stripe gateway in live mode");
            }
            Arc::new(StripeCheckoutGateway::new(
                StripeConfig::new(key.expose_secret().as_str())
                    .with_base_url(&payment.stripe_api_base_url),
            ))
        }
        _ => {
            warn!("Using the mock checkout gateway; no real payments will be taken");
            Arc::new(MockCheckoutGateway::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
