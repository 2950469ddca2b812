// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Opens SQLite storage, the HTTP delivery client and the configured broker,
//! then runs the scheduler until a shutdown signal arrives.

use std::sync::Arc;

use courier_broker::MemoryBroker;
use courier_config::model::{BrokerConfig, BrokerKind, CourierConfig};
use courier_core::{
    BrokerAdapter, CourierError, DeliveryAdapter, HealthStatus, PluginAdapter, StorageAdapter,
};
use courier_delivery::HttpDelivery;
use courier_scheduler::{Scheduler, SchedulerSettings, install_signal_handler};
use courier_storage::SqliteStorage;
use tracing::{error, info, warn};

#[cfg(feature = "nats")]
use courier_broker::NatsBroker;

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting courier serve");

    let storage = open_storage(&config).await?;
    let delivery: Arc<dyn DeliveryAdapter> = Arc::new(HttpDelivery::new(&config.delivery)?);
    let broker = connect_broker(&config.broker).await?;

    report_health(storage.as_ref()).await;
    report_health(delivery.as_ref()).await;
    report_health(broker.as_ref()).await;

    let cancel = install_signal_handler();
    let scheduler = Scheduler::new(
        SchedulerSettings::from_config(&config),
        storage.clone(),
        delivery.clone(),
        broker.clone(),
    );
    let result = scheduler.run(cancel).await;

    shutdown_adapter(broker.as_ref()).await;
    shutdown_adapter(delivery.as_ref()).await;
    storage.close().await?;

    info!("courier stopped");
    result
}

/// Opens and migrates the SQLite database.
pub(crate) async fn open_storage(
    config: &CourierConfig,
) -> Result<Arc<dyn StorageAdapter>, CourierError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Builds the broker adapter selected by `broker.kind`.
pub(crate) async fn connect_broker(
    config: &BrokerConfig,
) -> Result<Arc<dyn BrokerAdapter>, CourierError> {
    match config.kind {
        BrokerKind::Memory => {
            warn!("using the in-process broker; messages do not survive a restart");
            Ok(Arc::new(MemoryBroker::new()))
        }
        #[cfg(feature = "nats")]
        BrokerKind::Nats => Ok(Arc::new(NatsBroker::connect(config).await?)),
        #[cfg(not(feature = "nats"))]
        BrokerKind::Nats => Err(CourierError::Config(
            "broker.kind = \"nats\" requires courier built with the `nats` feature".into(),
        )),
    }
}

async fn report_health<A: PluginAdapter + ?Sized>(adapter: &A) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => {
            info!(adapter = adapter.name(), kind = %adapter.adapter_type(), "adapter healthy");
        }
        Ok(status) => {
            warn!(adapter = adapter.name(), status = ?status, "adapter not fully healthy");
        }
        Err(e) => {
            error!(adapter = adapter.name(), error = %e, "adapter health check failed");
        }
    }
}

async fn shutdown_adapter<A: PluginAdapter + ?Sized>(adapter: &A) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins; otherwise the configured level applies to courier crates.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
