// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::{
    AdapterType, Campaign, CampaignDraft, CampaignStats, Clock, CourierError, DeliveryRecord,
    FilterChoice, HealthStatus, NewDeliveryRecord, PluginAdapter, Recipient, RecipientDraft,
    StorageAdapter, SystemClock,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`]. Delivery records are stamped with the
/// adapter's clock.
pub struct SqliteStorage {
    config: StorageConfig,
    clock: Arc<dyn Clock>,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: StorageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, CourierError> {
        self.db.get().ok_or_else(|| CourierError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CourierError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CourierError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CourierError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Scheduler operations ---

    async fn create_delivery_record(
        &self,
        record: &NewDeliveryRecord,
    ) -> Result<DeliveryRecord, CourierError> {
        queries::deliveries::create_delivery_record(self.db()?, record, self.clock.now()).await
    }

    async fn get_campaign(&self, campaign_id: i64) -> Result<Option<Campaign>, CourierError> {
        queries::campaigns::get_campaign(self.db()?, campaign_id).await
    }

    async fn recipients_by_filter(
        &self,
        filter: FilterChoice,
        value: &str,
    ) -> Result<Vec<Recipient>, CourierError> {
        queries::recipients::recipients_by_filter(self.db()?, filter, value).await
    }

    async fn delivered_recipient_ids(&self, campaign_id: i64) -> Result<Vec<i64>, CourierError> {
        queries::deliveries::delivered_recipient_ids(self.db()?, campaign_id).await
    }

    async fn campaign_stats(&self, campaign_id: i64) -> Result<CampaignStats, CourierError> {
        queries::deliveries::campaign_stats(self.db()?, campaign_id).await
    }

    async fn all_campaign_stats(&self) -> Result<Vec<CampaignStats>, CourierError> {
        queries::deliveries::all_campaign_stats(self.db()?).await
    }

    // --- Administration ---

    async fn create_campaign(&self, draft: &CampaignDraft) -> Result<Campaign, CourierError> {
        queries::campaigns::create_campaign(self.db()?, draft).await
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), CourierError> {
        queries::campaigns::update_campaign(self.db()?, campaign).await
    }

    async fn delete_campaign(&self, campaign_id: i64) -> Result<(), CourierError> {
        queries::campaigns::delete_campaign(self.db()?, campaign_id).await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, CourierError> {
        queries::campaigns::list_campaigns(self.db()?).await
    }

    async fn create_recipient(&self, draft: &RecipientDraft) -> Result<Recipient, CourierError> {
        queries::recipients::create_recipient(self.db()?, draft).await
    }

    async fn get_recipient(&self, recipient_id: i64) -> Result<Option<Recipient>, CourierError> {
        queries::recipients::get_recipient(self.db()?, recipient_id).await
    }

    async fn update_recipient(&self, recipient: &Recipient) -> Result<(), CourierError> {
        queries::recipients::update_recipient(self.db()?, recipient).await
    }

    async fn delete_recipient(&self, recipient_id: i64) -> Result<(), CourierError> {
        queries::recipients::delete_recipient(self.db()?, recipient_id).await
    }

    async fn list_delivery_records(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<DeliveryRecord>, CourierError> {
        queries::deliveries::list_delivery_records(self.db()?, campaign_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }
}
