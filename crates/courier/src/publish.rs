// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier publish` command implementation.

use std::path::Path;

use courier_config::model::{BrokerKind, CourierConfig};
use courier_core::{CampaignDraft, CourierError};
use courier_scheduler::CampaignPublisher;

use crate::serve::{connect_broker, open_storage};

/// Parses a campaign draft from JSON.
fn parse_draft(raw: &str, path: &Path) -> Result<CampaignDraft, CourierError> {
    serde_json::from_str(raw)
        .map_err(|e| CourierError::Config(format!("invalid campaign in {}: {e}", path.display())))
}

/// Stores the campaign in `file` and announces it on the group subject.
pub async fn run_publish(config: &CourierConfig, file: &Path) -> Result<(), CourierError> {
    if config.broker.kind == BrokerKind::Memory {
        return Err(CourierError::Config(
            "publishing needs a shared broker; set broker.kind = \"nats\"".into(),
        ));
    }

    let raw = std::fs::read_to_string(file)
        .map_err(|e| CourierError::Config(format!("cannot read {}: {e}", file.display())))?;
    let draft = parse_draft(&raw, file)?;

    let storage = open_storage(config).await?;
    let broker = connect_broker(&config.broker).await?;
    let publisher =
        CampaignPublisher::new(storage.clone(), broker, config.broker.group_subject.clone());

    let campaign = publisher.publish(&draft).await?;
    storage.close().await?;

    println!(
        "campaign {} published on {} (window {} .. {})",
        campaign.id, config.broker.group_subject, campaign.dispatch_start, campaign.dispatch_end
    );
    Ok(())
}
