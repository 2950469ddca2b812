// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier stats` command implementation.

use courier_config::model::CourierConfig;
use courier_core::{CampaignStats, CourierError};

use crate::serve::open_storage;

/// Prints aggregated delivery stats for every campaign.
pub async fn run_stats(config: &CourierConfig, json: bool) -> Result<(), CourierError> {
    let storage = open_storage(config).await?;
    let stats = storage.all_campaign_stats().await?;
    storage.close().await?;

    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| CourierError::Internal(format!("failed to encode stats: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render_table(&stats));
    }
    Ok(())
}

fn render_table(stats: &[CampaignStats]) -> String {
    if stats.is_empty() {
        return "no campaigns\n".to_string();
    }

    let mut out = format!(
        "{:>8}  {:>9}  {:>6}  {:<25}  {:<25}\n",
        "campaign", "succeeded", "failed", "first attempt", "last attempt"
    );
    for s in stats {
        let first = s.first_attempt_at.map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        let last = s.last_attempt_at.map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        out.push_str(&format!(
            "{:>8}  {:>9}  {:>6}  {:<25}  {:<25}\n",
            s.campaign_id, s.succeeded, s.failed, first, last
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table() {
        assert_eq!(render_table(&[]), "no campaigns\n");
    }

    #[test]
    fn table_has_one_row_per_campaign() {
        let mut delivered = CampaignStats::empty(1);
        delivered.succeeded = 12;
        delivered.failed = 3;
        let table = render_table(&[delivered, CampaignStats::empty(2)]);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("12"));
        assert!(lines[2].trim_end().ends_with('-'));
    }
}
