// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for campaigns and recipients used across tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use courier_core::{CampaignDraft, FilterChoice, RecipientDraft};

/// Fixed reference instant: 2026-03-02 12:00:00 UTC.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A campaign filtered by operator code `"900"`.
///
/// Both windows span `[epoch - 1h, epoch + 1h)`, so the campaign is ready at
/// [`epoch`] and every recipient with offset 0 is reachable.
pub fn campaign_draft() -> CampaignDraft {
    let now = epoch();
    CampaignDraft {
        message_text: "Spring sale starts today".into(),
        operator_code: "900".into(),
        tag: "spring".into(),
        filter_choice: FilterChoice::Operator,
        dispatch_start: now - Duration::hours(1),
        dispatch_end: now + Duration::hours(1),
        eligibility_start: now - Duration::hours(1),
        eligibility_end: now + Duration::hours(1),
    }
}

/// A recipient on operator `"900"` with tag `"spring"` and UTC offset 0.
pub fn recipient_draft(phone: i64) -> RecipientDraft {
    RecipientDraft {
        phone,
        operator_code: "900".into(),
        tag: "spring".into(),
        utc_offset: 0,
    }
}
