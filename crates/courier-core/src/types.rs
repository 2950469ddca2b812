// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the scheduler.
//!
//! Serde field names follow the wire format used on the broker subjects, so
//! payloads published by other producers decode without translation. Operator
//! codes are accepted as JSON strings or integers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::error::CourierError;
use crate::window::ActivationWindow;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator an adapter stands in for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Broker,
    Storage,
    Delivery,
}

/// Which recipient attribute a campaign filters its audience on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum FilterChoice {
    /// Match `Recipient::operator_code` against `Campaign::operator_code`.
    #[serde(rename = "code")]
    #[strum(serialize = "code")]
    Operator,
    /// Match `Recipient::tag` against `Campaign::tag`.
    #[serde(rename = "tag")]
    #[strum(serialize = "tag")]
    Tag,
}

/// A bulk-notification request addressed to a filtered audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub message_text: String,
    #[serde(rename = "mobile_operator_code")]
    pub operator_code: String,
    pub tag: String,
    pub filter_choice: FilterChoice,
    /// Dispatch window: when the campaign may be processed at all.
    #[serde(rename = "datetime_start")]
    pub dispatch_start: DateTime<Utc>,
    #[serde(rename = "datetime_end")]
    pub dispatch_end: DateTime<Utc>,
    /// Eligibility window, compared against each recipient's local time.
    #[serde(rename = "interval_start")]
    pub eligibility_start: DateTime<Utc>,
    #[serde(rename = "interval_end")]
    pub eligibility_end: DateTime<Utc>,
}

impl Campaign {
    /// The activation window of any broker message carrying this campaign.
    pub fn dispatch_window(&self) -> Result<ActivationWindow, CourierError> {
        ActivationWindow::new(self.dispatch_start, self.dispatch_end)
    }

    pub fn eligibility_window(&self) -> Result<ActivationWindow, CourierError> {
        ActivationWindow::new(self.eligibility_start, self.eligibility_end)
    }

    /// The attribute value the audience is filtered on.
    pub fn filter_value(&self) -> &str {
        match self.filter_choice {
            FilterChoice::Operator => &self.operator_code,
            FilterChoice::Tag => &self.tag,
        }
    }
}

/// Campaign fields before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub message_text: String,
    #[serde(rename = "mobile_operator_code", default)]
    pub operator_code: String,
    #[serde(default)]
    pub tag: String,
    pub filter_choice: FilterChoice,
    #[serde(rename = "datetime_start")]
    pub dispatch_start: DateTime<Utc>,
    #[serde(rename = "datetime_end")]
    pub dispatch_end: DateTime<Utc>,
    #[serde(rename = "interval_start")]
    pub eligibility_start: DateTime<Utc>,
    #[serde(rename = "interval_end")]
    pub eligibility_end: DateTime<Utc>,
}

impl CampaignDraft {
    pub fn into_campaign(self, id: i64) -> Campaign {
        Campaign {
            id,
            message_text: self.message_text,
            operator_code: self.operator_code,
            tag: self.tag,
            filter_choice: self.filter_choice,
            dispatch_start: self.dispatch_start,
            dispatch_end: self.dispatch_end,
            eligibility_start: self.eligibility_start,
            eligibility_end: self.eligibility_end,
        }
    }
}

/// Length of one UTC offset step, in minutes.
pub const UTC_OFFSET_STEP_MINUTES: i64 = 15;

/// Smallest accepted offset: UTC-12:00.
pub const MIN_UTC_OFFSET: i32 = -48;

/// Largest accepted offset: UTC+14:00.
pub const MAX_UTC_OFFSET: i32 = 56;

/// Reads an operator code written either as a string or as an integer.
fn operator_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(code) => code,
        Code::Number(code) => code.to_string(),
    })
}

/// A member of a campaign audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    #[serde(rename = "phone_number")]
    pub phone: i64,
    #[serde(
        rename = "mobile_operator_code",
        default,
        deserialize_with = "operator_code"
    )]
    pub operator_code: String,
    #[serde(default)]
    pub tag: String,
    /// Signed offset from UTC in units of 15 minutes (`12` is UTC+03:00).
    #[serde(rename = "time_zone")]
    pub utc_offset: i32,
}

impl Recipient {
    /// The recipient's wall-clock time at `now`, expressed as a UTC instant.
    ///
    /// Fixed linear offset; no daylight-saving or calendar adjustment.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.offset()
    }

    fn offset(&self) -> Duration {
        Duration::minutes(UTC_OFFSET_STEP_MINUTES * i64::from(self.utc_offset))
    }

    /// Returns `true` if the recipient's local time at `now` lies strictly
    /// between the bounds of `window`.
    ///
    /// Both bounds are exclusive: at local `window.start()` the recipient is
    /// not reachable yet.
    pub fn is_reachable(&self, now: DateTime<Utc>, window: &ActivationWindow) -> bool {
        let local = self.local_time(now);
        local > window.start() && local < window.end()
    }

    /// The UTC instants at which the recipient's local clock reads the
    /// bounds of `window`. The recipient is reachable strictly between them.
    pub fn reachable_between(&self, window: &ActivationWindow) -> (DateTime<Utc>, DateTime<Utc>) {
        (window.start() - self.offset(), window.end() - self.offset())
    }

    /// Returns `true` if the recipient's attribute selected by `filter`
    /// equals `value`.
    pub fn matches(&self, filter: FilterChoice, value: &str) -> bool {
        match filter {
            FilterChoice::Operator => self.operator_code == value,
            FilterChoice::Tag => self.tag == value,
        }
    }

    pub fn offset_in_range(offset: i32) -> bool {
        (MIN_UTC_OFFSET..=MAX_UTC_OFFSET).contains(&offset)
    }
}

/// Recipient fields before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDraft {
    #[serde(rename = "phone_number")]
    pub phone: i64,
    #[serde(
        rename = "mobile_operator_code",
        default,
        deserialize_with = "operator_code"
    )]
    pub operator_code: String,
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "time_zone", default)]
    pub utc_offset: i32,
}

impl RecipientDraft {
    pub fn into_recipient(self, id: i64) -> Recipient {
        Recipient {
            id,
            phone: self.phone,
            operator_code: self.operator_code,
            tag: self.tag,
            utc_offset: self.utc_offset,
        }
    }
}

/// One delivery attempt to one recipient. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: i64,
    #[serde(rename = "date_time_creation")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "try")]
    pub attempt: u32,
    #[serde(rename = "delivery_status")]
    pub delivered: bool,
    #[serde(rename = "mailing_id")]
    pub campaign_id: i64,
    #[serde(rename = "client_id")]
    pub recipient_id: i64,
}

/// A delivery record about to be written; the store assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDeliveryRecord {
    pub attempt: u32,
    pub delivered: bool,
    pub campaign_id: i64,
    pub recipient_id: i64,
}

/// A campaign plus the recipients still owed a delivery.
///
/// Published on the pool subject; `attempt` increases by one on every
/// republication of the same audience subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEnvelope {
    #[serde(rename = "mailing")]
    pub campaign: Campaign,
    #[serde(rename = "clients")]
    pub recipients: Vec<Recipient>,
    #[serde(rename = "try")]
    pub attempt: u32,
}

impl RetryEnvelope {
    /// The window during which processing this envelope can reach anyone.
    ///
    /// It opens at the first instant one of the carried recipients becomes
    /// reachable (never before the dispatch window opens) and closes with the
    /// dispatch window. If no recipient can be reached again before dispatch
    /// ends, the window is empty at `now` and evaluates as expired. An envelope
    /// without recipients uses the dispatch window.
    pub fn activation_window(&self, now: DateTime<Utc>) -> Result<ActivationWindow, CourierError> {
        let dispatch = self.campaign.dispatch_window()?;
        if self.recipients.is_empty() {
            return Ok(dispatch);
        }

        let eligibility = self.campaign.eligibility_window()?;
        let opens = self
            .recipients
            .iter()
            .map(|r| r.reachable_between(&eligibility))
            .map(|(after, before)| ((after + Duration::nanoseconds(1)).max(now), before))
            .filter(|(first, before)| first < before)
            .map(|(first, _)| first)
            .min();

        match opens {
            Some(first) if first < dispatch.end() => {
                ActivationWindow::new(first.max(dispatch.start()), dispatch.end())
            }
            _ => ActivationWindow::new(now, now),
        }
    }
}

/// Aggregated delivery outcome of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    #[serde(rename = "mailing_id")]
    pub campaign_id: i64,
    /// Timestamp of the earliest delivery record, if any.
    pub first_attempt_at: Option<DateTime<Utc>>,
    /// Timestamp of the latest delivery record, if any.
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub succeeded: u64,
    pub failed: u64,
}

impl CampaignStats {
    /// Stats of a campaign with no delivery records yet.
    pub fn empty(campaign_id: i64) -> Self {
        Self {
            campaign_id,
            first_attempt_at: None,
            last_attempt_at: None,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Body of one outbound delivery API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub id: i64,
    pub phone: i64,
    pub text: String,
}

impl SendRequest {
    pub fn new(recipient: &Recipient, text: &str) -> Self {
        Self {
            id: recipient.id,
            phone: recipient.phone,
            text: text.to_string(),
        }
    }
}
