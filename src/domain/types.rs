//! # Domain Types
//!
//! Common data structures and enums used across the webhook pipeline.

use chrono::{DateTime, Utc};
use std::fmt;

pub const CHANNEL_SMS: &str = "SMS";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Header row of the log worksheet, in column order.
pub const LOG_HEADERS: [&str; 8] = [
    "timestamp", "from", "keyword", "channel", "status", "action", "reason", "to",
];

/// The three form fields the messaging provider posts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl InboundSms {
    pub fn new(from: &str, to: &str, body: &str) -> Self {
        Self {
            from: from.trim().to_string(),
            to: to.trim().to_string(),
            body: body.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OptOut,
    OptIn,
    Help,
    Message,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::OptOut => "Opt-out",
            Action::OptIn => "Opt-in",
            Action::Help => "Help",
            Action::Message => "Message",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the message after it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Received,
    /// The roster row was updated.
    Applied,
    /// A roster update was due but no row matched the sender.
    NotFound,
    /// A roster update was due but the spreadsheet call failed.
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::Applied => "Applied",
            Status::NotFound => "Not found",
            Status::Failed => "Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of keyword classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub action: Action,
    pub reason: String,
    pub reply: String,
}

/// One row of the log worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: String,
    pub from: String,
    pub body: String,
    pub channel: String,
    pub status: Status,
    pub action: Action,
    pub reason: String,
    pub to: String,
}

impl LogRow {
    pub fn new(sms: &InboundSms, classification: &Classification, status: Status, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: format_timestamp(now),
            from: sms.from.clone(),
            body: sms.body.clone(),
            channel: CHANNEL_SMS.to_string(),
            status,
            action: classification.action,
            reason: classification.reason.clone(),
            to: sms.to.clone(),
        }
    }

    /// Cell values in `LOG_HEADERS` order.
    pub fn into_cells(self) -> Vec<String> {
        vec![
            self.timestamp,
            self.from,
            self.body,
            self.channel,
            self.status.to_string(),
            self.action.to_string(),
            self.reason,
            self.to,
        ]
    }
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Outcome of a roster update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterUpdate {
    /// 1-based sheet row that was written.
    Applied { row: usize },
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inbound_trims_fields() {
        let sms = InboundSms::new(" +15551234567 ", "\t+15550000000", "  STOP \n");
        assert_eq!(sms.from, "+15551234567");
        assert_eq!(sms.to, "+15550000000");
        assert_eq!(sms.body, "STOP");
    }

    #[test]
    fn test_log_row_cells_follow_header_order() {
        let sms = InboundSms::new("+1555", "+1666", "Stop");
        let classification = Classification {
            action: Action::OptOut,
            reason: "user_sent_stop".to_string(),
            reply: String::new(),
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let cells = LogRow::new(&sms, &classification, Status::Applied, now).into_cells();

        assert_eq!(cells.len(), LOG_HEADERS.len());
        assert_eq!(
            cells,
            vec![
                "2024-03-05 07:08:09 UTC",
                "+1555",
                "Stop",
                "SMS",
                "Applied",
                "Opt-out",
                "user_sent_stop",
                "+1666",
            ]
        );
    }

    #[test]
    fn test_status_rendering() {
        assert_eq!(Status::NotFound.to_string(), "Not found");
        assert_eq!(Action::OptIn.to_string(), "Opt-in");
    }
}
