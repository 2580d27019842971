//! # Contact Roster
//!
//! Flips the status of a contact in the roster worksheet when they opt out
//! (and, optionally, back when they opt in). Contacts are matched on the
//! digit suffix of their phone number with a linear scan; the first matching
//! row in sheet order is the only one written.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::phone;
use crate::application::retry::RetryPolicy;
use crate::domain::config::RosterConfig;
use crate::domain::error::SheetError;
use crate::domain::traits::SheetStore;
use crate::domain::types::{Action, RosterUpdate, format_timestamp};
use crate::infrastructure::sheets::a1;
use crate::strings::logs;

pub struct Roster {
    store: Arc<dyn SheetStore>,
    config: RosterConfig,
    retry: RetryPolicy,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

/// Column positions resolved from the roster header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    phone: usize,
    status: usize,
    timestamp: Option<usize>,
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    header.iter().position(|h| h.trim().to_lowercase() == wanted)
}

impl Roster {
    pub fn new(store: Arc<dyn SheetStore>, config: RosterConfig, retry: RetryPolicy) -> Self {
        Self {
            store,
            config,
            retry,
            write_lock: Mutex::new(()),
        }
    }

    /// Whether a message with this action should touch the roster.
    pub fn triggers(&self, action: Action) -> bool {
        match action {
            Action::OptOut => true,
            Action::OptIn => self.config.reactivate_on_opt_in,
            Action::Help | Action::Message => false,
        }
    }

    fn columns(&self, header: &[String]) -> Result<Columns, SheetError> {
        let missing = |name: &str| {
            SheetError::new(
                "roster",
                format!("Roster '{}' has no '{}' column", self.config.worksheet, name),
            )
        };
        Ok(Columns {
            phone: find_column(header, &self.config.phone_column)
                .ok_or_else(|| missing(&self.config.phone_column))?,
            status: find_column(header, &self.config.status_column)
                .ok_or_else(|| missing(&self.config.status_column))?,
            timestamp: find_column(header, &self.config.timestamp_column),
        })
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        let range = a1::cell_ref(row, col);
        self.retry
            .execute_with_retry("write_range", || async {
                self.store
                    .write_range(&self.config.worksheet, &range, vec![vec![value.to_string()]])
                    .await
            })
            .await
    }

    /// Updates the sender's roster row for an opt-out (or opt-in) keyword.
    pub async fn mark(&self, sender: &str, action: Action, now: DateTime<Utc>) -> Result<RosterUpdate, SheetError> {
        let (value, stamp) = match action {
            Action::OptOut => (self.config.opted_out_value.as_str(), format_timestamp(now)),
            _ => (self.config.opted_in_value.as_str(), String::new()),
        };

        let _guard = self.write_lock.lock().await;

        let rows = self
            .retry
            .execute_with_retry("read_range", || async {
                self.store.read_range(&self.config.worksheet, None).await
            })
            .await?;

        let Some((header, body)) = rows.split_first() else {
            return Err(SheetError::new(
                "roster",
                format!("Roster '{}' is empty", self.config.worksheet),
            ));
        };
        let columns = self.columns(header)?;

        let position = body.iter().position(|row| {
            row.get(columns.phone)
                .is_some_and(|cell| phone::same_number(cell, sender, self.config.suffix_digits))
        });

        let Some(index) = position else {
            tracing::info!("{}", logs::roster_not_found(sender));
            return Ok(RosterUpdate::NotFound);
        };
        // +1 for the header
        let row = index + 1;

        self.write_cell(row, columns.status, value).await?;
        if let Some(col) = columns.timestamp {
            self.write_cell(row, col, &stamp).await?;
        }

        tracing::info!("{}", logs::roster_applied(sender, row + 1, value));
        Ok(RosterUpdate::Applied { row: row + 1 })
    }
}
