//! # Inbound Processor
//!
//! Runs one inbound SMS through the pipeline: noise filter, keyword
//! classification, roster update, log append. Spreadsheet failures are
//! logged and never change the reply the texter receives.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::keywords::KeywordClassifier;
use crate::application::logbook::Logbook;
use crate::application::retry::RetryPolicy;
use crate::application::roster::Roster;
use crate::domain::config::AppConfig;
use crate::domain::error::SheetError;
use crate::domain::traits::SheetStore;
use crate::domain::types::{Classification, InboundSms, LogRow, RosterUpdate, Status};
use crate::strings::logs;

/// What the processor did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Reply text; `None` for filtered noise.
    pub reply: Option<String>,
    pub classification: Option<Classification>,
    pub status: Status,
    pub logged: bool,
}

impl Outcome {
    fn ignored() -> Self {
        Self {
            reply: None,
            classification: None,
            status: Status::Received,
            logged: false,
        }
    }
}

pub struct InboundProcessor {
    store: Arc<dyn SheetStore>,
    classifier: KeywordClassifier,
    logbook: Logbook,
    roster: Option<Roster>,
}

impl InboundProcessor {
    pub fn new(config: &AppConfig, store: Arc<dyn SheetStore>) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let classifier = KeywordClassifier::new(&config.keywords, &config.replies);
        let logbook = Logbook::new(
            store.clone(),
            &config.sheets.worksheet,
            config.sheets.repair_header,
            retry.clone(),
        );
        let roster = config
            .roster
            .clone()
            .map(|roster| Roster::new(store.clone(), roster, retry));

        Self {
            store,
            classifier,
            logbook,
            roster,
        }
    }

    pub fn worksheet(&self) -> &str {
        self.logbook.worksheet()
    }

    /// Checks spreadsheet access and the log worksheet. Returns the spreadsheet title.
    pub async fn health(&self) -> Result<String, SheetError> {
        let title = self.store.title().await?;
        self.logbook.ensure_header().await?;
        Ok(title)
    }

    pub async fn handle(&self, sms: &InboundSms, now: DateTime<Utc>) -> Outcome {
        tracing::info!("{}", logs::inbound(&sms.from, &sms.body));

        if !self.classifier.should_log(&sms.body) {
            tracing::debug!("{}", logs::filtered(&sms.from));
            return Outcome::ignored();
        }

        let classification = self.classifier.classify(&sms.body);
        let status = self.apply_roster(sms, &classification, now).await;

        let row = LogRow::new(sms, &classification, status, now);
        let logged = match self.logbook.append(row).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{}", logs::sheets_error(&e.to_string()));
                false
            }
        };

        Outcome {
            reply: Some(classification.reply.clone()),
            classification: Some(classification),
            status,
            logged,
        }
    }

    async fn apply_roster(&self, sms: &InboundSms, classification: &Classification, now: DateTime<Utc>) -> Status {
        let Some(roster) = &self.roster else {
            return Status::Received;
        };
        if !roster.triggers(classification.action) {
            return Status::Received;
        }
        match roster.mark(&sms.from, classification.action, now).await {
            Ok(RosterUpdate::Applied { .. }) => Status::Applied,
            Ok(RosterUpdate::NotFound) => Status::NotFound,
            Err(e) => {
                tracing::error!("{}", logs::sheets_error(&e.to_string()));
                Status::Failed
            }
        }
    }
}
