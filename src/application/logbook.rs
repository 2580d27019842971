//! # Log Worksheet
//!
//! Appends one row per inbound message to the log worksheet, creating the
//! worksheet and repairing its header row when needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::application::retry::RetryPolicy;
use crate::domain::error::SheetError;
use crate::domain::traits::SheetStore;
use crate::domain::types::{LOG_HEADERS, LogRow};
use crate::infrastructure::sheets::a1;
use crate::strings::logs;

const NEW_WORKSHEET_ROWS: u32 = 1000;
const NEW_WORKSHEET_COLS: u32 = 10;

pub struct Logbook {
    store: Arc<dyn SheetStore>,
    worksheet: String,
    repair_header: bool,
    retry: RetryPolicy,
    /// Set once the header has been checked; cleared when a write fails.
    header_ok: AtomicBool,
    /// Serializes worksheet creation and header repair within this process.
    header_lock: Mutex<()>,
}

impl Logbook {
    pub fn new(store: Arc<dyn SheetStore>, worksheet: &str, repair_header: bool, retry: RetryPolicy) -> Self {
        Self {
            store,
            worksheet: worksheet.to_string(),
            repair_header,
            retry,
            header_ok: AtomicBool::new(false),
            header_lock: Mutex::new(()),
        }
    }

    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// Creates the worksheet if missing and makes row 1 the expected header.
    /// Only the first caller does the work; later callers see the cached result.
    pub async fn ensure_header(&self) -> Result<(), SheetError> {
        if self.header_ok.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.header_lock.lock().await;
        if self.header_ok.load(Ordering::Acquire) {
            return Ok(());
        }
        self.check_header().await?;
        self.header_ok.store(true, Ordering::Release);
        Ok(())
    }

    async fn check_header(&self) -> Result<(), SheetError> {
        if self.store.ensure_worksheet(&self.worksheet, NEW_WORKSHEET_ROWS, NEW_WORKSHEET_COLS).await? {
            tracing::info!("{}", logs::worksheet_created(&self.worksheet));
        }

        // A failed read proves nothing about the header, so it never leads to a clear.
        let header = self
            .store
            .read_range(&self.worksheet, Some("1:1"))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let matches = header.len() >= LOG_HEADERS.len()
            && header.iter().zip(LOG_HEADERS.iter()).all(|(found, expected)| found == expected);

        if !matches {
            if !self.repair_header {
                tracing::warn!("{}", logs::header_mismatch(&self.worksheet, &header));
                return Ok(());
            }
            self.store.clear(&self.worksheet).await?;
            let range = format!("A1:{}", a1::cell_ref(0, LOG_HEADERS.len() - 1));
            let row: Vec<String> = LOG_HEADERS.iter().map(|h| h.to_string()).collect();
            self.store.write_range(&self.worksheet, &range, vec![row]).await?;
            self.store.freeze_rows(&self.worksheet, 1).await?;
            tracing::warn!("{}", logs::header_repaired(&self.worksheet));
        }
        Ok(())
    }

    /// Appends a row, retrying transient failures.
    pub async fn append(&self, row: LogRow) -> Result<(), SheetError> {
        let cells = row.into_cells();
        let result = self
            .retry
            .execute_with_retry("append_row", || async {
                self.ensure_header().await?;
                self.store.append_row(&self.worksheet, cells.clone()).await
            })
            .await;

        if result.is_err() {
            self.header_ok.store(false, Ordering::Release);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Action, Classification, InboundSms, Status};
    use crate::infrastructure::sheets::memory::MemorySheets;
    use async_trait::async_trait;
    use chrono::Utc;

    const WS: &str = "OPT-OUT LOGS";

    fn header() -> Vec<String> {
        LOG_HEADERS.iter().map(|h| h.to_string()).collect()
    }

    fn row() -> LogRow {
        let sms = InboundSms::new("+15550101234", "+15559990000", "hola");
        let classification = Classification {
            action: Action::Message,
            reason: "free_text".to_string(),
            reply: String::new(),
        };
        LogRow::new(&sms, &classification, Status::Received, Utc::now())
    }

    #[tokio::test]
    async fn test_creates_worksheet_and_header() {
        let store = Arc::new(MemorySheets::new("Book"));
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::none());

        book.append(row()).await.unwrap();

        let rows = store.rows(WS);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], header());
        assert_eq!(rows[1][1], "+15550101234");
        assert_eq!(rows[1][3], "SMS");
        assert_eq!(store.frozen_rows(WS), 1);
    }

    #[tokio::test]
    async fn test_repairs_wrong_header() {
        let store = Arc::new(
            MemorySheets::new("Book").with_worksheet(WS, vec![vec!["date", "phone"], vec!["x", "y"]]),
        );
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::none());
        book.ensure_header().await.unwrap();

        assert_eq!(store.rows(WS), vec![header()]);
    }

    #[tokio::test]
    async fn test_keeps_matching_header_and_rows() {
        let mut existing = LOG_HEADERS.to_vec();
        existing.push("extra");
        let store = Arc::new(
            MemorySheets::new("Book").with_worksheet(WS, vec![existing, vec!["old"]]),
        );
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::none());
        book.append(row()).await.unwrap();

        let rows = store.rows(WS);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["old".to_string()]);
        assert_eq!(store.calls("clear"), 0);
    }

    #[tokio::test]
    async fn test_mismatch_left_alone_without_repair() {
        let store = Arc::new(MemorySheets::new("Book").with_worksheet(WS, vec![vec!["mine"]]));
        let book = Logbook::new(store.clone(), WS, false, RetryPolicy::none());
        book.append(row()).await.unwrap();

        let rows = store.rows(WS);
        assert_eq!(rows[0], vec!["mine".to_string()]);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_append_retries_rate_limits() {
        let store = Arc::new(MemorySheets::new("Book"));
        store.fail_next("append_row", SheetError::http("append_row", 429, "quota"), 2);
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::new(&[1, 1]));

        book.append(row()).await.unwrap();
        assert_eq!(store.calls("append_row"), 3);
        assert_eq!(store.rows(WS).len(), 2);
    }

    #[tokio::test]
    async fn test_append_gives_up() {
        let store = Arc::new(MemorySheets::new("Book"));
        store.fail_next("append_row", SheetError::http("append_row", 500, "boom"), 5);
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::new(&[1]));

        assert!(book.append(row()).await.is_err());
        assert_eq!(store.calls("append_row"), 2);
        // Header gets re-checked on the next message
        assert!(!book.header_ok.load(Ordering::Acquire));
    }

    fn seeded() -> Arc<MemorySheets> {
        Arc::new(MemorySheets::new("Book").with_worksheet(
            WS,
            vec![
                LOG_HEADERS.to_vec(),
                vec!["2024-01-01 00:00:00 UTC", "+15550100000", "old message"],
            ],
        ))
    }

    #[tokio::test]
    async fn test_failed_header_read_keeps_history() {
        let store = seeded();
        store.fail_next("read_range", SheetError::http("read_range", 503, "unavailable"), 1);
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::new(&[1]));

        book.append(row()).await.unwrap();

        let rows = store.rows(WS);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][2], "old message");
        assert_eq!(store.calls("clear"), 0);
    }

    #[tokio::test]
    async fn test_failed_header_read_without_retries_is_an_error() {
        let store = seeded();
        store.fail_next("read_range", SheetError::http("read_range", 503, "unavailable"), 1);
        let book = Logbook::new(store.clone(), WS, true, RetryPolicy::none());

        assert!(book.append(row()).await.is_err());
        assert_eq!(store.rows(WS).len(), 2);
        assert_eq!(store.calls("clear"), 0);
        assert_eq!(store.calls("append_row"), 0);
    }

    /// Yields after each read so concurrent callers interleave right after
    /// looking at the header.
    struct YieldingStore(Arc<MemorySheets>);

    #[async_trait]
    impl SheetStore for YieldingStore {
        async fn title(&self) -> Result<String, SheetError> {
            self.0.title().await
        }
        async fn ensure_worksheet(&self, worksheet: &str, rows: u32, cols: u32) -> Result<bool, SheetError> {
            self.0.ensure_worksheet(worksheet, rows, cols).await
        }
        async fn read_range(&self, worksheet: &str, range: Option<&str>) -> Result<Vec<Vec<String>>, SheetError> {
            let rows = self.0.read_range(worksheet, range).await;
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            rows
        }
        async fn write_range(&self, worksheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
            self.0.write_range(worksheet, range, rows).await
        }
        async fn append_row(&self, worksheet: &str, row: Vec<String>) -> Result<(), SheetError> {
            self.0.append_row(worksheet, row).await
        }
        async fn clear(&self, worksheet: &str) -> Result<(), SheetError> {
            self.0.clear(worksheet).await
        }
        async fn freeze_rows(&self, worksheet: &str, rows: u32) -> Result<(), SheetError> {
            self.0.freeze_rows(worksheet, rows).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_appends_are_serialized() {
        let memory = Arc::new(MemorySheets::new("Book"));
        let store = Arc::new(YieldingStore(memory.clone()));
        let book = Logbook::new(store, WS, true, RetryPolicy::none());

        let (a, b, c) = tokio::join!(book.append(row()), book.append(row()), book.ensure_header());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(c.is_ok());

        let rows = memory.rows(WS);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header());
        assert_eq!(memory.calls("clear"), 1);
        assert_eq!(memory.calls("ensure_worksheet"), 1);
    }
}
