//! In-process spreadsheet.
//!
//! Backs `--dry-run` and every test that needs a `SheetStore`.
//! Failures can be queued per operation to exercise retry paths.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::a1;
use crate::domain::error::SheetError;
use crate::domain::traits::SheetStore;

#[derive(Default)]
struct Inner {
    worksheets: Vec<(String, Vec<Vec<String>>)>,
    frozen: HashMap<String, u32>,
    failures: HashMap<String, VecDeque<SheetError>>,
    calls: HashMap<String, usize>,
}

impl Inner {
    fn sheet(&self, name: &str) -> Option<&Vec<Vec<String>>> {
        self.worksheets.iter().find(|(n, _)| n == name).map(|(_, rows)| rows)
    }

    fn sheet_mut(&mut self, op: &str, name: &str) -> Result<&mut Vec<Vec<String>>, SheetError> {
        self.worksheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, rows)| rows)
            .ok_or_else(|| unknown_worksheet(op, name))
    }

    /// Counts the call and pops a queued failure, if any.
    fn enter(&mut self, op: &str) -> Result<(), SheetError> {
        *self.calls.entry(op.to_string()).or_default() += 1;
        match self.failures.get_mut(op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn unknown_worksheet(op: &str, name: &str) -> SheetError {
    SheetError::http(op, 400, format!("Unable to parse range: {}", a1::quote_worksheet(name)))
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

pub struct MemorySheets {
    title: String,
    inner: Mutex<Inner>,
}

impl MemorySheets {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Cells are plain values, so a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
impl MemorySheets {
    /// Seeds a worksheet with rows.
    pub fn with_worksheet(self, name: &str, rows: Vec<Vec<&str>>) -> Self {
        {
            let mut inner = self.lock();
            let rows = rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect();
            inner.worksheets.retain(|(n, _)| n != name);
            inner.worksheets.push((name.to_string(), rows));
        }
        self
    }

    /// Makes the next `times` calls of `op` fail with `err`.
    pub fn fail_next(&self, op: &str, err: SheetError, times: usize) {
        let mut inner = self.lock();
        let queue = inner.failures.entry(op.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(err.clone());
        }
    }

    /// Snapshot of a worksheet's rows; empty when it does not exist.
    pub fn rows(&self, name: &str) -> Vec<Vec<String>> {
        self.lock().sheet(name).cloned().unwrap_or_default()
    }

    pub fn has_worksheet(&self, name: &str) -> bool {
        self.lock().sheet(name).is_some()
    }

    pub fn frozen_rows(&self, name: &str) -> u32 {
        self.lock().frozen.get(name).copied().unwrap_or(0)
    }

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn title(&self) -> Result<String, SheetError> {
        self.lock().enter("title")?;
        Ok(self.title.clone())
    }

    async fn ensure_worksheet(&self, worksheet: &str, _rows: u32, _cols: u32) -> Result<bool, SheetError> {
        let mut inner = self.lock();
        inner.enter("ensure_worksheet")?;
        if inner.sheet(worksheet).is_some() {
            return Ok(false);
        }
        inner.worksheets.push((worksheet.to_string(), Vec::new()));
        Ok(true)
    }

    async fn read_range(&self, worksheet: &str, range: Option<&str>) -> Result<Vec<Vec<String>>, SheetError> {
        let op = "read_range";
        let mut inner = self.lock();
        inner.enter(op)?;
        let rows = inner.sheet(worksheet).ok_or_else(|| unknown_worksheet(op, worksheet))?;

        let Some(range) = range else {
            let mut out: Vec<Vec<String>> = rows.iter().cloned().map(trim_row).collect();
            while out.last().is_some_and(|r| r.is_empty()) {
                out.pop();
            }
            return Ok(out);
        };

        let range = a1::parse_range(range)
            .ok_or_else(|| SheetError::http(op, 400, format!("Unable to parse range: {range}")))?;

        let mut out = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            if !range.contains_row(r) {
                continue;
            }
            let cells = row
                .iter()
                .enumerate()
                .filter(|(c, _)| range.contains_col(*c))
                .map(|(_, v)| v.clone())
                .collect();
            out.push(trim_row(cells));
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_range(&self, worksheet: &str, range: &str, values: Vec<Vec<String>>) -> Result<(), SheetError> {
        let op = "write_range";
        let mut inner = self.lock();
        inner.enter(op)?;
        let start = a1::parse_range(range)
            .ok_or_else(|| SheetError::http(op, 400, format!("Unable to parse range: {range}")))?;
        let rows = inner.sheet_mut(op, worksheet)?;

        for (i, values_row) in values.into_iter().enumerate() {
            let r = start.start_row + i;
            if rows.len() <= r {
                rows.resize(r + 1, Vec::new());
            }
            let row = &mut rows[r];
            for (j, value) in values_row.into_iter().enumerate() {
                let c = start.start_col + j;
                if row.len() <= c {
                    row.resize(c + 1, String::new());
                }
                row[c] = value;
            }
        }
        Ok(())
    }

    async fn append_row(&self, worksheet: &str, row: Vec<String>) -> Result<(), SheetError> {
        let op = "append_row";
        let mut inner = self.lock();
        inner.enter(op)?;
        let rows = inner.sheet_mut(op, worksheet)?;
        let last = rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0);
        rows.truncate(last);
        rows.push(row);
        Ok(())
    }

    async fn clear(&self, worksheet: &str) -> Result<(), SheetError> {
        let op = "clear";
        let mut inner = self.lock();
        inner.enter(op)?;
        inner.sheet_mut(op, worksheet)?.clear();
        Ok(())
    }

    async fn freeze_rows(&self, worksheet: &str, rows: u32) -> Result<(), SheetError> {
        let op = "freeze_rows";
        let mut inner = self.lock();
        inner.enter(op)?;
        inner.sheet_mut(op, worksheet)?;
        inner.frozen.insert(worksheet.to_string(), rows);
        Ok(())
    }
}
