pub const STARTING: &str = "Starting opt-out webhook...";
pub const SHUTDOWN: &str = "Shutting down...";
pub const DRY_RUN: &str = "Dry run: spreadsheet writes stay in memory";

pub fn config_missing(path: &str) -> String {
    format!("No config file at {path}, using defaults and environment")
}

pub fn listening(addr: &str) -> String {
    format!("Listening on http://{addr}")
}

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}

pub fn inbound(from: &str, body: &str) -> String {
    format!("Inbound SMS from {from}: {body}")
}

pub fn filtered(from: &str) -> String {
    format!("Ignoring technical noise from {from}")
}

pub fn sheets_error(err: &str) -> String {
    format!("[Sheets error] {err}")
}

pub fn retrying(op: &str, attempt: usize, err: &str, delay_ms: u64) -> String {
    format!("{op} failed (attempt {attempt}): {err} -> retry in {delay_ms}ms")
}

pub fn retry_succeeded(op: &str, attempt: usize) -> String {
    format!("{op} succeeded on attempt {attempt}")
}

pub fn header_repaired(worksheet: &str) -> String {
    format!("Header of '{worksheet}' did not match, rewrote it")
}

pub fn header_mismatch(worksheet: &str, found: &[String]) -> String {
    format!("Header of '{worksheet}' does not match the expected columns: {found:?}")
}

pub fn worksheet_created(worksheet: &str) -> String {
    format!("Created worksheet '{worksheet}'")
}

pub fn roster_applied(from: &str, row: usize, value: &str) -> String {
    format!("Roster row {row} for {from} set to '{value}'")
}

pub fn roster_not_found(from: &str) -> String {
    format!("No roster row matches {from}")
}

pub fn token_refreshed(expires_in: u64) -> String {
    format!("Refreshed spreadsheet access token (expires in {expires_in}s)")
}

pub fn spreadsheet_resolved(name: &str, id: &str) -> String {
    format!("Resolved spreadsheet '{name}' to {id}")
}
