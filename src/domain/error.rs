//! # Spreadsheet Errors
//!
//! Error type shared by every `SheetStore` implementation.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetError {
    /// Operation that failed, e.g. "append_row".
    pub op: String,
    pub message: String,
    /// HTTP status when the remote API answered.
    pub status: Option<u16>,
    /// Transport-level failure (connect, timeout) with no HTTP answer.
    pub transport: bool,
}

impl SheetError {
    pub fn new(op: &str, message: impl Into<String>) -> Self {
        Self {
            op: op.to_string(),
            message: message.into(),
            status: None,
            transport: false,
        }
    }

    pub fn http(op: &str, status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(op, message)
        }
    }

    pub fn transport(op: &str, message: impl Into<String>) -> Self {
        Self {
            transport: true,
            ..Self::new(op, message)
        }
    }

    /// Rate limits, server errors and network failures are worth another try.
    pub fn is_retryable(&self) -> bool {
        if self.transport {
            return true;
        }
        match self.status {
            Some(429) => true,
            Some(code) => (500..600).contains(&code),
            None => false,
        }
    }
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "[{}] HTTP {}: {}", self.op, code, self.message),
            None => write!(f, "[{}] {}", self.op, self.message),
        }
    }
}

impl std::error::Error for SheetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SheetError::http("append_row", 429, "Quota exceeded").is_retryable());
        assert!(SheetError::http("append_row", 503, "Service Unavailable").is_retryable());
        assert!(SheetError::transport("append_row", "connection reset").is_retryable());

        assert!(!SheetError::http("append_row", 400, "Bad Request").is_retryable());
        assert!(!SheetError::http("append_row", 404, "Not Found").is_retryable());
        assert!(!SheetError::new("auth", "invalid key").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = SheetError::http("read_range", 403, "forbidden");
        assert_eq!(err.to_string(), "[read_range] HTTP 403: forbidden");
        assert_eq!(SheetError::new("auth", "bad pem").to_string(), "[auth] bad pem");
    }
}
