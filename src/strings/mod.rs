//! # Strings Module
//!
//! Centralizes reply bodies and log text.
//! Ensures consistency in messaging and easier localization/updates.

pub mod logs;
pub mod messages;
