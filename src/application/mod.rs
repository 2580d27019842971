//! # Application Layer
//!
//! Contains the core business logic of the webhook.
//! This includes keyword classification, the log and roster writers, retries, and the inbound pipeline.

pub mod keywords;
pub mod logbook;
pub mod phone;
pub mod processor;
pub mod retry;
pub mod roster;
