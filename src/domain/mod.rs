//! # Domain Layer
//!
//! Core definitions, types, and traits that define the business domain of the webhook.
//! Independent of specific frameworks (mostly), serving as the contract for other layers.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
