//! # Interface Layer
//!
//! Entry points exposed to the outside world: the HTTP webhook and probes.

pub mod http;
