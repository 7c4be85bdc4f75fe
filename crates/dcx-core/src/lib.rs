//! Core domain + application logic for the Discord channel-export bot.
//!
//! This crate is intentionally framework-agnostic. Discord lives behind a
//! port (trait) implemented in the adapter crate; everything here can be
//! exercised without a gateway connection.

pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod formatting;
pub mod logging;
pub mod ports;

pub use errors::{Error, Result};
