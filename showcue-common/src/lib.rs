//! # Showcue Common Library
//!
//! Shared code for the showcue services including:
//! - Navigation command and event types (NavCommand / NavEvent)
//! - API request/response types
//! - Database schema and initialization
//! - Configuration loading
//! - Common error types

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{NavCommand, NavEvent};
