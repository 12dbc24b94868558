//! Navigation authority service for showcue
//!
//! Owns the position store, the navigation engine, and the per-session
//! broadcast bus. Nothing mutates a session's navigation state except
//! through [`engine::NavigationEngine::apply`].

pub mod api;
pub mod bus;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod store;

pub use error::{NavError, Result};
