//! HTTP API for the navigation service

mod handlers;
mod server;
mod sse;

pub use server::{create_router, AppContext};
