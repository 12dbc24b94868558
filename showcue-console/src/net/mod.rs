//! HTTP and SSE plumbing for talking to the navigation service

mod client;
mod sse;

pub use client::NavClient;
pub use sse::{decode_event, SseFrame, SseFrameParser};
