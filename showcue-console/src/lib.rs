//! Producer console for showcue
//!
//! Hosts the three input surfaces that feed the navigation service —
//! debounced keypad entry, dedicated navigation keys, and the voice
//! pipeline — plus the observer binding that keeps the console's view of
//! the current position in sync with every other client.

pub mod error;
pub mod input;
pub mod net;
pub mod observer;
pub mod voice;

pub use error::{ConsoleError, Result};
