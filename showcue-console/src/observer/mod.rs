//! Local mirror of the session's navigation state

mod binding;

pub use binding::{Bookmark, LinkStatus, ObserverBinding, PositionView};
