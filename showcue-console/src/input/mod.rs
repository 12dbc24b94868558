//! Keyboard input normalization

mod keypad;

pub use keypad::{JumpBuffer, KeypadAction, KeypadAdapter, KeypadEvent, KeyInput, DEBOUNCE};
