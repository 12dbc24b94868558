//! Keypad input adapter — debounced multi-digit jump entry
//!
//! An explicit two-state machine (`Idle` / `Buffering`) with a cancellable
//! commit timer. Digits accumulate into a jump buffer; the buffer commits
//! on Enter or when the debounce timer fires, and is discarded on Escape
//! or when a modal takes focus. Dedicated navigation keys (arrows, space,
//! home/end) bypass the buffer entirely and emit immediately.
//!
//! Rapid digit entry produces exactly one emitted command: every digit
//! re-arms the timer, and every transition out of `Buffering` clears it.

use showcue_common::events::NavCommand;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Debounce window after the last digit before the buffer commits
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Normalized key input, decoupled from the terminal backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Digit(char),
    Enter,
    Escape,
    /// Next lineup entry
    Right,
    /// Previous lineup entry
    Left,
    /// Next entry (same as Right; presenter remotes send space)
    Space,
    /// Next image of the current entry
    Down,
    /// Previous image of the current entry
    Up,
    /// First lineup entry
    Home,
    /// Last lineup entry
    End,
}

/// Events consumed by the adapter loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadEvent {
    Key(KeyInput),
    /// A modal overlay or text input took focus: suppress and cancel
    ModalOpened,
    /// Focus returned to the navigation surface
    ModalClosed,
}

/// What the state machine wants done after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadAction {
    None,
    /// Emit a sequential command; the buffer and timer are untouched
    Emit(NavCommand),
    /// The buffer committed (Enter): emit and clear the timer
    Commit(NavCommand),
    /// Digits changed: (re)arm the commit timer
    ArmTimer,
    /// Left `Buffering` without emitting: clear the timer
    DisarmTimer,
}

/// Jump buffer state machine
///
/// Pure transitions; the async driver ([`KeypadAdapter`]) owns the actual
/// timer. Never shared across clients and never outlives its adapter.
#[derive(Debug, Default)]
pub struct JumpBuffer {
    digits: String,
    suppressed: bool,
}

impl JumpBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_buffering(&self) -> bool {
        !self.digits.is_empty()
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Apply one event and return the required action
    pub fn handle(&mut self, event: KeypadEvent) -> KeypadAction {
        match event {
            KeypadEvent::ModalOpened => {
                self.suppressed = true;
                if self.is_buffering() {
                    debug!("keypad: modal opened, discarding buffer {:?}", self.digits);
                    self.digits.clear();
                    KeypadAction::DisarmTimer
                } else {
                    KeypadAction::None
                }
            }
            KeypadEvent::ModalClosed => {
                self.suppressed = false;
                KeypadAction::None
            }
            // While suppressed no transitions occur; keys pass through to
            // whatever owns focus
            KeypadEvent::Key(_) if self.suppressed => KeypadAction::None,
            KeypadEvent::Key(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: KeyInput) -> KeypadAction {
        match key {
            KeyInput::Digit(d) => {
                debug_assert!(d.is_ascii_digit());
                self.digits.push(d);
                KeypadAction::ArmTimer
            }
            KeyInput::Enter if self.is_buffering() => self.commit(),
            KeyInput::Escape if self.is_buffering() => {
                debug!("keypad: discarding buffer {:?}", self.digits);
                self.digits.clear();
                KeypadAction::DisarmTimer
            }
            KeyInput::Enter | KeyInput::Escape => KeypadAction::None,
            // Dedicated navigation keys emit immediately from any state
            // without touching the buffer
            KeyInput::Right | KeyInput::Space => KeypadAction::Emit(NavCommand::Next),
            KeyInput::Left => KeypadAction::Emit(NavCommand::Previous),
            KeyInput::Down => KeypadAction::Emit(NavCommand::NextImage),
            KeyInput::Up => KeypadAction::Emit(NavCommand::PreviousImage),
            KeyInput::Home => KeypadAction::Emit(NavCommand::First),
            KeyInput::End => KeypadAction::Emit(NavCommand::Last),
        }
    }

    /// Commit the buffer: parse digits and return to `Idle`
    pub fn commit(&mut self) -> KeypadAction {
        let digits = std::mem::take(&mut self.digits);
        match digits.parse::<u32>() {
            Ok(n) => KeypadAction::Commit(NavCommand::JumpToPosition(n)),
            Err(e) => {
                // Practically unreachable (digits only), except on overflow
                warn!("keypad: unparseable buffer {:?}: {}", digits, e);
                KeypadAction::DisarmTimer
            }
        }
    }
}

/// Async driver: owns the debounce timer and the command channel
pub struct KeypadAdapter {
    buffer: JumpBuffer,
    deadline: Option<Instant>,
    debounce: Duration,
    cmd_tx: mpsc::Sender<NavCommand>,
}

impl KeypadAdapter {
    pub fn new(cmd_tx: mpsc::Sender<NavCommand>) -> Self {
        Self {
            buffer: JumpBuffer::new(),
            deadline: None,
            debounce: DEBOUNCE,
            cmd_tx,
        }
    }

    /// Run until the key channel closes
    ///
    /// The timer is re-armed on every digit and cleared on every exit from
    /// `Buffering`; teardown (channel close) drops any pending timer with
    /// the adapter.
    pub async fn run(mut self, mut key_rx: mpsc::Receiver<KeypadEvent>) {
        loop {
            let timer = async {
                match self.deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                maybe_event = key_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    let action = self.buffer.handle(event);
                    self.perform(action).await;
                }
                _ = timer => {
                    // Debounce expired: commit whatever accumulated
                    let action = self.buffer.commit();
                    self.deadline = None;
                    self.perform(action).await;
                }
            }
        }
        debug!("keypad: input channel closed, adapter shutting down");
    }

    async fn perform(&mut self, action: KeypadAction) {
        match action {
            KeypadAction::None => {}
            KeypadAction::ArmTimer => {
                self.deadline = Some(Instant::now() + self.debounce);
            }
            KeypadAction::DisarmTimer => {
                self.deadline = None;
            }
            KeypadAction::Emit(cmd) => {
                self.send(cmd).await;
            }
            KeypadAction::Commit(cmd) => {
                self.deadline = None;
                self.send(cmd).await;
            }
        }
    }

    async fn send(&self, cmd: NavCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("keypad: command channel closed, dropping {:?}", cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(buffer: &mut JumpBuffer, s: &str) -> Vec<KeypadAction> {
        s.chars()
            .map(|c| buffer.handle(KeypadEvent::Key(KeyInput::Digit(c))))
            .collect()
    }

    // ── State machine transitions ────────────────────────────────────────

    #[test]
    fn digits_accumulate_and_arm_timer() {
        let mut buffer = JumpBuffer::new();
        let actions = digits(&mut buffer, "23");
        assert_eq!(actions, vec![KeypadAction::ArmTimer, KeypadAction::ArmTimer]);
        assert_eq!(buffer.digits(), "23");
    }

    #[test]
    fn enter_commits_buffer() {
        let mut buffer = JumpBuffer::new();
        digits(&mut buffer, "23");
        let action = buffer.handle(KeypadEvent::Key(KeyInput::Enter));
        assert_eq!(action, KeypadAction::Commit(NavCommand::JumpToPosition(23)));
        assert!(!buffer.is_buffering());
    }

    #[test]
    fn escape_discards_buffer() {
        let mut buffer = JumpBuffer::new();
        digits(&mut buffer, "42");
        let action = buffer.handle(KeypadEvent::Key(KeyInput::Escape));
        assert_eq!(action, KeypadAction::DisarmTimer);
        assert!(!buffer.is_buffering());
    }

    #[test]
    fn enter_in_idle_does_nothing() {
        let mut buffer = JumpBuffer::new();
        assert_eq!(buffer.handle(KeypadEvent::Key(KeyInput::Enter)), KeypadAction::None);
        assert_eq!(buffer.handle(KeypadEvent::Key(KeyInput::Escape)), KeypadAction::None);
    }

    #[test]
    fn navigation_keys_emit_without_touching_buffer() {
        let mut buffer = JumpBuffer::new();
        digits(&mut buffer, "1");

        let action = buffer.handle(KeypadEvent::Key(KeyInput::Right));
        assert_eq!(action, KeypadAction::Emit(NavCommand::Next));
        // Buffer still intact
        assert_eq!(buffer.digits(), "1");

        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Left)),
            KeypadAction::Emit(NavCommand::Previous)
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Space)),
            KeypadAction::Emit(NavCommand::Next)
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Home)),
            KeypadAction::Emit(NavCommand::First)
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::End)),
            KeypadAction::Emit(NavCommand::Last)
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Down)),
            KeypadAction::Emit(NavCommand::NextImage)
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Up)),
            KeypadAction::Emit(NavCommand::PreviousImage)
        );
    }

    #[test]
    fn modal_suppresses_and_cancels() {
        let mut buffer = JumpBuffer::new();
        digits(&mut buffer, "7");

        // Modal takes focus: buffer discarded, timer cleared
        assert_eq!(buffer.handle(KeypadEvent::ModalOpened), KeypadAction::DisarmTimer);
        assert!(!buffer.is_buffering());

        // No transitions while suppressed
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Digit('5'))),
            KeypadAction::None
        );
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Right)),
            KeypadAction::None
        );

        // Focus back: keys work again
        assert_eq!(buffer.handle(KeypadEvent::ModalClosed), KeypadAction::None);
        assert_eq!(
            buffer.handle(KeypadEvent::Key(KeyInput::Digit('5'))),
            KeypadAction::ArmTimer
        );
    }

    // ── Async driver / debounce ──────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn debounce_emits_exactly_one_command() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (key_tx, key_rx) = mpsc::channel(8);
        let adapter = KeypadAdapter::new(cmd_tx);
        let handle = tokio::spawn(adapter.run(key_rx));

        key_tx.send(KeypadEvent::Key(KeyInput::Digit('2'))).await.unwrap();
        key_tx.send(KeypadEvent::Key(KeyInput::Digit('3'))).await.unwrap();

        // Just under the window: nothing yet
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(cmd_rx.try_recv().is_err());

        // Past the window: exactly one command
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cmd_rx.recv().await, Some(NavCommand::JumpToPosition(23)));
        assert!(cmd_rx.try_recv().is_err());

        drop(key_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn each_digit_resets_the_timer() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (key_tx, key_rx) = mpsc::channel(8);
        let handle = tokio::spawn(KeypadAdapter::new(cmd_tx).run(key_rx));

        key_tx.send(KeypadEvent::Key(KeyInput::Digit('1'))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        key_tx.send(KeypadEvent::Key(KeyInput::Digit('2'))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        // 800ms since the first digit but only 400ms since the last:
        // still buffering
        assert!(cmd_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cmd_rx.recv().await, Some(NavCommand::JumpToPosition(12)));

        drop(key_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn enter_commits_without_waiting_for_timer() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (key_tx, key_rx) = mpsc::channel(8);
        let handle = tokio::spawn(KeypadAdapter::new(cmd_tx).run(key_rx));

        key_tx.send(KeypadEvent::Key(KeyInput::Digit('2'))).await.unwrap();
        key_tx.send(KeypadEvent::Key(KeyInput::Digit('3'))).await.unwrap();
        key_tx.send(KeypadEvent::Key(KeyInput::Enter)).await.unwrap();

        // No sleep: the commit is immediate
        assert_eq!(cmd_rx.recv().await, Some(NavCommand::JumpToPosition(23)));

        // And the timer was cancelled: nothing further arrives
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(cmd_rx.try_recv().is_err());

        drop(key_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn escape_cancels_pending_commit() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (key_tx, key_rx) = mpsc::channel(8);
        let handle = tokio::spawn(KeypadAdapter::new(cmd_tx).run(key_rx));

        key_tx.send(KeypadEvent::Key(KeyInput::Digit('9'))).await.unwrap();
        key_tx.send(KeypadEvent::Key(KeyInput::Escape)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(cmd_rx.try_recv().is_err());

        drop(key_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_key_mid_buffer_leaves_timer_running() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (key_tx, key_rx) = mpsc::channel(8);
        let handle = tokio::spawn(KeypadAdapter::new(cmd_tx).run(key_rx));

        key_tx.send(KeypadEvent::Key(KeyInput::Digit('4'))).await.unwrap();
        key_tx.send(KeypadEvent::Key(KeyInput::Right)).await.unwrap();

        // The sequential command arrives immediately
        assert_eq!(cmd_rx.recv().await, Some(NavCommand::Next));

        // And the buffered jump still commits when the timer fires
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(cmd_rx.recv().await, Some(NavCommand::JumpToPosition(4)));

        drop(key_tx);
        handle.await.unwrap();
    }
}
