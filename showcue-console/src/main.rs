//! Producer console (showcue-console) - Main entry point
//!
//! Terminal client for the navigation service: debounced keypad jumps,
//! dedicated navigation keys, optional voice control, and a live view of
//! the session position fed by the SSE broadcast stream.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use showcue_common::NavCommand;
use showcue_console::input::{KeypadAdapter, KeypadEvent, KeyInput};
use showcue_console::net::{decode_event, NavClient, SseFrameParser};
use showcue_console::observer::{Bookmark, LinkStatus, ObserverBinding};
use showcue_console::voice::{
    self, CaptureConfig, HttpWorker, MicCapture, PipelineStatus, SegmenterConfig,
    UtteranceSegmenter, VoiceNotice, VoicePipeline,
};

/// Command-line arguments for showcue-console
#[derive(Parser, Debug)]
#[command(name = "showcue-console")]
#[command(about = "Producer console for the showcue navigation service")]
#[command(version)]
struct Args {
    /// Base URL of the navigation service
    #[arg(
        short,
        long,
        default_value = "http://127.0.0.1:5850",
        env = "SHOWCUE_NAV_URL"
    )]
    server: String,

    /// Session to control
    #[arg(long, env = "SHOWCUE_SESSION")]
    session: Uuid,

    /// Open at this lineup position instead of the stored one
    #[arg(long)]
    position: Option<u32>,

    /// Start with voice control enabled (toggle at runtime with 'v')
    #[arg(long)]
    voice: bool,

    /// Base URL of the speech-to-text server
    #[arg(
        long,
        default_value = "http://127.0.0.1:5860",
        env = "SHOWCUE_STT_URL"
    )]
    stt_url: String,

    /// Input device name for voice capture (default device when omitted)
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the raw-mode terminal stays usable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showcue_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let client = NavClient::new(&args.server, args.session);

    info!(server = %args.server, session = %args.session, "connecting to navigation service");

    let mut binding = ObserverBinding::new(args.session);
    if let Some(position) = args.position {
        // The deep link is rendered locally until live updates supersede
        // it; it is never pushed to the session, or a stale bookmark would
        // rewind the show for every connected viewer
        binding.seed_bookmark(&Bookmark {
            session_id: args.session,
            position,
        });
        info!(position, "opening at bookmarked position");
    }

    let lineup_length = Arc::new(AtomicU32::new(0));

    // Command path: inputs -> cmd channel -> HTTP apply
    let (cmd_tx, cmd_rx) = mpsc::channel::<NavCommand>(32);
    tokio::spawn(send_commands(client.clone(), cmd_rx));

    // Keypad path: terminal thread -> key channel -> debounced adapter
    let (key_tx, key_rx) = mpsc::channel::<KeypadEvent>(32);
    tokio::spawn(KeypadAdapter::new(cmd_tx.clone()).run(key_rx));

    // Observer path: SSE stream -> binding -> rendered position line
    tokio::spawn(observe_session(
        client.clone(),
        binding,
        Arc::clone(&lineup_length),
    ));

    // Voice path: microphone -> segmenter -> pipeline -> cmd channel.
    // The capture handle is !Send and stays on this thread; the terminal
    // loop owns it so a pipeline halt can release the microphone.
    let mut voice_session = if args.voice {
        Some(start_voice(&args, Arc::clone(&lineup_length), cmd_tx.clone())?)
    } else {
        None
    };

    run_terminal(&args, key_tx, cmd_tx, lineup_length, &mut voice_session).await?;

    info!("console shutting down");
    Ok(())
}

/// Drain the command channel into the navigation service
///
/// Rejections (out-of-range jump, lineup emptied mid-show) are operator
/// feedback, not crashes.
async fn send_commands(client: NavClient, mut cmd_rx: mpsc::Receiver<NavCommand>) {
    while let Some(cmd) = cmd_rx.recv().await {
        match client.apply(cmd).await {
            Ok(state) => {
                debug!(position = state.position_display, "command applied");
            }
            Err(err) => warn!(?cmd, error = %err, "command rejected"),
        }
    }
}

/// Follow the session's SSE stream, reconnecting with backoff
///
/// Every (re)connect starts with an authoritative fetch: events are hints
/// and anything missed while disconnected is resynced from the store.
async fn observe_session(
    client: NavClient,
    mut binding: ObserverBinding,
    lineup_length: Arc<AtomicU32>,
) {
    let http = reqwest::Client::new();
    let events_url = client.events_url();

    loop {
        match client.fetch_state().await {
            Ok(state) => {
                binding.apply_snapshot(&state);
                lineup_length.store(binding.lineup_length(), Ordering::Relaxed);
                render(&binding);
            }
            Err(err) => warn!(error = %err, "resync fetch failed"),
        }

        match http.get(&events_url).send().await {
            Ok(response) if response.status().is_success() => {
                let mut stream = response.bytes_stream();
                let mut parser = SseFrameParser::new();
                while let Some(chunk) = stream.next().await {
                    let Ok(bytes) = chunk else { break };
                    let text = String::from_utf8_lossy(&bytes);
                    for frame in parser.push(&text) {
                        if let Some(event) = decode_event(&frame) {
                            if binding.apply_event(&event) {
                                lineup_length.store(binding.lineup_length(), Ordering::Relaxed);
                                render(&binding);
                            }
                        }
                    }
                }
                warn!("event stream closed");
            }
            Ok(response) => warn!(status = %response.status(), "event stream refused"),
            Err(err) => warn!(error = %err, "event stream connect failed"),
        }

        binding.mark_stale();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn render(binding: &ObserverBinding) {
    let Some(position) = binding.display_position() else {
        return;
    };
    let link = match binding.status() {
        LinkStatus::Live => "live",
        LinkStatus::Stale => "stale",
    };
    match binding.view() {
        Some(view) if view.position_display == position => {
            info!(
                position,
                of = view.lineup_length,
                item = %view.item_ref,
                image = %format!("{}/{}", view.image_index + 1, view.image_count),
                link,
                "now showing"
            );
        }
        // A not-yet-superseded bookmark: the stored entry details describe
        // a different position, so show only where this console opened
        _ => info!(position, link, "at bookmarked position"),
    }
}

/// One activation of voice input: the capture handle owning the
/// microphone (`!Send`, stays on the main thread) plus the pipeline
/// status feed the terminal loop watches for halts
struct VoiceSession {
    capture: MicCapture,
    status_rx: watch::Receiver<PipelineStatus>,
}

impl VoiceSession {
    fn stop(self) {
        // Dropping the capture handle releases the device; the segmenter
        // and pipeline tasks then drain out on their closed channels
        self.capture.stop();
    }
}

/// Start the microphone capture and the voice pipeline tasks
fn start_voice(
    args: &Args,
    lineup_length: Arc<AtomicU32>,
    cmd_tx: mpsc::Sender<NavCommand>,
) -> Result<VoiceSession> {
    let segmenter = UtteranceSegmenter::new(SegmenterConfig::default());

    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (segment_tx, segment_rx) = mpsc::channel(4);
    tokio::spawn(voice::run_segmenter(frame_rx, segment_tx, segmenter));

    let (notice_tx, mut notice_rx) = mpsc::channel(8);
    let worker = Arc::new(HttpWorker::new(&args.stt_url));
    let (pipeline, status_rx) = VoicePipeline::new(worker, lineup_length, cmd_tx, notice_tx);
    tokio::spawn(pipeline.run(segment_rx));

    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            match notice {
                VoiceNotice::OutOfRange {
                    heard,
                    lineup_length,
                } => warn!(heard, lineup_length, "spoken position out of range"),
                VoiceNotice::NoNumber { transcript } => {
                    info!(%transcript, "no position heard")
                }
                VoiceNotice::WorkerFailed(msg) => warn!(%msg, "transcription failed"),
            }
        }
    });
    let mut log_rx = status_rx.clone();
    tokio::spawn(async move {
        while log_rx.changed().await.is_ok() {
            let status = log_rx.borrow().clone();
            info!(?status, "voice pipeline");
        }
    });

    let capture = MicCapture::start(
        CaptureConfig {
            device_name: args.device.clone(),
            frame_size: SegmenterConfig::default().frame_size,
        },
        frame_tx,
    )
    .context("Failed to start microphone capture")?;
    info!("voice control active");
    Ok(VoiceSession { capture, status_rx })
}

/// Console events produced by the blocking key-reader thread
enum UiEvent {
    Key(KeypadEvent),
    VoiceToggle,
    Quit,
}

/// Pending while voice is off or healthy; resolves when the pipeline
/// halts and the microphone should be released
async fn voice_halted(voice: &mut Option<VoiceSession>) {
    match voice {
        Some(session) => voice::until_halted(&mut session.status_rx).await,
        None => std::future::pending().await,
    }
}

/// Terminal loop: reads keys on a blocking thread, drives the keypad
/// adapter, and owns the voice capture handle so it can tear voice down
/// when the pipeline halts and restart it on demand ('v')
async fn run_terminal(
    args: &Args,
    key_tx: mpsc::Sender<KeypadEvent>,
    cmd_tx: mpsc::Sender<NavCommand>,
    lineup_length: Arc<AtomicU32>,
    voice: &mut Option<VoiceSession>,
) -> Result<()> {
    crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiEvent>(32);

    std::thread::spawn(move || loop {
        let event = match crossterm::event::read() {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "terminal read failed");
                let _ = ui_tx.blocking_send(UiEvent::Quit);
                break;
            }
        };
        let Event::Key(key) = event else { continue };
        let ui = if is_quit(&key) {
            UiEvent::Quit
        } else if matches!(key.code, KeyCode::Char('v')) {
            UiEvent::VoiceToggle
        } else if let Some(input) = map_key(&key) {
            UiEvent::Key(KeypadEvent::Key(input))
        } else {
            continue;
        };
        let quit = matches!(ui, UiEvent::Quit);
        if ui_tx.blocking_send(ui).is_err() || quit {
            break;
        }
    });

    loop {
        tokio::select! {
            ui = ui_rx.recv() => {
                match ui {
                    None | Some(UiEvent::Quit) => break,
                    Some(UiEvent::Key(event)) => {
                        let _ = key_tx.send(event).await;
                    }
                    Some(UiEvent::VoiceToggle) => {
                        if let Some(session) = voice.take() {
                            session.stop();
                            info!("voice control stopped, microphone released");
                        } else {
                            match start_voice(args, Arc::clone(&lineup_length), cmd_tx.clone()) {
                                Ok(session) => *voice = Some(session),
                                Err(err) => warn!(error = %err, "could not start voice control"),
                            }
                        }
                    }
                }
            }
            _ = voice_halted(voice) => {
                if let Some(session) = voice.take() {
                    session.stop();
                    warn!("voice input halted, microphone released; press 'v' to re-activate");
                }
            }
        }
    }

    crossterm::terminal::disable_raw_mode().context("Failed to disable raw mode")?;
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q'))
        || (key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c')))
}

fn map_key(key: &KeyEvent) -> Option<KeyInput> {
    match key.code {
        KeyCode::Char(c) if c.is_ascii_digit() => Some(KeyInput::Digit(c)),
        KeyCode::Char(' ') => Some(KeyInput::Space),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Esc => Some(KeyInput::Escape),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Down => Some(KeyInput::Down),
        KeyCode::Up => Some(KeyInput::Up),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}
