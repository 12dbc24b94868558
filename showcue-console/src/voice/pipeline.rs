//! Voice command pipeline
//!
//! Drains finished utterances from the segmenter, transcribes them with at
//! most one request in flight, extracts a lineup position from the
//! transcript, and emits a jump command. Utterances that arrive while a
//! transcription is running are dropped, not queued — a stale "go to five"
//! firing seconds late mid-show is worse than asking the operator to
//! repeat it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use showcue_common::NavCommand;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::numbers::extract_position;
use super::worker::{TranscriptionWorker, WorkerError};

/// Observable pipeline state, for the console status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Idle,
    Listening,
    Transcribing,
    /// Backend gone; listening has halted until the operator re-activates
    /// voice input
    Error(String),
}

/// Operator-facing feedback for utterances that did not become a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceNotice {
    /// A number was heard but the lineup has no such position
    OutOfRange { heard: u32, lineup_length: u32 },
    /// Speech was transcribed but no number could be extracted
    NoNumber { transcript: String },
    /// One transcription request failed; listening continues
    WorkerFailed(String),
}

/// Segmented-utterance consumer
pub struct VoicePipeline {
    worker: Arc<dyn TranscriptionWorker>,
    /// Last lineup length observed from the broadcast stream; 0 means
    /// unknown, in which case range checking is left to the server
    lineup_length: Arc<AtomicU32>,
    cmd_tx: mpsc::Sender<NavCommand>,
    notice_tx: mpsc::Sender<VoiceNotice>,
    status_tx: watch::Sender<PipelineStatus>,
}

impl VoicePipeline {
    pub fn new(
        worker: Arc<dyn TranscriptionWorker>,
        lineup_length: Arc<AtomicU32>,
        cmd_tx: mpsc::Sender<NavCommand>,
        notice_tx: mpsc::Sender<VoiceNotice>,
    ) -> (Self, watch::Receiver<PipelineStatus>) {
        let (status_tx, status_rx) = watch::channel(PipelineStatus::Idle);
        (
            Self {
                worker,
                lineup_length,
                cmd_tx,
                notice_tx,
                status_tx,
            },
            status_rx,
        )
    }

    /// Consume utterances until the segment channel closes or the backend
    /// becomes unavailable
    pub async fn run(self, mut segment_rx: mpsc::Receiver<Vec<f32>>) {
        let mut in_flight: Option<JoinHandle<Result<String, WorkerError>>> = None;
        let _ = self.status_tx.send(PipelineStatus::Listening);

        loop {
            tokio::select! {
                segment = segment_rx.recv() => {
                    let Some(samples) = segment else {
                        // Capture stopped: drain the in-flight request so a
                        // transcript that completes during teardown is not
                        // discarded
                        if let Some(task) = in_flight.take() {
                            let result = join_task(task).await;
                            self.handle_result(result).await;
                        }
                        break;
                    };
                    if in_flight.is_some() {
                        debug!(samples = samples.len(),
                               "transcription in flight, dropping utterance");
                        continue;
                    }
                    let worker = Arc::clone(&self.worker);
                    in_flight = Some(tokio::spawn(async move {
                        worker.transcribe(&samples).await
                    }));
                    let _ = self.status_tx.send(PipelineStatus::Transcribing);
                }
                result = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    if self.handle_result(result).await {
                        break;
                    }
                }
            }
        }

        // Channel closed while idle: report Idle, not a stale Listening
        if !matches!(*self.status_tx.borrow(), PipelineStatus::Error(_)) {
            let _ = self.status_tx.send(PipelineStatus::Idle);
        }
    }

    /// Returns true when the pipeline must halt
    async fn handle_result(&self, result: Result<String, WorkerError>) -> bool {
        match result {
            Ok(transcript) => {
                self.handle_transcript(&transcript).await;
                let _ = self.status_tx.send(PipelineStatus::Listening);
                false
            }
            Err(WorkerError::Unavailable(msg)) => {
                warn!(error = %msg, "transcription backend unavailable, halting voice input");
                let _ = self.status_tx.send(PipelineStatus::Error(msg));
                true
            }
            Err(WorkerError::Failed(msg)) => {
                warn!(error = %msg, "transcription failed");
                let _ = self.notice_tx.send(VoiceNotice::WorkerFailed(msg)).await;
                let _ = self.status_tx.send(PipelineStatus::Listening);
                false
            }
        }
    }

    async fn handle_transcript(&self, transcript: &str) {
        debug!(%transcript, "utterance transcribed");
        match extract_position(transcript) {
            Ok(position) => {
                let lineup_length = self.lineup_length.load(Ordering::Relaxed);
                if lineup_length > 0 && position > lineup_length {
                    info!(heard = position, lineup_length, "spoken position out of range");
                    let _ = self
                        .notice_tx
                        .send(VoiceNotice::OutOfRange {
                            heard: position,
                            lineup_length,
                        })
                        .await;
                    return;
                }
                info!(position, "voice jump command");
                let _ = self.cmd_tx.send(NavCommand::JumpToPosition(position)).await;
            }
            Err(_) => {
                debug!(%transcript, "no number in transcript");
                let _ = self
                    .notice_tx
                    .send(VoiceNotice::NoNumber {
                        transcript: transcript.to_string(),
                    })
                    .await;
            }
        }
    }
}

/// Resolves to the in-flight transcription result, or pends forever when
/// nothing is in flight so the select loop only polls the segment channel
async fn join_in_flight(
    handle: &mut Option<JoinHandle<Result<String, WorkerError>>>,
) -> Result<String, WorkerError> {
    match handle {
        Some(task) => match task.await {
            Ok(result) => result,
            Err(join_err) => Err(WorkerError::Failed(join_err.to_string())),
        },
        None => std::future::pending().await,
    }
}

async fn join_task(task: JoinHandle<Result<String, WorkerError>>) -> Result<String, WorkerError> {
    match task.await {
        Ok(result) => result,
        Err(join_err) => Err(WorkerError::Failed(join_err.to_string())),
    }
}

/// Resolves once the pipeline has halted: either the status reached
/// `Error`, or the pipeline task exited and dropped its status sender.
/// Whoever owns the capture handle awaits this to release the microphone.
pub async fn until_halted(status_rx: &mut watch::Receiver<PipelineStatus>) {
    loop {
        if matches!(*status_rx.borrow(), PipelineStatus::Error(_)) {
            return;
        }
        if status_rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    struct MockWorker {
        transcript: Result<String, WorkerError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockWorker {
        fn new(transcript: Result<String, WorkerError>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                transcript,
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranscriptionWorker for MockWorker {
        async fn transcribe(&self, _samples: &[f32]) -> Result<String, WorkerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.transcript.clone()
        }
    }

    struct Harness {
        segment_tx: mpsc::Sender<Vec<f32>>,
        cmd_rx: mpsc::Receiver<NavCommand>,
        notice_rx: mpsc::Receiver<VoiceNotice>,
        status_rx: watch::Receiver<PipelineStatus>,
        pipeline_task: JoinHandle<()>,
    }

    fn start(worker: Arc<dyn TranscriptionWorker>, lineup_length: u32) -> Harness {
        let (segment_tx, segment_rx) = mpsc::channel(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (notice_tx, notice_rx) = mpsc::channel(8);
        let (pipeline, status_rx) = VoicePipeline::new(
            worker,
            Arc::new(AtomicU32::new(lineup_length)),
            cmd_tx,
            notice_tx,
        );
        let pipeline_task = tokio::spawn(pipeline.run(segment_rx));
        Harness {
            segment_tx,
            cmd_rx,
            notice_rx,
            status_rx,
            pipeline_task,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transcript_becomes_jump_command() {
        let worker = MockWorker::new(Ok("go to five".into()), Duration::from_millis(100));
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        let cmd = h.cmd_rx.recv().await.unwrap();
        assert_eq!(cmd, NavCommand::JumpToPosition(5));

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn utterance_during_transcription_is_dropped() {
        let worker = MockWorker::new(Ok("seven".into()), Duration::from_millis(500));
        let mut h = start(Arc::clone(&worker) as Arc<dyn TranscriptionWorker>, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        // Let the first transcription start
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Arrives mid-flight: must be dropped, not queued
        h.segment_tx.send(vec![0.5; 64]).await.unwrap();

        let cmd = h.cmd_rx.recv().await.unwrap();
        assert_eq!(cmd, NavCommand::JumpToPosition(7));

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);
        assert!(h.cmd_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_position_yields_notice_not_command() {
        let worker = MockWorker::new(Ok("fifty".into()), Duration::from_millis(10));
        let mut h = start(worker, 4);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        let notice = h.notice_rx.recv().await.unwrap();
        assert_eq!(
            notice,
            VoiceNotice::OutOfRange {
                heard: 50,
                lineup_length: 4
            }
        );
        assert!(h.cmd_rx.try_recv().is_err());

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_lineup_length_defers_range_check_to_server() {
        let worker = MockWorker::new(Ok("fifty".into()), Duration::from_millis(10));
        let mut h = start(worker, 0);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        let cmd = h.cmd_rx.recv().await.unwrap();
        assert_eq!(cmd, NavCommand::JumpToPosition(50));

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn number_free_speech_yields_notice() {
        let worker = MockWorker::new(Ok("hello everyone".into()), Duration::from_millis(10));
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        let notice = h.notice_rx.recv().await.unwrap();
        assert_eq!(
            notice,
            VoiceNotice::NoNumber {
                transcript: "hello everyone".into()
            }
        );
        assert!(h.cmd_rx.try_recv().is_err());

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_backend_halts_the_pipeline() {
        let worker = MockWorker::new(
            Err(WorkerError::Unavailable("connection refused".into())),
            Duration::from_millis(10),
        );
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        h.pipeline_task.await.unwrap();
        assert!(matches!(*h.status_rx.borrow(), PipelineStatus::Error(_)));
        assert!(h.cmd_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn backend_halt_wakes_the_capture_owner() {
        let worker = MockWorker::new(
            Err(WorkerError::Unavailable("connection refused".into())),
            Duration::from_millis(10),
        );
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        // The capture owner blocks here and releases the microphone on wake
        until_halted(&mut h.status_rx).await;
        assert!(matches!(*h.status_rx.borrow(), PipelineStatus::Error(_)));

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn inflight_transcript_survives_teardown() {
        let worker = MockWorker::new(Ok("nine".into()), Duration::from_millis(500));
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        // Let the transcription start, then stop capture mid-flight
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(h.segment_tx);

        // The completed transcript is still delivered before the task exits
        assert_eq!(h.cmd_rx.recv().await, Some(NavCommand::JumpToPosition(9)));
        h.pipeline_task.await.unwrap();
        assert_eq!(*h.status_rx.borrow(), PipelineStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn single_failure_keeps_listening() {
        let worker = MockWorker::new(
            Err(WorkerError::Failed("decode error".into())),
            Duration::from_millis(10),
        );
        let mut h = start(worker, 10);

        h.segment_tx.send(vec![0.5; 64]).await.unwrap();
        let notice = h.notice_rx.recv().await.unwrap();
        assert!(matches!(notice, VoiceNotice::WorkerFailed(_)));
        assert_eq!(*h.status_rx.borrow(), PipelineStatus::Listening);

        drop(h.segment_tx);
        h.pipeline_task.await.unwrap();
        assert_eq!(*h.status_rx.borrow(), PipelineStatus::Idle);
    }
}
