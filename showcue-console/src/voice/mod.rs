//! Voice input pipeline
//!
//! Microphone capture → utterance segmentation → single-flight
//! transcription → number extraction → normalized jump command.

pub mod capture;
pub mod numbers;
pub mod pipeline;
pub mod vad;
pub mod worker;

pub use capture::{run_segmenter, CaptureConfig, MicCapture};
pub use numbers::{extract_position, ExtractError};
pub use pipeline::{until_halted, PipelineStatus, VoiceNotice, VoicePipeline};
pub use vad::{SegmenterConfig, UtteranceSegmenter};
pub use worker::{HttpWorker, TranscriptionWorker, WorkerError};
