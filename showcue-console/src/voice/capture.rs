//! Microphone capture
//!
//! Owns the cpal input stream and converts whatever the device delivers
//! (any channel count, any rate) into mono 16 kHz f32 frames for the
//! segmenter. The audio callback must never block, so frames are pushed
//! with `try_send` and dropped when the consumer falls behind.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::ConsoleError;

use super::vad::UtteranceSegmenter;
use super::worker::WORKER_SAMPLE_RATE;

/// Capture tuning
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Input device name; default device when `None`
    pub device_name: Option<String>,
    /// Samples per frame delivered downstream, at 16 kHz
    pub frame_size: usize,
}

/// Live microphone stream
///
/// `cpal::Stream` is `!Send`; keep this on the thread that created it.
/// Dropping it stops capture and releases the device.
pub struct MicCapture {
    stream: cpal::Stream,
}

impl MicCapture {
    /// Open the input device and start pushing 16 kHz mono frames
    pub fn start(
        config: CaptureConfig,
        frame_tx: mpsc::Sender<Vec<f32>>,
    ) -> Result<Self, ConsoleError> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| ConsoleError::Audio(e.to_string()))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| {
                    ConsoleError::Audio(format!("input device '{}' not found", name))
                })?,
            None => host
                .default_input_device()
                .ok_or_else(|| ConsoleError::Audio("no input device available".into()))?,
        };

        let device_config = device
            .default_input_config()
            .map_err(|e| ConsoleError::Audio(e.to_string()))?;
        info!(
            device = device.name().unwrap_or_else(|_| "<unknown>".into()),
            rate = device_config.sample_rate().0,
            channels = device_config.channels(),
            "microphone capture starting"
        );

        let channels = device_config.channels() as usize;
        let source_rate = device_config.sample_rate().0;
        let sample_format = device_config.sample_format();
        let stream_config: cpal::StreamConfig = device_config.into();

        let err_fn = |err| warn!(error = %err, "audio stream error");
        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                let mut converter =
                    FrameConverter::new(source_rate, WORKER_SAMPLE_RATE, config.frame_size);
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        for frame in converter.push(data, channels) {
                            if frame_tx.try_send(frame).is_err() {
                                warn!("frame consumer behind, dropping audio");
                            }
                        }
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let mut converter =
                    FrameConverter::new(source_rate, WORKER_SAMPLE_RATE, config.frame_size);
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let samples: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        for frame in converter.push(&samples, channels) {
                            if frame_tx.try_send(frame).is_err() {
                                warn!("frame consumer behind, dropping audio");
                            }
                        }
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(ConsoleError::Audio(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| ConsoleError::Audio(e.to_string()))?;

        stream
            .play()
            .map_err(|e| ConsoleError::Audio(e.to_string()))?;
        Ok(Self { stream })
    }

    pub fn stop(self) {
        // Dropping the stream releases the device
        drop(self.stream);
    }
}

/// Downmixes to mono, linearly resamples to the target rate, and chunks
/// into fixed-size frames
struct FrameConverter {
    step: f64,
    cursor: f64,
    previous: f32,
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameConverter {
    fn new(source_rate: u32, target_rate: u32, frame_size: usize) -> Self {
        Self {
            step: source_rate as f64 / target_rate as f64,
            cursor: 0.0,
            previous: 0.0,
            frame_size: frame_size.max(1),
            pending: Vec::new(),
        }
    }

    fn push(&mut self, data: &[f32], channels: usize) -> Vec<Vec<f32>> {
        let channels = channels.max(1);
        for chunk in data.chunks_exact(channels) {
            let mono = chunk.iter().sum::<f32>() / channels as f32;
            // Emit every target-rate sample that falls before this source
            // sample, interpolated against the previous one
            while self.cursor < 1.0 {
                let sample = self.previous + (mono - self.previous) * self.cursor as f32;
                self.pending.push(sample);
                self.cursor += self.step;
            }
            self.cursor -= 1.0;
            self.previous = mono;
        }

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }
        frames
    }
}

/// Bridge from raw frames to finished utterances
///
/// Runs until the frame channel closes (capture stopped), flushing any
/// open utterance on the way out.
pub async fn run_segmenter(
    mut frame_rx: mpsc::Receiver<Vec<f32>>,
    segment_tx: mpsc::Sender<Vec<f32>>,
    mut segmenter: UtteranceSegmenter,
) {
    while let Some(frame) = frame_rx.recv().await {
        if let Some(utterance) = segmenter.push_frame(&frame) {
            if segment_tx.send(utterance).await.is_err() {
                return;
            }
        }
    }
    if let Some(utterance) = segmenter.flush() {
        let _ = segment_tx.send(utterance).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_is_downmixed() {
        let mut conv = FrameConverter::new(16_000, 16_000, 4);
        // L=1.0 R=0.0 repeated: mono is 0.5
        let data: Vec<f32> = [1.0, 0.0].repeat(8).to_vec();
        let frames = conv.push(&data, 2);
        assert_eq!(frames.len(), 2);
        assert!(frames[0][1..].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn downsampling_halves_sample_count() {
        let mut conv = FrameConverter::new(32_000, 16_000, 8);
        let data = vec![0.25_f32; 32];
        let frames = conv.push(&data, 1);
        // 32 source samples at 2:1 produce 16 output samples
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn partial_frames_carry_across_calls() {
        let mut conv = FrameConverter::new(16_000, 16_000, 10);
        assert!(conv.push(&[0.1; 6], 1).is_empty());
        let frames = conv.push(&[0.1; 6], 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 10);
    }

    #[tokio::test]
    async fn segmenter_bridge_emits_utterances() {
        use super::super::vad::SegmenterConfig;

        let (frame_tx, frame_rx) = mpsc::channel(16);
        let (segment_tx, mut segment_rx) = mpsc::channel(16);
        let segmenter = UtteranceSegmenter::new(SegmenterConfig {
            rms_threshold: 0.01,
            frame_size: 4,
            hangover_frames: 2,
            min_voice_frames: 2,
            max_utterance_frames: 100,
        });
        let task = tokio::spawn(run_segmenter(frame_rx, segment_tx, segmenter));

        for _ in 0..3 {
            frame_tx.send(vec![0.5; 4]).await.unwrap();
        }
        for _ in 0..2 {
            frame_tx.send(vec![0.0; 4]).await.unwrap();
        }
        let utterance = segment_rx.recv().await.unwrap();
        assert_eq!(utterance.len(), 20);

        drop(frame_tx);
        task.await.unwrap();
    }
}
