//! Energy-based activity detection and utterance segmentation
//!
//! Splits the continuous microphone stream into finite utterances. A frame
//! is classified as voice when its RMS amplitude exceeds the threshold;
//! an utterance starts on the first voice frame and ends after a hangover
//! of consecutive silent frames. Runs locally and continuously — only
//! finished utterances ever reach the transcription worker.

/// Segmenter tuning
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// RMS amplitude threshold; frames below are silence.
    /// 0.01 suits a quiet studio; raise to 0.02-0.05 on a noisy set.
    pub rms_threshold: f32,
    /// Frame size in samples (480 = 30 ms at 16 kHz)
    pub frame_size: usize,
    /// Consecutive silent frames that close an utterance (~400 ms)
    pub hangover_frames: usize,
    /// Minimum voiced frames for an utterance to be emitted at all;
    /// filters coughs and desk bumps
    pub min_voice_frames: usize,
    /// Hard cap on utterance length in frames (~10 s); a stuck-open
    /// microphone must not accumulate unboundedly
    pub max_utterance_frames: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            rms_threshold: 0.01,
            frame_size: 480,
            hangover_frames: 13,
            min_voice_frames: 4,
            max_utterance_frames: 333,
        }
    }
}

/// Streaming speech/silence segmenter
///
/// Feed fixed-size sample frames with [`push_frame`]; a `Some` return is a
/// complete utterance ready for transcription.
///
/// [`push_frame`]: UtteranceSegmenter::push_frame
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    in_speech: bool,
    silent_run: usize,
    voice_frames: usize,
    buffer: Vec<f32>,
}

impl UtteranceSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            in_speech: false,
            silent_run: 0,
            voice_frames: 0,
            buffer: Vec::new(),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    fn is_voice_frame(&self, frame: &[f32]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        mean_sq.sqrt() > self.config.rms_threshold
    }

    /// Feed one frame; returns a finished utterance on speech-end
    pub fn push_frame(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let voiced = self.is_voice_frame(frame);

        if !self.in_speech {
            if !voiced {
                return None;
            }
            // Speech start
            self.in_speech = true;
            self.silent_run = 0;
            self.voice_frames = 0;
            self.buffer.clear();
        }

        self.buffer.extend_from_slice(frame);
        if voiced {
            self.voice_frames += 1;
            self.silent_run = 0;
        } else {
            self.silent_run += 1;
        }

        let frames_buffered = self.buffer.len() / self.config.frame_size.max(1);
        if self.silent_run >= self.config.hangover_frames
            || frames_buffered >= self.config.max_utterance_frames
        {
            return self.finish();
        }
        None
    }

    /// Close any open utterance (stream teardown)
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.in_speech {
            self.finish()
        } else {
            None
        }
    }

    fn finish(&mut self) -> Option<Vec<f32>> {
        self.in_speech = false;
        let voice_frames = self.voice_frames;
        self.voice_frames = 0;
        self.silent_run = 0;

        let utterance = std::mem::take(&mut self.buffer);
        if voice_frames >= self.config.min_voice_frames {
            Some(utterance)
        } else {
            None
        }
    }
}
