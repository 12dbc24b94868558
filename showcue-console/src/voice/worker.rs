//! Transcription worker
//!
//! Trait seam over the speech-to-text backend so the pipeline can be
//! exercised with a mock. The production implementation posts the
//! utterance as a WAV body to a local STT HTTP server.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// Backend unreachable (server down, model still loading)
    #[error("Transcription backend unavailable: {0}")]
    Unavailable(String),
    /// Backend reachable but the request failed
    #[error("Transcription failed: {0}")]
    Failed(String),
}

/// One utterance in, one transcript out
#[async_trait]
pub trait TranscriptionWorker: Send + Sync {
    async fn transcribe(&self, samples: &[f32]) -> Result<String, WorkerError>;
}

/// Sample rate the capture path delivers to the worker
pub const WORKER_SAMPLE_RATE: u32 = 16_000;

/// HTTP client for a local STT server
///
/// Posts a mono 16 kHz WAV body to `/transcribe` and expects
/// `{"text": "..."}` back.
pub struct HttpWorker {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
}

impl HttpWorker {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/transcribe", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TranscriptionWorker for HttpWorker {
    async fn transcribe(&self, samples: &[f32]) -> Result<String, WorkerError> {
        let body = encode_wav(samples, WORKER_SAMPLE_RATE);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(body)
            .send()
            .await
            .map_err(|e| WorkerError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::Failed(format!(
                "server returned {}",
                response.status()
            )));
        }

        let parsed: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| WorkerError::Failed(e.to_string()))?;
        Ok(parsed.text)
    }
}

/// Encode f32 samples as a mono 16-bit PCM WAV byte buffer
fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_is_well_formed() {
        let wav = encode_wav(&[0.0, 0.5, -0.5, 1.0], 16_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        // 4 samples, 2 bytes each
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
        assert_eq!(wav.len(), 44 + 8);
    }

    #[test]
    fn samples_are_clamped() {
        let wav = encode_wav(&[2.0, -2.0], 16_000);
        let first = i16::from_le_bytes([wav[44], wav[45]]);
        let second = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(first, i16::MAX);
        assert_eq!(second, -i16::MAX);
    }
}
