//! Audio Capture Pipeline
//!
//! Owns the microphone for the duration of one capture session and turns the
//! captured fragments into a base64 WAV payload:
//!
//! - `Idle -> Capturing` on `start`, which acquires the device.
//! - `Capturing -> Finalizing -> Idle` on `stop`, which flushes, releases the
//!   device and encodes the recording.
//! - `abort` drops the recording and releases the device from any state.
//!
//! The session lives behind an async mutex that is held across device
//! acquisition and flush, so overlapping start/stop gestures are serialized
//! and at most one device session exists at a time.

pub mod microphone;

use crate::audio_utils::{encode_base64, wav_from_pcm16};
use hq_core::audio::{AudioDevice, AudioFormat, AudioFragment, AudioStream, OpenStream};
use hq_core::error::{HqError, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub use microphone::Microphone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Finalizing,
}

/// A finished recording in its text-safe transport form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio(String);

impl EncodedAudio {
    /// Wraps an already base64 encoded recording.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// An open device plus everything it has produced so far.
struct CaptureSession {
    stream: Box<dyn AudioStream>,
    fragments: mpsc::UnboundedReceiver<AudioFragment>,
    buffer: Vec<AudioFragment>,
    format: AudioFormat,
}

impl CaptureSession {
    fn new(open: OpenStream) -> Self {
        Self {
            stream: open.stream,
            fragments: open.fragments,
            buffer: Vec::new(),
            format: open.format,
        }
    }

    /// Stops the device and collects every fragment, in arrival order.
    async fn flush(&mut self) -> Result<()> {
        self.stream.stop().await?;
        while let Ok(fragment) = self.fragments.try_recv() {
            self.buffer.push(fragment);
        }
        Ok(())
    }

    fn encode(&self) -> Result<EncodedAudio> {
        let pcm = self.buffer.concat();
        let wav = wav_from_pcm16(&pcm, self.format)
            .map_err(|e| HqError::DeviceUnavailable(format!("cannot encode recording: {e}")))?;
        Ok(EncodedAudio(encode_base64(&wav)))
    }
}

pub struct AudioCapture {
    device: Arc<dyn AudioDevice>,
    session: tokio::sync::Mutex<Option<CaptureSession>>,
    state: Mutex<CaptureState>,
}

impl AudioCapture {
    pub fn new(device: Arc<dyn AudioDevice>) -> Self {
        Self {
            device,
            session: tokio::sync::Mutex::new(None),
            state: Mutex::new(CaptureState::Idle),
        }
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: CaptureState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Opens the device and starts buffering.
    ///
    /// Returns `Ok(false)` when a session is already running.
    pub async fn start(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            debug!("Capture already running; ignoring duplicate start");
            return Ok(false);
        }

        let open = self.device.open().await?;
        info!(
            sample_rate = open.format.sample_rate,
            channels = open.format.channels,
            "Capture started"
        );
        *session = Some(CaptureSession::new(open));
        self.set_state(CaptureState::Capturing);
        Ok(true)
    }

    /// Finishes the running session and returns the encoded recording.
    ///
    /// Returns `Ok(None)` when nothing is being captured. The device is
    /// released whether or not flushing and encoding succeed.
    pub async fn stop(&self) -> Result<Option<EncodedAudio>> {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            debug!("No capture running; ignoring stop");
            return Ok(None);
        };

        self.set_state(CaptureState::Finalizing);
        let encoded = match session.flush().await {
            Ok(()) => session.encode(),
            Err(e) => Err(e),
        };
        let fragments = session.buffer.len();
        drop(session);
        self.set_state(CaptureState::Idle);

        let encoded = encoded?;
        info!(fragments, bytes = encoded.as_str().len(), "Capture finalized");
        Ok(Some(encoded))
    }

    /// Discards the running session, if any, and releases the device.
    pub async fn abort(&self) -> bool {
        let mut guard = self.session.lock().await;
        let aborted = guard.take().is_some();
        self.set_state(CaptureState::Idle);
        if aborted {
            info!("Capture aborted");
        }
        aborted
    }
}
