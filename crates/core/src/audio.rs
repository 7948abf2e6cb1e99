//! Audio device boundary.
//!
//! A device hands out one `OpenStream` per capture session. Fragments arrive
//! on the stream's channel as mono PCM16 little-endian bytes, in capture order.

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Shape of the PCM data a stream produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }
}

/// One chunk of captured PCM16 audio.
pub type AudioFragment = Vec<u8>;

/// A live capture stream. Dropping it releases the device.
#[async_trait]
pub trait AudioStream: Send {
    /// Stops the device and waits until every fragment it produced has been
    /// handed to the fragment channel.
    async fn stop(&mut self) -> Result<()>;
}

/// A freshly opened capture session.
pub struct OpenStream {
    pub stream: Box<dyn AudioStream>,
    pub fragments: mpsc::UnboundedReceiver<AudioFragment>,
    pub format: AudioFormat,
}

/// Something that can be asked for microphone access.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Requests permission and opens the device.
    ///
    /// Fails with `HqError::DeviceUnavailable` when permission is denied or no
    /// input device exists.
    async fn open(&self) -> Result<OpenStream>;
}
