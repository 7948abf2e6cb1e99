//! Microphone capture using cpal.
//!
//! cpal streams are not `Send`, so each capture session owns a dedicated
//! thread that builds the stream, keeps it alive and drops it on stop. The
//! audio callback converts whatever the device delivers into mono PCM16 and
//! forwards it as fragments.

use crate::audio_utils::{pcm16_from_f32, to_mono};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use hq_core::audio::{AudioDevice, AudioFormat, AudioFragment, AudioStream, OpenStream};
use hq_core::error::{HqError, Result};
use std::sync::mpsc as std_mpsc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

fn unavailable(reason: impl Into<String>) -> HqError {
    HqError::DeviceUnavailable(reason.into())
}

/// The host's default input device.
#[derive(Debug, Default)]
pub struct Microphone;

impl Microphone {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDevice for Microphone {
    async fn open(&self) -> Result<OpenStream> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<oneshot::Sender<()>>();
        let (fragment_tx, fragments) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("hq-capture".to_string())
            .spawn(move || run_capture(fragment_tx, ready_tx, stop_rx))
            .map_err(|e| unavailable(format!("cannot spawn capture thread: {e}")))?;

        let format = ready_rx
            .await
            .map_err(|_| unavailable("capture thread exited during setup"))??;

        Ok(OpenStream {
            stream: Box::new(MicrophoneStream {
                stop_tx: Some(stop_tx),
            }),
            fragments,
            format,
        })
    }
}

/// Handle to a running capture thread. Dropping it closes the stop channel,
/// which makes the thread drop the cpal stream and release the device.
struct MicrophoneStream {
    stop_tx: Option<std_mpsc::Sender<oneshot::Sender<()>>>,
}

#[async_trait]
impl AudioStream for MicrophoneStream {
    async fn stop(&mut self) -> Result<()> {
        let stop_tx = self
            .stop_tx
            .take()
            .ok_or_else(|| HqError::InvalidState("capture already stopped".to_string()))?;
        let (ack_tx, ack_rx) = oneshot::channel();
        stop_tx
            .send(ack_tx)
            .map_err(|_| unavailable("capture thread exited"))?;
        ack_rx
            .await
            .map_err(|_| unavailable("capture thread exited before flushing"))
    }
}

fn run_capture(
    fragment_tx: mpsc::UnboundedSender<AudioFragment>,
    ready_tx: oneshot::Sender<Result<AudioFormat>>,
    stop_rx: std_mpsc::Receiver<oneshot::Sender<()>>,
) {
    let stream = match build_stream(fragment_tx) {
        Ok((stream, format)) => {
            let _ = ready_tx.send(Ok(format));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Blocks until a stop is requested or the handle is dropped.
    let ack = stop_rx.recv().ok();
    drop(stream);
    debug!("capture stream released");
    if let Some(ack) = ack {
        let _ = ack.send(());
    }
}

fn build_stream(
    fragment_tx: mpsc::UnboundedSender<AudioFragment>,
) -> Result<(cpal::Stream, AudioFormat)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| unavailable("no default input device"))?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());

    let supported = device
        .default_input_config()
        .map_err(|e| unavailable(format!("no default input config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.config();
    let channels = config.channels;
    let format = AudioFormat::mono(config.sample_rate.0);

    let on_error = |err: cpal::StreamError| error!("audio input stream error: {err}");

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = fragment_tx.send(pcm16_from_f32(&to_mono(data, channels)));
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let _ = fragment_tx.send(pcm16_from_f32(&to_mono(&samples, channels)));
            },
            on_error,
            None,
        ),
        other => {
            return Err(unavailable(format!("unsupported sample format {other:?}")));
        }
    }
    .map_err(|e| unavailable(format!("failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| unavailable(format!("failed to start input stream: {e}")))?;

    info!(
        device = %device_name,
        sample_rate = format.sample_rate,
        native_channels = channels,
        "Microphone capture started"
    );
    Ok((stream, format))
}
