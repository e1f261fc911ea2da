//! cpal implementation of the device collaborator.
//!
//! cpal streams are `!Send`, so every sound and every capture session is
//! owned by a dedicated thread that builds the stream, reports the build
//! result back, and parks on a stop channel. Stopping a handle drops the
//! channel sender; the owner thread wakes, drops the stream, and exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::decoder::AudioData;
use crate::format::RecordingFormat;

use super::{
    BackendError, CaptureBackend, CaptureDataCallback, CaptureSpec, CaptureStream,
    EndOfStreamHook, PlaybackBackend, SoundHandle,
};

/// Playback side of the cpal backend.
///
/// `open` resolves the default output device; each submitted sound then
/// gets its own output stream on that device.
#[derive(Default)]
pub struct CpalPlayback {
    device: Option<cpal::Device>,
}

impl CpalPlayback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackBackend for CpalPlayback {
    fn open(&mut self) -> Result<(), BackendError> {
        if self.device.is_some() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| BackendError("no output audio device found".into()))?;

        // Probe the config now so init failure surfaces here, not at the
        // first submission.
        device
            .default_output_config()
            .map_err(|e| BackendError(format!("no supported output config: {e}")))?;

        log::info!(
            "playback device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".into())
        );
        self.device = Some(device);
        Ok(())
    }

    fn close(&mut self) {
        self.device = None;
    }

    fn spawn_sound(
        &self,
        audio: Arc<AudioData>,
        master_gain: Arc<AtomicU32>,
        on_end: EndOfStreamHook,
    ) -> Result<Box<dyn SoundHandle>, BackendError> {
        let device = self
            .device
            .clone()
            .ok_or_else(|| BackendError("playback device not open".into()))?;

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), BackendError>>(1);

        let thread = thread::spawn(move || {
            sound_thread(&device, audio, master_gain, on_end, &ready_tx, &stop_rx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalSound {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(BackendError("sound thread died during setup".into()))
            }
        }
    }
}

/// Owner-thread body for one playing sound.
fn sound_thread(
    device: &cpal::Device,
    audio: Arc<AudioData>,
    master_gain: Arc<AtomicU32>,
    on_end: EndOfStreamHook,
    ready_tx: &Sender<Result<(), BackendError>>,
    stop_rx: &Receiver<()>,
) {
    let supported = match device.default_output_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            let _ = ready_tx.send(Err(BackendError(format!("no output config: {e}"))));
            return;
        }
    };
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let stream = match sample_format {
        SampleFormat::F32 => build_sound_stream::<f32>(device, &config, audio, master_gain, on_end),
        SampleFormat::I16 => build_sound_stream::<i16>(device, &config, audio, master_gain, on_end),
        SampleFormat::U16 => build_sound_stream::<u16>(device, &config, audio, master_gain, on_end),
        other => Err(BackendError(format!("unsupported output sample format: {other:?}"))),
    };

    let stream = match stream.and_then(|s| {
        s.play()
            .map_err(|e| BackendError(format!("failed to start stream: {e}")))?;
        Ok(s)
    }) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    // Parked until stop() drops the sender (or sends).
    let _ = stop_rx.recv();
    drop(stream);
}

fn build_sound_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &cpal::Device,
    config: &StreamConfig,
    audio: Arc<AudioData>,
    master_gain: Arc<AtomicU32>,
    on_end: EndOfStreamHook,
) -> Result<Stream, BackendError> {
    let device_channels = config.channels as usize;
    let mut position = 0usize;
    let mut on_end = Some(on_end);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                render_frames(
                    data,
                    &audio,
                    device_channels,
                    &master_gain,
                    &mut position,
                    &mut on_end,
                );
            },
            |err| log::error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| BackendError(format!("failed to build output stream: {e}")))
}

/// Fill one output buffer from the decoded audio.
///
/// Decoded channels are mapped cyclically onto the device layout. When
/// the samples run out the buffer is filled with silence and the
/// end-of-stream hook fires exactly once; the stream keeps running
/// (emitting silence) until its owner tears it down.
fn render_frames<T: cpal::SizedSample + cpal::FromSample<f32>>(
    output: &mut [T],
    audio: &AudioData,
    device_channels: usize,
    master_gain: &AtomicU32,
    position: &mut usize,
    on_end: &mut Option<EndOfStreamHook>,
) {
    let silence = T::from_sample(0.0f32);
    let audio_channels = audio.channels as usize;
    let total_samples = audio.samples.len();

    if audio_channels == 0 || device_channels == 0 {
        for sample in output.iter_mut() {
            *sample = silence;
        }
        return;
    }

    let gain = f32::from_bits(master_gain.load(Ordering::Relaxed));

    for frame in output.chunks_mut(device_channels) {
        if *position >= total_samples {
            if let Some(hook) = on_end.take() {
                hook();
            }
            for sample in frame.iter_mut() {
                *sample = silence;
            }
            continue;
        }

        for (dev_ch, sample) in frame.iter_mut().enumerate() {
            let idx = *position + dev_ch % audio_channels;
            let val = if idx < total_samples {
                audio.samples[idx]
            } else {
                0.0f32
            };
            *sample = T::from_sample(val * gain);
        }
        *position += audio_channels;
    }
}

struct CpalSound {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SoundHandle for CpalSound {
    fn stop(&mut self) {
        // Dropping the sender wakes the owner thread out of recv().
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalSound {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture side of the cpal backend.
#[derive(Default)]
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for CpalCapture {
    fn open_stream(
        &mut self,
        spec: CaptureSpec,
        on_data: CaptureDataCallback,
    ) -> Result<Box<dyn CaptureStream>, BackendError> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), BackendError>>(1);

        let thread = thread::spawn(move || {
            capture_thread(spec, on_data, &ready_tx, &stop_rx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalCaptureStream {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(BackendError("capture thread died during setup".into()))
            }
        }
    }
}

/// Owner-thread body for one capture session.
fn capture_thread(
    spec: CaptureSpec,
    on_data: CaptureDataCallback,
    ready_tx: &Sender<Result<(), BackendError>>,
    stop_rx: &Receiver<()>,
) {
    let device = match cpal::default_host().default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(BackendError("no input audio device found".into())));
            return;
        }
    };

    let config = StreamConfig {
        channels: u16::from(spec.channels),
        sample_rate: spec.sample_rate as SampleRate,
        buffer_size: BufferSize::Default,
    };

    let stream = match spec.format {
        RecordingFormat::Float32 => build_capture_stream::<f32, _>(&device, &config, pack_f32, on_data),
        RecordingFormat::Signed16 => build_capture_stream::<i16, _>(&device, &config, pack_i16, on_data),
        // cpal has no packed 24-bit format; capture i32 and keep the top 3 bytes.
        RecordingFormat::Signed24 => build_capture_stream::<i32, _>(&device, &config, pack_s24, on_data),
        RecordingFormat::Signed32 => build_capture_stream::<i32, _>(&device, &config, pack_i32, on_data),
        RecordingFormat::Unsigned8 => build_capture_stream::<u8, _>(&device, &config, pack_u8, on_data),
    };

    let stream = match stream.and_then(|s| {
        s.play()
            .map_err(|e| BackendError(format!("failed to start capture: {e}")))?;
        Ok(s)
    }) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    let _ = stop_rx.recv();
    drop(stream);
}

fn build_capture_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut pack: F,
    mut on_data: CaptureDataCallback,
) -> Result<Stream, BackendError>
where
    T: cpal::SizedSample,
    F: FnMut(&[T]) -> Vec<u8> + Send + 'static,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let bytes = pack(data);
                if !bytes.is_empty() {
                    on_data(&bytes);
                }
            },
            |err| log::error!("capture stream error: {err}"),
            None,
        )
        .map_err(|e| BackendError(format!("failed to build capture stream: {e}")))
}

fn pack_f32(data: &[f32]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn pack_i16(data: &[i16]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn pack_i32(data: &[i32]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn pack_u8(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

fn pack_s24(data: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 3);
    for v in data {
        out.extend_from_slice(&v.to_le_bytes()[1..4]);
    }
    out
}

struct CpalCaptureStream {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream for CpalCaptureStream {
    fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.stop();
    }
}
