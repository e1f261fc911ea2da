//! Console exerciser: a few seconds of mic loopback through the capture
//! pipeline, then playback of any files given on the command line.

use std::io::Cursor;
use std::time::{Duration, Instant};

use soundbox::{AudioMan, RecordingFormat};

const LOOPBACK_SECS: u64 = 10;
const LOOPBACK_RATE: u32 = 48_000;
const LOOPBACK_CHANNELS: u16 = 2;

/// Wrap raw s16 PCM into an in-memory WAV blob so it can be resubmitted
/// through the decoder.
fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav header");
    for s in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([s[0], s[1]]))
            .expect("wav sample");
    }
    writer.finalize().expect("wav finalize");

    cursor.into_inner()
}

fn main() {
    let mut audio = AudioMan::new();
    if !audio.init_playback() {
        eprintln!("failed to init playback device");
        std::process::exit(1);
    }

    // Mic loopback: drain the capture buffer, decode the chunks, wrap
    // them as WAV and hear them back.
    if audio.start_recording(
        LOOPBACK_RATE,
        LOOPBACK_CHANNELS as u8,
        RecordingFormat::Signed16,
    ) {
        println!("mic loopback for {LOOPBACK_SECS}s...");

        let started = Instant::now();
        while started.elapsed() < Duration::from_secs(LOOPBACK_SECS) {
            std::thread::sleep(Duration::from_millis(100));

            if audio.size_unread_recording() == 0 {
                continue;
            }

            let chunks = audio.get_unread_recording(usize::MAX);
            let pcm = audio.decode_recording_chunks(&chunks);
            let wav = pcm_to_wav(&pcm, LOOPBACK_RATE, LOOPBACK_CHANNELS);
            let _ = audio.submit_audio(&wav);
        }

        audio.stop_recording();
        println!("mic loopback done");
    } else {
        eprintln!("no capture device, skipping loopback");
    }

    // Play any files passed on the command line, overlapping.
    let mut pending = Vec::new();
    for path in std::env::args().skip(1) {
        match std::fs::read(&path) {
            Ok(data) => {
                let request = audio.submit_audio(&data);
                if request.is_valid() {
                    pending.push((path, request));
                } else {
                    eprintln!("{path}: not playable");
                }
            }
            Err(e) => eprintln!("{path}: {e}"),
        }
    }

    for (path, request) in pending {
        println!("{path}: played to end = {}", request.wait());
    }

    audio.uninit_playback();
}
