//! In-process audio engine with two independent services:
//!
//! - **Playback** — asynchronous decoded playback of in-memory encoded
//!   audio blobs, with per-submission cancellation and completion
//!   reporting ([`AudioRequest`]).
//! - **Capture** — recording from the default input device through a
//!   gain → silence-gate → compress pipeline, drained by the host as a
//!   self-describing byte stream.
//!
//! [`AudioMan`] is the facade host code talks to. The platform audio
//! layer and the blob decoder sit behind the [`backend`] and [`decoder`]
//! modules so the engines stay testable without hardware.

pub mod backend;
pub mod decoder;
pub mod format;
pub mod playback;
pub mod recording;

mod manager;

pub use format::RecordingFormat;
pub use manager::AudioMan;
pub use playback::request::{AudioRequest, Completion};
