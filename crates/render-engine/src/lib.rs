//! Montage Render Engine
//!
//! Turns a project's video tracks into a single exported file.
//!
//! ```text
//! Project ── flatten ──> RenderPlan (units sorted by start)
//!                             │
//!              per unit:  trim (once per loop) ─> opacity (level < 1)
//!                             │
//!                        concatenate ─> deliver ─> output file
//! ```
//!
//! The media work itself is behind [`TranscodingService`];
//! [`FfmpegTranscoder`] is the stock implementation.

pub mod export;
pub mod ffmpeg;
pub mod flatten;

pub use export::*;
pub use ffmpeg::FfmpegTranscoder;
pub use flatten::{flatten, MediaUnit, RenderPlan, SourceSegment};
