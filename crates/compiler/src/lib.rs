//! Revid Filter Graph Compiler
//!
//! Translates a sanitized [`revid_settings::Settings`] plus per-render
//! context into the ordered filter chains and full argument list for the
//! transcoding engine:
//! - **Filters:** ordered video chain, chained audio tempo factors
//! - **Command:** single-input `-vf` pipeline or two-input compositing graph
//! - **Progress:** normalization of heterogeneous engine progress signals
//!
//! This crate is pure computation — no I/O, no engine calls. The same
//! inputs always produce the same argument list, and compilation is total
//! for any sanitized settings value.

pub mod command;
pub mod filter;
pub mod progress;

pub use command::{generate_args, RenderContext};
pub use filter::{build_audio_filters, build_video_filters, decompose_tempo, FONT_STAGING_PATH};
pub use progress::{normalize_progress, ProgressTracker};
