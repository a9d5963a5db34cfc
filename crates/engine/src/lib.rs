//! Revid Job Execution Engine
//!
//! Runs compiled transformation commands against a single shared
//! transcoding-engine instance.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source.mp4 ──┐
//!              ├── stage into working storage
//! settings ────┤         │
//!              │         ├── compile filter graph + args
//! watermark ───┘         │
//!                        ├── execute (timeout, progress, logs)
//!                        │
//!                        ├── read + integrity-check output
//!                        │
//!                        ▼
//!                  cleanup (always)
//! ```
//!
//! The engine itself is an external collaborator consumed through the
//! [`engine::TranscodeEngine`] capability trait; [`ffmpeg::FfmpegEngine`]
//! is the process-backed client the CLI injects. Access to the shared
//! instance is serialized by running jobs strictly sequentially — the
//! batch queue never overlaps two jobs.

pub mod engine;
pub mod ffmpeg;
pub mod font;
pub mod job;
pub mod probe;
pub mod queue;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineEvent, TranscodeEngine};
pub use ffmpeg::FfmpegEngine;
pub use font::{FontResolver, FontResource};
pub use job::{ExportArtifact, ExportJob, ImageResource, JobProgress, JobResources, JobRunner, JobStage, JobTimeouts};
pub use queue::{process_queue, BatchReport, QueueItem, QueueStatus};
