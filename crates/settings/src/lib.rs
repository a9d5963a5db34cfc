//! Revid Settings Model
//!
//! The declarative description of one video transformation: color grading,
//! framing, effects, watermarking, speed, and metadata policy.
//!
//! Settings are pure data. Every mutation path runs through [`Settings::sanitize`],
//! which is total and idempotent: malformed input is coerced to the nearest
//! valid value or a named default, never rejected. The compiler and job
//! runner may therefore assume every field is in range.

pub mod settings;

pub use settings::*;
