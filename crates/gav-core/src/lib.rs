//! Configuration, types, and shared structures for gav.
//!
//! This crate contains the data model shared by the sampling, rendering
//! and assembly crates of the workspace.

pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use charset::GlyphRamp;
pub use config::{OutputMode, PipelineConfig};
pub use error::CoreError;
pub use frame::{AsciiGrid, FontMetrics, Frame, FrameBuffer, RenderedFrame};
