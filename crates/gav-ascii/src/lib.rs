//! ASCII conversion engine for gav.
//!
//! Converts pixel frames to glyph grids.

pub mod luminance;
