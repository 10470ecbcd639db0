//! Glyph rasterization, video muxing and JSON frame documents for gav.

pub mod document;
pub mod muxer;
pub mod rasterizer;
