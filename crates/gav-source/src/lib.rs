//! Video decoding, frame sampling and raster I/O for gav.

pub mod image;
pub mod resize;
pub mod sampler;
pub mod video;
