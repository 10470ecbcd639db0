use std::path::Path;

use anyhow::{Context, Result};
use gav_core::frame::FrameBuffer;
use image::{DynamicImage, RgbaImage};

/// Charge une image depuis le disque en RGBA.
///
/// # Errors
/// Returns an error if the image cannot be opened or decoded.
///
/// # Example
/// ```no_run
/// use gav_source::image::load_image;
/// use std::path::Path;
/// let frame = load_image(Path::new("frame_0000.png")).unwrap();
/// ```
pub fn load_image(path: &Path) -> Result<FrameBuffer> {
    let img =
        image::open(path).with_context(|| format!("Impossible de charger {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(FrameBuffer {
        data: rgba.into_raw(),
        width,
        height,
    })
}

/// Écrit une frame en PNG RGB (l'alpha est abandonné).
///
/// # Errors
/// Returns an error if the buffer size is inconsistent or the write fails.
pub fn save_frame(fb: &FrameBuffer, path: &Path) -> Result<()> {
    let rgba = RgbaImage::from_raw(fb.width, fb.height, fb.data.clone())
        .with_context(|| format!("Buffer incohérent {}x{}", fb.width, fb.height))?;
    DynamicImage::ImageRgba8(rgba)
        .to_rgb8()
        .save(path)
        .with_context(|| format!("Impossible d'écrire {}", path.display()))
}
