use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use gav_core::frame::FrameBuffer;

/// Resizer réutilisable wrappant fast_image_resize.
///
/// Filtre bilinéaire fixe : les grilles ASCII produites sont donc
/// reproductibles au pixel près pour une même entrée.
///
/// # Example
/// ```
/// use gav_source::resize::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Scratch image for source (owned buffer to avoid the mut borrow issue).
    src_buf: Vec<u8>,
}

impl Resizer {
    /// Create a new bilinear resizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            src_buf: Vec::new(),
        }
    }

    /// Resize `src` into `dst`. Dimensions of `dst` determine output size.
    ///
    /// # Errors
    /// Returns an error if either buffer is empty or the resize fails.
    ///
    /// # Example
    /// ```
    /// use gav_source::resize::Resizer;
    /// use gav_core::frame::FrameBuffer;
    /// let mut r = Resizer::new();
    /// let src = FrameBuffer::new(100, 100);
    /// let mut dst = FrameBuffer::new(50, 50);
    /// r.resize_into(&src, &mut dst).unwrap();
    /// ```
    pub fn resize_into(&mut self, src: &FrameBuffer, dst: &mut FrameBuffer) -> Result<()> {
        if src.width == 0 || src.height == 0 || dst.width == 0 || dst.height == 0 {
            anyhow::bail!(
                "Resize impossible {}x{} -> {}x{}",
                src.width,
                src.height,
                dst.width,
                dst.height
            );
        }
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        // fast_image_resize exige &mut sur la source
        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x4)
                .context("Invalid source dimensions")?;

        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x4)
                .context("Invalid destination dimensions")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("Resize failed")?;

        Ok(())
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot resize.
///
/// # Errors
/// Returns an error if the resize operation fails.
///
/// # Example
/// ```
/// use gav_source::resize::resize_frame;
/// use gav_core::frame::FrameBuffer;
/// let src = FrameBuffer::new(100, 100);
/// let dst = resize_frame(&src, 50, 50).unwrap();
/// assert_eq!(dst.width, 50);
/// ```
pub fn resize_frame(src: &FrameBuffer, width: u32, height: u32) -> Result<FrameBuffer> {
    let mut dst = FrameBuffer::new(width, height);
    let mut resizer = Resizer::new();
    resizer.resize_into(src, &mut dst)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_survives_downscale() {
        let src = FrameBuffer::solid(640, 480, (0, 0, 0));
        let dst = resize_frame(&src, 10, 3).unwrap();
        assert_eq!((dst.width, dst.height), (10, 3));
        for y in 0..3 {
            for x in 0..10 {
                let (r, g, b, _) = dst.pixel(x, y);
                assert_eq!((r, g, b), (0, 0, 0));
            }
        }
    }

    #[test]
    fn same_size_is_a_copy() {
        let src = FrameBuffer::solid(4, 4, (1, 2, 3));
        let dst = resize_frame(&src, 4, 4).unwrap();
        assert_eq!(dst.data, src.data);
    }

    #[test]
    fn zero_target_is_an_error() {
        let src = FrameBuffer::solid(4, 4, (1, 2, 3));
        assert!(resize_frame(&src, 0, 4).is_err());
    }
}
