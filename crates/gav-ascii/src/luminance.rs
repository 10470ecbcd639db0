use gav_core::charset::GlyphRamp;
use gav_core::error::CoreError;
use gav_core::frame::{AsciiGrid, FrameBuffer};

/// Convertit une frame RGBA en un plan de luminance, row-major.
///
/// # Example
/// ```
/// use gav_core::frame::FrameBuffer;
/// use gav_ascii::luminance::to_grayscale;
/// let gray = to_grayscale(&FrameBuffer::solid(3, 2, (255, 255, 255)));
/// assert_eq!(gray, vec![255; 6]);
/// ```
#[must_use]
pub fn to_grayscale(frame: &FrameBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize);
    for y in 0..frame.height {
        for x in 0..frame.width {
            out.push(frame.luminance(x, y));
        }
    }
    out
}

/// Mappe un plan de luminance `width × n` sur la rampe et le découpe en lignes.
///
/// # Errors
/// Returns an error if `gray` is empty or not a whole number of rows.
///
/// # Example
/// ```
/// use gav_core::charset::GlyphRamp;
/// use gav_ascii::luminance::map_intensities;
/// let ramp = GlyphRamp::new("@ ").unwrap();
/// let grid = map_intensities(&[0, 255, 255, 0], 2, &ramp).unwrap();
/// assert_eq!(grid.to_text(), "@ \n @");
/// ```
pub fn map_intensities(
    gray: &[u8],
    width: usize,
    ramp: &GlyphRamp,
) -> Result<AsciiGrid, CoreError> {
    let glyphs: Vec<char> = gray.iter().map(|&p| ramp.map(p)).collect();
    AsciiGrid::from_glyphs(width, &glyphs)
}

/// Process a frame already resized to the target grid into an ASCII grid.
///
/// One glyph per pixel: the frame's width becomes the grid width and its
/// height the row count.
///
/// # Errors
/// Returns an error if the frame has no pixels.
///
/// # Example
/// ```
/// use gav_core::charset::GlyphRamp;
/// use gav_core::frame::FrameBuffer;
/// use gav_ascii::luminance::process_luminance;
///
/// let frame = FrameBuffer::solid(10, 3, (0, 0, 0));
/// let grid = process_luminance(&frame, &GlyphRamp::new("@ ").unwrap()).unwrap();
/// assert_eq!(grid.rows()[0], "@@@@@@@@@@");
/// ```
pub fn process_luminance(frame: &FrameBuffer, ramp: &GlyphRamp) -> Result<AsciiGrid, CoreError> {
    let gray = to_grayscale(frame);
    map_intensities(&gray, frame.width as usize, ramp)
}
