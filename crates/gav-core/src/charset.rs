use crate::error::CoreError;

/// Rampe par défaut, du plus sombre au plus clair.
pub const CHARSET_DEFAULT: &str = "@%#*+=-:. ";

/// Ordered glyph ramp, darkest first, with a pre-computed intensity LUT.
///
/// Intensity `p` maps to `chars[min(p * L / 256, L - 1)]`. The LUT is built
/// once so the per-sample cost is a single array read, and the ramp is
/// shared read-only between worker threads.
///
/// # Example
/// ```
/// use gav_core::charset::GlyphRamp;
/// let ramp = GlyphRamp::new("@%#*+=-:. ").unwrap();
/// assert_eq!(ramp.map(0), '@');
/// assert_eq!(ramp.map(255), ' ');
/// ```
#[derive(Clone, Debug)]
pub struct GlyphRamp {
    chars: Vec<char>,
    lut: [char; 256],
}

impl GlyphRamp {
    /// Build a ramp from a string ordered darkest→lightest.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyRamp`] if `charset` has no characters.
    pub fn new(charset: &str) -> Result<Self, CoreError> {
        let chars: Vec<char> = charset.chars().collect();
        if chars.is_empty() {
            return Err(CoreError::EmptyRamp);
        }
        let lut = Self::build_lut(&chars);
        Ok(Self { chars, lut })
    }

    fn build_lut(chars: &[char]) -> [char; 256] {
        let mut lut = [' '; 256];
        for (p, slot) in lut.iter_mut().enumerate() {
            *slot = chars[Self::bucket(p as u8, chars.len())];
        }
        lut
    }

    /// Bucket index for intensity `p` on a ramp of length `len`.
    ///
    /// Total over `[0, 255]`: the result is always in `[0, len - 1]`.
    ///
    /// # Example
    /// ```
    /// use gav_core::charset::GlyphRamp;
    /// assert_eq!(GlyphRamp::bucket(255, 10), 9);
    /// assert_eq!(GlyphRamp::bucket(128, 2), 1);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn bucket(p: u8, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (usize::from(p) * len / 256).min(len - 1)
    }

    /// Map a grayscale intensity to its glyph.
    #[inline(always)]
    #[must_use]
    pub fn map(&self, intensity: u8) -> char {
        self.lut[intensity as usize]
    }

    /// Number of glyphs in the ramp.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false: construction rejects empty ramps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Glyphs, darkest first.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        let chars: Vec<char> = CHARSET_DEFAULT.chars().collect();
        let lut = Self::build_lut(&chars);
        Self { chars, lut }
    }
}
