use std::path::PathBuf;

use crate::error::CoreError;

/// Buffer de pixels RGBA, row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use gav_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer (noir transparent) aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use gav_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.data.len(), 100 * 50 * 4);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Buffer rempli d'une couleur unie opaque.
    ///
    /// # Example
    /// ```
    /// use gav_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::solid(2, 2, (255, 255, 255));
    /// assert_eq!(fb.luminance(1, 1), 255);
    /// ```
    #[must_use]
    pub fn solid(width: u32, height: u32, rgb: (u8, u8, u8)) -> Self {
        let mut fb = Self::new(width, height);
        for px in fb.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
        fb
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }

    /// Luminance ITU-R 601 (`L = 0.299 R + 0.587 G + 0.114 B`), integer math.
    ///
    /// Same weights as the usual single-channel "L" image conversion, so a
    /// grid built from an RGB frame matches one built from its grayscale copy.
    #[inline(always)]
    #[must_use]
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        let (r, g, b, _) = self.pixel(x, y);
        ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
    }
}

/// Une frame échantillonnée depuis la vidéo source.
///
/// `index` est dense et commence à 0, dans l'ordre d'émission.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Output index assigned at sampling time.
    pub index: usize,
    /// Decoded pixels.
    pub pixels: FrameBuffer,
}

/// Dimensions d'une cellule de glyphe, en pixels.
///
/// Dérivées une fois de la police chargée et partagées en lecture seule.
///
/// # Example
/// ```
/// use gav_core::frame::FontMetrics;
/// let m = FontMetrics::new(7, 14).unwrap();
/// assert_eq!(m.grid_rows(640, 480, 10), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontMetrics {
    glyph_width: u32,
    glyph_height: u32,
}

impl FontMetrics {
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] if either side is zero.
    pub fn new(glyph_width: u32, glyph_height: u32) -> Result<Self, CoreError> {
        if glyph_width == 0 || glyph_height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: glyph_width,
                height: glyph_height,
            });
        }
        Ok(Self {
            glyph_width,
            glyph_height,
        })
    }

    #[must_use]
    pub fn glyph_width(&self) -> u32 {
        self.glyph_width
    }

    #[must_use]
    pub fn glyph_height(&self) -> u32 {
        self.glyph_height
    }

    /// Hauteur de grille corrigée de l'aspect des glyphes.
    ///
    /// `floor(orig_h * (glyph_w / glyph_h) * (columns / orig_w))`, au moins 1.
    /// Glyph cells are usually taller than wide; this keeps the rendered
    /// frame at the source's visual aspect ratio.
    #[must_use]
    pub fn grid_rows(&self, orig_width: u32, orig_height: u32, columns: u32) -> u32 {
        if orig_width == 0 {
            return 1;
        }
        let ratio = f64::from(self.glyph_width) / f64::from(self.glyph_height);
        let scale = f64::from(columns) / f64::from(orig_width);
        let rows = (f64::from(orig_height) * ratio * scale).floor() as u32;
        rows.max(1)
    }

    /// Taille du canvas raster pour une grille `columns × rows`.
    #[must_use]
    pub fn canvas_size(&self, columns: u32, rows: u32) -> (u32, u32) {
        (columns * self.glyph_width, rows * self.glyph_height)
    }
}

/// Grille ASCII rectangulaire : `rows` lignes de exactement `width` glyphes.
///
/// # Example
/// ```
/// use gav_core::frame::AsciiGrid;
/// let grid = AsciiGrid::from_glyphs(3, &['@', '.', ' ', '#', '#', '#']).unwrap();
/// assert_eq!(grid.height(), 2);
/// assert_eq!(grid.to_text(), "@. \n###");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiGrid {
    width: usize,
    rows: Vec<String>,
}

impl AsciiGrid {
    /// Découpe un flux de glyphes row-major en lignes de `width` glyphes.
    ///
    /// # Errors
    /// Returns an error if `width` is zero, or if the glyph count is not a
    /// non-zero multiple of `width`.
    pub fn from_glyphs(width: usize, glyphs: &[char]) -> Result<Self, CoreError> {
        if width == 0 || glyphs.is_empty() || glyphs.len() % width != 0 {
            return Err(CoreError::InvalidDimensions {
                width: width as u32,
                height: (glyphs.len() / width.max(1)) as u32,
            });
        }
        let rows = glyphs
            .chunks_exact(width)
            .map(|row| row.iter().collect::<String>())
            .collect();
        Ok(Self { width, rows })
    }

    /// Construit une grille depuis des lignes déjà formées.
    ///
    /// # Errors
    /// Returns [`CoreError::RaggedRow`] if a row's glyph count differs from
    /// `width`, or [`CoreError::InvalidDimensions`] if the grid would be empty.
    pub fn from_rows(width: usize, rows: Vec<String>) -> Result<Self, CoreError> {
        if width == 0 || rows.is_empty() {
            return Err(CoreError::InvalidDimensions {
                width: width as u32,
                height: rows.len() as u32,
            });
        }
        for (row, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != width {
                return Err(CoreError::RaggedRow { row, len, width });
            }
        }
        Ok(Self { width, rows })
    }

    /// Width in glyphs.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Lignes jointes par `\n`, sans saut de ligne final.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.rows.join("\n")
    }
}

/// Résultat du rendu d'une frame : la grille et son raster sur disque.
///
/// Le raster reste sur disque jusqu'à l'assemblage pour borner la mémoire
/// sur les longues vidéos.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Index of the source [`Frame`].
    pub index: usize,
    /// Glyph grid.
    pub grid: AsciiGrid,
    /// Grayscale raster, `grid.width() * glyph_w` × `grid.height() * glyph_h`.
    pub raster_path: PathBuf,
    /// Raster size in pixels.
    pub raster_size: (u32, u32),
}
