use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Glyph ramp with no characters.
    #[error("La rampe de glyphes est vide")]
    EmptyRamp,

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// A grid row does not have the expected glyph count.
    #[error("Ligne {row} de longueur {len}, attendu {width}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Actual glyph count.
        len: usize,
        /// Expected glyph count.
        width: usize,
    },
}
