use anyhow::Result;

use crate::frame::FrameBuffer;

/// Fournit les frames décodées d'une vidéo, dans l'ordre de décodage.
///
/// Implémenté par : `FfmpegSource` (gav-source), et des sources mémoire en test.
///
/// # Example
/// ```
/// use gav_core::traits::Source;
/// use gav_core::frame::FrameBuffer;
///
/// struct DummySource;
/// impl Source for DummySource {
///     fn next_frame(&mut self) -> anyhow::Result<Option<FrameBuffer>> { Ok(None) }
///     fn frame_rate(&self) -> f64 { 30.0 }
/// }
/// ```
pub trait Source {
    /// Retourne la prochaine frame décodée.
    ///
    /// `Ok(None)` quand la source est épuisée.
    ///
    /// # Errors
    /// Returns an error on a decoder I/O failure.
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>>;

    /// Images par seconde intrinsèques.
    fn frame_rate(&self) -> f64;
}

/// Destination séquentielle de rasters (encodeur vidéo).
///
/// # Example
/// ```
/// use gav_core::traits::FrameSink;
/// use gav_core::frame::FrameBuffer;
///
/// #[derive(Default)]
/// struct CountingSink(usize);
/// impl FrameSink for CountingSink {
///     fn write_frame(&mut self, _fb: &FrameBuffer) -> anyhow::Result<()> { self.0 += 1; Ok(()) }
///     fn finish(self) -> anyhow::Result<()> { Ok(()) }
/// }
/// ```
pub trait FrameSink {
    /// Écrit une frame RGBA. Toutes les frames ont la taille de la première.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be written.
    fn write_frame(&mut self, fb: &FrameBuffer) -> Result<()>;

    /// Ferme le flux et finalise le fichier.
    ///
    /// # Errors
    /// Returns an error if finalisation fails.
    fn finish(self) -> Result<()>;
}
