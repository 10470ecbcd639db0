use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gav_core::config::OutputMode;
use gav_core::frame::{FrameBuffer, RenderedFrame};
use gav_core::traits::FrameSink;
use gav_export::document::FramesDocument;
use gav_export::muxer::Mp4Muxer;

use crate::scheduler::ConversionResults;

/// Bilan de l'assemblage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Frames effectivement écrites dans l'artefact.
    pub written: usize,
    /// Fichier produit, `None` si rien n'a été assemblé.
    pub output: Option<PathBuf>,
}

impl AssemblyReport {
    fn nothing() -> Self {
        log::warn!("Aucune frame convertie : nothing to assemble.");
        Self {
            written: 0,
            output: None,
        }
    }
}

/// Assemble les frames converties en vidéo ou en document.
pub struct OutputAssembler {
    mode: OutputMode,
    output: PathBuf,
    fps: u32,
}

impl OutputAssembler {
    /// `output` est le chemin final, extension comprise.
    #[must_use]
    pub fn new(mode: OutputMode, output: &Path, fps: u32) -> Self {
        Self {
            mode,
            output: output.to_path_buf(),
            fps,
        }
    }

    /// Assemble avec l'encodeur ffmpeg en mode vidéo.
    ///
    /// # Errors
    /// Retourne une erreur si l'artefact de sortie ne peut pas être créé.
    pub fn assemble(&self, results: ConversionResults) -> Result<AssemblyReport> {
        let fps = self.fps;
        self.assemble_with(results, |path, w, h| Mp4Muxer::new(path, w, h, fps))
    }

    /// Comme [`OutputAssembler::assemble`], avec une fabrique d'encodeur
    /// `(chemin, largeur, hauteur)`.
    ///
    /// # Errors
    /// Retourne une erreur si l'artefact de sortie ne peut pas être créé.
    pub fn assemble_with<K, F>(
        &self,
        results: ConversionResults,
        make_sink: F,
    ) -> Result<AssemblyReport>
    where
        K: FrameSink,
        F: FnOnce(&Path, u32, u32) -> Result<K>,
    {
        let frames = results.into_sorted();
        match self.mode {
            OutputMode::Video => assemble_video(&frames, &self.output, make_sink),
            OutputMode::Document => assemble_document(&frames, &self.output),
        }
    }
}

/// Écrit les rasters dans l'ordre des index, à la taille du premier.
///
/// Une frame illisible ou de taille différente est loggée et sautée.
/// Chaque raster est supprimé une fois traité.
///
/// # Errors
/// Retourne une erreur si l'encodeur ne peut pas être créé ou finalisé.
pub fn assemble_video<K, F>(
    frames: &[RenderedFrame],
    output: &Path,
    make_sink: F,
) -> Result<AssemblyReport>
where
    K: FrameSink,
    F: FnOnce(&Path, u32, u32) -> Result<K>,
{
    let Some(first) = frames.first() else {
        return Ok(AssemblyReport::nothing());
    };

    let (width, height) = first.raster_size;
    log::info!(
        "Assemblage vidéo : {} frames {width}x{height} -> {}",
        frames.len(),
        output.display()
    );
    let mut sink = make_sink(output, width, height)
        .with_context(|| format!("Impossible de créer {}", output.display()))?;

    let mut written = 0usize;
    for frame in frames {
        match load_raster(&frame.raster_path).and_then(|fb| sink.write_frame(&fb)) {
            Ok(()) => written += 1,
            Err(e) => log::error!(
                "Frame {} ({}) ignorée : {e:#}",
                frame.index,
                frame.raster_path.display()
            ),
        }
        remove_raster(&frame.raster_path);
    }

    sink.finish()?;
    log::info!("{written} frames écrites dans {}", output.display());
    Ok(AssemblyReport {
        written,
        output: Some(output.to_path_buf()),
    })
}

/// Sérialise les grilles, réindexées densément, puis supprime les rasters.
///
/// # Errors
/// Retourne une erreur si le document ne peut pas être écrit.
pub fn assemble_document(frames: &[RenderedFrame], output: &Path) -> Result<AssemblyReport> {
    if frames.is_empty() {
        return Ok(AssemblyReport::nothing());
    }

    let mut document = FramesDocument::new();
    for frame in frames {
        document.push(&frame.grid);
    }
    document.save(output)?;

    for frame in frames {
        remove_raster(&frame.raster_path);
    }

    log::info!("{} frames écrites dans {}", document.len(), output.display());
    Ok(AssemblyReport {
        written: document.len(),
        output: Some(output.to_path_buf()),
    })
}

/// Charge un raster niveaux de gris et l'étend en RGBA opaque.
fn load_raster(path: &Path) -> Result<FrameBuffer> {
    let gray = image::open(path)
        .with_context(|| format!("Raster illisible : {}", path.display()))?
        .to_luma8();
    let (width, height) = gray.dimensions();
    let mut fb = FrameBuffer::new(width, height);
    for (px, l) in fb.data.chunks_exact_mut(4).zip(gray.as_raw()) {
        px.copy_from_slice(&[*l, *l, *l, 255]);
    }
    Ok(fb)
}

fn remove_raster(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Suppression de {} impossible : {e}", path.display());
        }
    }
}
