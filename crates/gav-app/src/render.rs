use std::path::{Path, PathBuf};

use gav_ascii::luminance::process_luminance;
use gav_core::charset::GlyphRamp;
use gav_core::error::CoreError;
use gav_core::frame::{AsciiGrid, FrameBuffer, RenderedFrame};
use gav_export::rasterizer::Rasterizer;
use gav_source::image::load_image;
use gav_source::resize::resize_frame;
use gav_source::sampler::frame_path;

/// Échec de conversion d'une frame. N'interrompt jamais le pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("frame {index}: lecture de {path} impossible: {reason}")]
    Open {
        index: usize,
        path: PathBuf,
        reason: String,
    },
    #[error("frame {index}: redimensionnement vers {width}x{height} impossible: {reason}")]
    Resize {
        index: usize,
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("frame {index}: {source}")]
    Map {
        index: usize,
        #[source]
        source: CoreError,
    },
    #[error("frame {index}: rasterisation impossible: {reason}")]
    Rasterize { index: usize, reason: String },
    #[error("frame {index}: écriture de {path} impossible: {source}")]
    Save {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl RenderError {
    /// Index de la frame en échec.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Open { index, .. }
            | Self::Resize { index, .. }
            | Self::Map { index, .. }
            | Self::Rasterize { index, .. }
            | Self::Save { index, .. } => *index,
        }
    }
}

/// Chemin du raster ASCII d'index `index`.
#[must_use]
pub fn raster_path(work_dir: &Path, index: usize) -> PathBuf {
    work_dir.join(format!("ascii_{index:04}.png"))
}

/// Convertit une frame extraite en grille ASCII et en raster.
///
/// Sans état mutable : une seule instance est partagée par tous les workers.
pub struct AsciiRenderer {
    ramp: GlyphRamp,
    rasterizer: Rasterizer,
    columns: u32,
    work_dir: PathBuf,
}

impl AsciiRenderer {
    #[must_use]
    pub fn new(ramp: GlyphRamp, rasterizer: Rasterizer, columns: u32, work_dir: &Path) -> Self {
        Self {
            ramp,
            rasterizer,
            columns: columns.max(1),
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Grille d'une image : redimensionnement à `columns × H` (bilinéaire),
    /// niveaux de gris, puis glyphes.
    ///
    /// `H` corrige le rapport d'aspect des cellules, voir
    /// [`gav_core::frame::FontMetrics::grid_rows`].
    ///
    /// # Errors
    /// Returns an error if the image cannot be resized or mapped.
    pub fn grid_for(&self, index: usize, pixels: &FrameBuffer) -> Result<AsciiGrid, RenderError> {
        let rows = self
            .rasterizer
            .metrics()
            .grid_rows(pixels.width, pixels.height, self.columns);

        let small = resize_frame(pixels, self.columns, rows).map_err(|e| RenderError::Resize {
            index,
            width: self.columns,
            height: rows,
            reason: format!("{e:#}"),
        })?;

        process_luminance(&small, &self.ramp).map_err(|source| RenderError::Map { index, source })
    }

    /// Convertit la frame `index` du dossier de travail.
    ///
    /// La frame source est supprimée dans tous les cas, succès ou échec.
    ///
    /// # Errors
    /// Returns the per-frame failure; callers log it and move on.
    pub fn render(&self, index: usize) -> Result<RenderedFrame, RenderError> {
        let source = frame_path(&self.work_dir, index);
        let result = self.render_file(index, &source);

        if let Err(e) = std::fs::remove_file(&source) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Suppression de {} impossible : {e}", source.display());
            }
        }
        result
    }

    fn render_file(&self, index: usize, source: &Path) -> Result<RenderedFrame, RenderError> {
        let pixels = load_image(source).map_err(|e| RenderError::Open {
            index,
            path: source.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        let grid = self.grid_for(index, &pixels)?;

        let raster = self
            .rasterizer
            .render(&grid)
            .map_err(|e| RenderError::Rasterize {
                index,
                reason: format!("{e:#}"),
            })?;

        let path = raster_path(&self.work_dir, index);
        raster.save(&path).map_err(|source| RenderError::Save {
            index,
            path: path.clone(),
            source,
        })?;

        log::debug!(
            "[Conversion] frame {index:04}: {}x{} glyphes -> {}",
            grid.width(),
            grid.height(),
            path.display()
        );

        Ok(RenderedFrame {
            index,
            raster_size: raster.dimensions(),
            grid,
            raster_path: path,
        })
    }
}
