use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::CHARSET_DEFAULT;
use crate::error::CoreError;

/// Facteur appliqué à la taille de police demandée avant rasterisation.
///
/// Conserve le rendu historique (taille doublée). Ajustable via
/// `font_scale` dans la config.
pub const DEFAULT_FONT_SCALE: f32 = 2.0;

/// Mode de sortie de l'assembleur.
///
/// # Example
/// ```
/// use gav_core::config::OutputMode;
/// assert!(matches!(OutputMode::default(), OutputMode::Video));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Rasters muxés dans un conteneur vidéo.
    #[default]
    Video,
    /// Grilles sérialisées dans un document JSON.
    Document,
}

/// Configuration complète du pipeline.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use gav_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.fps, 20);
/// assert_eq!(config.width, 120);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PipelineConfig {
    // === Entrées / sorties ===
    /// Vidéo source.
    pub input: PathBuf,
    /// Fichier de sortie. En mode document, l'extension devient `.json`.
    pub output: PathBuf,
    /// Dossier des frames intermédiaires (supprimées en cours de route).
    pub work_dir: PathBuf,
    /// Police TTF/OTF utilisée pour la rasterisation.
    pub font_path: PathBuf,
    pub output_mode: OutputMode,

    // === Échantillonnage ===
    /// FPS de sortie.
    pub fps: u32,

    // === Rendu ASCII ===
    /// Largeur de la grille en caractères.
    pub width: u32,
    /// Rampe de glyphes, du plus sombre au plus clair.
    pub charset: String,
    /// Taille de police demandée (avant `font_scale`).
    pub font_size: u32,
    /// Multiplicateur appliqué à `font_size`.
    pub font_scale: f32,

    // === Performance ===
    /// Nombre maximal de conversions simultanées.
    pub threads: usize,
    /// Log de progression toutes les N frames converties.
    pub progress_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("video.mp4"),
            output: PathBuf::from("ascii_video.mp4"),
            work_dir: PathBuf::from("ascii_frames"),
            font_path: PathBuf::from("cour.ttf"),
            output_mode: OutputMode::Video,
            fps: 20,
            width: 120,
            charset: CHARSET_DEFAULT.to_string(),
            font_size: 12,
            font_scale: DEFAULT_FONT_SCALE,
            threads: 8,
            progress_every: 25,
        }
    }
}

impl PipelineConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization and CLI overrides.
    pub fn clamp_all(&mut self) {
        self.fps = self.fps.clamp(1, 240);
        self.width = self.width.clamp(1, 2000);
        self.font_size = self.font_size.clamp(1, 512);
        self.font_scale = self.font_scale.clamp(0.25, 8.0);
        self.threads = self.threads.clamp(1, 256);
        self.progress_every = self.progress_every.max(1);
    }

    /// Taille effective de police, en pixels.
    ///
    /// # Example
    /// ```
    /// use gav_core::config::PipelineConfig;
    /// assert_eq!(PipelineConfig::default().effective_font_px(), 24.0);
    /// ```
    #[must_use]
    pub fn effective_font_px(&self) -> f32 {
        self.font_size as f32 * self.font_scale
    }

    /// Chemin réellement écrit par l'assembleur.
    ///
    /// # Example
    /// ```
    /// use gav_core::config::{OutputMode, PipelineConfig};
    /// let mut c = PipelineConfig::default();
    /// c.output_mode = OutputMode::Document;
    /// assert_eq!(c.resolved_output(), std::path::PathBuf::from("ascii_video.json"));
    /// ```
    #[must_use]
    pub fn resolved_output(&self) -> PathBuf {
        match self.output_mode {
            OutputMode::Video => self.output.clone(),
            OutputMode::Document => self.output.with_extension("json"),
        }
    }
}

/// Structure TOML intermédiaire, toutes valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    font_path: Option<PathBuf>,
    output_mode: Option<OutputMode>,
    fps: Option<u32>,
    width: Option<u32>,
    charset: Option<String>,
    font_size: Option<u32>,
    font_scale: Option<f32>,
    threads: Option<usize>,
    progress_every: Option<usize>,
}

/// Parse une config TOML partielle et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed.
///
/// # Example
/// ```
/// use gav_core::config::parse_config;
/// let c = parse_config("fps = 10\nwidth = 80").unwrap();
/// assert_eq!((c.fps, c.width, c.threads), (10, 80, 8));
/// ```
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = PipelineConfig::default();

    if let Some(v) = file.input {
        config.input = v;
    }
    if let Some(v) = file.output {
        config.output = v;
    }
    if let Some(v) = file.work_dir {
        config.work_dir = v;
    }
    if let Some(v) = file.font_path {
        config.font_path = v;
    }
    if let Some(v) = file.output_mode {
        config.output_mode = v;
    }
    if let Some(v) = file.fps {
        config.fps = v;
    }
    if let Some(v) = file.width {
        config.width = v;
    }
    if let Some(v) = file.charset {
        config.charset = v;
    }
    if let Some(v) = file.font_size {
        config.font_size = v;
    }
    if let Some(v) = file.font_scale {
        config.font_scale = v;
    }
    if let Some(v) = file.threads {
        config.threads = v;
    }
    if let Some(v) = file.progress_every {
        config.progress_every = v;
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}
