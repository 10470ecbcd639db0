use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gav_core::charset::GlyphRamp;
use gav_core::config::PipelineConfig;
use gav_core::traits::{FrameSink, Source};
use gav_export::muxer::Mp4Muxer;
use gav_export::rasterizer::Rasterizer;
use gav_source::sampler::FrameSampler;
use gav_source::video::FfmpegSource;

use crate::assemble::OutputAssembler;
use crate::render::AsciiRenderer;
use crate::scheduler::ConversionScheduler;

/// Étapes du pipeline, strictement séquentielles. Non reprenable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Extracting,
    Converting,
    Assembling,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extraction",
            Self::Converting => "conversion",
            Self::Assembling => "assemblage",
            Self::Done => "terminé",
        };
        f.write_str(name)
    }
}

/// Bilan d'une exécution complète.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub extracted: usize,
    pub converted: usize,
    pub written: usize,
    /// `None` quand aucune frame n'a survécu.
    pub output: Option<PathBuf>,
    /// Dernière étape atteinte avant `Done`.
    pub last_stage: PipelineStage,
}

fn enter(stage: PipelineStage) {
    log::info!("=== Étape : {stage} ===");
}

/// Exécute le pipeline complet avec ffmpeg et la police configurée.
///
/// # Errors
/// Échec fatal si la police, la vidéo source ou la sortie sont inutilisables.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let ramp = GlyphRamp::new(&config.charset)?;
    let rasterizer =
        Rasterizer::from_file(&config.font_path, config.effective_font_px(), &config.charset)?;
    let renderer = AsciiRenderer::new(ramp, rasterizer, config.width, &config.work_dir);

    let mut source = FfmpegSource::open(&config.input)
        .with_context(|| format!("Vidéo source inutilisable : {}", config.input.display()))?;

    let fps = config.fps;
    run_with(config, &mut source, &renderer, |path, w, h| {
        Mp4Muxer::new(path, w, h, fps)
    })
}

/// Pipeline sur une source et un encodeur quelconques.
///
/// `Extracting → Converting → Assembling → Done`, avec retour direct à
/// `Done` quand aucune frame n'est convertie.
///
/// # Errors
/// Retourne une erreur si l'extraction ou l'écriture de la sortie échoue.
pub fn run_with<S, K, F>(
    config: &PipelineConfig,
    source: &mut S,
    renderer: &AsciiRenderer,
    make_sink: F,
) -> Result<PipelineOutcome>
where
    S: Source + ?Sized,
    K: FrameSink,
    F: FnOnce(&Path, u32, u32) -> Result<K>,
{
    enter(PipelineStage::Extracting);
    let report = FrameSampler::new(config.fps, &config.work_dir).run(source)?;
    log::info!(
        "{} frames extraites sur {} décodées",
        report.extracted,
        report.decoded
    );

    enter(PipelineStage::Converting);
    let results = ConversionScheduler::new(config.threads, config.progress_every)
        .run(report.extracted, |index| renderer.render(index))?;
    let converted = results.len();

    if results.is_empty() {
        log::warn!("Aucune frame convertie : nothing to assemble.");
        cleanup_work_dir(&config.work_dir);
        enter(PipelineStage::Done);
        return Ok(PipelineOutcome {
            extracted: report.extracted,
            converted: 0,
            written: 0,
            output: None,
            last_stage: PipelineStage::Converting,
        });
    }

    enter(PipelineStage::Assembling);
    let output = config.resolved_output();
    let assembly = OutputAssembler::new(config.output_mode, &output, config.fps)
        .assemble_with(results, make_sink)?;

    cleanup_work_dir(&config.work_dir);
    enter(PipelineStage::Done);

    if let Some(ref path) = assembly.output {
        log::info!("Sortie : {}", path.display());
    }
    Ok(PipelineOutcome {
        extracted: report.extracted,
        converted,
        written: assembly.written,
        output: assembly.output,
        last_stage: PipelineStage::Assembling,
    })
}

/// Supprime le dossier de travail s'il est vide.
fn cleanup_work_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir(dir) {
        log::debug!("Dossier de travail {} conservé : {e}", dir.display());
    }
}
