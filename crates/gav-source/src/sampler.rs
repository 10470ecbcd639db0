use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gav_core::frame::Frame;
use gav_core::traits::Source;

use crate::image::save_frame;

/// Chemin de la frame extraite d'index `index`.
///
/// # Example
/// ```
/// use gav_source::sampler::frame_path;
/// use std::path::Path;
/// assert_eq!(frame_path(Path::new("w"), 7), Path::new("w/frame_0007.png"));
/// ```
#[must_use]
pub fn frame_path(work_dir: &Path, index: usize) -> PathBuf {
    work_dir.join(format!("frame_{index:04}.png"))
}

/// Pas d'échantillonnage : `max(1, round(fps_in / fps_out))`.
///
/// Arrondi au pair le plus proche sur les demi-valeurs (2.5 → 2).
///
/// # Example
/// ```
/// use gav_source::sampler::frame_skip;
/// assert_eq!(frame_skip(30.0, 10), 3);
/// assert_eq!(frame_skip(24.0, 60), 1);
/// ```
#[must_use]
pub fn frame_skip(fps_in: f64, fps_out: u32) -> usize {
    if fps_out == 0 || !fps_in.is_finite() || fps_in <= 0.0 {
        return 1;
    }
    let ratio = (fps_in / f64::from(fps_out)).round_ties_even();
    (ratio as usize).max(1)
}

/// Bilan d'une extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleReport {
    /// Frames lues depuis la source.
    pub decoded: usize,
    /// Frames écrites, indices `0..extracted`.
    pub extracted: usize,
    /// Pas utilisé.
    pub skip: usize,
}

/// Sélectionne une frame sur `skip` et l'écrit dans le dossier de travail.
pub struct FrameSampler {
    target_fps: u32,
    work_dir: PathBuf,
}

impl FrameSampler {
    #[must_use]
    pub fn new(target_fps: u32, work_dir: &Path) -> Self {
        Self {
            target_fps,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Parcourt `source` jusqu'à épuisement, en émettant une frame toutes
    /// les `skip` frames décodées, chacune écrite sous [`frame_path`].
    ///
    /// Une erreur de décodage en cours de flux termine l'extraction (les
    /// frames déjà écrites sont conservées).
    ///
    /// # Errors
    /// Returns an error if no frame at all can be decoded, or if the working
    /// directory or a frame file cannot be written.
    pub fn run<S: Source + ?Sized>(&self, source: &mut S) -> Result<SampleReport> {
        self.run_with(source, |frame| {
            let path = frame_path(&self.work_dir, frame.index);
            save_frame(&frame.pixels, &path)?;
            log::debug!("[Extraction] frame {:04} -> {}", frame.index, path.display());
            Ok(())
        })
    }

    /// Même boucle que [`FrameSampler::run`], avec un consommateur arbitraire.
    ///
    /// # Errors
    /// Propagates the first error returned by `emit`.
    pub fn run_with<S, F>(&self, source: &mut S, mut emit: F) -> Result<SampleReport>
    where
        S: Source + ?Sized,
        F: FnMut(Frame) -> Result<()>,
    {
        std::fs::create_dir_all(&self.work_dir).with_context(|| {
            format!("Impossible de créer {}", self.work_dir.display())
        })?;

        let skip = frame_skip(source.frame_rate(), self.target_fps);
        log::info!(
            "Extraction : {:.3}fps -> {}fps, 1 frame sur {skip}",
            source.frame_rate(),
            self.target_fps
        );

        let mut decoded = 0usize;
        let mut extracted = 0usize;
        loop {
            let pixels = match source.next_frame() {
                Ok(Some(fb)) => fb,
                Ok(None) => break,
                Err(e) if decoded == 0 => {
                    return Err(e.context("Aucune frame décodable dans la source"));
                }
                Err(e) => {
                    log::warn!("Décodage interrompu après {decoded} frames : {e:#}");
                    break;
                }
            };
            if decoded % skip == 0 {
                emit(Frame {
                    index: extracted,
                    pixels,
                })?;
                extracted += 1;
            }
            decoded += 1;
        }

        log::info!("{extracted} frames extraites ({decoded} décodées)");
        Ok(SampleReport {
            decoded,
            extracted,
            skip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gav_core::frame::FrameBuffer;

    /// Source mémoire : `total` frames dont la couleur encode le rang.
    struct MemorySource {
        total: usize,
        produced: usize,
        fps: f64,
        fail_at: Option<usize>,
    }

    impl MemorySource {
        fn new(total: usize, fps: f64) -> Self {
            Self {
                total,
                produced: 0,
                fps,
                fail_at: None,
            }
        }
    }

    impl Source for MemorySource {
        fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
            if Some(self.produced) == self.fail_at {
                anyhow::bail!("pipe cassé");
            }
            if self.produced >= self.total {
                return Ok(None);
            }
            let v = self.produced as u8;
            self.produced += 1;
            Ok(Some(FrameBuffer::solid(4, 4, (v, v, v))))
        }

        fn frame_rate(&self) -> f64 {
            self.fps
        }
    }

    fn collect(total: usize, fps_in: f64, fps_out: u32) -> (SampleReport, Vec<Frame>) {
        let dir = tempfile::tempdir().unwrap();
        let sampler = FrameSampler::new(fps_out, dir.path());
        let mut frames = Vec::new();
        let report = sampler
            .run_with(&mut MemorySource::new(total, fps_in), |f| {
                frames.push(f);
                Ok(())
            })
            .unwrap();
        (report, frames)
    }

    #[test]
    fn skip_rounds_half_to_even() {
        assert_eq!(frame_skip(25.0, 10), 2);
        assert_eq!(frame_skip(35.0, 10), 4);
        assert_eq!(frame_skip(29.97, 10), 3);
        assert_eq!(frame_skip(5.0, 20), 1);
        assert_eq!(frame_skip(0.0, 20), 1);
    }

    #[test]
    fn extracted_count_is_ceil_of_total_over_skip() {
        for total in [0usize, 1, 2, 3, 10, 89, 90, 91] {
            let (report, frames) = collect(total, 30.0, 10);
            assert_eq!(report.skip, 3);
            assert_eq!(report.decoded, total);
            assert_eq!(report.extracted, total.div_ceil(3), "total={total}");
            assert_eq!(frames.len(), report.extracted);
        }
    }

    #[test]
    fn indices_are_dense_and_pick_every_skip() {
        let (_, frames) = collect(10, 30.0, 10);
        let indices: Vec<usize> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let ranks: Vec<u8> = frames.iter().map(|f| f.pixels.pixel(0, 0).0).collect();
        assert_eq!(ranks, vec![0, 3, 6, 9]);
    }

    #[test]
    fn decode_error_stops_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = FrameSampler::new(30, dir.path());
        let mut source = MemorySource::new(10, 30.0);
        source.fail_at = Some(4);
        let report = sampler.run_with(&mut source, |_| Ok(())).unwrap();
        assert_eq!(report.decoded, 4);
        assert_eq!(report.extracted, 4);
    }

    #[test]
    fn decode_error_before_first_frame_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = FrameSampler::new(10, dir.path());
        let mut source = MemorySource::new(10, 30.0);
        source.fail_at = Some(0);
        let err = sampler.run_with(&mut source, |_| Ok(())).unwrap_err();
        assert!(format!("{err:#}").contains("pipe cassé"));
    }

    #[cfg(unix)]
    #[test]
    fn undecodable_video_fails_extraction() {
        use crate::video::{FfmpegSource, fake_tools};

        let dir = tempfile::tempdir().unwrap();
        let (tools, video) = fake_tools::tools(
            dir.path(),
            "echo 'moov atom not found' >&2; exit 1",
        );
        let mut source = FfmpegSource::open_with(&video, &tools).unwrap();
        let sampler = FrameSampler::new(10, &dir.path().join("frames"));

        let err = sampler.run(&mut source).unwrap_err();
        assert!(format!("{err:#}").contains("moov atom not found"));
        assert!(!frame_path(&dir.path().join("frames"), 0).exists());
    }

    #[cfg(unix)]
    #[test]
    fn decoder_crash_after_frames_keeps_them() {
        use crate::video::{FfmpegSource, fake_tools};

        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "head -c {} /dev/zero; echo 'corrupt packet' >&2; exit 1",
            4 * fake_tools::FRAME_BYTES
        );
        let (tools, video) = fake_tools::tools(dir.path(), &body);
        let mut source = FfmpegSource::open_with(&video, &tools).unwrap();
        let sampler = FrameSampler::new(10, &dir.path().join("frames"));

        // skip = 3 : frames 0 et 3 sur 4 décodées
        let report = sampler.run(&mut source).unwrap();
        assert_eq!(report.decoded, 4);
        assert_eq!(report.extracted, 2);
        assert!(frame_path(&dir.path().join("frames"), 1).exists());
    }

    #[test]
    fn run_writes_frame_files() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = FrameSampler::new(10, dir.path());
        let report = sampler.run(&mut MemorySource::new(7, 30.0)).unwrap();
        assert_eq!(report.extracted, 3);
        for i in 0..3 {
            assert!(frame_path(dir.path(), i).exists());
        }
        assert!(!frame_path(dir.path(), 3).exists());
    }

    #[test]
    fn empty_source_extracts_nothing() {
        let (report, frames) = collect(0, 30.0, 10);
        assert_eq!(report.extracted, 0);
        assert!(frames.is_empty());
    }
}
