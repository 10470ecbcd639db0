// Décodage via ffmpeg/ffprobe en subprocess (std::process::Command).
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH (ou chemins
// explicites via `FfmpegTools`).
//
//   - `probe_video`  : interroge ffprobe pour obtenir width/height/fps
//   - `FfmpegSource` : lance ffmpeg → flux raw RGBA sur stdout, une frame par décodage

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use gav_core::frame::FrameBuffer;
use gav_core::traits::Source;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
}

/// Parse la sortie `key=value` de ffprobe.
///
/// Retourne `None` si une dimension ou le débit d'images manque.
fn parse_probe_output(text: &str) -> Option<VideoInfo> {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut fps: Option<f64> = None;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: Option<f64> = parts.next().and_then(|s| s.parse().ok());
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            fps = num.filter(|_| den > 0.0).map(|n| n / den);
        }
    }

    match (width, height, fps) {
        (Some(w), Some(h), Some(f)) if w > 0 && h > 0 && f > 0.0 => Some(VideoInfo {
            width: w,
            height: h,
            fps: f,
        }),
        _ => None,
    }
}

/// Exécutables utilisés pour sonder et décoder.
#[derive(Clone, Debug)]
pub struct FfmpegTools {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable, échoue, ou si le fichier
/// ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    probe_video_with(path, &FfmpegTools::default())
}

/// [`probe_video`] avec des exécutables explicites.
///
/// # Errors
/// Voir [`probe_video`].
pub fn probe_video_with(path: &Path, tools: &FfmpegTools) -> Result<VideoInfo> {
    if !path.exists() {
        anyhow::bail!("Vidéo introuvable : {}", path.display());
    }

    let output = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe a échoué sur {}: {}", path.display(), stderr.trim());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&text).with_context(|| {
        format!("ffprobe n'a trouvé aucun flux vidéo dans {}", path.display())
    })?;

    log::info!(
        "probe_video: {}x{} @ {:.3}fps ({})",
        info.width,
        info.height,
        info.fps,
        path.display()
    );

    Ok(info)
}

/// Lit jusqu'à `buf.len()` bytes depuis `reader`.
///
/// Retourne le nombre de bytes lus : `buf.len()` pour une lecture complète,
/// moins sur EOF (0 = EOF propre, entre les deux = frame tronquée).
///
/// # Errors
/// Retourne `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

/// Vide stderr dans un thread pour que ffmpeg ne bloque jamais sur un pipe plein.
fn drain_stderr(stderr: Option<ChildStderr>) -> Option<JoinHandle<String>> {
    let mut stderr = stderr?;
    std::thread::Builder::new()
        .name("gav-ffmpeg-stderr".into())
        .spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
        .ok()
}

/// Source vidéo décodée par un processus `ffmpeg`.
///
/// Chaque frame = `w × h × 4` bytes (RGBA row-major, sans padding), à la
/// résolution native, sans rééchantillonnage temporel : l'échantillonnage
/// est fait par [`crate::sampler::FrameSampler`].
pub struct FfmpegSource {
    info: VideoInfo,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    exhausted: bool,
}

impl FfmpegSource {
    /// Sonde puis ouvre la vidéo.
    ///
    /// # Errors
    /// Returns an error if ffprobe fails or ffmpeg cannot be spawned.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &FfmpegTools::default())
    }

    /// [`FfmpegSource::open`] avec des exécutables explicites.
    ///
    /// # Errors
    /// Returns an error if ffprobe fails or ffmpeg cannot be spawned.
    pub fn open_with(path: &Path, tools: &FfmpegTools) -> Result<Self> {
        let info = probe_video_with(path, tools)?;

        let mut child = Command::new(&tools.ffmpeg)
            .arg("-i")
            .arg(path)
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-fps_mode",
                "passthrough",
                "-an",
                "-hide_banner",
                "-loglevel",
                "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Impossible de lancer ffmpeg. Est-il dans PATH ?")?;
        let stderr = drain_stderr(child.stderr.take());

        log::debug!(
            "ffmpeg spawné: {}x{} depuis {}",
            info.width,
            info.height,
            path.display()
        );

        Ok(Self {
            info,
            child,
            stderr,
            exhausted: false,
        })
    }

    /// Attend la fin du décodeur ; un code de sortie non nul est une erreur.
    fn check_exit(&mut self) -> Result<()> {
        let status = self.child.wait().context("Attente du décodeur ffmpeg")?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            anyhow::bail!("ffmpeg decoder error ({status}): {}", stderr.trim());
        }
        if !stderr.trim().is_empty() {
            log::warn!("ffmpeg: {}", stderr.trim());
        }
        Ok(())
    }
}

impl Source for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut fb = FrameBuffer::new(self.info.width, self.info.height);
        let Some(stdout) = self.child.stdout.as_mut() else {
            self.exhausted = true;
            return Ok(None);
        };
        let read = read_exact_or_eof(stdout, &mut fb.data)?;
        if read == fb.data.len() {
            return Ok(Some(fb));
        }

        self.exhausted = true;
        if read > 0 {
            log::warn!(
                "Frame finale tronquée ({read}/{} octets), ignorée",
                fb.data.len()
            );
        }
        self.check_exit()?;
        Ok(None)
    }

    fn frame_rate(&self) -> f64 {
        self.info.fps
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_probe_output_reads_fraction_rate() {
        let info = parse_probe_output("width=640\nheight=480\nr_frame_rate=30000/1001\n").unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn parse_probe_output_requires_all_fields() {
        assert!(parse_probe_output("width=640\nheight=480\n").is_none());
        assert!(parse_probe_output("").is_none());
        assert!(parse_probe_output("width=0\nheight=480\nr_frame_rate=30/1").is_none());
        assert!(parse_probe_output("width=640\nheight=480\nr_frame_rate=30/0").is_none());
    }

    #[test]
    fn read_exact_or_eof_reports_short_read() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        let mut buf = [0u8; 4];
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(read_exact_or_eof(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn missing_video_file_is_fatal() {
        assert!(probe_video(Path::new("/nonexistent/video.mp4")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn failing_decoder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tools, video) = fake_tools::tools(
            dir.path(),
            "echo 'Invalid data found when processing input' >&2; exit 1",
        );
        let mut source = FfmpegSource::open_with(&video, &tools).unwrap();
        assert!((source.frame_rate() - 30.0).abs() < f64::EPSILON);

        let err = source.next_frame().unwrap_err();
        assert!(format!("{err:#}").contains("Invalid data found"));
        // Une fois épuisée, la source reste vide
        assert!(source.next_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn decoder_frames_then_clean_exit() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("head -c {} /dev/zero", 2 * fake_tools::FRAME_BYTES + 100);
        let (tools, video) = fake_tools::tools(dir.path(), &body);
        let mut source = FfmpegSource::open_with(&video, &tools).unwrap();

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        // 100 octets restants : frame tronquée ignorée, sortie propre
        assert!(source.next_frame().unwrap().is_none());
    }
}
