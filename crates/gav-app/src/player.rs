use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use gav_export::document::FramesDocument;

/// Paramètres de lecture.
#[derive(Clone, Copy, Debug)]
pub struct PlayOptions {
    pub fps: u32,
    /// Première frame, 1-based.
    pub start: Option<usize>,
    /// Dernière frame incluse, 1-based.
    pub end: Option<usize>,
}

/// Fin de lecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEnd {
    Complete,
    Stopped,
}

/// Chemin du document : `document` relatif à `dir` si fourni.
#[must_use]
pub fn resolve_document(dir: Option<&Path>, document: &Path) -> PathBuf {
    match dir {
        Some(dir) => dir.join(document),
        None => document.to_path_buf(),
    }
}

/// Plage 0-based jouée pour `total` frames.
///
/// `start` est ramené à 1 minimum ; un `end` absent, nul ou au-delà du total
/// vaut la dernière frame. `None` si rien n'est à jouer.
#[must_use]
pub fn frame_range(
    total: usize,
    start: Option<usize>,
    end: Option<usize>,
) -> Option<RangeInclusive<usize>> {
    let start = start.unwrap_or(1).max(1);
    let end = match end {
        Some(e) if (1..=total).contains(&e) => e,
        _ => total,
    };
    if total == 0 || start > end {
        return None;
    }
    Some(start - 1..=end - 1)
}

/// Joue les frames sur `out`, en effaçant l'écran entre chaque frame.
///
/// S'arrête dès que `stop` passe à `true`.
///
/// # Errors
/// Retourne une erreur d'écriture sur `out`.
pub fn play_frames<W: Write>(
    out: &mut W,
    document: &FramesDocument,
    options: PlayOptions,
    stop: &AtomicBool,
) -> Result<PlaybackEnd> {
    let total = document.len();
    let delay = Duration::from_secs_f64(1.0 / f64::from(options.fps.max(1)));

    if let Some(range) = frame_range(total, options.start, options.end) {
        for (i, (_, text)) in document
            .iter()
            .enumerate()
            .skip(*range.start())
            .take(range.end() - range.start() + 1)
        {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            crossterm::queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
            writeln!(out, "{text}")?;
            write!(out, "[Frame {}/{total}]", i + 1)?;
            out.flush()?;
            std::thread::sleep(delay);
        }
    }

    if stop.load(Ordering::SeqCst) {
        writeln!(out, "\nPlayback stopped.")?;
        Ok(PlaybackEnd::Stopped)
    } else {
        writeln!(out, "\n\nPlayback complete!")?;
        Ok(PlaybackEnd::Complete)
    }
}

/// Charge un document et le joue dans le terminal. Ctrl+C arrête proprement.
///
/// # Errors
/// Fichier absent, JSON invalide, clé `frames` manquante, ou handler Ctrl+C
/// impossible à installer.
pub fn play(path: &Path, options: PlayOptions) -> Result<PlaybackEnd> {
    let document = FramesDocument::load(path)?;
    log::info!(
        "{} frames chargées depuis {} ({} fps)",
        document.len(),
        path.display(),
        options.fps
    );

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Impossible d'installer le handler Ctrl+C")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    play_frames(&mut out, &document, options, &stop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: usize) -> FramesDocument {
        let mut text = String::from(r#"{"frames":{"#);
        for i in 0..n {
            if i > 0 {
                text.push(',');
            }
            text.push_str(&format!(r#""{i:04}":"F{i}""#));
        }
        text.push_str("}}");
        FramesDocument::from_json(&text).unwrap()
    }

    fn fast(start: Option<usize>, end: Option<usize>) -> PlayOptions {
        PlayOptions {
            fps: 1000,
            start,
            end,
        }
    }

    #[test]
    fn document_is_resolved_against_dir() {
        assert_eq!(
            resolve_document(Some(Path::new("renders")), Path::new("output.json")),
            PathBuf::from("renders/output.json")
        );
        assert_eq!(
            resolve_document(None, Path::new("out.json")),
            PathBuf::from("out.json")
        );
    }

    #[test]
    fn range_is_clamped() {
        assert_eq!(frame_range(5, None, None), Some(0..=4));
        assert_eq!(frame_range(5, Some(0), Some(0)), Some(0..=4));
        assert_eq!(frame_range(5, Some(4), Some(2)), None);
        assert_eq!(frame_range(5, Some(6), None), None);
    }

    #[test]
    fn plays_selected_frames() {
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);
        let end = play_frames(&mut out, &doc(5), fast(Some(2), Some(3)), &stop).unwrap();
        assert_eq!(end, PlaybackEnd::Complete);

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("F1\n[Frame 2/5]"));
        assert!(text.contains("F2\n[Frame 3/5]"));
        assert!(!text.contains("F0"));
        assert!(!text.contains("F3"));
        assert!(text.ends_with("Playback complete!\n"));
    }

    #[test]
    fn stop_flag_interrupts() {
        let mut out = Vec::new();
        let stop = AtomicBool::new(true);
        let end = play_frames(&mut out, &doc(3), fast(None, None), &stop).unwrap();
        assert_eq!(end, PlaybackEnd::Stopped);
        let text = String::from_utf8_lossy(&out);
        assert!(!text.contains("[Frame"));
        assert!(text.contains("Playback stopped."));
    }

    #[test]
    fn missing_document_is_an_error() {
        let opts = fast(None, None);
        assert!(play(Path::new("/nonexistent/out.json"), opts).is_err());
    }
}
