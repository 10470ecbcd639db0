use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use gav_core::frame::FrameBuffer;
use gav_core::traits::FrameSink;

/// Encode des raw frames RGBA dans un fichier MP4 avec ffmpeg.
///
/// Les frames arrivent par le stdin de ffmpeg ; toutes doivent avoir la taille
/// annoncée à la création.
pub struct Mp4Muxer {
    ffmpeg_child: Child,
    /// Lecteur de stderr : ffmpeg ne doit jamais bloquer sur un pipe plein.
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames: usize,
}

impl Mp4Muxer {
    /// Crée un Muxer vidéo.
    /// Utilise x264 en RGB avec `-crf 0` : les rasters noir/blanc ne bavent pas.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg n'est pas installé ou impossible à démarrer.
    pub fn new(output_path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        Self::with_ffmpeg(Path::new("ffmpeg"), output_path, width, height, fps)
    }

    /// [`Mp4Muxer::new`] avec un exécutable ffmpeg explicite.
    ///
    /// # Errors
    /// Retourne une erreur si `ffmpeg` est impossible à démarrer.
    pub fn with_ffmpeg(
        ffmpeg: &Path,
        output_path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self> {
        let path_str = output_path.to_str().context("Chemin invalide")?;
        if width == 0 || height == 0 {
            anyhow::bail!("Dimensions vidéo invalides : {width}x{height}");
        }

        let mut child = Command::new(ffmpeg)
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-vcodec",
                "rawvideo",
                "-s",
                &format!("{width}x{height}"),
                "-pix_fmt",
                "rgba",
                "-r",
                &fps.to_string(),
                "-i",
                "-",
                "-c:v",
                "libx264rgb",
                "-crf",
                "0",
                "-preset",
                "fast",
                "-pix_fmt",
                "rgb24",
                "-color_range",
                "pc",
                "-hide_banner",
                "-loglevel",
                "error",
                path_str,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Échec de l'initialisation de l'encodeur vidéo ffmpeg. (PATH ?)")?;

        let stderr = child.stderr.take().and_then(|mut pipe| {
            std::thread::Builder::new()
                .name("gav-mux-stderr".into())
                .spawn(move || {
                    let mut text = String::new();
                    let _ = pipe.read_to_string(&mut text);
                    text
                })
                .ok()
        });

        log::debug!("Muxer: {} {width}x{height} @ {fps} fps", output_path.display());

        Ok(Self {
            ffmpeg_child: child,
            stderr,
            width,
            height,
            frames: 0,
        })
    }
}

impl FrameSink for Mp4Muxer {
    fn write_frame(&mut self, fb: &FrameBuffer) -> Result<()> {
        if fb.width != self.width || fb.height != self.height {
            anyhow::bail!(
                "Frame {}x{} ≠ vidéo {}x{}",
                fb.width,
                fb.height,
                self.width,
                self.height
            );
        }
        let stdin = self
            .ffmpeg_child
            .stdin
            .as_mut()
            .context("stdin ffmpeg déjà fermé")?;
        stdin
            .write_all(&fb.data)
            .context("Écriture dans le pipe ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        drop(self.ffmpeg_child.stdin.take());

        let status = self.ffmpeg_child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            anyhow::bail!("ffmpeg encoder error: {}", stderr.trim());
        }
        log::debug!("Muxer: {} frames encodées", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_video_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Mp4Muxer::new(&dir.path().join("out.mp4"), 0, 10, 20).is_err());
    }

    #[test]
    fn muxer_rejects_mismatched_frame() {
        // Dépend de la présence de ffmpeg : si absent, rien à vérifier.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        if let Ok(mut muxer) = Mp4Muxer::new(&path, 4, 4, 20) {
            assert!(muxer.write_frame(&FrameBuffer::new(2, 2)).is_err());
            assert_eq!(muxer.frames, 0);
            muxer.write_frame(&FrameBuffer::solid(4, 4, (255, 255, 255))).unwrap();
            assert_eq!(muxer.frames, 1);
            let _ = muxer.finish();
        }
    }

    #[cfg(unix)]
    #[test]
    fn verbose_encoder_failure_does_not_block() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Remplit stderr bien au-delà d'un buffer de pipe avant de lire stdin.
        let ffmpeg = dir.path().join("ffmpeg");
        std::fs::write(
            &ffmpeg,
            "#!/bin/sh\nhead -c 300000 /dev/zero | tr '\\0' x >&2\n\
             echo 'Unknown encoder libx264rgb' >&2\ncat > /dev/null\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755)).unwrap();

        let out = dir.path().join("out.mp4");
        let mut muxer = Mp4Muxer::with_ffmpeg(&ffmpeg, &out, 256, 256, 20).unwrap();
        let frame = FrameBuffer::solid(256, 256, (255, 255, 255));
        for _ in 0..4 {
            muxer.write_frame(&frame).unwrap();
        }
        let err = muxer.finish().unwrap_err();
        assert!(err.to_string().contains("Unknown encoder libx264rgb"));
    }
}
