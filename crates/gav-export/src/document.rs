//! Document JSON des frames ASCII.
//!
//! Format : `{"frames": {"0000": "<ligne>\n<ligne>...", "0001": ...}}`.
//! Les clés sont l'index dense sur 4 chiffres minimum, écrites dans l'ordre
//! de lecture.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use gav_core::frame::AsciiGrid;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Clé racine du document.
pub const FRAMES_KEY: &str = "frames";

/// Clé d'une frame : index zero-paddé sur 4 chiffres.
///
/// # Example
/// ```
/// assert_eq!(gav_export::document::frame_key(7), "0007");
/// assert_eq!(gav_export::document::frame_key(12345), "12345");
/// ```
#[must_use]
pub fn frame_key(index: usize) -> String {
    format!("{index:04}")
}

/// Frames ordonnées (clé, texte).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FramesDocument {
    entries: Vec<(String, String)>,
}

impl FramesDocument {
    /// Document vide.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une grille sous la prochaine clé dense.
    pub fn push(&mut self, grid: &AsciiGrid) {
        let key = frame_key(self.entries.len());
        self.entries.push((key, grid.to_text()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Itère sur les paires (clé, texte) dans l'ordre de lecture.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse un document JSON.
    ///
    /// Les clés sont triées numériquement quand elles le sont (`"10000"` après
    /// `"9999"`), lexicographiquement sinon.
    ///
    /// # Errors
    /// Retourne une erreur si le JSON est invalide ou si la clé `frames` manque.
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawDocument {
            frames: BTreeMap<String, String>,
        }

        let raw: RawDocument =
            serde_json::from_str(text).context("Document JSON invalide")?;
        let mut entries: Vec<(String, String)> = raw.frames.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        });
        Ok(Self { entries })
    }

    /// Lit un document depuis le disque.
    ///
    /// # Errors
    /// Retourne une erreur si le fichier est illisible ou mal formé.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Document {}", path.display()))
    }

    /// Écrit le document (JSON indenté, UTF-8).
    ///
    /// # Errors
    /// Retourne une erreur d'I/O ou de sérialisation.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Impossible de créer {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }
}

impl Serialize for FramesDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Frames<'a>(&'a [(String, String)]);

        impl Serialize for Frames<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (key, text) in self.0 {
                    map.serialize_entry(key, text)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(FRAMES_KEY, &Frames(&self.entries))?;
        map.end()
    }
}
