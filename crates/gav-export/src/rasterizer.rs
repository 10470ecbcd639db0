use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontRef, PxScale, point};
use anyhow::{Context, Result};
use gav_core::frame::{AsciiGrid, FontMetrics};
use image::GrayImage;

/// Convertit une AsciiGrid en raster niveaux de gris : glyphes noirs sur fond blanc.
///
/// Les glyphes sont rasterisés une fois à la construction (atlas logiciel),
/// puis seulement recopiés par cellule. Partagé en lecture seule entre les
/// workers.
pub struct Rasterizer {
    metrics: FontMetrics,
    /// Maps a char to its 1D alpha buffer (size = glyph_width * glyph_height)
    glyph_cache: HashMap<char, Vec<u8>>,
    /// Fallback for chars absent from the font (all zeros = blank cell).
    empty_glyph: Vec<u8>,
}

impl Rasterizer {
    /// Charge une police depuis le disque.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid font.
    pub fn from_file(path: &Path, scale_px: f32, charset: &str) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Impossible de lire la police {}", path.display()))?;
        Self::new(&data, scale_px, charset)
            .with_context(|| format!("Police invalide : {}", path.display()))
    }

    /// Initialise le rasterizer en pré-calculant l'ASCII imprimable et les
    /// glyphes de `charset`.
    ///
    /// Cellule : avance horizontale de 'M' × hauteur de ligne
    /// (ascent - descent + line gap), arrondies au pixel supérieur.
    ///
    /// # Errors
    /// Retourne une erreur si la police fournie est invalide.
    pub fn new(font_data: &[u8], scale_px: f32, charset: &str) -> Result<Self> {
        let font = FontRef::try_from_slice(font_data)?;
        let scale = PxScale::from(scale_px);

        let v_advance = font.ascent_unscaled() - font.descent_unscaled() + font.line_gap_unscaled();
        let height = (v_advance * scale.y / font.height_unscaled()).ceil() as u32;

        let m_glyph = font.glyph_id('M');
        let h_advance = font.h_advance_unscaled(m_glyph);
        let width = (h_advance * scale.x / font.height_unscaled()).ceil() as u32;

        let metrics = FontMetrics::new(width.max(1), height.max(1))?;
        let cell_len = (metrics.glyph_width() * metrics.glyph_height()) as usize;

        let mut rasterizer = Self {
            metrics,
            glyph_cache: HashMap::new(),
            empty_glyph: vec![0u8; cell_len],
        };

        rasterizer.cache_chars(&font, scale, (32..=126u32).filter_map(char::from_u32));
        rasterizer.cache_chars(&font, scale, charset.chars());

        log::debug!(
            "Rasterizer: cellule {}x{} px, {} glyphes en cache",
            metrics.glyph_width(),
            metrics.glyph_height(),
            rasterizer.glyph_cache.len()
        );

        Ok(rasterizer)
    }

    /// Construit un rasterizer depuis un atlas déjà rasterisé.
    ///
    /// # Errors
    /// Returns an error if a glyph buffer does not have
    /// `glyph_width * glyph_height` entries.
    pub fn from_atlas(metrics: FontMetrics, glyphs: HashMap<char, Vec<u8>>) -> Result<Self> {
        let cell_len = (metrics.glyph_width() * metrics.glyph_height()) as usize;
        if let Some((ch, buf)) = glyphs.iter().find(|(_, buf)| buf.len() != cell_len) {
            anyhow::bail!(
                "Glyphe {ch:?} : {} octets, attendu {cell_len}",
                buf.len()
            );
        }
        Ok(Self {
            metrics,
            glyph_cache: glyphs,
            empty_glyph: vec![0u8; cell_len],
        })
    }

    fn cache_chars(&mut self, font: &FontRef, scale: PxScale, chars: impl Iterator<Item = char>) {
        let cw = self.metrics.glyph_width();
        let ch_h = self.metrics.glyph_height();
        let ascent_px = font.ascent_unscaled() * scale.y / font.height_unscaled();

        for ch in chars {
            if self.glyph_cache.contains_key(&ch) {
                continue;
            }
            // glyph_id 0 = .notdef : on évite les boîtes "?" dans la sortie
            let gid = font.glyph_id(ch);
            if gid.0 == 0 {
                log::warn!("Glyphe {ch:?} absent de la police, cellule vide.");
                continue;
            }

            let mut buffer = vec![0u8; (cw * ch_h) as usize];
            let glyph = gid.with_scale_and_position(scale, point(0.0, ascent_px));

            if let Some(outline) = font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                #[allow(clippy::cast_possible_wrap)]
                outline.draw(|x, y, v| {
                    let px = (x as i32 + bounds.min.x as i32).max(0) as u32;
                    let py = (y as i32 + bounds.min.y as i32).max(0) as u32;
                    if px < cw && py < ch_h {
                        let idx = (py * cw + px) as usize;
                        buffer[idx] = buffer[idx].max((v * 255.0).round() as u8);
                    }
                });
            }
            self.glyph_cache.insert(ch, buffer);
        }
    }

    /// Dimensions d'une cellule.
    #[must_use]
    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Rendu de la grille : fond blanc (255), encre noire (0), anti-aliasée.
    ///
    /// La ligne `i` commence à `i * glyph_height` pixels.
    ///
    /// # Errors
    /// Retourne une erreur si une ligne dépasse la largeur de la grille.
    pub fn render(&self, grid: &AsciiGrid) -> Result<GrayImage> {
        let cw = self.metrics.glyph_width() as usize;
        let ch_h = self.metrics.glyph_height() as usize;
        let (w, h) = self
            .metrics
            .canvas_size(grid.width() as u32, grid.height() as u32);
        let stride = w as usize;
        let mut data = vec![255u8; stride * h as usize];

        for (gy, row) in grid.rows().iter().enumerate() {
            for (gx, ch) in row.chars().take(grid.width()).enumerate() {
                let alpha = self.glyph_cache.get(&ch).unwrap_or(&self.empty_glyph);
                let x0 = gx * cw;
                let y0 = gy * ch_h;
                for cy in 0..ch_h {
                    let dst = (y0 + cy) * stride + x0;
                    let src = cy * cw;
                    for (out, a) in data[dst..dst + cw].iter_mut().zip(&alpha[src..src + cw]) {
                        *out = 255 - *a;
                    }
                }
            }
        }

        GrayImage::from_raw(w, h, data)
            .with_context(|| format!("Canvas {w}x{h} incohérent avec la grille"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Atlas 2×3 : '@' plein, '.' un seul pixel, ' ' absent.
    fn test_rasterizer() -> Rasterizer {
        let metrics = FontMetrics::new(2, 3).unwrap();
        let mut glyphs = HashMap::new();
        glyphs.insert('@', vec![255; 6]);
        glyphs.insert('.', vec![0, 0, 0, 0, 255, 0]);
        Rasterizer::from_atlas(metrics, glyphs).unwrap()
    }

    #[test]
    fn canvas_is_grid_times_metrics() {
        let r = test_rasterizer();
        let grid = AsciiGrid::from_rows(3, vec!["@. ".into(), "   ".into()]).unwrap();
        let img = r.render(&grid).unwrap();
        assert_eq!(img.dimensions(), (6, 6));
        assert_eq!(r.metrics().canvas_size(3, 2), (6, 6));
    }

    #[test]
    fn glyphs_are_black_on_white() {
        let r = test_rasterizer();
        let grid = AsciiGrid::from_rows(3, vec!["@. ".into()]).unwrap();
        let img = r.render(&grid).unwrap();
        // '@' couvre la cellule (0..2, 0..3)
        for y in 0..3 {
            for x in 0..2 {
                assert_eq!(img.get_pixel(x, y)[0], 0);
            }
        }
        // '.' : seul le pixel (0, 2) de sa cellule est encré
        assert_eq!(img.get_pixel(2, 2)[0], 0);
        assert_eq!(img.get_pixel(3, 2)[0], 255);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
        // ' ' absent de l'atlas : cellule blanche
        assert!((4..6).all(|x| (0..3).all(|y| img.get_pixel(x, y)[0] == 255)));
    }

    #[test]
    fn rows_are_offset_by_glyph_height() {
        let r = test_rasterizer();
        let grid = AsciiGrid::from_rows(1, vec![" ".into(), "@".into()]).unwrap();
        let img = r.render(&grid).unwrap();
        assert_eq!(img.get_pixel(0, 2)[0], 255);
        assert_eq!(img.get_pixel(0, 3)[0], 0);
    }

    #[test]
    fn atlas_with_wrong_cell_size_is_rejected() {
        let metrics = FontMetrics::new(2, 2).unwrap();
        let mut glyphs = HashMap::new();
        glyphs.insert('@', vec![255; 3]);
        assert!(Rasterizer::from_atlas(metrics, glyphs).is_err());
    }

    #[test]
    fn invalid_font_data_is_an_error() {
        assert!(Rasterizer::new(b"not a font", 24.0, "@ ").is_err());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(Rasterizer::from_file(Path::new("/nonexistent/cour.ttf"), 24.0, "@ ").is_err());
    }

    /// Première police système trouvée, si l'environnement en a une.
    fn system_font() -> Option<std::path::PathBuf> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
            "/Library/Fonts/Courier New.ttf",
            "C:\\Windows\\Fonts\\cour.ttf",
        ]
        .iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.exists())
    }

    #[test]
    fn real_font_metrics_and_glyphs() {
        // Dépend d'une police système : si absente, rien à vérifier.
        let Some(path) = system_font() else {
            return;
        };
        let r = Rasterizer::from_file(&path, 24.0, "@ ").unwrap();
        let m = r.metrics();
        assert!(m.glyph_width() > 0 && m.glyph_height() > 0);
        // Cellule plus haute que large pour une police de texte
        assert!(m.glyph_height() > m.glyph_width());

        let at = &r.glyph_cache[&'@'];
        assert!(at.iter().any(|&a| a > 0), "'@' sans encre");
        let space = r.glyph_cache.get(&' ').unwrap_or(&r.empty_glyph);
        assert!(space.iter().all(|&a| a == 0));

        let grid = AsciiGrid::from_rows(2, vec!["@ ".into(), " @".into()]).unwrap();
        let img = r.render(&grid).unwrap();
        assert_eq!(img.dimensions(), m.canvas_size(2, 2));
        let gw = m.glyph_width();
        let gh = m.glyph_height();
        // '@' encré en haut à gauche, cellule voisine blanche
        assert!((0..gh).any(|y| (0..gw).any(|x| img.get_pixel(x, y)[0] < 128)));
        assert!((0..gh).all(|y| (gw..2 * gw).all(|x| img.get_pixel(x, y)[0] == 255)));
    }
}
