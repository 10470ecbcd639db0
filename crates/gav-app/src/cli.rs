use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gav_core::config::{OutputMode, PipelineConfig};

/// gav : convertit une vidéo en frames ASCII (vidéo MP4 ou document JSON).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Vidéo source.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Fichier de sortie (l'extension devient .json en mode document).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fichier de configuration TOML, fusionné avec les valeurs par défaut.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// FPS de sortie.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Largeur de la grille, en caractères.
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Rampe de glyphes, du plus sombre au plus clair.
    #[arg(long)]
    pub chars: Option<String>,

    /// Police TTF/OTF utilisée pour le rendu.
    #[arg(long)]
    pub font_path: Option<PathBuf>,

    /// Taille de police en points (multipliée par `font_scale`).
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Nombre de workers de conversion.
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Dossier de travail pour les frames intermédiaires.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Écrire un document JSON au lieu d'une vidéo.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rejoue un document JSON dans le terminal.
    Play {
        /// Document produit avec --json.
        #[arg(default_value = "output.json")]
        document: PathBuf,

        /// Dossier contenant le document.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Images par seconde.
        #[arg(long, default_value_t = 20)]
        fps: u32,

        /// Première frame (1-based).
        #[arg(long)]
        start: Option<usize>,

        /// Dernière frame (1-based, incluse).
        #[arg(long)]
        end: Option<usize>,
    },
}

impl Cli {
    /// Applique les overrides CLI sur une config chargée, puis re-clamp.
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(ref v) = self.input {
            config.input.clone_from(v);
        }
        if let Some(ref v) = self.output {
            config.output.clone_from(v);
        }
        if let Some(v) = self.fps {
            config.fps = v;
        }
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(ref v) = self.chars {
            config.charset.clone_from(v);
        }
        if let Some(ref v) = self.font_path {
            config.font_path.clone_from(v);
        }
        if let Some(v) = self.font_size {
            config.font_size = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        if let Some(ref v) = self.work_dir {
            config.work_dir.clone_from(v);
        }
        if self.json {
            config.output_mode = OutputMode::Document;
        }
        config.clamp_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["gav"]);
        let mut config = PipelineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.fps, 20);
        assert_eq!(config.width, 120);
        assert_eq!(config.output_mode, OutputMode::Video);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "gav", "-i", "in.mp4", "--fps", "10", "-w", "10", "--chars", "@ ", "--json",
            "-t", "4",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.input, PathBuf::from("in.mp4"));
        assert_eq!((config.fps, config.width, config.threads), (10, 10, 4));
        assert_eq!(config.charset, "@ ");
        assert_eq!(config.output_mode, OutputMode::Document);
    }

    #[test]
    fn overrides_are_clamped() {
        let cli = Cli::parse_from(["gav", "--fps", "0", "-t", "0"]);
        let mut config = PipelineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!((config.fps, config.threads), (1, 1));
    }

    #[test]
    fn play_subcommand() {
        let cli = Cli::parse_from(["gav", "play", "out.json", "--fps", "5", "--start", "2"]);
        match cli.command {
            Some(Command::Play {
                document,
                path,
                fps,
                start,
                end,
            }) => {
                assert_eq!(document, PathBuf::from("out.json"));
                assert_eq!(path, None);
                assert_eq!((fps, start, end), (5, Some(2), None));
            }
            None => panic!("sous-commande attendue"),
        }
    }

    #[test]
    fn play_defaults_to_output_json_in_dir() {
        let cli = Cli::parse_from(["gav", "play", "--path", "renders"]);
        match cli.command {
            Some(Command::Play { document, path, fps, .. }) => {
                assert_eq!(document, PathBuf::from("output.json"));
                assert_eq!(path, Some(PathBuf::from("renders")));
                assert_eq!(fps, 20);
            }
            None => panic!("sous-commande attendue"),
        }
    }
}
