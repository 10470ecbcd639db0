use anyhow::Result;
use clap::Parser;
use gav_core::config::{PipelineConfig, load_config};

pub mod assemble;
pub mod cli;
pub mod pipeline;
pub mod player;
pub mod render;
pub mod scheduler;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Lecture d'un document
    if let Some(cli::Command::Play {
        ref document,
        ref path,
        fps,
        start,
        end,
    }) = cli.command
    {
        let document = player::resolve_document(path.as_deref(), document);
        let finished = player::play(&document, player::PlayOptions { fps, start, end })?;
        log::debug!("Lecture : {finished:?}");
        return Ok(());
    }

    // 4. Charger la config puis appliquer les overrides CLI
    let mut config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    cli.apply_overrides(&mut config);

    log::info!(
        "{} -> {} ({} fps, {} colonnes, {} workers)",
        config.input.display(),
        config.resolved_output().display(),
        config.fps,
        config.width,
        config.threads
    );

    // 5. Extraction, conversion, assemblage
    let outcome = pipeline::run(&config)?;
    log::info!(
        "Terminé : {} extraites, {} converties, {} écrites",
        outcome.extracted,
        outcome.converted,
        outcome.written
    );
    Ok(())
}
