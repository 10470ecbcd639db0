use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use gav_core::frame::RenderedFrame;
use rayon::prelude::*;

use crate::render::RenderError;

/// Frames converties, indexées par index source. Les échecs sont absents.
#[derive(Debug, Default)]
pub struct ConversionResults {
    frames: BTreeMap<usize, RenderedFrame>,
}

impl ConversionResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames triées par index croissant.
    #[must_use]
    pub fn into_sorted(self) -> Vec<RenderedFrame> {
        self.frames.into_values().collect()
    }
}

impl FromIterator<RenderedFrame> for ConversionResults {
    fn from_iter<I: IntoIterator<Item = RenderedFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().map(|f| (f.index, f)).collect(),
        }
    }
}

/// Pool de conversion borné à `threads` workers.
pub struct ConversionScheduler {
    threads: usize,
    progress_every: usize,
}

impl ConversionScheduler {
    #[must_use]
    pub fn new(threads: usize, progress_every: usize) -> Self {
        Self {
            threads: threads.max(1),
            progress_every: progress_every.max(1),
        }
    }

    /// Tente chaque index de `0..count` une seule fois, sans retry.
    ///
    /// L'ordre de complétion est libre ; le résultat est indexé par frame.
    /// Un échec est loggé et l'index est simplement absent du résultat.
    ///
    /// # Errors
    /// Retourne une erreur uniquement si le pool de threads ne peut pas être créé.
    pub fn run<F>(&self, count: usize, render: F) -> Result<ConversionResults>
    where
        F: Fn(usize) -> Result<RenderedFrame, RenderError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("gav-convert-{i}"))
            .build()
            .context("Impossible de créer le pool de conversion")?;

        log::info!("Conversion de {count} frames sur {} workers", self.threads);

        let completed = AtomicUsize::new(0);
        let results: ConversionResults = pool.install(|| {
            (0..count)
                .into_par_iter()
                .filter_map(|index| {
                    let outcome = render(index);

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % self.progress_every == 0 || done == count {
                        log::info!("Conversion : {done}/{count}");
                    }

                    match outcome {
                        Ok(frame) => Some(frame),
                        Err(e) => {
                            log::error!("{e}");
                            None
                        }
                    }
                })
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        });

        if results.len() < count {
            log::warn!(
                "{} frame(s) ignorée(s) sur {count}",
                count - results.len()
            );
        }
        Ok(results)
    }
}
