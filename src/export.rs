//! Source-agnostic export: fetch a song collection, then write it to CSV.

use std::{future::Future, path::PathBuf};

use log::{error, info, warn};

use crate::clients::{
    entities::SongCollection,
    errors::{Error, Result},
    local_storage::{CsvTarget, write_songs},
};

/// Anything that can produce the liked songs list
pub trait SongSource {
    /// Human readable name used in logs
    fn name(&self) -> &str;
    /// Produce the songs in source order
    fn fetch(&self) -> impl Future<Output = Result<SongCollection>>;
}

/// Where and how a collection is written
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// Files to write; the first one decides overall success
    pub targets: Vec<CsvTarget>,
    /// Write header-only files when nothing was extracted
    pub allow_empty: bool,
}

/// Outcome of one export run
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Songs extracted from the source
    pub songs: usize,
    /// Whether the source was read to its end
    pub complete: bool,
    /// Files written successfully
    pub written: Vec<PathBuf>,
    /// Files that could not be written
    pub failed: Vec<PathBuf>,
    primary_written: bool,
}

impl ExportReport {
    /// True when the primary (first) target was written
    pub fn succeeded(&self) -> bool {
        self.primary_written
    }
}

/// Fetch from `source` and write every target of `plan`.
///
/// Each write is attempted independently; a failed write is logged and
/// recorded in the report rather than returned.
pub async fn export<S: SongSource>(source: &S, plan: &ExportPlan) -> Result<ExportReport> {
    info!("Extracting liked songs from {} ...", source.name());
    let collection = source.fetch().await?;

    if collection.is_empty() && !plan.allow_empty {
        return Err(Error::NoSongsExtracted);
    }
    if !collection.complete {
        warn!(
            "Extraction stopped early, saving the {} songs collected",
            collection.len()
        );
    }
    info!("Extracted {} liked songs", collection.len());
    preview(&collection);

    let mut report = ExportReport {
        songs: collection.len(),
        complete: collection.complete,
        ..Default::default()
    };

    for (index, target) in plan.targets.iter().enumerate() {
        info!("Saving {} songs to {:?} ...", collection.len(), target.path);
        match write_songs(target, &collection.songs) {
            Ok(_) => {
                if index == 0 {
                    report.primary_written = true;
                }
                report.written.push(target.path.clone());
            }
            Err(e) => {
                error!("Error saving {:?}: {e}", target.path);
                report.failed.push(target.path.clone());
            }
        }
    }

    Ok(report)
}

fn preview(collection: &SongCollection) {
    for (i, song) in collection.songs.iter().take(5).enumerate() {
        info!(
            "  {}. \"{}\" by {} ({})",
            i + 1,
            song.title,
            song.artist,
            song.album
        );
    }
    if collection.len() > 5 {
        info!("... and {} more songs", collection.len() - 5);
    }
}
