use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::shared::constants::{SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX};
use crate::shared::image::ColorImage;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("nothing to save: view is {width}x{height}")]
    EmptyView { width: u32, height: u32 },
    #[error("failed to create snapshot directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Persists a still image of the current view.
pub trait SnapshotWriter: Send + Sync {
    fn write(&self, path: &Path, image: &ColorImage) -> Result<(), SnapshotError>;
}

/// `screenshot_YYYYMMDD_HHMMSS.png` for the given local time.
///
/// Second resolution: two snapshots within the same second share a name and
/// the later one overwrites the earlier.
pub fn snapshot_file_name(taken_at: NaiveDateTime) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}.{SNAPSHOT_EXTENSION}",
        taken_at.format("%Y%m%d_%H%M%S")
    )
}
