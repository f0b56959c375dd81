use std::path::Path;

use crate::shared::image::ColorImage;
use crate::snapshot::domain::snapshot_writer::{SnapshotError, SnapshotWriter};

/// Writes snapshots with the `image` crate. The format follows the file
/// extension, which is PNG for generated snapshot names.
pub struct PngSnapshotWriter;

impl PngSnapshotWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngSnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotWriter for PngSnapshotWriter {
    fn write(&self, path: &Path, image: &ColorImage) -> Result<(), SnapshotError> {
        if image.is_empty() {
            return Err(SnapshotError::EmptyView {
                width: image.width(),
                height: image.height(),
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SnapshotError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        image::save_buffer(
            path,
            image.data(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Saved {}x{} snapshot to {}", image.width(), image.height(), path.display());
        Ok(())
    }
}
