use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Where a resolved model file came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelOrigin {
    Explicit,
    Cache,
    Bundled,
    Downloaded,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Describes how to find the detection model.
pub struct ModelRequest<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// A user-supplied path wins over every other location and is never
    /// replaced by a download.
    pub explicit: Option<&'a Path>,
    pub bundled_dir: Option<&'a Path>,
}

/// Resolves the model file, downloading it into the user cache as a last resort.
///
/// Order: explicit path, user cache directory, bundled directory, download.
pub fn resolve(
    request: &ModelRequest<'_>,
    progress: Option<ProgressFn>,
) -> Result<(PathBuf, ModelOrigin), ModelResolveError> {
    if let Some(path) = request.explicit {
        return if path.exists() {
            Ok((path.to_path_buf(), ModelOrigin::Explicit))
        } else {
            Err(ModelResolveError::NotFound(path.to_path_buf()))
        };
    }
    resolve_in(&model_cache_dir()?, request, progress)
}

fn resolve_in(
    cache_dir: &Path,
    request: &ModelRequest<'_>,
    progress: Option<ProgressFn>,
) -> Result<(PathBuf, ModelOrigin), ModelResolveError> {
    let cached_path = cache_dir.join(request.name);
    if cached_path.exists() {
        return Ok((cached_path, ModelOrigin::Cache));
    }

    if let Some(dir) = request.bundled_dir {
        let bundled_path = dir.join(request.name);
        if bundled_path.exists() {
            return Ok((bundled_path, ModelOrigin::Bundled));
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", request.name, request.url);
    download(request.url, &cached_path, progress)?;
    Ok((cached_path, ModelOrigin::Downloaded))
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Facecam/models/`
/// - Linux: `$XDG_CACHE_HOME/Facecam/models/` or `~/.cache/Facecam/models/`
/// - Windows: `%LOCALAPPDATA%/Facecam/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("Facecam").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Downloads to `<dest>.part` and renames on success, so an interrupted
/// download never leaves a truncated model at `dest`.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_to(url, &temp_path, progress).and_then(|()| {
        fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_to(
    url: &str,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_error = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(write_error)?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_error)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_error)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_error)
}
