//! Output directory handling and image file naming.
//!
//! Tools never write files directly; they resolve a directory here, get a
//! filename, and hand both to [`write_image`]. Keeping the filesystem work
//! in one place keeps error context (which path failed, and how) uniform
//! across tools.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::core::config::Config;

/// Errors from filesystem operations on image files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write image file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read image file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the directory a tool call should write into and make sure it
/// exists.
///
/// A non-empty `requested` value wins over the configured default. Values
/// are trimmed and lexically normalized; missing directories are created
/// with all parents.
pub async fn prepare_dir(requested: Option<&str>, config: &Config) -> Result<PathBuf, OutputError> {
    let dir = match requested.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => normalize_lexically(Path::new(trimmed)),
        _ => normalize_lexically(&config.output.default_dir),
    };

    fs::create_dir_all(&dir)
        .await
        .map_err(|source| OutputError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    debug!(dir = %dir.display(), "output directory ready");
    Ok(dir)
}

/// Fresh filename for a generated image: `sd_<uuid>.png`.
pub fn generated_image_name() -> String {
    format!("sd_{}.png", Uuid::new_v4())
}

/// Filename for an upscaled copy of `source_path`: `upscaled_<basename>`.
pub fn upscaled_image_name(source_path: &str) -> String {
    let trimmed = source_path.trim();
    let base = Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string());
    format!("upscaled_{base}")
}

/// Write image bytes, reporting the destination path on failure.
pub async fn write_image(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    fs::write(path, bytes)
        .await
        .map_err(|source| OutputError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Read image bytes, reporting the source path on failure.
pub async fn read_image(path: &Path) -> Result<Vec<u8>, OutputError> {
    fs::read(path)
        .await
        .map_err(|source| OutputError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Collapse `.` and `..` segments without touching the filesystem.
///
/// Leading `..` segments are kept (there is nothing to pop) and `..` at the
/// root stays at the root, matching how path normalization behaves in most
/// tooling.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
