//! Artifact upload helpers
//!
//! Resolves a run's artifact root URI to a destination kind and walks local
//! directories into the list of files to upload.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{Error, Result};

/// Where a run's artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRoot {
    /// Directory on the local filesystem (`file:` URI or bare path).
    Local(PathBuf),
    /// Served by the tracking server (`mlflow-artifacts:` URI); holds the
    /// path relative to the server's artifact store, without leading `/`.
    Proxied(String),
    /// Any other scheme (`s3:`, `gs:`, ...), stored verbatim.
    Unsupported(String),
}

impl ArtifactRoot {
    /// Classify an artifact root URI.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        if Path::new(uri).is_absolute() {
            return Self::Local(PathBuf::from(uri));
        }

        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::Unsupported(uri.to_string()), Self::Local),
            Ok(url) if url.scheme() == "mlflow-artifacts" => {
                Self::Proxied(url.path().trim_matches('/').to_string())
            }
            Ok(_) => Self::Unsupported(uri.to_string()),
            // Relative path without a scheme
            Err(_) => Self::Local(PathBuf::from(uri)),
        }
    }
}

/// A file found under a directory being uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    path: PathBuf,
    relative_dir: String,
}

impl ArtifactFile {
    /// Absolute or caller-relative path of the file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of the file relative to the walked root, `/`-separated;
    /// empty for files at the root.
    #[must_use]
    pub fn relative_dir(&self) -> &str {
        &self.relative_dir
    }
}

/// Fail with [`Error::NotFound`] unless `path` exists.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the path is missing.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Fail with [`Error::NotFound`] unless `path` is a directory.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the directory is missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// List every regular file under `dir`, depth first, in name order.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if `dir` is not a directory, or an IO error
/// from reading it.
pub fn walk_files(dir: &Path) -> Result<Vec<ArtifactFile>> {
    ensure_dir(dir)?;
    let mut files = Vec::new();
    walk_into(dir, "", &mut files)?;
    Ok(files)
}

fn walk_into(dir: &Path, relative_dir: &str, files: &mut Vec<ArtifactFile>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = join_segments(relative_dir, &name);
            walk_into(&path, &child, files)?;
        } else if path.is_file() {
            files.push(ArtifactFile {
                path,
                relative_dir: relative_dir.to_string(),
            });
        }
    }
    Ok(())
}

/// Join an optional destination subpath with a relative directory.
///
/// Returns `None` when both are empty, meaning the artifact root itself.
#[must_use]
pub fn join_artifact_path(base: Option<&str>, relative_dir: &str) -> Option<String> {
    let base = base.map(|b| b.trim_matches('/')).unwrap_or_default();
    let joined = join_segments(base, relative_dir.trim_matches('/'));
    (!joined.is_empty()).then_some(joined)
}

fn join_segments(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{a}/{b}"),
    }
}

/// Name of the file as it will appear in the artifact store.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for paths without a file name (`..`, `/`).
pub fn file_name(local_path: &Path) -> Result<String> {
    local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "artifact path has no file name: {}",
                local_path.display()
            ))
        })
}

/// Copy one file into a local artifact root.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Propagates IO errors from creating directories or copying.
pub fn copy_to_local(
    root: &Path,
    local_path: &Path,
    artifact_path: Option<&str>,
) -> Result<u64> {
    let mut dest_dir = root.to_path_buf();
    if let Some(sub) = artifact_path {
        dest_dir.extend(sub.split('/').filter(|s| !s.is_empty()));
    }
    fs::create_dir_all(&dest_dir)?;
    let dest = dest_dir.join(file_name(local_path)?);
    Ok(fs::copy(local_path, dest)?)
}
