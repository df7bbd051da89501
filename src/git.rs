//! Git provenance for run tags
//!
//! Reads remote URL, branch and head commit of a local checkout by shelling
//! out to the `git` binary. The configured directory must be the repository
//! root; a subdirectory of some enclosing repository does not count.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::{Error, Result};

/// Provenance of the code that produced a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitMetadata {
    remote_url: String,
    branch: String,
    commit: String,
}

impl GitMetadata {
    /// Create metadata from known values.
    #[must_use]
    pub fn new(
        remote_url: impl Into<String>,
        branch: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            remote_url: remote_url.into(),
            branch: branch.into(),
            commit: commit.into(),
        }
    }

    /// Read metadata from the repository rooted at `dir`.
    ///
    /// The remote is the last one `git remote` lists. On a detached HEAD the
    /// branch falls back to the last local branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GitMetadata`] if `dir` is not a repository root, has
    /// no remote, has no commits, or `git` cannot be run.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let fail = |message: String| Error::GitMetadata {
            path: dir.to_path_buf(),
            message,
        };

        let root = dir
            .canonicalize()
            .map_err(|e| fail(format!("cannot resolve directory: {e}")))?;
        let toplevel = PathBuf::from(git(&root, &["rev-parse", "--show-toplevel"]).map_err(&fail)?);
        let toplevel = toplevel.canonicalize().unwrap_or(toplevel);
        if toplevel != root {
            return Err(fail("not a git repository root".to_string()));
        }

        let remotes = git(&root, &["remote"]).map_err(&fail)?;
        let remote = remotes
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or_else(|| fail("repository has no remotes".to_string()))?;
        let remote_url = git(&root, &["remote", "get-url", remote]).map_err(&fail)?;

        let commit = git(&root, &["rev-parse", "HEAD"]).map_err(&fail)?;

        let mut branch = git(&root, &["rev-parse", "--abbrev-ref", "HEAD"]).map_err(&fail)?;
        if branch == "HEAD" {
            let heads = git(
                &root,
                &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
            )
            .map_err(&fail)?;
            branch = heads
                .lines()
                .last()
                .map(str::to_string)
                .ok_or_else(|| fail("detached HEAD and no local branches".to_string()))?;
        }

        debug!(dir = %root.display(), remote = %remote_url, %branch, %commit, "read git metadata");

        Ok(Self {
            remote_url,
            branch,
            commit,
        })
    }

    /// URL of the repository remote.
    #[must_use]
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// Branch name.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Full hex SHA of HEAD.
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }
}

fn git(dir: &Path, args: &[&str]) -> std::result::Result<String, String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| format!("failed to run git: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()));
    }

    String::from_utf8(output.stdout)
        .map(|s| s.trim().to_string())
        .map_err(|e| format!("git output is not UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_git_error() {
        let err = GitMetadata::read("/definitely/not/a/repo/anywhere").unwrap_err();
        assert!(matches!(err, Error::GitMetadata { .. }));
    }

    #[test]
    fn test_plain_directory_is_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitMetadata::read(dir.path()).unwrap_err();
        assert!(matches!(err, Error::GitMetadata { .. }));
    }
}
