//! Scratch directory for intermediate run files.

use std::io;
use std::path::{Path, PathBuf};

use tempfile;

/// Uniquely named per-invocation directory holding intermediate sorted runs.
///
/// The directory and everything in it are removed when the value is dropped,
/// regardless of how the sort ended. Removal is best-effort: errors during
/// teardown are swallowed so they can never mask a primary failure.
pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    /// Creates a fresh scratch directory under `root`, or under the platform
    /// temporary directory if `root` is [`None`].
    pub fn new(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("blobsort-");

        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }?;

        log::info!("using {} as a scratch directory", dir.path().display());

        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for the run covering the byte range `[offset, offset + size)`.
    ///
    /// Task ranges are disjoint within one invocation, so encoding the range
    /// into the name guarantees distinct tasks never collide.
    pub fn run_path(&self, offset: u64, size: u64) -> PathBuf {
        self.dir.path().join(format!("{:016x}-{:016x}", offset, size))
    }
}
