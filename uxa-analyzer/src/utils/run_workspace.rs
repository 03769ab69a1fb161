//! Private per-run working directory
//!
//! Each run owns a directory `run_<timestamp>_<suffix>` created exclusively
//! under the configured work root. Artifacts are written there, published to
//! the stable output location at the end of the run, and the private
//! directory is removed only after every file was confirmed copied.

use crate::error::PipelineError;
use crate::models::manifest::Deliverable;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uxa_common::time::new_run_id;

/// Attempts at finding an unused run directory name
const CREATE_ATTEMPTS: usize = 5;

/// Private working directory of one run
#[derive(Debug)]
pub struct RunWorkspace {
    run_id: String,
    dir: PathBuf,
}

/// Files copied to the stable location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRun {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

impl RunWorkspace {
    /// Create a fresh run directory under `work_root`
    pub fn create(work_root: &Path, at: DateTime<Utc>) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(work_root).map_err(|e| {
            PipelineError::Workspace(format!("Cannot create {}: {}", work_root.display(), e))
        })?;

        for _ in 0..CREATE_ATTEMPTS {
            let run_id = new_run_id(at);
            let dir = work_root.join(&run_id);
            match std::fs::create_dir(&dir) {
                Ok(()) => {
                    debug!(run_id = %run_id, dir = %dir.display(), "Run directory created");
                    return Ok(Self { run_id, dir });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PipelineError::Workspace(format!(
                        "Cannot create {}: {}",
                        dir.display(),
                        e
                    )))
                }
            }
        }

        Err(PipelineError::Workspace(format!(
            "No unused run directory name under {} after {} attempts",
            work_root.display(),
            CREATE_ATTEMPTS
        )))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a deliverable inside the run directory
    pub fn path(&self, deliverable: Deliverable) -> PathBuf {
        self.dir.join(deliverable.file_name())
    }

    /// Location of an arbitrary file inside the run directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Copy every file of the run directory to `output_root/<run_id>/`
    ///
    /// Each copy is verified by size. Any failure leaves the private directory
    /// untouched and is returned to the caller.
    pub fn publish(&self, output_root: &Path) -> std::io::Result<PublishedRun> {
        let dest = output_root.join(&self.run_id);
        std::fs::create_dir_all(&dest)?;

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let target = dest.join(entry.file_name());
            let copied = std::fs::copy(entry.path(), &target)?;
            let expected = entry.metadata()?.len();
            if copied != expected {
                return Err(std::io::Error::new(
                    ErrorKind::Other,
                    format!(
                        "Short copy of {} ({} of {} bytes)",
                        entry.path().display(),
                        copied,
                        expected
                    ),
                ));
            }
            files.push(target);
        }

        files.sort();
        info!(
            run_id = %self.run_id,
            dest = %dest.display(),
            file_count = files.len(),
            "Deliverables published"
        );
        Ok(PublishedRun { dir: dest, files })
    }

    /// Remove the run directory; failures are logged, never returned
    pub fn cleanup(self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(run_id = %self.run_id, "Run directory removed"),
            Err(e) => warn!(
                run_id = %self.run_id,
                dir = %self.dir.display(),
                error = %e,
                "Failed to remove run directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_runs_get_distinct_directories() {
        let root = TempDir::new().unwrap();
        let at = Utc::now();
        let a = RunWorkspace::create(root.path(), at).unwrap();
        let b = RunWorkspace::create(root.path(), at).unwrap();

        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().is_dir());
        assert!(a.run_id().starts_with("run_"));
        assert_eq!(a.path(Deliverable::Heatmap), a.dir().join("heatmap.png"));
    }

    #[test]
    fn test_publish_then_cleanup() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let ws = RunWorkspace::create(work.path(), Utc::now()).unwrap();
        std::fs::write(ws.path(Deliverable::AssessmentJson), b"{}").unwrap();
        std::fs::write(ws.path(Deliverable::ReportSource), b"# Report").unwrap();

        let published = ws.publish(out.path()).unwrap();
        assert_eq!(published.files.len(), 2);
        assert_eq!(
            std::fs::read(published.dir.join("report.md")).unwrap(),
            b"# Report"
        );

        let dir = ws.dir().to_path_buf();
        ws.cleanup();
        assert!(!dir.exists());
    }

    #[test]
    fn test_cleanup_of_missing_directory_does_not_panic() {
        let work = TempDir::new().unwrap();
        let ws = RunWorkspace::create(work.path(), Utc::now()).unwrap();
        std::fs::remove_dir_all(ws.dir()).unwrap();
        ws.cleanup();
    }
}
