use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} is unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("writing {path:?} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive target unavailable: {0}")]
    Unavailable(String),
}

/// Directory that receives saved summaries, created on first use.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn prepare(&self) -> Result<(), PersistError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(self.unusable("not a directory")),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.path).map_err(|err| self.unusable(err))
            }
            Err(err) => Err(self.unusable(err)),
        }
    }

    /// Write `content` as `name` inside the directory. Readers see either the
    /// previous file or the complete new one; a same-named file is replaced.
    pub fn write_atomic(&self, name: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.prepare()?;
        let target = self.path.join(name);
        let failed = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut staged = NamedTempFile::new_in(&self.path).map_err(failed)?;
        staged.write_all(content.as_bytes()).map_err(failed)?;
        staged.as_file().sync_all().map_err(failed)?;
        staged.persist(&target).map_err(|err| failed(err.error))?;
        Ok(target)
    }

    fn unusable(&self, reason: impl ToString) -> PersistError {
        PersistError::OutputDir {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
