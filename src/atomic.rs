//! Whole-file replacement through a sibling temporary file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{PipelineError, Result};

/// New contents for `destination`, written but not yet moved into place.
///
/// Dropping a `StagedFile` without calling [`StagedFile::commit`] removes the
/// temporary file and leaves `destination` untouched.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    pub fn new(destination: &Path, contents: &[u8]) -> Result<Self> {
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(contents)?;
        temp.flush()?;
        if let Ok(metadata) = fs::metadata(destination) {
            fs::set_permissions(temp.path(), metadata.permissions())?;
        }

        Ok(StagedFile {
            temp,
            destination: destination.to_path_buf(),
        })
    }

    /// Rename the temporary file over the destination.
    pub fn commit(self) -> Result<PathBuf> {
        self.temp
            .persist(&self.destination)
            .map_err(|e| PipelineError::Io(e.error))?;
        Ok(self.destination)
    }
}

/// Replace `destination` with `contents` in one rename.
pub fn write_atomic(destination: &Path, contents: &[u8]) -> Result<()> {
    StagedFile::new(destination, contents)?.commit()?;
    Ok(())
}
