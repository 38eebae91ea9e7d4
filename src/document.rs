// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The Markdown document holding marker regions.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, io_error};

/// Document loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Document
{
    path:    PathBuf,
    content: String,
}

impl Document
{
    /// Reads the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read.
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        info!("Reading document from {}", path.display());
        let content = fs::read_to_string(path,).map_err(|e| io_error(path, e,),)?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
        },)
    }

    /// Location on disk.
    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    /// Current content.
    pub fn content(&self,) -> &str
    {
        &self.content
    }

    /// Replaces the file with `updated` unless it equals the loaded content.
    ///
    /// The new content is written to a temporary file next to the document and
    /// renamed over it, so readers observe either the old or the new file.
    /// Returns `true` when a write happened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the temporary file cannot be created, written
    /// or renamed.
    pub fn persist(&mut self, updated: String,) -> Result<bool, Error,>
    {
        if updated == self.content {
            info!("No changes to {}", self.path.display());
            return Ok(false,);
        }

        write_atomically(&self.path, &updated,)?;
        self.content = updated;
        info!("{} updated successfully", self.path.display());
        Ok(true,)
    }
}

fn write_atomically(path: &Path, content: &str,) -> Result<(), Error,>
{
    let directory = match path.parent() {
        Some(parent,) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new(".",),
    };

    let mut temp = NamedTempFile::new_in(directory,).map_err(|e| io_error(directory, e,),)?;
    debug!("Staging {} at {}", path.display(), temp.path().display());

    temp.write_all(content.as_bytes(),)
        .and_then(|()| temp.as_file().sync_all(),)
        .map_err(|e| io_error(temp.path(), e,),)?;

    if let Ok(metadata,) = fs::metadata(path,) {
        temp.as_file()
            .set_permissions(metadata.permissions(),)
            .map_err(|e| io_error(path, e,),)?;
    }

    temp.persist(path,).map_err(|e| io_error(path, e.error,),)?;
    Ok((),)
}
