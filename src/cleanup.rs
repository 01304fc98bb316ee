//! # Temporary File Cleanup
//!
//! Every intermediate file the pipeline writes is named `temp*.nc` and lives in
//! the working directory. This module finds and removes those files, either on
//! request ([`remove_temp_files`]) or when a [`TempFileGuard`] goes out of scope,
//! so a failed run does not leave its intermediates behind.

use crate::error::{PipelineError, PipelineResult};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TEMP_PREFIX: &str = "temp";
pub const TEMP_SUFFIX: &str = ".nc";

/// Builds an intermediate file name such as `tempWind.nc`.
pub fn temp_file_name(stem: &str) -> String {
    format!("{}{}{}", TEMP_PREFIX, stem, TEMP_SUFFIX)
}

/// A file-name glob with exactly one `*`, e.g. `temp*.nc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempPattern {
    prefix: String,
    suffix: String,
}

impl TempPattern {
    pub fn parse(pattern: &str) -> PipelineResult<Self> {
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(PipelineError::InvalidPattern(format!(
                "'{}' must be a file name, not a path",
                pattern
            )));
        }
        if pattern.contains(['?', '[', ']']) {
            return Err(PipelineError::InvalidPattern(format!(
                "'{}' may only use '*' as a wildcard",
                pattern
            )));
        }
        let mut parts = pattern.split('*');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(suffix), None) => {
                if prefix.is_empty() && suffix.is_empty() {
                    return Err(PipelineError::InvalidPattern(
                        "'*' alone would match every file".to_string(),
                    ));
                }
                Ok(Self {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
            }
            _ => Err(PipelineError::InvalidPattern(format!(
                "'{}' must contain exactly one '*'",
                pattern
            ))),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
    }
}

impl Default for TempPattern {
    fn default() -> Self {
        Self {
            prefix: TEMP_PREFIX.to_string(),
            suffix: TEMP_SUFFIX.to_string(),
        }
    }
}

impl FromStr for TempPattern {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TempPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.prefix, self.suffix)
    }
}

/// Lists regular files directly inside `dir` whose names match `pattern`.
///
/// The listing is sorted and never recurses into subdirectories.
pub fn find_temp_files(dir: &Path, pattern: &TempPattern) -> PipelineResult<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && pattern.matches(name)
        {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

/// Deletes every file in `dir` matching `pattern` and returns what was removed.
pub fn remove_temp_files(dir: &Path, pattern: &TempPattern) -> PipelineResult<Vec<PathBuf>> {
    let files = find_temp_files(dir, pattern)?;
    for file in &files {
        debug!("Removing temporary file: {}", file.display());
        fs::remove_file(file)?;
    }
    Ok(files)
}

/// Removes matching temp files from a directory when dropped.
///
/// Arm the guard before the first intermediate file is written; whichever way
/// the run ends, the directory is swept on scope exit.
#[derive(Debug)]
pub struct TempFileGuard {
    dir: PathBuf,
    pattern: TempPattern,
    armed: bool,
}

impl TempFileGuard {
    pub fn new<P: Into<PathBuf>>(dir: P, pattern: TempPattern) -> Self {
        Self {
            dir: dir.into(),
            pattern,
            armed: true,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keeps the temp files; the guard does nothing on drop.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Cleans up now and reports the removed files.
    pub fn finish(mut self) -> PipelineResult<Vec<PathBuf>> {
        if !self.armed {
            return Ok(Vec::new());
        }
        self.armed = false;
        remove_temp_files(&self.dir, &self.pattern)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match remove_temp_files(&self.dir, &self.pattern) {
            Ok(removed) if !removed.is_empty() => {
                debug!(
                    "Removed {} temporary file(s) from {} after an aborted run",
                    removed.len(),
                    self.dir.display()
                );
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Failed to clean temporary files in {}: {}",
                self.dir.display(),
                e
            ),
        }
    }
}
