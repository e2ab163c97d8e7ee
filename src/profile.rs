//! Idempotent shell profile mutation
//!
//! PATH and environment exports land in the user's shell profiles. A line is
//! appended only when an exact-line scan shows it absent, so repeated runs
//! leave the files byte-identical.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to update {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ProfileWriter {
    paths: Vec<PathBuf>,
}

impl ProfileWriter {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// The profile files this engine manages: `~/.bashrc`, `~/.zshrc`,
    /// `~/.profile`.
    pub fn default_paths() -> Vec<PathBuf> {
        match dirs::home_dir() {
            Some(home) => vec![
                home.join(".bashrc"),
                home.join(".zshrc"),
                home.join(".profile"),
            ],
            None => Vec::new(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Append `line` to every managed profile that does not already contain
    /// it. Missing files are created. Returns true if anything changed.
    pub fn ensure_line(&self, line: &str) -> Result<bool, ProfileError> {
        let line = line.trim_end();
        let mut changed = false;

        for path in &self.paths {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(source) => {
                    return Err(ProfileError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            };

            if contents.lines().any(|existing| existing.trim() == line) {
                continue;
            }

            let mut updated = contents;
            if !updated.is_empty() && !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push_str(line);
            updated.push('\n');

            fs::write(path, updated).map_err(|source| ProfileError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), line, "appended profile line");
            changed = true;
        }

        Ok(changed)
    }
}
