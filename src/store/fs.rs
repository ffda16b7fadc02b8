use std::fs;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};

use super::{ArtifactStore, validate_name};
use crate::errors::StoreError;

/// Artifact store backed by the project's state directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an artifact.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn io_error(name: &str, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, name: &str) -> Result<String, StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        }
        fs::read_to_string(&path).map_err(|e| Self::io_error(name, &path, e))
    }

    fn save(&self, name: &str, text: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(name, parent, e))?;
        }

        // Write beside the target, then rename over it
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));
        if let Err(e) = fs::write(&tmp, text) {
            let _ = fs::remove_file(&tmp);
            return Err(Self::io_error(name, &tmp, e));
        }
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Self::io_error(name, &path, e)
        })?;

        tracing::debug!(artifact = name, bytes = text.len(), "saved artifact");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path_of(name).is_file()
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(name, &path, e)),
        }
    }

    fn ensure_dir(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        fs::create_dir_all(&path).map_err(|e| Self::io_error(name, &path, e))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        validate_name(dir)?;
        let base = self.path_of(dir);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/*",
            Pattern::escape(&base.to_string_lossy())
        );
        let entries = glob(&pattern).map_err(|e| StoreError::Corrupt {
            name: dir.to_string(),
            message: format!("invalid listing pattern: {}", e),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
            })
            .filter(|file| !file.starts_with('.'))
            .map(|file| format!("{}/{}", dir.trim_end_matches('/'), file))
            .collect();
        names.sort();
        Ok(names)
    }
}
