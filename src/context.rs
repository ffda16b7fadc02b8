//! Project context: the resolved engine root and project directory.
//!
//! A `ProjectContext` is built once at process start and passed by reference
//! to everything that needs a path. Every accessor is a pure lookup; nothing
//! here creates directories.
//!
//! ```text
//! <project>/
//! ├── stagegate.toml        # optional, falls back to <engine_root>/stagegate.toml
//! ├── templates/            # optional, falls back to <engine_root>/templates
//! │   └── prompts/
//! └── state/                # artifact store root
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable that pins the engine root.
pub const ENGINE_HOME_ENV: &str = "STAGEGATE_HOME";

/// Name of the configuration file, both project-local and engine default.
pub const CONFIG_FILE: &str = "stagegate.toml";

/// Name of the state directory under the project.
pub const STATE_DIR: &str = "state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    engine_root: PathBuf,
    project_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve a context against the default engine root.
    ///
    /// `None` selects the engine root itself as the project directory.
    /// A provided directory must exist; it is canonicalized.
    pub fn new(project_dir: Option<&Path>) -> Result<Self> {
        Self::with_engine_root(default_engine_root(), project_dir)
    }

    /// Resolve a context against an explicit engine root.
    pub fn with_engine_root(engine_root: PathBuf, project_dir: Option<&Path>) -> Result<Self> {
        let project_dir = match project_dir {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("Failed to resolve project directory: {}", dir.display()))?,
            None => engine_root.clone(),
        };
        Ok(Self {
            engine_root,
            project_dir,
        })
    }

    pub fn engine_root(&self) -> &Path {
        &self.engine_root
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// `<project>/state`
    pub fn state_dir(&self) -> PathBuf {
        self.project_dir.join(STATE_DIR)
    }

    /// Project-local `stagegate.toml` if present, otherwise the engine default.
    pub fn config_path(&self) -> PathBuf {
        let local = self.project_dir.join(CONFIG_FILE);
        if local.exists() {
            return local;
        }
        self.engine_root.join(CONFIG_FILE)
    }

    /// Project-local `templates/` if it is a directory, otherwise the engine default.
    pub fn templates_dir(&self) -> PathBuf {
        self.prefer_local_dir(Path::new("templates"))
    }

    /// Project-local `templates/prompts/` if it is a directory, otherwise the engine default.
    pub fn prompts_dir(&self) -> PathBuf {
        self.prefer_local_dir(&Path::new("templates").join("prompts"))
    }

    /// Path of the `.env` file loaded at startup.
    pub fn dotenv_path(&self) -> PathBuf {
        self.project_dir.join(".env")
    }

    fn prefer_local_dir(&self, relative: &Path) -> PathBuf {
        let local = self.project_dir.join(relative);
        if local.is_dir() {
            return local;
        }
        self.engine_root.join(relative)
    }
}

impl Default for ProjectContext {
    /// A context whose project directory is the engine root.
    fn default() -> Self {
        let engine_root = default_engine_root();
        Self {
            project_dir: engine_root.clone(),
            engine_root,
        }
    }
}

/// `$STAGEGATE_HOME`, else `<data_dir>/stagegate`, else the current directory.
pub fn default_engine_root() -> PathBuf {
    if let Some(home) = std::env::var_os(ENGINE_HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    if let Some(data) = dirs::data_dir() {
        return data.join("stagegate");
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
