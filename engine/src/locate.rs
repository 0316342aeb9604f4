//! Resolve the engine executable inside a configured directory.

use crate::EngineError;
use std::path::{Path, PathBuf};

/// Operating system family, which decides the engine binary's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.to_string()),
        }
    }

    /// File name of the Stockfish release build for this platform.
    pub fn default_binary_name(&self) -> Result<&'static str, EngineError> {
        match self {
            Platform::Windows => Ok("stockfish-windows-x86-64.exe"),
            Platform::MacOs => Ok("stockfish"),
            Platform::Linux => Ok("stockfish-ubuntu-x86-64-avx2"),
            Platform::Other(name) => Err(EngineError::UnsupportedPlatform(name.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineLocator {
    base_dir: PathBuf,
    binary_name: Option<String>,
    platform: Platform,
}

impl EngineLocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            binary_name: None,
            platform: Platform::current(),
        }
    }

    /// Use a fixed file name instead of the platform default.
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = Some(name.into());
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// The path the engine is expected at. Does not touch the filesystem.
    pub fn binary_path(&self) -> Result<PathBuf, EngineError> {
        let name = match &self.binary_name {
            Some(name) => name.as_str(),
            None => self.platform.default_binary_name()?,
        };
        Ok(self.base_dir.join(name))
    }

    /// Find the engine and make sure it can be executed.
    pub fn resolve(&self) -> Result<PathBuf, EngineError> {
        let path = self.binary_path()?;
        if !path.is_file() {
            return Err(EngineError::NotFound(path));
        }

        if self.platform != Platform::Windows {
            ensure_executable(&path)?;
        }

        Ok(path)
    }
}

/// Set mode 0o755 when any execute bit is missing. Idempotent.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;

    let unusable = |source| EngineError::Unusable {
        path: path.to_path_buf(),
        source,
    };

    let mode = std::fs::metadata(path).map_err(unusable)?.permissions().mode();
    if mode & 0o111 == 0o111 {
        return Ok(());
    }

    tracing::info!(
        path = %path.display(),
        mode = %format!("{:o}", mode),
        "Marking engine executable"
    );
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(unusable)
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), EngineError> {
    Ok(())
}
