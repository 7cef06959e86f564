//! Locating and binding the pdfium shared library.

use std::path::PathBuf;

use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::error::DocumentLoadError;

/// Environment variable naming a directory that contains the pdfium library.
pub const PDFIUM_DIR_ENV: &str = "FOLIO_PDFIUM_DIR";

/// Where to look for the pdfium shared library.
///
/// Search order:
/// 1. `explicit_dir`, if set
/// 2. `$FOLIO_PDFIUM_DIR`
/// 3. `./lib` in the working directory
/// 4. `lib/` next to the executable, then the executable's directory
/// 5. The system library path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySearch {
    pub explicit_dir: Option<PathBuf>,
}

impl LibrarySearch {
    pub fn new(explicit_dir: Option<PathBuf>) -> Self {
        Self { explicit_dir }
    }

    /// Candidate library files, in search order. The system library is
    /// tried after all of these.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        if let Some(dir) = &self.explicit_dir {
            dirs.push(dir.clone());
        }

        if let Some(dir) = std::env::var_os(PDFIUM_DIR_ENV) {
            if !dir.is_empty() {
                dirs.push(PathBuf::from(dir));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd.join("lib"));
        }

        if let Ok(exe) = std::env::current_exe() {
            if let Some(parent) = exe.parent() {
                dirs.push(parent.join("lib"));
                dirs.push(parent.to_path_buf());
            }
        }

        let mut paths: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let path = Pdfium::pdfium_platform_library_name_at_path(&dir);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Bind the library.
    ///
    /// Returns the bound engine and a description of where it was found.
    pub fn bind(&self) -> Result<(Pdfium, String), DocumentLoadError> {
        for path in self.search_paths() {
            if !path.exists() {
                continue;
            }

            debug!(path = %path.display(), "trying pdfium library");
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => {
                    info!(path = %path.display(), "bound pdfium library");
                    return Ok((Pdfium::new(bindings), path.display().to_string()));
                }
                Err(e) => debug!(path = %path.display(), error = %e, "failed to bind pdfium"),
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|e| {
            DocumentLoadError::Engine(format!(
                "pdfium library not found (set {} or install it system-wide): {}",
                PDFIUM_DIR_ENV, e
            ))
        })?;
        info!("bound system pdfium library");
        Ok((Pdfium::new(bindings), "system".to_string()))
    }
}
