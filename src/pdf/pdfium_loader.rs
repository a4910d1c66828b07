//! PDFium library loader with platform-specific search paths.
//!
//! Centralizes locating and binding the PDFium dynamic library across
//! development checkouts, installed binaries and macOS bundles.

use crate::error::{RenderError, RenderResult};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct PdfiumLoader;

impl PdfiumLoader {
    /// Bind PDFium, trying an explicit library path first.
    ///
    /// Search order:
    /// 1. `explicit` (from settings), a file or a directory containing the library
    /// 2. `lib/` in the current working directory (development)
    /// 3. `lib/` next to the executable
    /// 4. `Resources/lib/` in a macOS bundle
    /// 5. System library fallback
    pub fn load(explicit: Option<&Path>) -> RenderResult<Pdfium> {
        for path in Self::search_paths(explicit) {
            if !path.is_file() {
                continue;
            }
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => {
                    info!("Loaded pdfium from {}", path.display());
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => debug!("Could not bind pdfium at {}: {:?}", path.display(), e),
            }
        }
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| RenderError::Binding(format!("{:?}", e)))
    }

    fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(explicit) = explicit {
            if explicit.is_dir() {
                paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(explicit)));
            } else {
                paths.push(explicit.to_path_buf());
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                &cwd.join("lib"),
            )));
        }

        if let Ok(exe) = std::env::current_exe() {
            if let Some(parent) = exe.parent() {
                paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                    &parent.join("lib"),
                )));

                if let Some(grandparent) = parent.parent() {
                    paths.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                        &grandparent.join("Resources/lib"),
                    )));
                }
            }
        }

        paths
    }
}
