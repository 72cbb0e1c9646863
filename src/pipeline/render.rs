//! pdfium access: library binding, document loading, page rasterisation.
//!
//! Everything here is blocking. Callers run it inside
//! `tokio::task::spawn_blocking` because pdfium keeps thread-local state and
//! rendering is CPU-bound.
//!
//! Rendering only happens for pages with no text layer (scanned reports);
//! `max_rendered_pixels` caps the longest edge so an A3 scan at 150 DPI
//! does not produce a 5,000 px image for the vision model.

use crate::error::SoilError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bind to a pdfium library.
///
/// Lookup order:
/// 1. `PDFIUM_LIB_PATH` (a library file, or a directory containing one)
/// 2. the platform library name in the current directory
/// 3. the system library search path
pub fn bind_pdfium() -> Result<Pdfium, SoilError> {
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !env_path.is_empty() {
            let p = PathBuf::from(&env_path);
            let lib = if p.is_dir() {
                PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&p))
            } else {
                p
            };
            return bind_pdfium_from_path(&lib);
        }
    }

    let local = PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./"));
    Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SoilError::PdfiumBindingFailed(format!("{e:?}")))
}

/// Bind to the pdfium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, SoilError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| SoilError::PdfiumBindingFailed(format!("{}: {e:?}", path.display())))
}

/// Open a PDF, mapping pdfium's load error onto the password / corruption
/// variants of [`SoilError`].
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, SoilError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                SoilError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                SoilError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            SoilError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Rasterise one page (0-based `idx`) at `dpi`, with its longest edge
/// capped at `max_pixels`.
pub fn render_page(
    page: &PdfPage<'_>,
    idx: usize,
    dpi: u32,
    max_pixels: u32,
) -> Result<DynamicImage, SoilError> {
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| SoilError::RasterisationFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        idx + 1,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_outlives_the_open_call() {
        // Needs a pdfium library; nothing to check without one.
        let Ok(pdfium) = bind_pdfium() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nnot really a pdf").unwrap();

        let password = String::from("secret");
        let result = open_document(&pdfium, &path, Some(password.as_str()));
        assert!(matches!(
            result,
            Err(SoilError::CorruptPdf { .. }) | Err(SoilError::WrongPassword { .. })
        ));
    }
}
