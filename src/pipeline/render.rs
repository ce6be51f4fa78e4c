//! PDF rasterisation: turn an uploaded document into page images via pdfium.
//!
//! The [`Rasterizer`] trait is the seam the intake pipeline depends on;
//! [`PdfiumRasterizer`] is the production implementation. Rendering is
//! blocking and CPU-bound, so callers run it inside `spawn_blocking`
//! (see [`crate::intake::process_document`]).
//!
//! ## Library binding
//!
//! pdfium is a shared library loaded at runtime. Resolution order:
//! 1. [`RenderConfig::pdfium_library`] (the `--pdfium-lib` flag)
//! 2. the `PDFIUM_LIB_PATH` environment variable
//! 3. the platform's system library search path
//!
//! A path may name either the library file or the directory holding it.

use crate::config::RenderConfig;
use crate::error::RasterError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An in-memory raster of one document page.
pub type PageImage = DynamicImage;

/// How far into the upload the `%PDF` header may appear.
const PDF_HEADER_WINDOW: usize = 1024;

/// Turns document bytes into an ordered sequence of page images.
///
/// An empty sequence is a valid result (a document with no pages).
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, document: &[u8]) -> Result<Vec<PageImage>, RasterError>;
}

/// Check that `document` looks like a PDF.
///
/// Like most readers, tolerates leading junk before the header as long as
/// `%PDF` occurs within the first kilobyte.
pub fn sniff_pdf(document: &[u8]) -> Result<(), RasterError> {
    let window = &document[..document.len().min(PDF_HEADER_WINDOW)];
    if window.windows(4).any(|w| w == b"%PDF") {
        Ok(())
    } else {
        Err(RasterError::NotAPdf {
            magic: document.iter().take(8).copied().collect(),
        })
    }
}

/// [`Rasterizer`] backed by the pdfium C++ library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    config: RenderConfig,
}

impl PdfiumRasterizer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Bind to the pdfium library following the documented resolution order.
    fn bind(&self) -> Result<Pdfium, RasterError> {
        let explicit = self
            .config
            .pdfium_library
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = library_file(&path);
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib).map_err(|e| {
                    RasterError::EngineUnavailable(format!("{}: {:?}", lib.display(), e))
                })?
            }
            None => Pdfium::bind_to_system_library()
                .map_err(|e| RasterError::EngineUnavailable(format!("system library: {:?}", e)))?,
        };

        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, document: &[u8]) -> Result<Vec<PageImage>, RasterError> {
        sniff_pdf(document)?;

        let pdfium = self.bind()?;
        let doc = pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    RasterError::PasswordRequired
                } else {
                    RasterError::CorruptPdf { detail: err_str }
                }
            })?;

        let pages = doc.pages();
        let total_pages = pages.len() as usize;
        let wanted = total_pages.min(self.config.max_pages);
        info!("PDF loaded: {} pages, rendering {}", total_pages, wanted);

        let max_px = self.config.max_rendered_pixels as i32;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.config.dpi as f32 / 72.0)
            .set_maximum_width(max_px)
            .set_maximum_height(max_px);

        let mut images = Vec::with_capacity(wanted);
        for idx in 0..wanted {
            let page = pages
                .get(idx as u16)
                .map_err(|e| RasterError::RenderFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| RasterError::RenderFailed {
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
            images.push(image);
        }

        Ok(images)
    }
}

/// Resolve a user-supplied pdfium location to the library file itself.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(Pdfium::pdfium_platform_library_name())
    } else {
        path.to_path_buf()
    }
}
