//! Pipeline stages for intake processing.
//!
//! Each submodule implements exactly one transformation step, so an engine
//! can be swapped (another OCR backend, another PDF renderer) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ ocr ──▶ extract
//! (pdfium)  (tesseract) (regex)
//! ```
//!
//! 1. [`render`]: rasterise leading pages; blocking, run on the blocking pool
//! 2. [`ocr`]: recognise text on the first page image
//! 3. [`extract`]: pure pattern matchers for name, email, phone and age
//!
//! With the `llm` feature, `llm` offers a language-model alternative to
//! step 3 that falls back to [`extract`] on failure.

pub mod extract;
#[cfg(feature = "llm")]
pub mod llm;
pub mod ocr;
pub mod render;
