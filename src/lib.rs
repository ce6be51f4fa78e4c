//! # formscan
//!
//! Lightweight intake-form processor: upload a PDF, get back the contact
//! fields printed on its first page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /extract (multipart "file")
//!  │
//!  ├─ 1. Upload    buffer the file field (bounded by max_upload_bytes)
//!  ├─ 2. Render    rasterise the first page via pdfium (spawn_blocking)
//!  ├─ 3. OCR       tesseract CLI over the page PNG
//!  ├─ 4. Extract   name / email / phone / age pattern matches (or an LLM)
//!  └─ 5. Respond   {"name","email","phone","age","message"} or {} for no pages
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formscan::{serve, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().port(8000).build()?;
//!     serve(&config, AppState::from_config(&config)?).await?;
//!     Ok(())
//! }
//! ```
//!
//! The extractors are plain functions and need neither engine:
//!
//! ```rust
//! use formscan::ExtractedRecord;
//!
//! let record = ExtractedRecord::from_text("John Smith\nage 29\njohn@smith.io");
//! assert_eq!(record.name, "John Smith");
//! assert_eq!(record.age, "29");
//! assert_eq!(record.email, "john@smith.io");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `formscan` binary (clap + anyhow + tracing-subscriber) |
//! | `llm`   | on      | Optional LLM field extraction via `edgequake-llm` (off unless configured) |
//!
//! ## Runtime requirements
//!
//! * pdfium shared library: `PDFIUM_LIB_PATH`, `--pdfium-lib`, or the system path
//! * `tesseract` on `PATH` (or `--tesseract /path/to/tesseract`)

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod intake;
pub mod output;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LlmConfig, OcrConfig, RenderConfig, ServerConfig, ServerConfigBuilder};
pub use error::{IntakeError, LlmError, OcrError, RasterError};
#[cfg(feature = "llm")]
pub use intake::process_document_llm;
pub use intake::{process_document, process_document_blocking, recognize_first_page};
pub use output::{ExtractedRecord, IntakeOutcome};
pub use pipeline::extract::{extract_age, extract_email, extract_name, extract_phone};
#[cfg(feature = "llm")]
pub use pipeline::llm::LlmExtractor;
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
pub use server::{create_router, serve, AppState};
