//! Error types for the formscan library.
//!
//! Each pipeline stage owns its error type:
//!
//! * [`RasterError`]: the document could not be turned into page images
//!   (not a PDF, encrypted, corrupt, pdfium missing).
//! * [`OcrError`]: the OCR engine could not turn a page image into text.
//! * [`LlmError`]: the optional language-model extractor failed. Request
//!   failures never reach the client; the pipeline falls back to the
//!   pattern extractors. Only a provider that cannot be built surfaces.
//!
//! [`IntakeError`] aggregates both plus the upload and internal failures the
//! HTTP layer can hit. Every variant maps to exactly one status code and
//! machine-readable `kind` (see [`IntakeError::status_code`] and
//! [`IntakeError::kind`]), so "bad input" and "internal fault" are never
//! reported identically.
//!
//! Running out of pages is *not* an error: a zero-page document produces
//! [`crate::IntakeOutcome::Empty`].

use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the rasterisation stage.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The upload does not carry a `%PDF` header.
    #[error("upload is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The PDF is encrypted and no password is available.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// pdfium could not parse the document.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// pdfium parsed the document but failed to render a page.
    #[error("rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The pdfium shared library could not be loaded.
    #[error(
        "PDF engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or pass --pdfium-lib."
    )]
    EngineUnavailable(String),
}

/// Failures of the OCR stage.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The OCR binary is not installed or not on `PATH`.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The OCR process ran but exited unsuccessfully.
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The page image could not be encoded for the OCR engine.
    #[error("failed to encode page image: {0}")]
    ImageEncoding(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the language-model field extractor.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No provider could be built from the flags or the environment.
    #[error("LLM provider '{provider}' not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("LLM request failed: {0}")]
    Request(String),

    /// The model answered with something other than a JSON object.
    #[error("LLM reply is not a JSON object: {0}")]
    InvalidReply(String),
}

/// All errors surfaced by an intake request.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The multipart form had no file field.
    #[error("no file field in upload; send the document as multipart field 'file'")]
    MissingFile,

    /// The multipart body could not be read.
    #[error("malformed upload: {detail}")]
    BadUpload { detail: String, status: StatusCode },

    // ── Pipeline errors ───────────────────────────────────────────────────
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// HTTP status the handler responds with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::MissingFile => StatusCode::BAD_REQUEST,
            IntakeError::BadUpload { status, .. } => *status,
            IntakeError::Raster(e) => match e {
                RasterError::NotAPdf { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                RasterError::PasswordRequired | RasterError::CorruptPdf { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                RasterError::RenderFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                RasterError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            IntakeError::Ocr(OcrError::EngineUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            IntakeError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IntakeError::Llm(LlmError::ProviderNotConfigured { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            IntakeError::Llm(_) => StatusCode::BAD_GATEWAY,
            IntakeError::InvalidConfig(_) | IntakeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable identifier for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            IntakeError::MissingFile => "missing_file",
            IntakeError::BadUpload { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            IntakeError::BadUpload { .. } => "bad_upload",
            IntakeError::Raster(e) => match e {
                RasterError::NotAPdf { .. } => "not_a_pdf",
                RasterError::PasswordRequired => "password_required",
                RasterError::CorruptPdf { .. } => "corrupt_pdf",
                RasterError::RenderFailed { .. } => "render_failed",
                RasterError::EngineUnavailable(_) => "engine_unavailable",
            },
            IntakeError::Ocr(OcrError::EngineUnavailable(_)) => "engine_unavailable",
            IntakeError::Ocr(_) => "ocr_failed",
            IntakeError::Llm(LlmError::ProviderNotConfigured { .. }) => "engine_unavailable",
            IntakeError::Llm(_) => "llm_failed",
            IntakeError::InvalidConfig(_) => "invalid_config",
            IntakeError::Internal(_) => "internal",
        }
    }
}
