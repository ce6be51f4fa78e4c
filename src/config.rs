//! Configuration types for the intake service.
//!
//! All service behaviour is controlled through [`ServerConfig`], built via its
//! [`ServerConfigBuilder`]. The engine sections ([`RenderConfig`],
//! [`OcrConfig`] and the optional [`LlmConfig`]) are handed to the engines
//! they configure.

use crate::error::IntakeError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Origin permitted to call the service cross-origin.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default upload cap: 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Rasterisation settings for [`crate::pipeline::render::PdfiumRasterizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Rendering DPI. Range: 72–600. Default: 200.
    ///
    /// Tesseract is tuned for text of roughly 300 DPI; 200 keeps ordinary
    /// form fonts legible while holding a Letter page near 1700 × 2200 px.
    pub dpi: u32,

    /// Cap on either rendered edge in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Number of leading pages to rasterise. Default: 1.
    ///
    /// Only the first page is OCR'd, so rendering more is wasted work unless
    /// a caller uses the rasterizer directly.
    pub max_pages: usize,

    /// Explicit path to the pdfium shared library. When `None`,
    /// `PDFIUM_LIB_PATH` is consulted, then the system library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 4000,
            max_pages: 1,
            pdfium_library: None,
        }
    }
}

/// OCR settings for [`crate::pipeline::ocr::TesseractEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract executable name or path. Default: `tesseract`.
    pub tesseract_bin: PathBuf,
    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_bin: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }
}

/// Settings for the optional language-model extractor.
///
/// When present on [`ServerConfig`], recognised text is sent to an LLM that
/// fills the five record fields (including `message`); the pattern
/// extractors remain the fallback when the model call fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: openai, anthropic, gemini, ollama, azure. `None`
    /// auto-detects from `EDGEQUAKE_LLM_PROVIDER` or API key variables.
    pub provider_name: Option<String>,

    /// Model identifier. Default when unset: `gpt-4o-mini`.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.0, so the same text gives the same record.
    pub temperature: f32,

    /// Completion cap. A filled record is well under 200 tokens. Default: 512.
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

/// Configuration for the HTTP intake service.
///
/// # Example
/// ```rust
/// use formscan::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .allowed_origin("https://forms.example.com")
///     .dpi(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.render.dpi, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. Default: `127.0.0.1`.
    pub host: String,
    /// Port to bind. Default: 8000.
    pub port: u16,
    /// The single origin allowed by CORS. Default: `http://localhost:3000`.
    pub allowed_origin: String,
    /// Largest accepted request body in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,
    pub render: RenderConfig,
    pub ocr: OcrConfig,
    /// Language-model extraction; `None` keeps the pattern extractors only.
    pub llm: Option<LlmConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            render: RenderConfig::default(),
            ocr: OcrConfig::default(),
            llm: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address assembled from `host` and `port`.
    ///
    /// `host` must be an IP literal or `localhost`; names are not resolved.
    pub fn socket_addr(&self) -> Result<SocketAddr, IntakeError> {
        let host = match self.host.as_str() {
            "localhost" => "127.0.0.1",
            other => other.trim_start_matches('[').trim_end_matches(']'),
        };
        let ip: IpAddr = host.parse().map_err(|e| {
            IntakeError::InvalidConfig(format!("cannot bind '{}': {}", self.host, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = origin.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1024);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.render.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.render.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.render.pdfium_library = Some(path.into());
        self
    }

    pub fn tesseract_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.config.ocr.tesseract_bin = bin.into();
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = Some(llm);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, IntakeError> {
        let c = &self.config;
        if !(c.allowed_origin.starts_with("http://") || c.allowed_origin.starts_with("https://"))
        {
            return Err(IntakeError::InvalidConfig(format!(
                "allowed origin must be an http(s) origin, got '{}'",
                c.allowed_origin
            )));
        }
        if c.allowed_origin.ends_with('/') {
            return Err(IntakeError::InvalidConfig(format!(
                "allowed origin must not end with '/', got '{}'",
                c.allowed_origin
            )));
        }
        if c.ocr.language.trim().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if let Some(ref llm) = c.llm {
            if !(0.0..=2.0).contains(&llm.temperature) {
                return Err(IntakeError::InvalidConfig(format!(
                    "LLM temperature must be within 0.0-2.0, got {}",
                    llm.temperature
                )));
            }
        }
        c.socket_addr()?;
        Ok(self.config)
    }
}
