//! Optical character recognition: page image → text.
//!
//! [`OcrEngine`] is the seam; [`TesseractEngine`] shells out to the
//! `tesseract` CLI. The page is PNG-encoded into a private temp directory
//! (tesseract reads files, not pipes, reliably across versions) and the
//! recognised text is read from the process's stdout.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::render::PageImage;
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;
use tracing::debug;

/// Recognises text on a single page image.
///
/// Output is best-effort and may be empty or noisy; no confidence is
/// reported.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page: &PageImage) -> Result<String, OcrError>;
}

/// [`OcrEngine`] wrapping the `tesseract` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Build the `tesseract <input> stdout -l <lang>` invocation.
    fn command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.tesseract_bin);
        cmd.arg(input)
            .arg("stdout")
            .args(["-l", &self.config.language]);
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        let start = Instant::now();

        let tmpdir = TempDir::with_prefix("formscan-ocr")?;
        let input_path = tmpdir.path().join("page.png");
        page.save_with_format(&input_path, image::ImageFormat::Png)
            .map_err(|e| OcrError::ImageEncoding(e.to_string()))?;

        let output = match self.command(&input_path).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::EngineUnavailable(format!(
                    "'{}' not found (install tesseract-ocr)",
                    self.config.tesseract_bin.display()
                )));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "OCR produced {} chars in {}ms",
            text.chars().count(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}
