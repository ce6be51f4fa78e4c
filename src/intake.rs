//! Intake pipeline: document bytes → [`IntakeOutcome`].
//!
//! ```text
//! bytes ──▶ rasterize ──▶ first page ──▶ OCR ──▶ extract ──▶ record
//!              │                                   │
//!              └─ no pages ──▶ IntakeOutcome::Empty └─ patterns, or LLM
//!                                                     falling back to patterns
//! ```
//!
//! The rasteriser and OCR engine are passed in rather than constructed here,
//! so the same pipeline runs against pdfium/tesseract in production and
//! against fakes in tests.

use crate::error::IntakeError;
use crate::output::{ExtractedRecord, IntakeOutcome};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::Rasterizer;
use axum::body::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Run the pipeline on an uploaded document.
///
/// pdfium and tesseract both block for their full duration, so the work is
/// moved onto Tokio's blocking pool.
pub async fn process_document(
    document: Bytes,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
) -> Result<IntakeOutcome, IntakeError> {
    tokio::task::spawn_blocking(move || {
        process_document_blocking(&document, rasterizer.as_ref(), ocr.as_ref())
    })
    .await
    .map_err(|e| IntakeError::Internal(format!("Intake task panicked: {}", e)))?
}

/// Blocking implementation of [`process_document`].
pub fn process_document_blocking(
    document: &[u8],
    rasterizer: &dyn Rasterizer,
    ocr: &dyn OcrEngine,
) -> Result<IntakeOutcome, IntakeError> {
    let Some(text) = recognize_first_page(document, rasterizer, ocr)? else {
        return Ok(IntakeOutcome::Empty);
    };
    Ok(IntakeOutcome::Record(finish(ExtractedRecord::from_text(&text))))
}

/// Run the pipeline, filling the record with a language model.
///
/// A failed model call is logged and the pattern extractors are used
/// instead, so the response shape never depends on the provider.
#[cfg(feature = "llm")]
pub async fn process_document_llm(
    document: Bytes,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
    llm: &crate::pipeline::llm::LlmExtractor,
) -> Result<IntakeOutcome, IntakeError> {
    let text = tokio::task::spawn_blocking(move || {
        recognize_first_page(&document, rasterizer.as_ref(), ocr.as_ref())
    })
    .await
    .map_err(|e| IntakeError::Internal(format!("Intake task panicked: {}", e)))??;

    let Some(text) = text else {
        return Ok(IntakeOutcome::Empty);
    };

    let record = match llm.extract(&text).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("LLM extraction failed, using pattern extraction: {}", e);
            ExtractedRecord::from_text(&text)
        }
    };
    Ok(IntakeOutcome::Record(finish(record)))
}

/// Rasterise and OCR the first page. `None` when the document has no pages.
pub fn recognize_first_page(
    document: &[u8],
    rasterizer: &dyn Rasterizer,
    ocr: &dyn OcrEngine,
) -> Result<Option<String>, IntakeError> {
    // ── Step 1: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let pages = rasterizer.rasterize(document)?;
    let render_ms = render_start.elapsed().as_millis();

    let Some(first_page) = pages.into_iter().next() else {
        info!("Document has no pages ({} bytes); returning empty outcome", document.len());
        return Ok(None);
    };

    // ── Step 2: OCR the first page ───────────────────────────────────────
    let ocr_start = Instant::now();
    let text = ocr.recognize(&first_page)?;

    info!(
        "Recognised first page: {} chars, render {}ms, ocr {}ms",
        text.chars().count(),
        render_ms,
        ocr_start.elapsed().as_millis()
    );
    Ok(Some(text))
}

// ── Step 3: Extract fields ───────────────────────────────────────────────
fn finish(record: ExtractedRecord) -> ExtractedRecord {
    debug!(
        name = !record.name.is_empty(),
        email = !record.email.is_empty(),
        phone = !record.phone.is_empty(),
        age = !record.age.is_empty(),
        "Field presence"
    );
    info!("Intake complete: {}/4 fields", record.filled_fields());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, RasterError};
    use crate::pipeline::render::PageImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRasterizer {
        pages: usize,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, _document: &[u8]) -> Result<Vec<PageImage>, RasterError> {
            // Encode the page number in the width so the OCR fake can tell pages apart.
            Ok((1..=self.pages)
                .map(|n| PageImage::new_luma8(n as u32, 1))
                .collect())
        }
    }

    struct FakeOcr {
        calls: AtomicUsize,
    }

    impl OcrEngine for FakeOcr {
        fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match page.width() {
                1 => "Jane Doe\njane.doe@example.com\n+44 7911 123456\n34 years old".into(),
                _ => "Second Page Person\nother@example.com".into(),
            })
        }
    }

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _page: &PageImage) -> Result<String, OcrError> {
            Err(OcrError::Failed {
                status: "exit status: 1".into(),
                stderr: "Error in pixReadMem".into(),
            })
        }
    }

    struct CorruptRasterizer;

    impl Rasterizer for CorruptRasterizer {
        fn rasterize(&self, _document: &[u8]) -> Result<Vec<PageImage>, RasterError> {
            Err(RasterError::CorruptPdf {
                detail: "FormatError".into(),
            })
        }
    }

    fn fake_ocr() -> FakeOcr {
        FakeOcr {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn zero_pages_short_circuits() {
        let ocr = fake_ocr();
        let outcome =
            process_document_blocking(b"%PDF", &FakeRasterizer { pages: 0 }, &ocr).unwrap();
        assert_eq!(outcome, IntakeOutcome::Empty);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0, "OCR must not run");
    }

    #[test]
    fn only_first_page_is_read() {
        let ocr = fake_ocr();
        let outcome =
            process_document_blocking(b"%PDF", &FakeRasterizer { pages: 3 }, &ocr).unwrap();
        let record = outcome.record().expect("record");
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.email, "jane.doe@example.com");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recognize_returns_raw_first_page_text() {
        let text = recognize_first_page(b"%PDF", &FakeRasterizer { pages: 2 }, &fake_ocr())
            .unwrap()
            .expect("one page");
        assert!(text.starts_with("Jane Doe\n"));
        assert_eq!(
            recognize_first_page(b"%PDF", &FakeRasterizer { pages: 0 }, &fake_ocr()).unwrap(),
            None
        );
    }

    #[test]
    fn ocr_error_propagates_as_ocr() {
        let err = process_document_blocking(b"%PDF", &FakeRasterizer { pages: 1 }, &BrokenOcr)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Ocr(OcrError::Failed { .. })));
    }

    #[test]
    fn raster_error_propagates_as_raster() {
        let err = process_document_blocking(b"%PDF", &CorruptRasterizer, &fake_ocr()).unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Raster(RasterError::CorruptPdf { .. })
        ));
    }

    #[tokio::test]
    async fn async_entry_point_matches_blocking() {
        let outcome = process_document(
            Bytes::from_static(b"%PDF"),
            Arc::new(FakeRasterizer { pages: 1 }),
            Arc::new(fake_ocr()),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome.record().map(|r| r.age.as_str()),
            Some("34")
        );
    }
}
