//! HTTP surface for the intake pipeline.
//!
//! One route does the work (`POST /extract`); `GET /health` is for probes.
//! The router is built from an explicit [`AppState`] at startup, so tests
//! can drive it with fake engines and no global registry exists.

mod handlers;
mod routes;

pub use handlers::FILE_FIELD;
pub use routes::{cors_layer, create_router};

use std::sync::Arc;

use axum::body::Bytes;

use crate::config::ServerConfig;
use crate::error::IntakeError;
#[cfg(feature = "llm")]
use crate::intake::process_document_llm;
use crate::intake::process_document;
use crate::output::IntakeOutcome;
#[cfg(feature = "llm")]
use crate::pipeline::llm::LlmExtractor;
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};

/// Shared state for the web server.
///
/// Engines hold configuration only; every request runs them afresh.
#[derive(Clone)]
pub struct AppState {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub ocr: Arc<dyn OcrEngine>,
    /// Language-model extractor; `None` uses the pattern extractors.
    #[cfg(feature = "llm")]
    pub llm: Option<Arc<LlmExtractor>>,
}

impl AppState {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            ocr,
            #[cfg(feature = "llm")]
            llm: None,
        }
    }

    #[cfg(feature = "llm")]
    pub fn with_llm(mut self, llm: Arc<LlmExtractor>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// pdfium + tesseract (+ the LLM provider, if configured) from `config`.
    ///
    /// Fails when an LLM is requested but no provider can be built, or when
    /// the crate was compiled without the `llm` feature.
    pub fn from_config(config: &ServerConfig) -> Result<Self, IntakeError> {
        let state = Self::new(
            Arc::new(PdfiumRasterizer::new(config.render.clone())),
            Arc::new(TesseractEngine::new(config.ocr.clone())),
        );

        match config.llm {
            None => Ok(state),
            #[cfg(feature = "llm")]
            Some(ref llm) => {
                let extractor = LlmExtractor::from_config(llm.clone())?;
                tracing::info!("LLM extraction enabled: {:?}", extractor);
                Ok(state.with_llm(Arc::new(extractor)))
            }
            #[cfg(not(feature = "llm"))]
            Some(_) => Err(IntakeError::InvalidConfig(
                "LLM extraction requested but formscan was built without the 'llm' feature"
                    .into(),
            )),
        }
    }
    /// Run one document through the pipeline these engines make up.
    pub async fn process(&self, document: impl Into<Bytes>) -> Result<IntakeOutcome, IntakeError> {
        let document = document.into();
        let rasterizer = Arc::clone(&self.rasterizer);
        let ocr = Arc::clone(&self.ocr);

        #[cfg(feature = "llm")]
        if let Some(ref llm) = self.llm {
            return process_document_llm(document, rasterizer, ocr, llm).await;
        }

        process_document(document, rasterizer, ocr).await
    }
}

/// Start the web server and run until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), IntakeError> {
    let app = create_router(state, config)?;
    let addr = config.socket_addr()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IntakeError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    tracing::info!(
        "Listening on http://{} (CORS origin: {})",
        addr,
        config.allowed_origin
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IntakeError::Internal(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::RenderConfig;
    use crate::error::{OcrError, RasterError};
    use crate::pipeline::render::PageImage;

    const BOUNDARY: &str = "formscanboundary";

    struct FakeRasterizer {
        pages: usize,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, _document: &[u8]) -> Result<Vec<PageImage>, RasterError> {
            Ok((0..self.pages).map(|_| PageImage::new_luma8(4, 4)).collect())
        }
    }

    struct FakeOcr(&'static str);

    impl OcrEngine for FakeOcr {
        fn recognize(&self, _page: &PageImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct MissingOcr;

    impl OcrEngine for MissingOcr {
        fn recognize(&self, _page: &PageImage) -> Result<String, OcrError> {
            Err(OcrError::EngineUnavailable("tesseract not found".into()))
        }
    }

    fn app_with(rasterizer: Arc<dyn Rasterizer>, ocr: Arc<dyn OcrEngine>) -> axum::Router {
        create_router(AppState::new(rasterizer, ocr), &ServerConfig::default()).unwrap()
    }

    fn app(pages: usize, text: &'static str) -> axum::Router {
        app_with(Arc::new(FakeRasterizer { pages }), Arc::new(FakeOcr(text)))
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let disposition = match filename {
            Some(f) => format!("form-data; name=\"{field}\"; filename=\"{f}\""),
            None => format!("form-data; name=\"{field}\""),
        };
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_extract_returns_record() {
        let app = app(
            1,
            "Jane Doe\njane.doe@example.com\n+44 7911 123456\n34 years old",
        );

        let response = app
            .oneshot(upload(multipart_body("file", Some("form.pdf"), b"%PDF-1.4")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Jane Doe",
                "email": "jane.doe@example.com",
                "phone": "+44 7911 123456",
                "age": "34",
                "message": ""
            })
        );
    }

    #[tokio::test]
    async fn test_extract_zero_pages_is_empty_object() {
        let response = app(0, "unused")
            .oneshot(upload(multipart_body("file", Some("empty.pdf"), b"%PDF-1.4")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_extract_accepts_other_file_field() {
        let response = app(1, "Some Person")
            .oneshot(upload(multipart_body("document", Some("a.pdf"), b"%PDF")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["name"], "Some Person");
    }

    #[tokio::test]
    async fn test_extract_missing_file_field() {
        let response = app(1, "unused")
            .oneshot(upload(multipart_body("comment", None, b"hello")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "missing_file");
    }

    #[tokio::test]
    async fn test_extract_requires_multipart() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/extract")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app(1, "unused").oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        assert_eq!(json_body(response).await["error"], "bad_upload");
    }

    #[tokio::test]
    async fn test_extract_rejects_non_pdf_before_pdfium() {
        let rasterizer = PdfiumRasterizer::new(RenderConfig {
            pdfium_library: Some("/nonexistent/libpdfium.so".into()),
            ..RenderConfig::default()
        });
        let app = app_with(Arc::new(rasterizer), Arc::new(FakeOcr("unused")));

        let response = app
            .oneshot(upload(multipart_body("file", Some("photo.png"), b"\x89PNG\r\n")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["error"], "not_a_pdf");
    }

    #[tokio::test]
    async fn test_extract_missing_ocr_engine_is_503() {
        let app = app_with(Arc::new(FakeRasterizer { pages: 1 }), Arc::new(MissingOcr));

        let response = app
            .oneshot(upload(multipart_body("file", Some("a.pdf"), b"%PDF")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "engine_unavailable");
        assert!(json["message"].as_str().unwrap().contains("tesseract"));
    }

    #[tokio::test]
    async fn test_extract_upload_over_limit() {
        let config = ServerConfig {
            max_upload_bytes: 2048,
            ..ServerConfig::default()
        };
        let state = AppState::new(
            Arc::new(FakeRasterizer { pages: 1 }),
            Arc::new(FakeOcr("unused")),
        );
        let app = create_router(state, &config).unwrap();

        let response = app
            .oneshot(upload(multipart_body("file", Some("big.pdf"), &[b'x'; 8192])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "payload_too_large");
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/extract")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-requested-with")
            .body(Body::empty())
            .unwrap();

        let response = app(1, "unused").oneshot(request).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "x-requested-with"
        );
    }

    #[tokio::test]
    async fn test_cors_other_origin_not_echoed() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/extract")
            .header(header::ORIGIN, "http://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(1, "unused").oneshot(request).await.unwrap();
        // A fixed origin is always advertised as-is; the browser then refuses
        // the mismatch. What matters is that the caller's origin is never echoed.
        let allowed = &response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN];
        assert_eq!(allowed, "http://localhost:3000");
        assert_ne!(allowed, "http://evil.example");
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(1, "unused")
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[test]
    fn test_from_config_without_llm() {
        let state = AppState::from_config(&ServerConfig::default()).unwrap();
        assert_eq!(Arc::strong_count(&state.ocr), 1);
        #[cfg(feature = "llm")]
        assert!(state.llm.is_none());
    }

    #[tokio::test]
    async fn test_process_uses_injected_engines() {
        let state = AppState::new(
            Arc::new(FakeRasterizer { pages: 1 }),
            Arc::new(FakeOcr("Ada Lovelace\nada@engines.org")),
        );
        let outcome = state.process(b"%PDF-1.7".to_vec()).await.unwrap();
        let record = outcome.record().unwrap();
        assert_eq!(record.name, "Ada Lovelace");
        assert_eq!(record.email, "ada@engines.org");
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        assert!(cors_layer("http://bad\norigin").is_err());
    }
}
