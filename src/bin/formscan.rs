//! CLI binary for formscan.
//!
//! A thin shim over the library crate: `serve` maps flags to `ServerConfig`
//! and runs the HTTP service, `extract` runs the same pipeline on a local
//! file and prints the JSON the service would have returned.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use formscan::{serve, AppState, LlmConfig, ServerConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "formscan",
    version,
    about = "OCR the first page of a PDF and extract name, email, phone and age",
    after_help = "Requires the pdfium shared library (PDFIUM_LIB_PATH) and tesseract on PATH."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FORMSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "FORMSCAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP intake service (POST /extract).
    Serve(ServeArgs),

    /// Process a local PDF and print the extracted record as JSON.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "FORMSCAN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(short, long, env = "FORMSCAN_PORT", default_value_t = 8000)]
    port: u16,

    /// The one origin allowed to call the API from a browser.
    #[arg(long, env = "FORMSCAN_ALLOWED_ORIGIN", default_value = formscan::config::DEFAULT_ALLOWED_ORIGIN)]
    allowed_origin: String,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "FORMSCAN_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    #[command(flatten)]
    engines: EngineArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file path.
    input: PathBuf,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    engines: EngineArgs,
}

/// Engine settings shared by both subcommands.
#[derive(Args, Debug)]
struct EngineArgs {
    /// Rendering DPI for the rasterised page.
    #[arg(long, env = "FORMSCAN_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Tesseract executable.
    #[arg(long, env = "FORMSCAN_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "FORMSCAN_LANG", default_value = "eng")]
    lang: String,

    /// Cap on either edge of the rendered page, in pixels.
    #[arg(long, env = "FORMSCAN_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Fill fields with an LLM instead of pattern matching (falls back on failure).
    #[arg(long, env = "FORMSCAN_LLM")]
    llm: bool,

    /// LLM provider: openai, anthropic, gemini, ollama, azure. Auto-detected if unset.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// LLM model ID (default: gpt-4o-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    llm_model: Option<String>,
}

impl EngineArgs {
    fn apply(&self, mut builder: formscan::ServerConfigBuilder) -> formscan::ServerConfigBuilder {
        builder = builder
            .dpi(self.dpi)
            .max_rendered_pixels(self.max_pixels)
            .tesseract_bin(&self.tesseract)
            .language(&self.lang);
        if let Some(ref lib) = self.pdfium_lib {
            builder = builder.pdfium_library(lib);
        }
        if self.llm {
            builder = builder.llm(LlmConfig {
                provider_name: self.llm_provider.clone(),
                model: self.llm_model.clone(),
                ..LlmConfig::default()
            });
        }
        builder
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Extract(args) => run_extract(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let builder = ServerConfig::builder()
        .host(&args.host)
        .port(args.port)
        .allowed_origin(&args.allowed_origin)
        .max_upload_bytes(args.max_upload_mb.saturating_mul(1024 * 1024));
    let config = args
        .engines
        .apply(builder)
        .build()
        .context("Invalid server configuration")?;

    let state = AppState::from_config(&config).context("Failed to set up engines")?;
    serve(&config, state).await.context("Server failed")?;
    Ok(())
}

async fn run_extract(args: ExtractArgs) -> Result<()> {
    let config = args
        .engines
        .apply(ServerConfig::builder())
        .build()
        .context("Invalid configuration")?;

    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;

    let state = AppState::from_config(&config).context("Failed to set up engines")?;
    let outcome = state
        .process(bytes)
        .await
        .with_context(|| format!("Failed to process '{}'", args.input.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string(&outcome)
    }
    .context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
