//! CLI binary for shelf-tag-reader.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, loads the photos and prints the table.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shelf_tag_reader::{
    collect_images, extract_batch, BatchReport, ExtractionConfig, ExtractionProgressCallback,
    ProgressCallback, ReaderError,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar plus a log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} etiquetas  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Processando");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.reset_eta();
    }

    fn on_image_start(&self, _index: usize, _total: usize, image_name: &str) {
        self.bar.set_message(image_name.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, image_name: &str) {
        self.bar.println(format!(
            "  {} {:>3} de {:<3} {}",
            green("✓"),
            index,
            total,
            image_name
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, image_name: &str, error: &str) {
        // Keep the log tidy; the full reason is repeated in the summary.
        let msg: String = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3} de {:<3} {}  {}",
            red("✗"),
            index,
            total,
            image_name,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_images: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Read every photo in a folder
  etiquetas fotos/

  # A few specific tags, JSON output
  etiquetas --json arroz.jpg feijao.jpg > compras.json

  # Another vision model, fewer parallel calls
  etiquetas --model llama-3.2-90b-vision-preview -c 2 fotos/

ENVIRONMENT VARIABLES:
  GROQ_API_KEY        Groq API key (required; also read from .env)
  GROQ_BASE_URL       Override the API root (any OpenAI-compatible endpoint)
  GROQ_VISION_MODEL   Override the vision model

ACCEPTED IMAGES:
  jpg, jpeg, png, gif, bmp, webp
"#;

/// Read product names and prices from shelf price-tag photos.
#[derive(Parser, Debug)]
#[command(
    name = "etiquetas",
    version,
    about = "Read product names and prices from shelf price-tag photos using a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Vision model ID.
    #[arg(long, env = "GROQ_VISION_MODEL")]
    model: Option<String>,

    /// API root of an OpenAI-compatible endpoint.
    #[arg(long, env = "GROQ_BASE_URL")]
    base_url: Option<String>,

    /// Number of concurrent vision API calls.
    #[arg(short, long, env = "ETIQUETAS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per image on network / rate-limit failures.
    #[arg(long, env = "ETIQUETAS_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-image API timeout in seconds.
    #[arg(long, env = "ETIQUETAS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Nucleus sampling cutoff (0.0–1.0).
    #[arg(long, default_value_t = 0.1)]
    top_p: f32,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "ETIQUETAS_PROMPT")]
    prompt: Option<PathBuf>,

    /// Output the full report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Exit with status 2 when any image failed.
    #[arg(long)]
    strict: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // The credential may live in a .env next to the photos.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config (fatal if GROQ_API_KEY is missing) ──────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Load images ──────────────────────────────────────────────────────
    let images = match collect_images(&cli.inputs) {
        Ok(images) => images,
        Err(ReaderError::NoImages) => {
            eprintln!("{} Nenhuma imagem encontrada.", yellow("ℹ"));
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to load images"),
    };
    if !cli.quiet {
        eprintln!(
            "{} {} imagem(ns) carregada(s)  {}",
            green("◆"),
            bold(&images.len().to_string()),
            dim(&format!("modelo: {}", config.model))
        );
    }

    // ── Run batch ────────────────────────────────────────────────────────
    let report = extract_batch(images, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_report(&report).context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_failures(&report);
        eprintln!(
            "   {} tokens in  /  {} tokens out  ·  {}ms total",
            dim(&report.stats.total_input_tokens.to_string()),
            dim(&report.stats.total_output_tokens.to_string()),
            report.stats.total_duration_ms,
        );
    }

    if cli.strict && !report.failures.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .from_env()
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .temperature(cli.temperature)
        .top_p(cli.top_p);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_report(report: &BatchReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if report.records.is_empty() {
        writeln!(out, "Nenhum produto identificado.")?;
    } else {
        writeln!(out, "### Lista de Produtos e Preços\n")?;
        write!(out, "{}", report.to_markdown_table())?;
    }
    writeln!(out, "\n### {}", report.total_line())?;
    Ok(())
}

fn print_failures(report: &BatchReport) {
    if report.stats.duplicates_dropped > 0 {
        eprintln!(
            "{} {} produto(s) repetido(s) ignorado(s)",
            dim("ℹ"),
            report.stats.duplicates_dropped
        );
    }
    if report.failures.is_empty() {
        eprintln!(
            "{} {} etiqueta(s) lida(s)",
            green("✔"),
            bold(&report.stats.parsed_images.to_string())
        );
        return;
    }
    eprintln!(
        "{} {}/{} etiqueta(s) com erro:",
        yellow("⚠"),
        red(&report.stats.failed_images.to_string()),
        report.stats.total_images
    );
    for line in report.failure_lines() {
        eprintln!("   {}", line);
    }
}
