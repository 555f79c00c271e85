//! # shelf-tag-reader
//!
//! Read product names and prices from photos of retail shelf price tags
//! ("etiquetas") using a Vision Language Model, and total them up.
//!
//! Each photo is sent to a multimodal chat model together with a fixed
//! prompt that asks for exactly two lines, `Produto: …` and `Preço: R$ …`.
//! The reply is parsed into a typed row, priced, deduplicated by product
//! name, and summed into a [`BatchReport`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! photos
//!  │
//!  ├─ 1. Input   RawImage { name, bytes, mime_type }
//!  ├─ 2. Encode  sniff format → base64 data URI
//!  ├─ 3. VLM     concurrent chat-completion calls (Groq by default)
//!  ├─ 4. Parse   Produto: / Preço: lines → ParsedLabel
//!  ├─ 5. Price   "R$ 24,90" → 24.90
//!  └─ 6. Report  first-seen unique products + total spend + failures
//! ```
//!
//! A failure on one photo (network, model, unreadable reply, non-numeric
//! price) is attached to that photo and never aborts the batch. Only a
//! missing credential is fatal; an empty batch yields an empty report with
//! a zero total.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelf_tag_reader::{extract_batch, ExtractionConfig, RawImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GROQ_API_KEY (and optional GROQ_BASE_URL / GROQ_VISION_MODEL)
//!     let config = ExtractionConfig::builder().from_env().build()?;
//!     let images = vec![RawImage::new("arroz.jpg", std::fs::read("arroz.jpg")?)];
//!
//!     let report = extract_batch(images, &config).await?;
//!     print!("{}", report.to_markdown_table());
//!     println!("{}", report.total_line());
//!     for line in report.failure_lines() {
//!         eprintln!("⚠ {line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `etiquetas` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ItemError, ReaderError};
pub use extract::{extract_batch, extract_sync, process_image};
pub use output::{BatchReport, BatchStats, ImageFailure, ImageResult, LabelRecord};
pub use pipeline::input::{collect_images, RawImage};
pub use pipeline::vision::{GroqVisionClient, VisionModel, VisionResponse};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{collect_report, extract_stream, ImageStream};
