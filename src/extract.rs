//! Eager (whole-batch) extraction entry points.
//!
//! This module provides the simpler API: wait for every image, then return
//! one [`BatchReport`]. Use [`crate::stream::extract_stream`] instead to get
//! per-image results as they complete.
//!
//! ## Retry Strategy
//!
//! A single vision call never retries. Here, transport failures (network,
//! `429`, `5xx`, timeout) are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`); with 500 ms base and 2 retries the
//! waits are 500 ms → 1 s. Auth, model, parse and price failures are
//! reported immediately since repeating the same photo rarely changes them.

use crate::config::ExtractionConfig;
use crate::error::{ItemError, ReaderError};
use crate::output::{BatchReport, BatchStats, ImageFailure, ImageResult, LabelRecord};
use crate::pipeline::input::RawImage;
use crate::pipeline::vision::{GroqVisionClient, VisionModel, VisionResponse};
use crate::pipeline::{dedup, encode, parse, price};
use crate::prompts::extraction_prompt;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Read every tag photo in `images` and build the batch report.
///
/// # Returns
/// `Ok(BatchReport)` whenever the batch could run, even if every image
/// failed; per-image problems are listed in `report.failures`.
///
/// An empty `images` vector yields an empty report with a zero total.
///
/// # Errors
/// Returns `Err(ReaderError)` only when no usable vision client can be
/// built (e.g. missing API key), before the first image is sent.
pub async fn extract_batch(
    images: Vec<RawImage>,
    config: &ExtractionConfig,
) -> Result<BatchReport, ReaderError> {
    let start = Instant::now();
    let vision = resolve_vision(config)?;
    let total = images.len();
    info!(
        "Starting batch: {} images via {} ({})",
        total,
        vision.name(),
        config.model
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results: Vec<ImageResult> = stream::iter(images.into_iter().enumerate().map(
        |(i, image)| {
            let vision = Arc::clone(&vision);
            async move { process_image(&vision, i + 1, total, image, config).await }
        },
    ))
    // The field is public, so a hand-built config may bypass the builder.
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    // Completion order is arbitrary; the report follows input order.
    results.sort_by_key(|r| r.index);

    let report = build_report(results, start.elapsed().as_millis() as u64);

    info!(
        "Batch complete: {} records, {} failed, {} duplicates dropped, total R$ {} in {}ms",
        report.records.len(),
        report.stats.failed_images,
        report.stats.duplicates_dropped,
        report.total_display(),
        report.stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, report.stats.parsed_images);
    }

    Ok(report)
}

/// Synchronous wrapper around [`extract_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    images: Vec<RawImage>,
    config: &ExtractionConfig,
) -> Result<BatchReport, ReaderError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReaderError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_batch(images, config))
}

/// Run one image through encode → infer → parse → price.
///
/// Always returns an [`ImageResult`]; errors are stored in it rather than
/// propagated, so one bad photo never aborts the batch. `index` is 1-based.
pub async fn process_image(
    vision: &Arc<dyn VisionModel>,
    index: usize,
    total: usize,
    image: RawImage,
    config: &ExtractionConfig,
) -> ImageResult {
    let start = Instant::now();
    let image_name = image.name.clone();

    if let Some(ref cb) = config.progress_callback {
        cb.on_image_start(index, total, &image_name);
    }
    debug!("Processing {} of {}: {}", index, total, image_name);

    let mut result = ImageResult {
        index,
        image_name,
        record: None,
        error: None,
        raw_response: None,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        retries: 0,
    };

    let encoded = encode::encode_image(&image);
    // The raw bytes are not needed past this point.
    drop(image);

    let outcome = match encoded {
        Ok(encoded) => {
            let (response, retries) = infer_with_retry(vision, &encoded, index, config).await;
            result.retries = retries;
            response.and_then(|resp| {
                result.input_tokens = resp.prompt_tokens;
                result.output_tokens = resp.completion_tokens;
                result.raw_response = Some(resp.content.clone());
                to_record(&result.image_name, &resp.content)
            })
        }
        Err(e) => Err(e),
    };

    result.duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(record) => {
            debug!(
                "{}: '{}' at R$ {} ({}ms)",
                result.image_name,
                record.product,
                price::to_display(record.price_value),
                result.duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_complete(index, total, &result.image_name);
            }
            result.record = Some(record);
        }
        Err(e) => {
            warn!("{}: {} ({})", result.image_name, e, e.kind());
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_error(index, total, &result.image_name, &e.to_string());
            }
            result.error = Some(e);
        }
    }

    result
}

/// Parse a model reply and price it.
fn to_record(image_name: &str, reply: &str) -> Result<LabelRecord, ItemError> {
    let parsed = parse::parse_response(reply)?;
    let price_value = price::to_numeric(&parsed.price_text)?;
    Ok(LabelRecord {
        image_name: image_name.to_string(),
        product: parsed.product,
        price_text: parsed.price_text,
        price_value,
    })
}

/// Call the model, retrying transport failures. Returns the final outcome
/// and the number of retries spent.
async fn infer_with_retry(
    vision: &Arc<dyn VisionModel>,
    image: &encode::EncodedImage,
    index: usize,
    config: &ExtractionConfig,
) -> (Result<VisionResponse, ItemError>, u32) {
    let prompt = extraction_prompt(config);
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!(
                "Image {}: retry {}/{} after {}ms",
                index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = vision.infer(&config.model, image, prompt);
        let outcome = match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
            Ok(r) => r,
            Err(_) => Err(ItemError::Timeout {
                secs: config.api_timeout_secs,
            }),
        };

        match outcome {
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                warn!("Image {}: attempt {} failed: {}", index, attempt + 1, e);
                attempt += 1;
            }
            other => return (other, attempt),
        }
    }
}

/// Fold per-image results (already in input order) into the final report.
pub(crate) fn build_report(results: Vec<ImageResult>, total_duration_ms: u64) -> BatchReport {
    let mut stats = BatchStats {
        total_images: results.len(),
        total_duration_ms,
        ..Default::default()
    };

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for r in results {
        stats.total_input_tokens += u64::from(r.input_tokens);
        stats.total_output_tokens += u64::from(r.output_tokens);
        match (r.record, r.error) {
            (Some(record), _) => records.push(record),
            (None, Some(error)) => failures.push(ImageFailure {
                image_name: r.image_name,
                error,
            }),
            (None, None) => failures.push(ImageFailure {
                image_name: r.image_name,
                error: ItemError::Model {
                    detail: "no result produced".into(),
                },
            }),
        }
    }

    stats.parsed_images = records.len();
    stats.failed_images = failures.len();

    let (records, dropped) = dedup::dedup_records(records);
    stats.duplicates_dropped = dropped;
    let total_spend = price::total(&records);

    BatchReport {
        records,
        failures,
        total_spend,
        stats,
    }
}

/// Use the injected vision model, or build the HTTP client from config.
pub(crate) fn resolve_vision(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, ReaderError> {
    if let Some(ref vision) = config.vision {
        return Ok(Arc::clone(vision));
    }
    Ok(Arc::new(GroqVisionClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedImage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a transport error `failures` times, then answers `reply`.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        reply: &'static str,
    }

    #[async_trait]
    impl VisionModel for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn infer(
            &self,
            _model: &str,
            _image: &EncodedImage,
            _prompt: &str,
        ) -> Result<VisionResponse, ItemError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ItemError::Transport {
                    detail: "connection reset".into(),
                })
            } else {
                Ok(VisionResponse::text(self.reply))
            }
        }
    }

    fn config(vision: Arc<dyn VisionModel>, max_retries: u32) -> ExtractionConfig {
        ExtractionConfig::builder()
            .vision(vision)
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn jpeg_like(name: &str) -> RawImage {
        RawImage::new(name, b"\xFF\xD8\xFF\xE0fake".to_vec())
    }

    #[test]
    fn transport_failures_are_retried() {
        let flaky = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
            reply: "Produto: Leite\nPreço: R$ 5,00",
        });
        let vision: Arc<dyn VisionModel> = flaky.clone();
        let cfg = config(Arc::clone(&vision), 2);

        let result =
            tokio_test::block_on(process_image(&vision, 1, 1, jpeg_like("leite.jpg"), &cfg));
        assert!(result.is_success(), "error: {:?}", result.error);
        assert_eq!(result.retries, 2);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let flaky = Arc::new(Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            reply: "",
        });
        let vision: Arc<dyn VisionModel> = flaky.clone();
        let cfg = config(Arc::clone(&vision), 1);

        let result =
            tokio_test::block_on(process_image(&vision, 1, 1, jpeg_like("x.jpg"), &cfg));
        assert_eq!(result.error.as_ref().map(ItemError::kind), Some("TransportError"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unparseable_price_is_a_format_error() {
        let vision: Arc<dyn VisionModel> = Arc::new(Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
            reply: "Produto: Leite\nPreço: consultar no caixa",
        });
        let cfg = config(Arc::clone(&vision), 0);

        let result =
            tokio_test::block_on(process_image(&vision, 1, 1, jpeg_like("x.jpg"), &cfg));
        assert_eq!(
            result.error,
            Some(ItemError::Format {
                price_text: "consultar no caixa".into()
            })
        );
        assert_eq!(
            result.raw_response.as_deref(),
            Some("Produto: Leite\nPreço: consultar no caixa")
        );
    }

    #[test]
    fn empty_image_never_reaches_the_model() {
        let flaky = Arc::new(Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
            reply: "Produto: X\nPreço: R$ 1,00",
        });
        let vision: Arc<dyn VisionModel> = flaky.clone();
        let cfg = config(Arc::clone(&vision), 0);

        let result = tokio_test::block_on(process_image(
            &vision,
            1,
            1,
            RawImage::new("vazia.jpg", Vec::new()),
            &cfg,
        ));
        assert_eq!(result.error.as_ref().map(ItemError::kind), Some("EncodeError"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn build_report_counts_and_totals() {
        let ok = |i: usize, product: &str, value: f64| ImageResult {
            index: i,
            image_name: format!("{i}.jpg"),
            record: Some(LabelRecord {
                image_name: format!("{i}.jpg"),
                product: product.into(),
                price_text: price::to_display(value),
                price_value: value,
            }),
            error: None,
            raw_response: None,
            input_tokens: 100,
            output_tokens: 10,
            duration_ms: 5,
            retries: 0,
        };
        let failed = ImageResult {
            record: None,
            error: Some(ItemError::Parse {
                detail: "nope".into(),
            }),
            ..ok(3, "ignored", 0.0)
        };

        let report = build_report(
            vec![ok(1, "Arroz", 24.9), ok(2, "Arroz", 23.0), failed, ok(4, "Feijão", 7.5)],
            42,
        );

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.total_spend, 32.4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].image_name, "3.jpg");
        assert_eq!(report.stats.parsed_images, 3);
        assert_eq!(report.stats.duplicates_dropped, 1);
        assert_eq!(report.stats.total_input_tokens, 400);
        assert_eq!(report.stats.total_duration_ms, 42);
    }
}
