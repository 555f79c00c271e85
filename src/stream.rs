//! Streaming extraction API: emit per-image results as they complete.
//!
//! Unlike the eager [`crate::extract::extract_batch`], which returns only
//! after every image is done, [`extract_stream`] yields an [`ImageResult`]
//! per photo as soon as its model call finishes. Results arrive in
//! completion order; `ImageResult::index` gives the input position. Feed the
//! collected results to [`collect_report`] to get the same deduplicated
//! [`BatchReport`] the eager API builds.

use crate::config::ExtractionConfig;
use crate::error::ReaderError;
use crate::extract::{build_report, process_image, resolve_vision};
use crate::output::{BatchReport, ImageResult};
use crate::pipeline::input::RawImage;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-image results.
pub type ImageStream = Pin<Box<dyn Stream<Item = ImageResult> + Send>>;

/// Extract price tags, streaming each image's result as it is ready.
///
/// # Returns
/// - `Ok(ImageStream)`: one item per input image (empty for no images)
/// - `Err(ReaderError)`: fatal error (missing credential)
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use shelf_tag_reader::{extract_stream, ExtractionConfig, RawImage};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::builder().from_env().build()?;
/// let images = vec![RawImage::new("arroz.jpg", std::fs::read("arroz.jpg")?)];
/// let mut results = extract_stream(images, &config)?;
/// while let Some(r) = results.next().await {
///     match (&r.record, &r.error) {
///         (Some(rec), _) => println!("{}: {} {}", r.image_name, rec.product, rec.price_text),
///         (_, Some(e)) => eprintln!("{}: {e}", r.image_name),
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_stream(
    images: Vec<RawImage>,
    config: &ExtractionConfig,
) -> Result<ImageStream, ReaderError> {
    let vision = resolve_vision(config)?;
    let total = images.len();
    let concurrency = config.concurrency.max(1);
    let config = Arc::new(config.clone());
    info!("Starting streaming batch: {} images", total);

    let s = stream::iter(images.into_iter().enumerate().map(move |(i, image)| {
        let vision = Arc::clone(&vision);
        let config = Arc::clone(&config);
        async move { process_image(&vision, i + 1, total, image, &config).await }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

/// Drain `stream` and fold its results into a [`BatchReport`] in input order.
pub async fn collect_report(stream: ImageStream) -> BatchReport {
    let start = std::time::Instant::now();
    let mut results: Vec<ImageResult> = stream.collect().await;
    results.sort_by_key(|r| r.index);
    build_report(results, start.elapsed().as_millis() as u64)
}
