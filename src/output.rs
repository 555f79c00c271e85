//! Result types produced by a batch run.
//!
//! A [`BatchReport`] is built once, after every image has been attempted,
//! and is read-only from then on. It carries the unique priced rows, the
//! images that failed (with their reason), the total spend and run stats.

use crate::error::ItemError;
use crate::pipeline::price;
use serde::{Deserialize, Serialize};

/// One priced product read from one tag photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Name of the photo the record came from.
    pub image_name: String,
    /// Product name, trimmed and non-empty. Unique within a report.
    pub product: String,
    /// Price exactly as the model wrote it, e.g. `"R$ 24,90"`.
    pub price_text: String,
    /// Numeric value of `price_text`.
    pub price_value: f64,
}

/// An image that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub image_name: String,
    pub error: ItemError,
}

/// Outcome of processing a single image.
///
/// Exactly one of `record` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    /// 1-based position in the input batch.
    pub index: usize,
    pub image_name: String,
    pub record: Option<LabelRecord>,
    pub error: Option<ItemError>,
    /// Raw model reply, when one was received.
    pub raw_response: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: u64,
    /// Transport retries spent on this image.
    pub retries: u32,
}

impl ImageResult {
    pub fn is_success(&self) -> bool {
        self.record.is_some()
    }
}

/// Counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_images: usize,
    /// Images that produced a priced record (before deduplication).
    pub parsed_images: usize,
    pub failed_images: usize,
    /// Records dropped because their product was already listed.
    pub duplicates_dropped: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Final table of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique-by-product rows in input order of first appearance.
    pub records: Vec<LabelRecord>,
    /// Failed images in input order.
    pub failures: Vec<ImageFailure>,
    /// Sum of `records[*].price_value`, rounded to cents.
    pub total_spend: f64,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Total spend formatted for display, e.g. `"32,40"`.
    pub fn total_display(&self) -> String {
        price::to_display(self.total_spend)
    }

    /// `Gasto: R$ <total>`
    pub fn total_line(&self) -> String {
        format!("Gasto: R$ {}", self.total_display())
    }

    /// GFM table with the columns `Imagem | Produto | Preço (R$)`.
    pub fn to_markdown_table(&self) -> String {
        let mut out = String::from("| Imagem | Produto | Preço (R$) |\n| --- | --- | ---: |\n");
        for r in &self.records {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&r.image_name),
                escape_cell(&r.product),
                price::to_display(r.price_value)
            ));
        }
        out
    }

    /// One line per failed image: `<name>: <kind>: <reason>`.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}: {}", f.image_name, f.error.kind(), f.error))
            .collect()
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
