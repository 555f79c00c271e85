//! Pipeline stages for price-tag extraction.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the vision provider can be swapped without
//! touching parsing or pricing.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ vision ──▶ parse ──▶ price ──▶ dedup
//! (files)   (base64)   (VLM)      (2 lines)  (R$→f64)  (first wins)
//! ```
//!
//! 1. [`input`] : load photos from disk into [`input::RawImage`]s
//! 2. [`encode`]: sniff the format, base64-wrap for the data URI
//! 3. [`vision`]: one chat-completion call per image; the only stage with
//!    network I/O
//! 4. [`parse`] : read `Produto:` / `Preço:` out of the reply
//! 5. [`price`] : decimal-comma text to number, display formatting, totals
//! 6. [`dedup`] : keep the first record per product name

pub mod dedup;
pub mod encode;
pub mod input;
pub mod parse;
pub mod price;
pub mod vision;
