//! Instruction text sent to the vision model with every tag photo.
//!
//! The prompt pushes the parsing problem upstream: instead of interpreting a
//! free-form description of the tag, we ask the model for exactly two
//! labelled lines and parse those (see [`crate::pipeline::parse`]). Keeping
//! the text here lets tests check the extraction policy without a model.
//!
//! Callers can override the default via [`crate::config::ExtractionConfig::prompt`].

use crate::config::ExtractionConfig;

/// Marker that opens the product line of the reply.
pub const PRODUCT_MARKER: &str = "Produto:";

/// Marker that opens the price line of the reply.
pub const PRICE_MARKER: &str = "Preço:";

/// Default extraction prompt. Identical for every image in a batch.
///
/// Price policy, in order:
/// 1. a member price ("EXCLUSIVO PARA COOPERADOS" / "COOPERADOS"),
/// 2. otherwise the regular price ("PRECO NORMAL"),
/// 3. when a discounted "POR R$" price is printed, the lower of the two.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert assistant in reading retail shelf price tags with precision.

Rules:
1. Extract exactly ONE product name and ONE price from the image.
2. A product must appear only once in the answer.
3. Price source, in priority order:
   - the price labelled 'EXCLUSIVO PARA COOPERADOS' or 'COOPERADOS'
   - otherwise the price labelled 'PRECO NORMAL'
4. A discounted price starts with 'POR R$'. When one is present, answer with
   the LOWER of the discounted price and the normal price.
5. Do NOT describe the steps you took. Answer in Portuguese with ONLY these
   two lines and nothing else:

Produto: <nome do produto>
Preço: R$ <preço com vírgula decimal, por exemplo 12,34>"#;

/// Prompt for the given config: the override when set, the default otherwise.
pub fn extraction_prompt(config: &ExtractionConfig) -> &str {
    config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT)
}
