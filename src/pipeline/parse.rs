//! Reply parsing: two labelled lines → [`ParsedLabel`].
//!
//! The prompt asks for
//!
//! ```text
//! Produto: <name>
//! Preço: R$ <value>
//! ```
//!
//! Models mostly comply but decorate: `**Produto:**` in bold, a bullet in
//! front, a chatty preamble line, CRLF line endings. Lines are matched by marker,
//! not by position, so a reply that puts the price first still parses.
//! Anything that does not yield both fields is a [`ItemError::Parse`]; a
//! partial record is never returned.

use crate::error::ItemError;
use crate::prompts::{PRICE_MARKER, PRODUCT_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;

/// Unaccented spelling some models fall back to.
const PRICE_MARKER_ASCII: &str = "Preco:";

/// Product name and raw price text as read from the model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    /// Trimmed, never empty.
    pub product: String,
    /// Trimmed text after the price marker, e.g. `"R$ 24,90"`.
    pub price_text: String,
}

static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__").unwrap());

/// Parse a model reply into a product/price pair.
pub fn parse_response(raw: &str) -> Result<ParsedLabel, ItemError> {
    let cleaned = RE_EMPHASIS.replace_all(raw, "");
    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(parse_error(format!(
            "expected two lines, got {}: {:?}",
            lines.len(),
            preview(raw)
        )));
    }

    let product = find_field(&lines, &[PRODUCT_MARKER])
        .ok_or_else(|| parse_error(format!("missing '{PRODUCT_MARKER}' line: {:?}", preview(raw))))?;
    let price_text = find_field(&lines, &[PRICE_MARKER, PRICE_MARKER_ASCII])
        .ok_or_else(|| parse_error(format!("missing '{PRICE_MARKER}' line: {:?}", preview(raw))))?;

    if product.is_empty() {
        return Err(parse_error("product name is empty".to_string()));
    }

    Ok(ParsedLabel {
        product,
        price_text,
    })
}

/// Text after the first marker occurrence on the first line carrying any of
/// `markers`, trimmed.
fn find_field(lines: &[&str], markers: &[&str]) -> Option<String> {
    lines.iter().find_map(|line| {
        markers.iter().find_map(|marker| {
            line.find(marker)
                .map(|pos| line[pos + marker.len()..].trim().to_string())
        })
    })
}

fn parse_error(detail: String) -> ItemError {
    ItemError::Parse { detail }
}

fn preview(raw: &str) -> String {
    const MAX: usize = 80;
    let mut s: String = raw.chars().take(MAX).collect();
    if raw.chars().count() > MAX {
        s.push('…');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(product: &str, price: &str) -> ParsedLabel {
        ParsedLabel {
            product: product.into(),
            price_text: price.into(),
        }
    }

    #[test]
    fn well_formed_reply() {
        let r = parse_response("Produto: Arroz 5kg\nPreço: R$ 24,90").unwrap();
        assert_eq!(r, parsed("Arroz 5kg", "R$ 24,90"));
    }

    #[test]
    fn fields_are_trimmed_substrings_after_markers() {
        let r = parse_response("Produto:    Feijão Carioca 1kg   \nPreço:   R$ 7,50  ").unwrap();
        assert_eq!(r, parsed("Feijão Carioca 1kg", "R$ 7,50"));
    }

    #[test]
    fn bold_markers_and_crlf_are_tolerated() {
        let r = parse_response("**Produto:** Leite Integral\r\n**Preço:** R$ 5,00\r\n").unwrap();
        assert_eq!(r, parsed("Leite Integral", "R$ 5,00"));
    }

    #[test]
    fn bullets_are_tolerated() {
        let r = parse_response("- Produto: Café 500g\n- Preço: R$ 18,99").unwrap();
        assert_eq!(r, parsed("Café 500g", "R$ 18,99"));
    }

    #[test]
    fn order_does_not_matter() {
        let r = parse_response("Preço: R$ 3,49\nProduto: Macarrão").unwrap();
        assert_eq!(r, parsed("Macarrão", "R$ 3,49"));
    }

    #[test]
    fn extra_lines_are_ignored() {
        let raw = "Aqui está a resposta:\nProduto: Óleo de Soja\nPreço: R$ 8,79\nObservação: preço cooperado";
        let r = parse_response(raw).unwrap();
        assert_eq!(r, parsed("Óleo de Soja", "R$ 8,79"));
    }

    #[test]
    fn unaccented_price_marker_is_accepted() {
        let r = parse_response("Produto: Açúcar\nPreco: R$ 4,20").unwrap();
        assert_eq!(r.price_text, "R$ 4,20");
    }

    #[test]
    fn single_line_is_rejected() {
        let err = parse_response("Could not determine product").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn missing_price_marker_is_rejected() {
        let err = parse_response("Produto: Leite\nValor: R$ 5,00").unwrap_err();
        assert!(err.to_string().contains("Preço:"), "got: {err}");
    }

    #[test]
    fn missing_product_marker_is_rejected() {
        let err = parse_response("Item: Leite\nPreço: R$ 5,00").unwrap_err();
        assert!(err.to_string().contains("Produto:"), "got: {err}");
    }

    #[test]
    fn empty_product_is_rejected() {
        let err = parse_response("Produto:   \nPreço: R$ 5,00").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn blank_lines_do_not_count() {
        let err = parse_response("\n\nProduto: Leite\n\n").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }
}
