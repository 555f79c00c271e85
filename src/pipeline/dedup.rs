//! Product-identity deduplication across a batch.
//!
//! Several photos of the same shelf often show the same tag. A product is
//! identified by its exact name (case-sensitive, already trimmed by the
//! parser); the first record seen wins and later ones are dropped together
//! with their price. There is no merge and no "latest wins".

use crate::output::LabelRecord;
use std::collections::HashSet;
use tracing::debug;

/// Accumulates unique records in first-seen order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    records: Vec<LabelRecord>,
    dropped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `record` unless its product was already seen. Returns whether it
    /// was kept.
    pub fn insert(&mut self, record: LabelRecord) -> bool {
        if self.seen.contains(&record.product) {
            debug!(
                "Dropping duplicate '{}' from {} (price {})",
                record.product, record.image_name, record.price_text
            );
            self.dropped += 1;
            return false;
        }
        self.seen.insert(record.product.clone());
        self.records.push(record);
        true
    }

    /// Number of records dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<LabelRecord> {
        self.records
    }
}

impl Extend<LabelRecord> for Deduplicator {
    fn extend<I: IntoIterator<Item = LabelRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Deduplicate `records`, returning the unique ones and the drop count.
pub fn dedup_records(records: impl IntoIterator<Item = LabelRecord>) -> (Vec<LabelRecord>, usize) {
    let mut dedup = Deduplicator::new();
    dedup.extend(records);
    let dropped = dedup.dropped();
    (dedup.into_records(), dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: &str, product: &str, value: f64) -> LabelRecord {
        LabelRecord {
            image_name: image.into(),
            product: product.into(),
            price_text: format!("R$ {value:.2}").replace('.', ","),
            price_value: value,
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let (unique, dropped) = dedup_records([
            record("1.jpg", "Leite", 5.00),
            record("2.jpg", "Leite", 5.20),
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].image_name, "1.jpg");
        assert_eq!(unique[0].price_value, 5.00);
    }

    #[test]
    fn first_seen_order_is_kept() {
        let (unique, _) = dedup_records([
            record("1.jpg", "Café", 18.99),
            record("2.jpg", "Arroz", 24.90),
            record("3.jpg", "Café", 17.50),
            record("4.jpg", "Feijão", 7.50),
        ]);
        let names: Vec<&str> = unique.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(names, ["Café", "Arroz", "Feijão"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let (unique, dropped) =
            dedup_records([record("1.jpg", "Leite", 5.0), record("2.jpg", "LEITE", 5.0)]);
        assert_eq!(unique.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn size_equals_distinct_names() {
        let names = ["a", "b", "a", "c", "b", "a"];
        let records = names
            .iter()
            .enumerate()
            .map(|(i, n)| record(&format!("{i}.jpg"), n, i as f64));
        let (unique, dropped) = dedup_records(records);
        assert_eq!(unique.len(), 3);
        assert_eq!(dropped, 3);

        // Running it again changes nothing.
        let (again, dropped_again) = dedup_records(unique.clone());
        assert_eq!(again, unique);
        assert_eq!(dropped_again, 0);
    }

    #[test]
    fn insert_reports_whether_kept() {
        let mut d = Deduplicator::new();
        assert!(d.is_empty());
        assert!(d.insert(record("1.jpg", "Pão", 1.0)));
        assert!(!d.insert(record("2.jpg", "Pão", 2.0)));
        assert_eq!(d.len(), 1);
        assert_eq!(d.dropped(), 1);
    }
}
