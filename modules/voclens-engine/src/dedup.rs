use std::collections::HashSet;

use voclens_common::ScrapedReview;

/// Fingerprint set for one company, loaded once per job. Filters new
/// batches against prior storage and against duplicates inside the same
/// batch, which is what makes repeated syncs additive.
pub struct FingerprintSet {
    seen: HashSet<String>,
}

impl FingerprintSet {
    pub fn new(existing: HashSet<String>) -> Self {
        Self { seen: existing }
    }

    /// Keep only reviews whose fingerprint has not been seen, inserting
    /// as it goes so within-batch duplicates are caught too.
    pub fn filter_new(&mut self, reviews: Vec<ScrapedReview>) -> Vec<ScrapedReview> {
        reviews
            .into_iter()
            .filter(|r| self.seen.insert(r.fingerprint.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
