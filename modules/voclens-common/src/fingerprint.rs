use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Deterministic content fingerprint for a review, used as the dedup key
/// across scrape runs. Built from the normalized text plus reviewer name
/// and date so the same review yields the same fingerprint regardless of
/// which parser path produced it.
pub fn review_fingerprint(text: &str, reviewer_name: Option<&str>, date: Option<NaiveDate>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text));
    hasher.update([0x1f]);
    hasher.update(reviewer_name.unwrap_or("").trim().to_lowercase());
    hasher.update([0x1f]);
    hasher.update(date.map(|d| d.to_string()).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// Lowercase and collapse all whitespace runs to single spaces, so that
/// markup-driven formatting differences don't defeat dedup.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
