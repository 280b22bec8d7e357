//! Memo of extracted text keyed by the SHA-256 of the uploaded bytes.
//!
//! Bounded by entry count; moka picks eviction victims. Capacity 0 disables caching.

use moka::sync::Cache;
use sha2::{Digest, Sha256};

use super::ExtractedText;

pub struct ExtractionCache {
    /// None when caching is disabled.
    entries: Option<Cache<String, ExtractedText>>,
}

impl ExtractionCache {
    pub fn new(capacity: usize) -> Self {
        let entries = (capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity as u64)
                .build()
        });
        Self { entries }
    }

    pub fn digest(document: &[u8]) -> String {
        hex::encode(Sha256::digest(document))
    }

    pub fn get(&self, digest: &str) -> Option<ExtractedText> {
        self.entries.as_ref()?.get(digest)
    }

    pub fn insert(&self, digest: String, extracted: ExtractedText) {
        if let Some(entries) = &self.entries {
            entries.insert(digest, extracted);
        }
    }

    /// Approximate until pending maintenance has run.
    pub fn len(&self) -> u64 {
        self.entries.as_ref().map_or(0, |c| c.entry_count())
    }

    #[cfg(test)]
    fn run_pending_tasks(&self) {
        if let Some(entries) = &self.entries {
            entries.run_pending_tasks();
        }
    }
}
