//! In-memory bundle store.
//!
//! Lets callers that already hold page images (an upload handler, a test)
//! feed the builder without touching disk. Test builds also record every
//! lookup so tests can assert on what the builder asked for; a `Mutex` rather
//! than a `RefCell` keeps the store `Sync` for the staging pool.

use super::{Bundle, BundleError, BundleStore, PageImage, decode};
use crate::manifest::Identifier;
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    bundles: HashMap<Identifier, (Vec<PageImage>, Option<PageImage>)>,
    #[cfg(test)]
    lookups: Mutex<Vec<Identifier>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a bundle.
    pub fn insert(&mut self, id: Identifier, pages: Vec<PageImage>, thumbnail: Option<PageImage>) {
        self.bundles.insert(id, (pages, thumbnail));
    }

    pub fn with_bundle(
        mut self,
        id: Identifier,
        pages: Vec<PageImage>,
        thumbnail: Option<PageImage>,
    ) -> Self {
        self.insert(id, pages, thumbnail);
        self
    }

    /// Identifiers resolved so far, in call order.
    #[cfg(test)]
    pub fn lookups(&self) -> Vec<Identifier> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }

    #[cfg(test)]
    fn record(&self, id: &Identifier) {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(id.clone());
        }
    }
}

impl BundleStore for MemoryStore {
    fn resolve(&self, id: &Identifier) -> Result<Bundle, BundleError> {
        #[cfg(test)]
        self.record(id);
        let (pages, thumbnail) = self
            .bundles
            .get(id)
            .ok_or_else(|| BundleError::NotFound(id.clone()))?;

        for (i, page) in pages.iter().chain(thumbnail).enumerate() {
            decode::validate(page.format, &page.bytes).map_err(|reason| {
                let which = if i < pages.len() {
                    format!("page {}", i + 1)
                } else {
                    "thumbnail".to_string()
                };
                BundleError::corrupt(id, format!("{which}: {reason}"))
            })?;
        }

        Bundle::new(id.clone(), pages.clone(), thumbnail.clone())
    }
}
