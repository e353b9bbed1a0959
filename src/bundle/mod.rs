//! Bundle resolution: identifier → ordered page images.
//!
//! A bundle is what the notebook export produces for one document: the
//! rendered pages, one file per page, plus an optional designated thumbnail.
//! The [`BundleStore`] trait is the seam between the builder and wherever
//! bundles live, the same way the rest of the crate is agnostic to
//! storage:
//!
//! | Store | Source |
//! |-------|--------|
//! | [`FsBundleStore`] | `root/<id>/` directories or `root/<id>.zip` archives |
//! | [`MemoryStore`]   | in-memory pages, for embedding callers and tests |
//!
//! Both validate every page on resolve (see [`decode`]), so a bundle that
//! resolves is a bundle that can be staged.

pub mod decode;
pub mod fs_store;
pub mod memory;

pub use fs_store::FsBundleStore;
pub use memory::MemoryStore;

use crate::manifest::Identifier;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Bundle not found: {0}")]
    NotFound(Identifier),
    #[error("Bundle {id} is corrupt: {reason}")]
    Corrupt { id: Identifier, reason: String },
    #[error("IO error reading bundle {id}: {source}")]
    Io {
        id: Identifier,
        #[source]
        source: std::io::Error,
    },
}

impl BundleError {
    pub(crate) fn corrupt(id: &Identifier, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

/// Encoding of one page or thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Svg,
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Case-insensitive; `jpg` and `jpeg` are both JPEG.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical extension used for staged files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Encoded bytes of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl PageImage {
    pub fn new(format: ImageFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }
}

/// A resolved bundle. Always has at least one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    id: Identifier,
    pages: Vec<PageImage>,
    thumbnail: Option<PageImage>,
}

impl Bundle {
    pub fn new(
        id: Identifier,
        pages: Vec<PageImage>,
        thumbnail: Option<PageImage>,
    ) -> Result<Self, BundleError> {
        if pages.is_empty() {
            return Err(BundleError::corrupt(&id, "bundle has no pages"));
        }
        Ok(Self {
            id,
            pages,
            thumbnail,
        })
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Pages in order; page `n` is `pages()[n - 1]`.
    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The designated thumbnail, or page 1.
    pub fn thumbnail(&self) -> &PageImage {
        self.thumbnail.as_ref().unwrap_or(&self.pages[0])
    }

    pub fn has_designated_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }
}

/// Source of bundles.
///
/// `Sync` so the builder can resolve from several staging workers at once.
/// Implementations must be read-only and idempotent: resolving the same
/// identifier twice yields equal bundles.
pub trait BundleStore: Sync {
    fn resolve(&self, id: &Identifier) -> Result<Bundle, BundleError>;
}
