//! Bundles on the local filesystem.
//!
//! ```text
//! bundles/
//! ├── 3c4d…/                 # directory layout
//! │   ├── 1.svg
//! │   ├── 2.svg
//! │   └── thumbnail.png      # optional
//! └── 5e6f….zip              # archive layout, same names,
//!     └── 5e6f…/1.svg        # top level or under an `<id>/` prefix
//! ```
//!
//! A directory wins over an archive with the same identifier. Within a
//! bundle, files whose stem is an unsigned integer are pages, ordered
//! numerically; gaps collapse (`1, 2, 5` become pages 1, 2, 3). `thumbnail.*`
//! is the designated thumbnail. Anything else is ignored.

use super::{Bundle, BundleError, BundleStore, ImageFormat, PageImage, decode};
use crate::manifest::Identifier;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const THUMBNAIL_STEM: &str = "thumbnail";

/// Store rooted at a directory of bundle directories and `.zip` archives.
#[derive(Debug, Clone)]
pub struct FsBundleStore {
    root: PathBuf,
}

impl FsBundleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BundleStore for FsBundleStore {
    fn resolve(&self, id: &Identifier) -> Result<Bundle, BundleError> {
        let dir = self.root.join(id.as_str());
        let archive = self.root.join(format!("{id}.zip"));

        let mut collector = Collector::new(id);
        if dir.is_dir() {
            tracing::debug!(%id, path = %dir.display(), "resolving directory bundle");
            read_directory(&dir, &mut collector)?;
        } else if archive.is_file() {
            tracing::debug!(%id, path = %archive.display(), "resolving archive bundle");
            read_archive(&archive, &mut collector)?;
        } else {
            return Err(BundleError::NotFound(id.clone()));
        }
        collector.finish()
    }
}

fn read_directory(dir: &Path, collector: &mut Collector<'_>) -> Result<(), BundleError> {
    let id = collector.id;
    let io_err = |source| BundleError::Io {
        id: id.clone(),
        source,
    };
    let mut wanted = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Some(kind) = classify(id, &name)? {
            wanted.push((kind, entry.path()));
        }
    }
    for (kind, path) in wanted {
        let bytes = std::fs::read(&path).map_err(io_err)?;
        collector.add(kind, &path.display().to_string(), bytes)?;
    }
    Ok(())
}

fn read_archive(path: &Path, collector: &mut Collector<'_>) -> Result<(), BundleError> {
    let id = collector.id;
    let file = File::open(path).map_err(|source| BundleError::Io {
        id: id.clone(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| BundleError::corrupt(id, format!("unreadable archive: {e}")))?;

    let prefix = format!("{id}/");
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| BundleError::corrupt(id, format!("unreadable archive entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let full_name = entry.name().to_string();
        let name = full_name.strip_prefix(&prefix).unwrap_or(&full_name);
        if name.contains('/') {
            continue;
        }
        let Some(kind) = classify(id, name)? else {
            continue;
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| BundleError::corrupt(id, format!("cannot extract {full_name}: {e}")))?;
        collector.add(kind, &full_name, bytes)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Page(u64, ImageFormat),
    Thumbnail(ImageFormat),
}

/// Decide what a bundle file is from its name alone.
fn classify(id: &Identifier, name: &str) -> Result<Option<EntryKind>, BundleError> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };
    let format = ext.and_then(ImageFormat::from_extension);

    if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
        let number: u64 = stem
            .parse()
            .map_err(|_| BundleError::corrupt(id, format!("page number out of range: {name}")))?;
        let format = format
            .ok_or_else(|| BundleError::corrupt(id, format!("unsupported page format: {name}")))?;
        return Ok(Some(EntryKind::Page(number, format)));
    }

    if stem == THUMBNAIL_STEM {
        let format = format.ok_or_else(|| {
            BundleError::corrupt(id, format!("unsupported thumbnail format: {name}"))
        })?;
        return Ok(Some(EntryKind::Thumbnail(format)));
    }

    Ok(None)
}

/// Accumulates validated pages, then orders them into a [`Bundle`].
struct Collector<'a> {
    id: &'a Identifier,
    pages: Vec<(u64, PageImage)>,
    thumbnail: Option<PageImage>,
}

impl<'a> Collector<'a> {
    fn new(id: &'a Identifier) -> Self {
        Self {
            id,
            pages: Vec::new(),
            thumbnail: None,
        }
    }

    fn add(&mut self, kind: EntryKind, source: &str, bytes: Vec<u8>) -> Result<(), BundleError> {
        let format = match kind {
            EntryKind::Page(_, format) | EntryKind::Thumbnail(format) => format,
        };
        decode::validate(format, &bytes)
            .map_err(|reason| BundleError::corrupt(self.id, format!("{source}: {reason}")))?;

        let image = PageImage::new(format, bytes);
        match kind {
            EntryKind::Page(number, _) => self.pages.push((number, image)),
            EntryKind::Thumbnail(_) => {
                if self.thumbnail.replace(image).is_some() {
                    return Err(BundleError::corrupt(self.id, "more than one thumbnail"));
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Bundle, BundleError> {
        self.pages.sort_by_key(|(number, _)| *number);
        if let Some(pair) = self.pages.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(BundleError::corrupt(
                self.id,
                format!("duplicate page number {}", pair[0].0),
            ));
        }
        let pages = self.pages.into_iter().map(|(_, image)| image).collect();
        Bundle::new(self.id.clone(), pages, self.thumbnail)
    }
}
