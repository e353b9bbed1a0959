//! Shared test utilities for the notebook-site test suite.
//!
//! Provides page and bundle builders for the store and builder tests, the
//! nested scenario manifest used across modules, and lookup helpers over a
//! built [`SiteTree`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tree = manifest::parse(SCENARIO_MANIFEST).unwrap();
//! let site = build(&tree, &scenario_store(), &PathResolver::default(), out).unwrap();
//!
//! let doc = find_document(&site, "Boxes + Arrows");
//! assert_eq!(doc.page_count, 2);
//! ```

use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::bundle::{ImageFormat, MemoryStore, PageImage};
use crate::descriptor::{SiteDocument, SiteTree};
use crate::manifest::Identifier;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/notebooks/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/notebooks");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Pages and bundles
// =========================================================================

/// A small valid SVG page whose bytes differ per page number.
pub fn svg_page(n: usize) -> Vec<u8> {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="140" height="200" viewBox="0 0 140 200"><rect width="140" height="200" fill="white"/><text x="10" y="24">Page {n}</text></svg>"#
    )
    .into_bytes()
}

/// Write `<root>/<id>/1.svg … N.svg`.
pub fn write_svg_bundle(root: &Path, id: &str, pages: usize) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    for n in 1..=pages {
        std::fs::write(dir.join(format!("{n}.svg")), svg_page(n)).unwrap();
    }
}

/// Write `<root>/<id>.zip` holding the given entries verbatim.
pub fn write_zip_bundle(root: &Path, id: &str, entries: &[(String, Vec<u8>)]) {
    std::fs::create_dir_all(root).unwrap();
    let file = std::fs::File::create(root.join(format!("{id}.zip"))).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

// =========================================================================
// Scenario
// =========================================================================

/// Two levels of nesting, one display name needing sanitization.
pub const SCENARIO_MANIFEST: &str = r#"{
    "documents": {"Home": "home"},
    "folders": {
        "Posts": {
            "documents": {"Sample Notebook": "sample"},
            "folders": {
                "Folders Work Too": {
                    "documents": {
                        "Boxes + Arrows": "boxes",
                        "Pythagorean Theorem": "pythagoras"
                    }
                }
            }
        }
    }
}"#;

/// Bundles for every document in [`SCENARIO_MANIFEST`].
pub fn scenario_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for (id, pages) in [("home", 1), ("sample", 3), ("boxes", 2), ("pythagoras", 1)] {
        let pages = (1..=pages)
            .map(|n| PageImage::new(ImageFormat::Svg, svg_page(n)))
            .collect();
        store.insert(Identifier::new(id).unwrap(), pages, None);
    }
    store
}

// =========================================================================
// Site lookups, panics with a clear message on miss
// =========================================================================

/// Find a document by display name anywhere in the site. Panics if not found.
pub fn find_document<'a>(site: &'a SiteTree, name: &str) -> &'a SiteDocument {
    let docs = site.documents();
    docs.iter().copied().find(|d| d.name == name).unwrap_or_else(|| {
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        panic!("document '{name}' not found. Available: {names:?}")
    })
}

/// All document paths in encounter order.
pub fn document_paths(site: &SiteTree) -> Vec<&str> {
    site.documents().into_iter().map(|d| d.path.as_str()).collect()
}
