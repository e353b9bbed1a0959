//! End-to-end tests: fixture manifest and bundles on disk, built and rendered
//! through the public API the CLI uses.

use notebook_site::builder::{self, BuildError, BuildMode, BuildOptions, BuildReport};
use notebook_site::bundle::{BundleError, FsBundleStore};
use notebook_site::config::{self, SiteConfig};
use notebook_site::descriptor::{DESCRIPTOR_FILE, SiteTree};
use notebook_site::manifest;
use notebook_site::navigation::NavigationModel;
use notebook_site::paths::PathResolver;
use notebook_site::render;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Copy `fixtures/notebooks/` into a fresh temp directory.
fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/notebooks");
    for entry in walkdir::WalkDir::new(&fixtures) {
        let entry = entry.unwrap();
        let target = tmp.path().join(entry.path().strip_prefix(&fixtures).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    tmp
}

fn build_and_render(
    fixtures: &Path,
    output: &Path,
    mode: BuildMode,
) -> Result<(BuildReport, SiteConfig), BuildError> {
    let config = config::load_config(fixtures).unwrap();
    let tree = manifest::load(&fixtures.join("manifest.json")).unwrap();
    let store = FsBundleStore::new(fixtures.join("bundles"));
    let options = BuildOptions {
        mode,
        ..BuildOptions::from_config(&config)
    };
    let report = builder::build_with_options(
        &tree,
        &store,
        &PathResolver::from_config(&config),
        output,
        &options,
    )?;
    render::render_site(&report.site, output, &config).unwrap();
    Ok((report, config))
}

// =========================================================================
// Full pipeline
// =========================================================================

#[test]
fn fixture_site_builds_and_renders() {
    let fixtures = setup_fixtures();
    let out = fixtures.path().join("site");
    let (report, _) = build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();

    assert_eq!(report.site.title, "Field Notes");
    assert_eq!(report.pages_written, 7);
    assert!(report.skipped.is_empty());

    for path in [
        "index.html",
        "Home/1.svg",
        "Home/1.html",
        "Posts/index.html",
        "Posts/Sample-Notebook/3.html",
        "Posts/Folders-Work-Too/index.html",
        "Posts/Folders-Work-Too/Boxes-Arrows/2.svg",
        "Posts/Folders-Work-Too/Pythagorean-Theorem/thumbnail.svg",
        "_assets/logo.svg",
        DESCRIPTOR_FILE,
    ] {
        assert!(out.join(path).is_file(), "missing {path}");
    }
    assert!(!builder::is_incomplete(&out));

    let index = std::fs::read_to_string(out.join("index.html")).unwrap();
    assert!(index.contains("<title>Field Notes</title>"));
    assert!(index.contains("--color-bg: #fdfcf8"));
    assert!(index.contains(r#"src="/_assets/logo.svg""#));
}

#[test]
fn designated_thumbnail_is_staged_separately() {
    let fixtures = setup_fixtures();
    let out = fixtures.path().join("site");
    build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();

    let doc = out.join("Posts/Sample-Notebook");
    let thumbnail = std::fs::read(doc.join("thumbnail.svg")).unwrap();
    assert_ne!(thumbnail, std::fs::read(doc.join("1.svg")).unwrap());
    assert_eq!(
        thumbnail,
        std::fs::read(fixtures.path().join("bundles/sample/thumbnail.svg")).unwrap()
    );
}

#[test]
fn descriptor_supports_navigation() {
    let fixtures = setup_fixtures();
    let out = fixtures.path().join("site");
    build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();

    let json = std::fs::read_to_string(out.join(DESCRIPTOR_FILE)).unwrap();
    let site = SiteTree::from_json(&json).unwrap();
    let nav = NavigationModel::new(&site);

    let crumbs: Vec<String> = nav
        .breadcrumbs("Posts/Folders-Work-Too/Boxes-Arrows")
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(crumbs, ["Field Notes", "Posts", "Folders Work Too", "Boxes + Arrows"]);

    let doc = nav.document("Posts/Folders-Work-Too/Boxes-Arrows").unwrap();
    let cursor = nav.page_cursor(doc, 2).unwrap();
    assert_eq!((cursor.previous, cursor.next), (Some(1), None));
}

// =========================================================================
// Determinism
// =========================================================================

#[test]
fn rebuild_is_byte_identical() {
    let fixtures = setup_fixtures();
    let out = fixtures.path().join("site");

    build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();
    let first = builder::digest_output(&out).unwrap();
    build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();
    assert_eq!(builder::digest_output(&out).unwrap(), first);
}

#[test]
fn rerender_from_descriptor_matches_build() {
    let fixtures = setup_fixtures();
    let out = fixtures.path().join("site");
    let (_, config) = build_and_render(fixtures.path(), &out, BuildMode::Strict).unwrap();
    let first = builder::digest_output(&out).unwrap();

    std::fs::remove_file(out.join("Posts/index.html")).unwrap();
    let json = std::fs::read_to_string(out.join(DESCRIPTOR_FILE)).unwrap();
    render::render_site(&SiteTree::from_json(&json).unwrap(), &out, &config).unwrap();
    assert_eq!(builder::digest_output(&out).unwrap(), first);
}

#[test]
fn zip_bundle_builds_same_site_as_directory() {
    let fixtures = setup_fixtures();
    let from_dir = fixtures.path().join("site-dir");
    build_and_render(fixtures.path(), &from_dir, BuildMode::Strict).unwrap();

    // Replace the boxes directory with an archive holding the same pages.
    let bundles = fixtures.path().join("bundles");
    let file = std::fs::File::create(bundles.join("boxes.zip")).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for n in 1..=2 {
        let bytes = std::fs::read(bundles.join(format!("boxes/{n}.svg"))).unwrap();
        zip.start_file(format!("boxes/{n}.svg"), zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&bytes).unwrap();
    }
    zip.finish().unwrap();
    std::fs::remove_dir_all(bundles.join("boxes")).unwrap();

    let from_zip = fixtures.path().join("site-zip");
    build_and_render(fixtures.path(), &from_zip, BuildMode::Strict).unwrap();
    assert_eq!(
        builder::digest_output(&from_zip).unwrap(),
        builder::digest_output(&from_dir).unwrap()
    );
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn missing_bundle_strict_vs_best_effort() {
    let fixtures = setup_fixtures();
    std::fs::remove_dir_all(fixtures.path().join("bundles/pythagoras")).unwrap();

    let strict_out = fixtures.path().join("strict");
    let err = build_and_render(fixtures.path(), &strict_out, BuildMode::Strict).unwrap_err();
    assert!(matches!(
        err,
        BuildError::DocumentResolutionFailed { source: BundleError::NotFound(_), .. }
    ));
    assert!(builder::is_incomplete(&strict_out));

    let lenient_out = fixtures.path().join("lenient");
    let (report, _) = build_and_render(fixtures.path(), &lenient_out, BuildMode::BestEffort).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].identifier.as_str(), "pythagoras");
    assert!(!lenient_out.join("Posts/Folders-Work-Too/Pythagorean-Theorem").exists());
    let folder = std::fs::read_to_string(lenient_out.join("Posts/Folders-Work-Too/index.html")).unwrap();
    assert!(folder.contains("Boxes + Arrows"));
    assert!(!folder.contains("Pythagorean Theorem"));
}

#[test]
fn corrupt_page_is_reported() {
    let fixtures = setup_fixtures();
    std::fs::write(fixtures.path().join("bundles/home/2.svg"), "<svg><g></svg>").unwrap();

    let err = build_and_render(fixtures.path(), &fixtures.path().join("site"), BuildMode::Strict)
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::DocumentResolutionFailed { source: BundleError::Corrupt { .. }, .. }
    ));
}
