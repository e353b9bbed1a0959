//! Site building: stage every document's bundle into the output tree.
//!
//! Stage 2 of the pipeline. Takes the [`ManifestTree`], assigns paths, pulls
//! each document's bundle from a [`BundleStore`] and writes its pages under
//! the document's resolved path. The result is a [`SiteTree`] descriptor,
//! also written to `site.json`.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── .notebook-site             # Ownership marker
//! ├── site.json                  # SiteTree descriptor
//! ├── _assets/logo.svg           # Optional logo (thumbnail of the logo bundle)
//! ├── Home/
//! │   ├── 1.svg … N.svg          # Pages, renumbered 1..N
//! │   └── thumbnail.svg          # Designated thumbnail or page 1
//! └── Posts/
//!     └── Folders-Work-Too/
//!         └── Boxes-Arrows/…
//! ```
//!
//! ## Rebuilds
//!
//! The output directory belongs to the builder. Each build clears it and
//! regenerates everything, so deleted or renamed documents never leave
//! orphans, and the same manifest and bundles give a byte-identical tree
//! (see [`digest_output`]). A directory that has content but no
//! `.notebook-site` marker is refused rather than wiped.
//!
//! While a build runs, `.build-incomplete` sits in the output root. It is
//! removed only after `site.json` is written, so a failed or cancelled build
//! is always detectable with [`is_incomplete`].
//!
//! ## Parallel Staging
//!
//! Documents are resolved and staged on a private [rayon](https://docs.rs/rayon)
//! pool. Each document writes only inside its own directory; folder
//! directories are created before staging starts.

use crate::bundle::{BundleError, BundleStore, PageImage};
use crate::config::{self, SiteConfig};
use crate::descriptor::{DESCRIPTOR_FILE, SiteDocument, SiteFolder, SiteNode, SiteTree, StagedPage};
use crate::manifest::{Folder, Identifier, ManifestTree, NamePath, Node};
use crate::paths::{Disambiguation, PathError, PathMap, PathResolver, ResolvedPath};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Marks a directory as owned (and therefore clearable) by the builder.
pub const OWNERSHIP_MARKER: &str = ".notebook-site";

/// Present while a build is in progress or after it failed.
pub const INCOMPLETE_MARKER: &str = ".build-incomplete";

/// Directory for site-level assets. Starts with `_`, which no sanitized
/// segment can, so it never collides with a node.
pub const ASSETS_DIR: &str = "_assets";

const DEFAULT_TITLE: &str = "Notebooks";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Cannot resolve document {node} (bundle {identifier}): {source}")]
    DocumentResolutionFailed {
        node: NamePath,
        identifier: Identifier,
        #[source]
        source: BundleError,
    },
    #[error("Cannot resolve logo bundle {identifier}: {source}")]
    LogoResolutionFailed {
        identifier: Identifier,
        #[source]
        source: BundleError,
    },
    #[error("Refusing to clear {0}: not empty and not created by notebook-site")]
    OutputNotOwned(PathBuf),
    #[error("Build cancelled")]
    Cancelled,
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("No path assigned to {0}")]
    Unassigned(NamePath),
}

/// What to do when a document's bundle cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Abort the build on the first failing document.
    #[default]
    Strict,
    /// Leave the document out and report it.
    BestEffort,
}

/// Cooperative cancellation for a running build.
///
/// Cloning shares the flag. Staging workers check it before every file
/// write.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub mode: BuildMode,
    /// Staging workers. 0 is treated as 1.
    pub threads: usize,
    pub cancel: CancelFlag,
    /// Recorded in the descriptor; names the root breadcrumb.
    pub title: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::Strict,
            threads: config::effective_threads(&config::ProcessingConfig::default()),
            cancel: CancelFlag::new(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl BuildOptions {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            mode: if config.build.best_effort {
                BuildMode::BestEffort
            } else {
                BuildMode::Strict
            },
            threads: config::effective_threads(&config.processing),
            cancel: CancelFlag::new(),
            title: config.title.clone(),
        }
    }
}

/// A document (or the logo, with a root node) left out in best-effort mode.
#[derive(Debug)]
pub struct Skipped {
    pub node: NamePath,
    pub identifier: Identifier,
    pub error: BundleError,
}

impl Skipped {
    pub fn is_logo(&self) -> bool {
        self.node.is_root()
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub site: SiteTree,
    pub skipped: Vec<Skipped>,
    pub disambiguations: Vec<Disambiguation>,
    pub pages_written: usize,
}

/// Build with default options (strict, all cores).
pub fn build(
    tree: &ManifestTree,
    store: &dyn BundleStore,
    resolver: &PathResolver,
    output_root: &Path,
) -> Result<SiteTree, BuildError> {
    build_with_options(tree, store, resolver, output_root, &BuildOptions::default())
        .map(|report| report.site)
}

pub fn build_with_options(
    tree: &ManifestTree,
    store: &dyn BundleStore,
    resolver: &PathResolver,
    output_root: &Path,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    // Path errors must surface before anything on disk changes.
    let paths = resolver.assign(tree)?;

    prepare_output(output_root)?;
    tracing::info!(output = %output_root.display(), "prepared output directory");

    for (chain, node) in tree.nodes() {
        if let Node::Folder(_) = node {
            create_dir(&path_for(&paths, &chain)?.to_fs_path(output_root))?;
        }
    }

    let jobs = tree
        .documents()
        .into_iter()
        .map(|(chain, doc)| -> Result<Job, BuildError> {
            Ok(Job {
                path: path_for(&paths, &chain)?.clone(),
                node: chain,
                identifier: doc.identifier().clone(),
            })
        })
        .collect::<Result<Vec<Job>, BuildError>>()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()
        .map_err(io::Error::other)?;
    let ctx = StageContext {
        store,
        output_root,
        cancel: &options.cancel,
        abort: AtomicBool::new(false),
        strict: options.mode == BuildMode::Strict,
    };
    let outcomes: Vec<Result<StagedDocument, StageFailure>> =
        pool.install(|| jobs.par_iter().map(|job| ctx.stage(job)).collect());

    if options.cancel.is_cancelled() {
        return Err(BuildError::Cancelled);
    }

    let mut staged: HashMap<NamePath, StagedDocument> = HashMap::new();
    let mut skipped = Vec::new();
    for (job, outcome) in jobs.into_iter().zip(outcomes) {
        match outcome {
            Ok(doc) => {
                staged.insert(job.node, doc);
            }
            Err(StageFailure::Resolve(source)) if !ctx.strict => {
                tracing::warn!(node = %job.node, identifier = %job.identifier, error = %source, "skipping document");
                skipped.push(Skipped {
                    node: job.node,
                    identifier: job.identifier,
                    error: source,
                });
            }
            Err(StageFailure::Resolve(source)) => {
                return Err(BuildError::DocumentResolutionFailed {
                    node: job.node,
                    identifier: job.identifier,
                    source,
                });
            }
            Err(StageFailure::Write { path, source }) => {
                return Err(BuildError::Write { path, source });
            }
            Err(StageFailure::Cancelled) => return Err(BuildError::Cancelled),
            // Another document failed first; its error is reported instead.
            Err(StageFailure::Aborted) => {}
        }
    }

    let logo = match tree.logo() {
        Some(id) => match store.resolve(id) {
            Ok(bundle) => {
                if options.cancel.is_cancelled() {
                    return Err(BuildError::Cancelled);
                }
                Some(stage_logo(bundle.thumbnail(), output_root)?)
            }
            Err(source) if !ctx.strict => {
                tracing::warn!(identifier = %id, error = %source, "skipping logo");
                skipped.push(Skipped {
                    node: NamePath::root(),
                    identifier: id.clone(),
                    error: source,
                });
                None
            }
            Err(source) => {
                return Err(BuildError::LogoResolutionFailed {
                    identifier: id.clone(),
                    source,
                });
            }
        },
        None => None,
    };

    let pages_written = staged.values().map(|doc| doc.pages.len()).sum();
    let site = SiteTree {
        title: options.title.clone(),
        logo,
        root: assemble_folder(tree.root(), &NamePath::root(), &paths, &mut staged)?,
    };

    if options.cancel.is_cancelled() {
        return Err(BuildError::Cancelled);
    }
    let descriptor = output_root.join(DESCRIPTOR_FILE);
    write_file(&descriptor, format!("{}\n", site.to_json()?).as_bytes())?;
    remove_marker(output_root)?;

    tracing::info!(
        documents = site.documents().len(),
        pages = pages_written,
        skipped = skipped.len(),
        "build complete"
    );

    Ok(BuildReport {
        site,
        skipped,
        disambiguations: paths.disambiguations().to_vec(),
        pages_written,
    })
}

/// Whether `output_root` holds a failed, cancelled or still-running build.
pub fn is_incomplete(output_root: &Path) -> bool {
    output_root.join(INCOMPLETE_MARKER).exists()
}

/// SHA-256 over every file under `root`: relative paths in sorted order,
/// each followed by its contents. Equal digests mean byte-identical trees.
pub fn digest_output(root: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let contents = std::fs::read(entry.path())?;
        hasher.update(relative.as_bytes());
        hasher.update(b"\0");
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Output directory lifecycle
// ============================================================================

fn prepare_output(root: &Path) -> Result<(), BuildError> {
    if root.exists() {
        if !root.is_dir() {
            return Err(BuildError::OutputNotOwned(root.to_path_buf()));
        }
        let entries = std::fs::read_dir(root)?.collect::<Result<Vec<_>, _>>()?;
        if !entries.is_empty() && !root.join(OWNERSHIP_MARKER).is_file() {
            return Err(BuildError::OutputNotOwned(root.to_path_buf()));
        }
        for entry in entries {
            let path = entry.path();
            let removed = if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|source| BuildError::Write { path, source })?;
        }
    } else {
        create_dir(root)?;
    }

    write_file(&root.join(OWNERSHIP_MARKER), b"notebook-site\n")?;
    write_file(&root.join(INCOMPLETE_MARKER), b"")?;
    Ok(())
}

fn remove_marker(root: &Path) -> Result<(), BuildError> {
    let path = root.join(INCOMPLETE_MARKER);
    std::fs::remove_file(&path).map_err(|source| BuildError::Write { path, source })
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(path).map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BuildError> {
    std::fs::write(path, bytes).map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Staging
// ============================================================================

struct Job {
    node: NamePath,
    identifier: Identifier,
    path: ResolvedPath,
}

struct StagedDocument {
    identifier: Identifier,
    pages: Vec<StagedPage>,
    thumbnail: String,
}

enum StageFailure {
    Resolve(BundleError),
    Write { path: PathBuf, source: io::Error },
    Cancelled,
    Aborted,
}

struct StageContext<'a> {
    store: &'a dyn BundleStore,
    output_root: &'a Path,
    cancel: &'a CancelFlag,
    /// Set by the first failure in strict mode; stops the remaining workers.
    abort: AtomicBool,
    strict: bool,
}

impl StageContext<'_> {
    fn check(&self) -> Result<(), StageFailure> {
        if self.cancel.is_cancelled() {
            Err(StageFailure::Cancelled)
        } else if self.abort.load(Ordering::SeqCst) {
            Err(StageFailure::Aborted)
        } else {
            Ok(())
        }
    }

    fn fail(&self, failure: StageFailure) -> StageFailure {
        if self.strict || matches!(failure, StageFailure::Write { .. }) {
            self.abort.store(true, Ordering::SeqCst);
        }
        failure
    }

    fn stage(&self, job: &Job) -> Result<StagedDocument, StageFailure> {
        self.check()?;
        let bundle = self
            .store
            .resolve(&job.identifier)
            .map_err(|e| self.fail(StageFailure::Resolve(e)))?;
        tracing::debug!(node = %job.node, pages = bundle.page_count(), "resolved bundle");

        let dir = job.path.to_fs_path(self.output_root);
        std::fs::create_dir_all(&dir).map_err(|source| {
            self.fail(StageFailure::Write {
                path: dir.clone(),
                source,
            })
        })?;

        let base = job.path.as_url();
        let mut pages = Vec::with_capacity(bundle.page_count());
        for (i, page) in bundle.pages().iter().enumerate() {
            let number = i + 1;
            let file_name = format!("{number}.{}", page.format.extension());
            self.check()?;
            self.write(&dir.join(&file_name), &page.bytes)?;
            pages.push(StagedPage {
                number,
                path: join_url(&base, &file_name),
            });
        }

        let thumb = bundle.thumbnail();
        let thumb_name = format!("thumbnail.{}", thumb.format.extension());
        self.check()?;
        self.write(&dir.join(&thumb_name), &thumb.bytes)?;

        tracing::debug!(node = %job.node, path = %base, "staged document");
        Ok(StagedDocument {
            identifier: job.identifier.clone(),
            pages,
            thumbnail: join_url(&base, &thumb_name),
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StageFailure> {
        std::fs::write(path, bytes).map_err(|source| {
            self.fail(StageFailure::Write {
                path: path.to_path_buf(),
                source,
            })
        })
    }
}

fn stage_logo(image: &PageImage, output_root: &Path) -> Result<String, BuildError> {
    let dir = output_root.join(ASSETS_DIR);
    create_dir(&dir)?;
    let file_name = format!("logo.{}", image.format.extension());
    write_file(&dir.join(&file_name), &image.bytes)?;
    Ok(format!("{ASSETS_DIR}/{file_name}"))
}

fn join_url(base: &str, file_name: &str) -> String {
    if base.is_empty() {
        file_name.to_string()
    } else {
        format!("{base}/{file_name}")
    }
}

// ============================================================================
// Descriptor assembly
// ============================================================================

fn assemble_folder(
    folder: &Folder,
    chain: &NamePath,
    paths: &PathMap,
    staged: &mut HashMap<NamePath, StagedDocument>,
) -> Result<SiteFolder, BuildError> {
    let mut children = Vec::with_capacity(folder.children().len());
    for child in folder.children() {
        let child_chain = chain.child(child.name());
        let path = path_for(paths, &child_chain)?.as_url();
        match child {
            Node::Folder(sub) => {
                children.push(SiteNode::Folder(assemble_folder(
                    sub,
                    &child_chain,
                    paths,
                    staged,
                )?));
            }
            Node::Document(doc) => {
                // Absent when skipped in best-effort mode.
                if let Some(staged_doc) = staged.remove(&child_chain) {
                    children.push(SiteNode::Document(SiteDocument {
                        name: doc.name().to_string(),
                        path,
                        identifier: staged_doc.identifier.to_string(),
                        page_count: staged_doc.pages.len(),
                        pages: staged_doc.pages,
                        thumbnail: staged_doc.thumbnail,
                    }));
                }
            }
        }
    }

    Ok(SiteFolder {
        name: folder.name().to_string(),
        path: path_for(paths, chain)?.as_url(),
        children,
    })
}

fn path_for<'a>(paths: &'a PathMap, chain: &NamePath) -> Result<&'a ResolvedPath, BuildError> {
    paths
        .get(chain)
        .ok_or_else(|| BuildError::Unassigned(chain.clone()))
}
