//! CLI output formatting for `check` and `build`.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (folder, document) is its display name and positional
//! index among its siblings, followed by `→` and the resolved path. Bundle
//! identifiers and errors are indented context lines underneath.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Documents
//! 001 Home → Home/
//!     Identifier: home
//! 002 Posts → Posts/
//!     001 Sample Notebook → Posts/Sample-Notebook/
//!         Identifier: sample
//!
//! Disambiguated
//!     Notes! → Notes-2 (Notes taken)
//!
//! Checked 2 documents in 1 folder
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! 001 Home (1 page) → Home/
//! 002 Posts → Posts/
//!     001 Sample Notebook (3 pages) → Posts/Sample-Notebook/
//!
//! Skipped
//!     Ghost (ghost): Bundle not found: ghost
//!
//! Built 2 documents, 4 pages
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::builder::BuildReport;
use crate::descriptor::{SiteFolder, SiteNode};
use crate::manifest::{Folder, ManifestTree, NamePath, Node};
use crate::paths::PathMap;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + name, with optional page count.
///
/// ```text
/// 001 Sample Notebook (3 pages)
/// 002 Posts
/// ```
fn entity_header(index: usize, name: &str, pages: Option<usize>) -> String {
    match pages {
        Some(1) => format!("{} {} (1 page)", format_index(index), name),
        Some(n) => format!("{} {} ({} pages)", format_index(index), name, n),
        None => format!("{} {}", format_index(index), name),
    }
}

/// Directory form of a root-relative path.
fn dir_display(path: &str) -> String {
    if path.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", path)
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Stage banners
// ============================================================================

/// Banner before the builder runs. Path resolution and staging happen in one
/// call, so stages 1 and 2 share it.
pub fn format_build_banner(documents: usize) -> String {
    format!(
        "==> Stages 1-2: Resolving paths and staging {}",
        plural(documents, "document", "documents")
    )
}

/// Banner before HTML rendering.
pub fn format_render_banner(output: &Path) -> String {
    format!("==> Stage 3: Rendering HTML \u{2192} {}", output.display())
}

// ============================================================================
// Check output
// ============================================================================

/// Format the manifest hierarchy with the path assigned to every node.
pub fn format_check_output(tree: &ManifestTree, paths: &PathMap) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    walk_manifest(tree.root(), &NamePath::root(), paths, 0, &mut lines);

    if !paths.disambiguations().is_empty() {
        lines.push(String::new());
        lines.push("Disambiguated".to_string());
        for d in paths.disambiguations() {
            let name = d.node.names().last().map(String::as_str).unwrap_or_default();
            lines.push(format!(
                "    {} \u{2192} {} ({} taken)",
                name, d.assigned, d.sanitized
            ));
        }
    }

    let documents = tree.documents().len();
    let folders = tree.nodes().len() - documents;
    lines.push(String::new());
    lines.push(format!(
        "Checked {} in {}",
        plural(documents, "document", "documents"),
        plural(folders, "folder", "folders")
    ));
    lines
}

fn walk_manifest(
    folder: &Folder,
    chain: &NamePath,
    paths: &PathMap,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let base_indent = indent(depth);
    for (i, child) in folder.children().iter().enumerate() {
        let child_chain = chain.child(child.name());
        let target = paths
            .get(&child_chain)
            .map(|p| dir_display(&p.as_url()))
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!(
            "{}{} \u{2192} {}",
            base_indent,
            entity_header(i + 1, child.name(), None),
            target
        ));
        match child {
            Node::Document(doc) => {
                lines.push(format!("{}    Identifier: {}", base_indent, doc.identifier()));
            }
            Node::Folder(sub) => walk_manifest(sub, &child_chain, paths, depth + 1, lines),
        }
    }
}

/// Print check output to stdout.
pub fn print_check_output(tree: &ManifestTree, paths: &PathMap) {
    for line in format_check_output(tree, paths) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format the built site, skipped bundles and totals.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = vec!["Home \u{2192} index.html".to_string()];
    walk_site(&report.site.root, 0, &mut lines);

    if let Some(logo) = &report.site.logo {
        lines.push(format!("Logo \u{2192} {}", logo));
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for skipped in &report.skipped {
            let label = if skipped.is_logo() {
                "Logo".to_string()
            } else {
                skipped.node.to_string()
            };
            lines.push(format!(
                "    {} ({}): {}",
                label, skipped.identifier, skipped.error
            ));
        }
    }

    let documents = report.site.documents().len();
    lines.push(String::new());
    lines.push(format!(
        "Built {}, {}",
        plural(documents, "document", "documents"),
        plural(report.pages_written, "page", "pages")
    ));
    lines
}

fn walk_site(folder: &SiteFolder, depth: usize, lines: &mut Vec<String>) {
    let base_indent = indent(depth);
    for (i, child) in folder.children.iter().enumerate() {
        match child {
            SiteNode::Document(doc) => lines.push(format!(
                "{}{} \u{2192} {}",
                base_indent,
                entity_header(i + 1, &doc.name, Some(doc.page_count)),
                dir_display(&doc.path)
            )),
            SiteNode::Folder(sub) => {
                lines.push(format!(
                    "{}{} \u{2192} {}",
                    base_indent,
                    entity_header(i + 1, &sub.name, None),
                    dir_display(&sub.path)
                ));
                walk_site(sub, depth + 1, lines);
            }
        }
    }
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
