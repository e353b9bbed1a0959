//! # Notebook Site
//!
//! Builds a browsable static site from a tree of handwritten notebooks.
//! A JSON manifest describes the hierarchy of folders and documents; every
//! document names a bundle of pre-rendered page images. The builder resolves
//! each bundle, stages its pages under a filesystem-safe path and records the
//! result in a site descriptor the renderer turns into HTML.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Resolve   manifest.json  →  PathMap     (display names → safe paths)
//! 2. Build     PathMap        →  site/       (staged pages + site.json)
//! 3. Render    site.json      →  site/*.html (galleries, page viewers)
//! ```
//!
//! Each stage only reads what the previous one produced:
//!
//! - **Path resolution** is pure. Two runs over the same manifest give the
//!   same paths, so rebuilding into the same output gives the same bytes.
//! - **Building** touches the bundle store and the output directory, nothing
//!   else. Its only product besides staged files is the [`descriptor`].
//! - **Rendering** reads the descriptor alone, so a site can be re-rendered
//!   (new theme, new prefix) without resolving a single bundle.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manifest`] | Parses the manifest JSON into an ordered, validated tree |
//! | [`naming`] | Turns display names into filesystem-safe path segments |
//! | [`paths`] | Assigns a unique, length-bounded path to every node |
//! | [`bundle`] | Bundle lookup by identifier: directories, zip archives, in-memory |
//! | [`builder`] | Stage 2: resolves bundles in parallel and stages pages into the output |
//! | [`descriptor`] | The site tree written to `site.json` |
//! | [`navigation`] | Breadcrumbs, siblings and page cursors over a built site |
//! | [`render`] | Stage 3: HTML pages generated with Maud |
//! | [`config`] | `config.toml` loading, validation and CSS generation |
//! | [`output`] | CLI output formatting for `check` and `build` |
//!
//! # Design Decisions
//!
//! ## Display Names Are Never Paths
//!
//! Names come from people. They contain spaces, slashes, emoji and `..`. The
//! [`naming`] module reduces every name to ASCII letters, digits and dashes;
//! siblings that collide (case-insensitively, so the output is portable to
//! macOS and Windows) get `-2`, `-3`, … suffixes in encounter order. The
//! display name survives untouched in the descriptor for breadcrumbs and
//! titles.
//!
//! ## Owned Output Directories
//!
//! The builder deletes stale files on rebuild, so it refuses to write into a
//! non-empty directory it did not create. Ownership is recorded by a marker
//! file at the output root. A second marker flags a build that failed or was
//! cancelled part way, so a half-written site is never mistaken for a good
//! one.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Malformed markup is a build error, interpolation is escaped
//! by default, and there is no template directory to ship.

pub mod builder;
pub mod bundle;
pub mod config;
pub mod descriptor;
pub mod manifest;
pub mod naming;
pub mod navigation;
pub mod output;
pub mod paths;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
