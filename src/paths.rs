//! Deterministic path assignment.
//!
//! Every node in a [`ManifestTree`] gets a root-relative [`ResolvedPath`]: the
//! chain of its ancestors' segments plus its own. Segments come from
//! [`naming::sanitize_segment`]; siblings whose segments collide (compared
//! case-insensitively) are disambiguated in encounter order:
//!
//! ```text
//! Posts/
//! ├── Notes        → Posts/Notes
//! ├── Notes!       → Posts/Notes-2
//! ├── notes        → Posts/notes-3
//! └── Notes-2      → Posts/Notes-2-2   (natural name taken by a suffix)
//! ```
//!
//! Assignment is a pure function of the tree and the length limit, so the
//! same manifest always yields the same site layout.

use crate::config::SiteConfig;
use crate::manifest::{Folder, ManifestTree, NamePath, Node};
use crate::naming;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default cap on a resolved path, in bytes of its `/`-joined form.
pub const DEFAULT_MAX_PATH_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Path for {node} is {len} bytes, over the {max}-byte limit: {path}")]
    Unresolvable {
        node: NamePath,
        path: String,
        len: usize,
        max: usize,
    },
}

/// Root-relative sequence of sanitized segments. Empty for the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedPath {
    segments: Vec<String>,
}

impl ResolvedPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `/`-joined form used in URLs and in the site descriptor.
    pub fn as_url(&self) -> String {
        self.segments.join("/")
    }

    /// Location under an output root.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }

    fn child(&self, segment: String) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_url())
    }
}

/// A node whose sanitized segment was already taken by an earlier sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disambiguation {
    pub node: NamePath,
    pub sanitized: String,
    pub assigned: String,
}

/// Result of path assignment: one path per node, plus a record of every
/// suffix handed out.
#[derive(Debug, Clone, Default)]
pub struct PathMap {
    paths: BTreeMap<NamePath, ResolvedPath>,
    disambiguations: Vec<Disambiguation>,
}

impl PathMap {
    pub fn get(&self, node: &NamePath) -> Option<&ResolvedPath> {
        self.paths.get(node)
    }

    /// Number of assigned nodes, root included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NamePath, &ResolvedPath)> {
        self.paths.iter()
    }

    /// Suffixed nodes in encounter order.
    pub fn disambiguations(&self) -> &[Disambiguation] {
        &self.disambiguations
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathResolver {
    max_path_len: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PATH_LEN)
    }
}

impl PathResolver {
    pub fn new(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.paths.max_path_len)
    }

    pub fn max_path_len(&self) -> usize {
        self.max_path_len
    }

    /// Assign a path to every node of `tree`.
    pub fn assign(&self, tree: &ManifestTree) -> Result<PathMap, PathError> {
        let mut map = PathMap::default();
        map.paths.insert(NamePath::root(), ResolvedPath::root());
        self.assign_children(tree.root(), &NamePath::root(), &ResolvedPath::root(), &mut map)?;
        Ok(map)
    }

    fn assign_children(
        &self,
        folder: &Folder,
        chain: &NamePath,
        parent: &ResolvedPath,
        map: &mut PathMap,
    ) -> Result<(), PathError> {
        let mut used: HashSet<String> = HashSet::new();

        for child in folder.children() {
            let child_chain = chain.child(child.name());
            let sanitized = naming::sanitize_segment(child.name());

            let segment = if used.insert(naming::collision_key(&sanitized)) {
                sanitized
            } else {
                let mut n = 2;
                let assigned = loop {
                    let candidate = naming::with_suffix(&sanitized, n);
                    if used.insert(naming::collision_key(&candidate)) {
                        break candidate;
                    }
                    n += 1;
                };
                tracing::debug!(node = %child_chain, %sanitized, %assigned, "disambiguated path segment");
                map.disambiguations.push(Disambiguation {
                    node: child_chain.clone(),
                    sanitized,
                    assigned: assigned.clone(),
                });
                assigned
            };

            let path = parent.child(segment);
            let url = path.as_url();
            if url.len() > self.max_path_len {
                return Err(PathError::Unresolvable {
                    node: child_chain,
                    len: url.len(),
                    max: self.max_path_len,
                    path: url,
                });
            }

            if let Node::Folder(sub) = child {
                self.assign_children(sub, &child_chain, &path, map)?;
            }
            map.paths.insert(child_chain, path);
        }

        Ok(())
    }
}
