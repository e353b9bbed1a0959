//! Manifest parsing into the folder/document hierarchy.
//!
//! Stage 1 of the build. The manifest is the export pipeline's description of
//! what the site contains: a tree of named folders and named documents, each
//! document pointing at a bundle by [`Identifier`].
//!
//! ## Format
//!
//! ```json
//! {
//!   "logo": "7c0f…",
//!   "documents": { "Home": "1a2b…" },
//!   "folders": {
//!     "Posts": {
//!       "documents": { "Sample Notebook": "3c4d…" },
//!       "folders": {
//!         "Folders Work Too": {
//!           "documents": { "Boxes + Arrows": "5e6f…" }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Keys are display names and are kept exactly as written. Key order is
//! preserved: a folder's children are its documents in file order followed by
//! its sub-folders in file order. That **encounter order** drives suffix
//! assignment in [`crate::paths`] and the order of everything rendered.
//!
//! ## Validation
//!
//! - Unknown keys are rejected (typos in `folders` should not silently drop content)
//! - Display names must contain something other than whitespace
//! - Identifiers must be usable as a file name (see [`Identifier::new`])
//! - Folders and documents share one namespace per parent: a folder and a
//!   document called `Notes` side by side is a [`ManifestError::DuplicateName`]

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed manifest: {0}")]
    Malformed(String),
    #[error("Duplicate name '{name}' in {parent}")]
    DuplicateName { parent: NamePath, name: String },
}

/// Stable identifier of one bundle in the bundle store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate an identifier.
    ///
    /// Identifiers are opaque, but stores map them onto file names, so they
    /// must be non-empty, untrimmed, free of path separators and control
    /// characters, and not `.` or `..`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ManifestError> {
        let raw = raw.into();
        let invalid = |why: &str| ManifestError::Malformed(format!("invalid identifier {raw:?}: {why}"));
        if raw.is_empty() {
            return Err(invalid("empty"));
        }
        if raw.trim() != raw {
            return Err(invalid("leading or trailing whitespace"));
        }
        if raw == "." || raw == ".." {
            return Err(invalid("reserved path component"));
        }
        if raw.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(invalid("contains a path separator or control character"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = ManifestError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root-relative chain of display names identifying one node.
///
/// Unique per node because sibling names are unique. The root is the empty
/// chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamePath(Vec<String>);

impl NamePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut names = self.0.clone();
        names.push(name.to_string());
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of names in the chain; 0 for the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NamePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.0.join(" / "))
        }
    }
}

/// A node in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Folder(Folder),
    Document(Document),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::Document(doc) => &doc.name,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Node::Document(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    name: String,
    children: Vec<Node>,
}

impl Folder {
    /// Display name. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children in encounter order (documents first, then folders).
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    name: String,
    id: Identifier,
}

impl Document {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &Identifier {
        &self.id
    }
}

/// The parsed manifest. Owns every node.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTree {
    root: Folder,
    logo: Option<Identifier>,
}

impl ManifestTree {
    pub fn root(&self) -> &Folder {
        &self.root
    }

    /// Bundle whose thumbnail is used as the site logo, if any.
    pub fn logo(&self) -> Option<&Identifier> {
        self.logo.as_ref()
    }

    /// Every node except the root, depth-first in encounter order.
    pub fn nodes(&self) -> Vec<(NamePath, &Node)> {
        let mut out = Vec::new();
        collect_nodes(&self.root, &NamePath::root(), &mut out);
        out
    }

    /// Every document, depth-first in encounter order.
    pub fn documents(&self) -> Vec<(NamePath, &Document)> {
        self.nodes()
            .into_iter()
            .filter_map(|(chain, node)| match node {
                Node::Document(doc) => Some((chain, doc)),
                Node::Folder(_) => None,
            })
            .collect()
    }
}

fn collect_nodes<'a>(folder: &'a Folder, chain: &NamePath, out: &mut Vec<(NamePath, &'a Node)>) {
    for child in &folder.children {
        let child_chain = chain.child(child.name());
        out.push((child_chain.clone(), child));
        if let Node::Folder(sub) = child {
            collect_nodes(sub, &child_chain, out);
        }
    }
}

/// Parse manifest JSON into a tree.
pub fn parse(source: &str) -> Result<ManifestTree, ManifestError> {
    let raw: RawRoot =
        serde_json::from_str(source).map_err(|e| ManifestError::Malformed(e.to_string()))?;
    let folder = RawFolder {
        documents: raw.documents,
        folders: raw.folders,
    };
    let root = build_folder(String::new(), folder, &NamePath::root())?;
    Ok(ManifestTree {
        root,
        logo: raw.logo,
    })
}

/// Read and parse a manifest file.
pub fn load(path: &Path) -> Result<ManifestTree, ManifestError> {
    let source = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source)
}

fn build_folder(name: String, raw: RawFolder, chain: &NamePath) -> Result<Folder, ManifestError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut claim = |child_name: &str| -> Result<(), ManifestError> {
        if child_name.trim().is_empty() {
            return Err(ManifestError::Malformed(format!(
                "empty display name in {chain}"
            )));
        }
        if !seen.insert(child_name.to_string()) {
            return Err(ManifestError::DuplicateName {
                parent: chain.clone(),
                name: child_name.to_string(),
            });
        }
        Ok(())
    };

    let mut children = Vec::with_capacity(raw.documents.0.len() + raw.folders.0.len());
    for (doc_name, id) in raw.documents.0 {
        claim(&doc_name)?;
        children.push(Node::Document(Document { name: doc_name, id }));
    }
    let mut sub_folders = Vec::with_capacity(raw.folders.0.len());
    for (folder_name, sub) in raw.folders.0 {
        claim(&folder_name)?;
        sub_folders.push((folder_name, sub));
    }
    for (folder_name, sub) in sub_folders {
        let sub_chain = chain.child(&folder_name);
        children.push(Node::Folder(build_folder(folder_name, sub, &sub_chain)?));
    }

    Ok(Folder { name, children })
}

// ============================================================================
// Raw serde shapes
// ============================================================================

struct RawRoot {
    logo: Option<Identifier>,
    documents: Entries<Identifier>,
    folders: Entries<RawFolder>,
}

struct RawFolder {
    documents: Entries<Identifier>,
    folders: Entries<RawFolder>,
}

const ROOT_FIELDS: &[&str] = &["logo", "documents", "folders"];
const FOLDER_FIELDS: &[&str] = &["documents", "folders"];

impl<'de> Deserialize<'de> for RawRoot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ShapeVisitor { fields: ROOT_FIELDS })
    }
}

impl<'de> Deserialize<'de> for RawFolder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_map(ShapeVisitor { fields: FOLDER_FIELDS })?;
        Ok(RawFolder {
            documents: raw.documents,
            folders: raw.folders,
        })
    }
}

/// Reads the root or a folder. Objects only: a derived visitor would also
/// take an array and fill the fields by position.
struct ShapeVisitor {
    fields: &'static [&'static str],
}

impl<'de> Visitor<'de> for ShapeVisitor {
    type Value = RawRoot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with optional documents and folders")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut logo: Option<Option<Identifier>> = None;
        let mut documents: Option<Entries<Identifier>> = None;
        let mut folders: Option<Entries<RawFolder>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "logo" if self.fields.contains(&"logo") => {
                    if logo.is_some() {
                        return Err(de::Error::duplicate_field("logo"));
                    }
                    logo = Some(map.next_value()?);
                }
                "documents" => {
                    if documents.is_some() {
                        return Err(de::Error::duplicate_field("documents"));
                    }
                    documents = Some(map.next_value()?);
                }
                "folders" => {
                    if folders.is_some() {
                        return Err(de::Error::duplicate_field("folders"));
                    }
                    folders = Some(map.next_value()?);
                }
                other => return Err(de::Error::unknown_field(other, self.fields)),
            }
        }

        Ok(RawRoot {
            logo: logo.flatten(),
            documents: documents.unwrap_or_default(),
            folders: folders.unwrap_or_default(),
        })
    }
}

/// A JSON object read as an ordered list of entries.
///
/// Keeps file order and keeps repeated keys, which a map would silently
/// collapse, so duplicates can be reported instead of lost.
struct Entries<T>(Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping display names to entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
