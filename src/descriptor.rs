//! The site tree descriptor.
//!
//! Output of the builder and the only thing the renderer reads. It mirrors
//! the manifest hierarchy, with every node carrying its resolved path and
//! every document its staged asset paths. Serialized to `site.json` at the
//! output root so other tools can render or index the site.
//!
//! ```json
//! {
//!   "title": "Notebooks",
//!   "root": {
//!     "name": "", "path": "",
//!     "children": [
//!       { "kind": "document", "name": "Home", "path": "Home",
//!         "identifier": "1a2b…", "page_count": 2,
//!         "pages": [{ "number": 1, "path": "Home/1.svg" }, …],
//!         "thumbnail": "Home/thumbnail.svg" },
//!       { "kind": "folder", "name": "Posts", "path": "Posts", "children": […] }
//!     ]
//!   }
//! }
//! ```
//!
//! All paths are root-relative and `/`-separated.

use serde::{Deserialize, Serialize};

/// File name of the serialized descriptor in the output root.
pub const DESCRIPTOR_FILE: &str = "site.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTree {
    pub title: String,
    /// Staged logo image, if the manifest named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub root: SiteFolder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SiteNode {
    Folder(SiteFolder),
    Document(SiteDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFolder {
    /// Display name, verbatim from the manifest. Empty for the root.
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SiteNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDocument {
    pub name: String,
    pub path: String,
    pub identifier: String,
    pub page_count: usize,
    pub pages: Vec<StagedPage>,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedPage {
    /// 1-based.
    pub number: usize,
    pub path: String,
}

/// Borrowed view of one node, root included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Folder(&'a SiteFolder),
    Document(&'a SiteDocument),
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Folder(f) => &f.name,
            NodeRef::Document(d) => &d.name,
        }
    }

    pub fn path(&self) -> &'a str {
        match self {
            NodeRef::Folder(f) => &f.path,
            NodeRef::Document(d) => &d.path,
        }
    }
}

/// A node together with the folders above it, root first.
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub ancestors: Vec<&'a SiteFolder>,
    pub node: NodeRef<'a>,
}

impl SiteNode {
    pub fn name(&self) -> &str {
        self.as_node_ref().name()
    }

    pub fn path(&self) -> &str {
        self.as_node_ref().path()
    }

    pub fn as_node_ref(&self) -> NodeRef<'_> {
        match self {
            SiteNode::Folder(f) => NodeRef::Folder(f),
            SiteNode::Document(d) => NodeRef::Document(d),
        }
    }
}

impl SiteFolder {
    /// First document in depth-first order, used as the folder's cover.
    pub fn first_document(&self) -> Option<&SiteDocument> {
        self.children.iter().find_map(|child| match child {
            SiteNode::Document(doc) => Some(doc),
            SiteNode::Folder(folder) => folder.first_document(),
        })
    }

    fn collect_documents<'a>(&'a self, out: &mut Vec<&'a SiteDocument>) {
        for child in &self.children {
            match child {
                SiteNode::Document(doc) => out.push(doc),
                SiteNode::Folder(folder) => folder.collect_documents(out),
            }
        }
    }

    fn collect_folders<'a>(&'a self, out: &mut Vec<&'a SiteFolder>) {
        out.push(self);
        for child in &self.children {
            if let SiteNode::Folder(folder) = child {
                folder.collect_folders(out);
            }
        }
    }
}

impl SiteTree {
    /// Find the node at a root-relative path (`""` is the root).
    pub fn locate(&self, path: &str) -> Option<Located<'_>> {
        let mut ancestors = Vec::new();
        let mut folder = &self.root;
        if path.is_empty() {
            return Some(Located {
                ancestors,
                node: NodeRef::Folder(folder),
            });
        }

        let segments: Vec<&str> = path.split('/').collect();
        for depth in 0..segments.len() {
            let target = segments[..=depth].join("/");
            let child = folder.children.iter().find(|c| c.path() == target)?;
            let last = depth + 1 == segments.len();
            match child {
                SiteNode::Folder(next) if !last => {
                    ancestors.push(folder);
                    folder = next;
                }
                _ if last => {
                    ancestors.push(folder);
                    return Some(Located {
                        ancestors,
                        node: child.as_node_ref(),
                    });
                }
                SiteNode::Document(_) | SiteNode::Folder(_) => return None,
            }
        }
        None
    }

    /// All documents, depth-first in encounter order.
    pub fn documents(&self) -> Vec<&SiteDocument> {
        let mut out = Vec::new();
        self.root.collect_documents(&mut out);
        out
    }

    /// All folders, root first, depth-first in encounter order.
    pub fn folders(&self) -> Vec<&SiteFolder> {
        let mut out = Vec::new();
        self.root.collect_folders(&mut out);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, path: &str, pages: usize) -> SiteNode {
        SiteNode::Document(SiteDocument {
            name: name.into(),
            path: path.into(),
            identifier: format!("id-{name}"),
            page_count: pages,
            pages: (1..=pages)
                .map(|n| StagedPage {
                    number: n,
                    path: format!("{path}/{n}.svg"),
                })
                .collect(),
            thumbnail: format!("{path}/thumbnail.svg"),
        })
    }

    fn sample() -> SiteTree {
        SiteTree {
            title: "Notebooks".into(),
            logo: None,
            root: SiteFolder {
                name: String::new(),
                path: String::new(),
                children: vec![
                    doc("Home", "Home", 1),
                    SiteNode::Folder(SiteFolder {
                        name: "Posts".into(),
                        path: "Posts".into(),
                        children: vec![
                            doc("Sample Notebook", "Posts/Sample-Notebook", 2),
                            SiteNode::Folder(SiteFolder {
                                name: "Empty".into(),
                                path: "Posts/Empty".into(),
                                children: vec![],
                            }),
                        ],
                    }),
                ],
            },
        }
    }

    #[test]
    fn locate_root_folder_and_document() {
        let site = sample();

        let root = site.locate("").unwrap();
        assert!(root.ancestors.is_empty());
        assert!(matches!(root.node, NodeRef::Folder(f) if f.path.is_empty()));

        let posts = site.locate("Posts").unwrap();
        assert_eq!(posts.ancestors.len(), 1);
        assert_eq!(posts.node.name(), "Posts");

        let sample_doc = site.locate("Posts/Sample-Notebook").unwrap();
        assert_eq!(sample_doc.ancestors.len(), 2);
        assert_eq!(sample_doc.ancestors[1].name, "Posts");
        assert!(matches!(sample_doc.node, NodeRef::Document(d) if d.page_count == 2));
    }

    #[test]
    fn locate_unknown_paths() {
        let site = sample();
        assert!(site.locate("Nope").is_none());
        assert!(site.locate("Home/1").is_none());
        assert!(site.locate("Posts/").is_none());
    }

    #[test]
    fn documents_and_folders_in_order() {
        let site = sample();
        let docs: Vec<&str> = site.documents().iter().map(|d| d.path.as_str()).collect();
        assert_eq!(docs, vec!["Home", "Posts/Sample-Notebook"]);
        let folders: Vec<&str> = site.folders().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(folders, vec!["", "Posts", "Posts/Empty"]);
    }

    #[test]
    fn first_document_descends() {
        let site = sample();
        let posts = site.folders()[1];
        assert_eq!(posts.first_document().unwrap().name, "Sample Notebook");
        assert!(site.folders()[2].first_document().is_none());
    }

    #[test]
    fn json_uses_kind_tags() {
        let site = sample();
        let json = site.to_json().unwrap();
        assert!(json.contains(r#""kind": "document""#));
        assert!(json.contains(r#""kind": "folder""#));
        assert!(!json.contains("logo"));
        assert_eq!(SiteTree::from_json(&json).unwrap(), site);
    }
}
