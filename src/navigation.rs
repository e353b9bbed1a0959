//! Navigation over a built site: breadcrumbs, siblings, page cursors.
//!
//! Pure functions of a [`SiteTree`]; no I/O. Paths are the root-relative
//! paths stored in the descriptor (`""` for the root).
//!
//! ```text
//! breadcrumbs("Posts/Folders-Work-Too/Boxes-Arrows")
//!   → Notebooks ("") › Posts ("Posts") › Folders Work Too (…) › Boxes + Arrows (…)
//! ```

use crate::descriptor::{Located, NodeRef, SiteDocument, SiteNode, SiteTree};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavError {
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },
    #[error("No node at path {0:?}")]
    NodeNotFound(String),
}

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    /// Display name; the site title for the root.
    pub name: String,
    pub path: String,
}

/// Position within a document's pages. All numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub current: usize,
    pub previous: Option<usize>,
    pub next: Option<usize>,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct NavigationModel<'a> {
    site: &'a SiteTree,
}

impl<'a> NavigationModel<'a> {
    pub fn new(site: &'a SiteTree) -> Self {
        Self { site }
    }

    /// Root-to-node trail, node included. Length is the node's depth plus one.
    pub fn breadcrumbs(&self, path: &str) -> Result<Vec<Crumb>, NavError> {
        let located = self.locate(path)?;

        let mut crumbs = vec![Crumb {
            name: self.site.title.clone(),
            path: String::new(),
        }];
        crumbs.extend(located.ancestors.iter().skip(1).map(|folder| Crumb {
            name: folder.name.clone(),
            path: folder.path.clone(),
        }));
        if !path.is_empty() {
            crumbs.push(Crumb {
                name: located.node.name().to_string(),
                path: located.node.path().to_string(),
            });
        }
        Ok(crumbs)
    }

    /// The node's siblings in encounter order, the node itself excluded.
    /// The root has none.
    pub fn siblings(&self, path: &str) -> Result<Vec<&'a SiteNode>, NavError> {
        let located = self.locate(path)?;
        let Some(&parent) = located.ancestors.last() else {
            return Ok(Vec::new());
        };
        Ok(parent
            .children
            .iter()
            .filter(|child| child.path() != path)
            .collect())
    }

    /// Previous/next around `page` of `doc`.
    pub fn page_cursor(&self, doc: &SiteDocument, page: usize) -> Result<PageCursor, NavError> {
        page_cursor(doc, page)
    }

    /// The document at `path`, if that path names one.
    pub fn document(&self, path: &str) -> Result<&'a SiteDocument, NavError> {
        match self.locate(path)?.node {
            NodeRef::Document(doc) => Ok(doc),
            NodeRef::Folder(_) => Err(NavError::NodeNotFound(path.to_string())),
        }
    }

    fn locate(&self, path: &str) -> Result<Located<'a>, NavError> {
        self.site
            .locate(path)
            .ok_or_else(|| NavError::NodeNotFound(path.to_string()))
    }
}

/// Previous/next around `page` of `doc`.
pub fn page_cursor(doc: &SiteDocument, page: usize) -> Result<PageCursor, NavError> {
    let total = doc.page_count;
    if page == 0 || page > total {
        return Err(NavError::PageOutOfRange { page, total });
    }
    Ok(PageCursor {
        current: page,
        previous: (page > 1).then(|| page - 1),
        next: (page < total).then(|| page + 1),
        total_pages: total,
    })
}
