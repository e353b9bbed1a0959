//! HTML rendering of a built site.
//!
//! Stage 3 of the pipeline. Reads only the [`SiteTree`] descriptor and writes
//! HTML next to the staged pages.
//!
//! ## Generated Pages
//!
//! - **Gallery pages** (`index.html`, `{folder}/index.html`): cards for child
//!   folders (covered by their first document's thumbnail) and documents
//! - **Document pages** (`{doc}/index.html`): grid of every page
//! - **Page viewers** (`{doc}/{n}.html`): one page, thumbnail rail,
//!   previous/next links; arrow keys step through pages, Escape goes back
//!   to the document
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── index.html                 # Root gallery
//! ├── Home/
//! │   ├── index.html             # Page grid
//! │   ├── 1.html … N.html        # Page viewers
//! │   └── 1.svg … N.svg          # Staged by the builder
//! └── Posts/
//!     └── index.html             # Folder gallery
//! ```
//!
//! Links are absolute under `config.prefix` except within a document, where
//! viewers link to their siblings by file name.
//!
//! ## CSS and JavaScript
//!
//! Embedded at compile time from `static/`. Color and layout custom
//! properties from `config.toml` are prepended to the stylesheet. Output
//! carries no timestamps, so rendering the same tree twice gives the same
//! bytes.

use crate::config::{self, SiteConfig};
use crate::descriptor::{SiteDocument, SiteFolder, SiteNode, SiteTree};
use crate::navigation::{Crumb, NavError, NavigationModel};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Navigation error: {0}")]
    Nav(#[from] NavError),
}

/// Counts of generated HTML files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub galleries: usize,
    pub documents: usize,
    pub viewers: usize,
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/nav.js");

/// Render every gallery, document page and page viewer of `site` into
/// `output_root`.
pub fn render_site(
    site: &SiteTree,
    output_root: &Path,
    config: &SiteConfig,
) -> Result<RenderSummary, RenderError> {
    let css = format!(
        "{}\n\n{}\n\n{}",
        config::generate_color_css(&config.colors),
        config::generate_theme_css(&config.theme),
        CSS_STATIC
    );
    let ctx = Context {
        site,
        nav: NavigationModel::new(site),
        prefix: &config.prefix,
        css: &css,
    };
    let mut summary = RenderSummary::default();

    for folder in site.folders() {
        let html = ctx.gallery_page(folder)?;
        write_page(output_root, &folder.path, "index.html", html)?;
        summary.galleries += 1;
    }

    for doc in site.documents() {
        write_page(output_root, &doc.path, "index.html", ctx.document_page(doc)?)?;
        summary.documents += 1;

        for page in 1..=doc.page_count {
            let file_name = format!("{page}.html");
            write_page(output_root, &doc.path, &file_name, ctx.viewer_page(doc, page)?)?;
            summary.viewers += 1;
        }
        tracing::debug!(path = %doc.path, pages = doc.page_count, "rendered document");
    }

    tracing::info!(
        galleries = summary.galleries,
        documents = summary.documents,
        viewers = summary.viewers,
        "rendered site"
    );
    Ok(summary)
}

fn write_page(root: &Path, path: &str, file_name: &str, html: Markup) -> std::io::Result<()> {
    let dir = if path.is_empty() {
        root.to_path_buf()
    } else {
        root.join(path)
    };
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(file_name), html.into_string())
}

/// URL of a folder or document landing page.
fn dir_url(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{path}/")
    }
}

/// URL of a staged file.
fn file_url(prefix: &str, path: &str) -> String {
    format!("{prefix}{path}")
}

struct Context<'a> {
    site: &'a SiteTree,
    nav: NavigationModel<'a>,
    prefix: &'a str,
    css: &'a str,
}

impl Context<'_> {
    fn page_title(&self, name: &str) -> String {
        if name.is_empty() {
            self.site.title.clone()
        } else {
            format!("{} - {}", name, self.site.title)
        }
    }

    fn header(&self, crumbs: &[Crumb]) -> Markup {
        html! {
            header.site-header {
                @if let Some(logo) = &self.site.logo {
                    a.site-logo href=(self.prefix) {
                        img src=(file_url(self.prefix, logo)) alt=(self.site.title);
                    }
                }
                (breadcrumb_trail(crumbs, self.prefix))
            }
        }
    }

    fn gallery_page(&self, folder: &SiteFolder) -> Result<Markup, RenderError> {
        let crumbs = self.nav.breadcrumbs(&folder.path)?;
        let content = html! {
            (self.header(&crumbs))
            main.gallery-page {
                @if folder.children.is_empty() {
                    p.empty { "Nothing here yet." }
                } @else {
                    div.gallery {
                        @for child in &folder.children {
                            (self.card(child))
                        }
                    }
                }
            }
        };
        Ok(base_document(&self.page_title(&folder.name), self.css, None, content))
    }

    fn card(&self, node: &SiteNode) -> Markup {
        match node {
            SiteNode::Folder(folder) => {
                let cover = folder.first_document().map(|doc| file_url(self.prefix, &doc.thumbnail));
                html! {
                    a.card.folder href=(dir_url(self.prefix, &folder.path)) {
                        div.cover {
                            @if let Some(src) = cover {
                                img src=(src) alt=(folder.name) loading="lazy";
                            }
                        }
                        span.title { (folder.name) }
                        span.meta { (item_count(folder.children.len())) }
                    }
                }
            }
            SiteNode::Document(doc) => html! {
                a.card.document href=(dir_url(self.prefix, &doc.path)) {
                    div.cover {
                        img src=(file_url(self.prefix, &doc.thumbnail)) alt=(doc.name) loading="lazy";
                    }
                    span.title { (doc.name) }
                    span.meta { (page_count(doc.page_count)) }
                }
            },
        }
    }

    fn document_page(&self, doc: &SiteDocument) -> Result<Markup, RenderError> {
        let crumbs = self.nav.breadcrumbs(&doc.path)?;
        let content = html! {
            (self.header(&crumbs))
            main.document-page {
                div.page-grid {
                    @for page in &doc.pages {
                        a.card.page href={ (page.number) ".html" } {
                            div.cover {
                                img src=(file_url(self.prefix, &page.path))
                                    alt={ (doc.name) " - page " (page.number) }
                                    loading="lazy";
                            }
                            span.meta { (page.number) }
                        }
                    }
                }
            }
        };
        Ok(base_document(&self.page_title(&doc.name), self.css, None, content))
    }

    fn viewer_page(&self, doc: &SiteDocument, page: usize) -> Result<Markup, RenderError> {
        let crumbs = self.nav.breadcrumbs(&doc.path)?;
        let cursor = self.nav.page_cursor(doc, page)?;
        let current = doc
            .pages
            .iter()
            .find(|staged| staged.number == page)
            .ok_or(NavError::PageOutOfRange {
                page,
                total: doc.page_count,
            })?;

        let prev_url = cursor
            .previous
            .map(|n| format!("{n}.html"))
            .unwrap_or_else(|| "index.html".to_string());
        let next_url = cursor
            .next
            .map(|n| format!("{n}.html"))
            .unwrap_or_else(|| "index.html".to_string());

        let content = html! {
            (self.header(&crumbs))
            main.page-view {
                ol.rail {
                    @for staged in &doc.pages {
                        li class=[(staged.number == page).then_some("current")] {
                            a href={ (staged.number) ".html" } {
                                img src=(file_url(self.prefix, &staged.path))
                                    alt={ "Page " (staged.number) }
                                    loading="lazy";
                            }
                        }
                    }
                }
                figure.page-frame {
                    img src=(file_url(self.prefix, &current.path)) alt={ (doc.name) " - page " (page) };
                    nav.page-nav data-prev=(prev_url) data-next=(next_url) data-up="index.html" {
                        a.prev href=(prev_url) { "‹ Previous" }
                        span.counter { (page) " / " (cursor.total_pages) }
                        a.next href=(next_url) { "Next ›" }
                    }
                }
            }
            script { (PreEscaped(JS)) }
        };

        let title = format!("{} - {}", doc.name, page);
        Ok(base_document(&self.page_title(&title), self.css, Some("page-viewer"), content))
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Every crumb but the last is a link; the last is the current node.
fn breadcrumb_trail(crumbs: &[Crumb], prefix: &str) -> Markup {
    html! {
        nav.breadcrumb {
            @for (i, crumb) in crumbs.iter().enumerate() {
                @if i > 0 {
                    " › "
                }
                @if i + 1 == crumbs.len() {
                    span.current { (crumb.name) }
                } @else {
                    a href=(dir_url(prefix, &crumb.path)) { (crumb.name) }
                }
            }
        }
    }
}

fn page_count(n: usize) -> String {
    if n == 1 {
        "1 page".to_string()
    } else {
        format!("{n} pages")
    }
}

fn item_count(n: usize) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{n} items")
    }
}
