//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives next
//! to the manifest (or in the directory given by `--config`) and is optional:
//! stock defaults are the base layer and the user file is merged on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Notebooks"       # Root breadcrumb and page titles
//! prefix = "/"              # URL prefix the site is served under
//!
//! [paths]
//! max_path_len = 200        # Longest relative path (bytes) a node may get
//!
//! [build]
//! best_effort = false       # Skip documents whose bundle fails to resolve
//!
//! [theme]
//! thumbnail_gap = "1rem"    # Gap between cards in galleries and page grids
//! grid_padding = "2rem"     # Padding around galleries and page grids
//! rail_width = "7rem"       # Width of the thumbnail rail in the page viewer
//!
//! [theme.page_padding]
//! size = "3vw"              # Preferred padding around the viewed page
//! min = "1rem"
//! max = "2.5rem"
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#111111"
//! text_muted = "#666666"    # Breadcrumbs, page counters
//! border = "#e0e0e0"
//! link = "#333333"
//! link_hover = "#000000"
//!
//! [colors.dark]
//! background = "#0a0a0a"
//! text = "#eeeeee"
//! text_muted = "#999999"
//! border = "#333333"
//! link = "#cccccc"
//! link_hover = "#ffffff"
//!
//! [processing]
//! max_processes = 4         # Max staging workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! title = "Lab Notebooks"
//!
//! [colors.dark]
//! background = "#000000"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::paths::DEFAULT_MAX_PATH_LEN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Smallest accepted `paths.max_path_len`.
pub const MIN_PATH_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title: names the root breadcrumb and prefixes page titles.
    pub title: String,
    /// URL prefix every generated link starts with. Must start and end with `/`.
    pub prefix: String,
    /// Path assignment limits.
    pub paths: PathsConfig,
    /// Build behavior on failure.
    pub build: BuildConfig,
    /// Layout settings for the rendered pages.
    pub theme: ThemeConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
    /// Parallel staging settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Notebooks".to_string(),
            prefix: "/".to_string(),
            paths: PathsConfig::default(),
            build: BuildConfig::default(),
            theme: ThemeConfig::default(),
            colors: ColorConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation("title must not be empty".into()));
        }
        if !self.prefix.starts_with('/') || !self.prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "prefix must start and end with '/', got {:?}",
                self.prefix
            )));
        }
        if self.paths.max_path_len < MIN_PATH_LEN {
            return Err(ConfigError::Validation(format!(
                "paths.max_path_len must be at least {MIN_PATH_LEN}"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Path assignment limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Longest `/`-joined relative path, in bytes, any node may resolve to.
    pub max_path_len: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
        }
    }
}

/// Build behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Omit documents whose bundle cannot be resolved instead of failing.
    pub best_effort: bool,
}

/// Parallel staging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel staging workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// A responsive CSS size expressed as `clamp(min, size, max)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClampSize {
    /// Preferred/fluid value, typically viewport-relative (e.g. `"3vw"`).
    pub size: String,
    /// Minimum bound (e.g. `"1rem"`).
    pub min: String,
    /// Maximum bound (e.g. `"2.5rem"`).
    pub max: String,
}

impl ClampSize {
    /// Render as a CSS `clamp()` expression.
    pub fn to_css(&self) -> String {
        format!("clamp({}, {}, {})", self.min, self.size, self.max)
    }
}

/// Layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Gap between cards in galleries and page grids (CSS value).
    pub thumbnail_gap: String,
    /// Padding around galleries and page grids (CSS value).
    pub grid_padding: String,
    /// Width of the page viewer's thumbnail rail (CSS value).
    pub rail_width: String,
    /// Padding around the page in the viewer.
    pub page_padding: ClampSize,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            thumbnail_gap: "1rem".to_string(),
            grid_padding: "2rem".to_string(),
            rail_width: "7rem".to_string(),
            page_padding: ClampSize {
                size: "3vw".to_string(),
                min: "1rem".to_string(),
                max: "2.5rem".to_string(),
            },
        }
    }
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Muted/secondary text color (breadcrumbs, page counters).
    pub text_muted: String,
    pub border: String,
    pub link: String,
    pub link_hover: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            text_muted: "#666666".to_string(),
            border: "#e0e0e0".to_string(),
            link: "#333333".to_string(),
            link_hover: "#000000".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0a0a0a".to_string(),
            text: "#eeeeee".to_string(),
            text_muted: "#999999".to_string(),
            border: "#333333".to_string(),
            link: "#cccccc".to_string(),
            link_hover: "#ffffff".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    let overlay = load_raw_config(dir)?;
    if overlay.is_some() {
        tracing::info!(path = %dir.join(CONFIG_FILE).display(), "loaded site config");
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# notebook-site Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file next to manifest.json (or in the directory passed with
# --config). Unknown keys will cause an error.

# Site title: names the root breadcrumb and prefixes every page title.
title = "Notebooks"

# URL prefix the site is served under. Must start and end with "/".
# Use e.g. "/notes/" when the site lives below the domain root.
prefix = "/"

# ---------------------------------------------------------------------------
# Path assignment
# ---------------------------------------------------------------------------
[paths]
# Longest relative path (in bytes, "/"-joined) any folder or document may
# get. Deeply nested manifests with long names fail the build when exceeded.
max_path_len = 200

# ---------------------------------------------------------------------------
# Build behavior
# ---------------------------------------------------------------------------
[build]
# When true, documents whose bundle is missing or corrupt are left out of the
# site (and listed in the build summary) instead of failing the build.
best_effort = false

# ---------------------------------------------------------------------------
# Theme / layout
# ---------------------------------------------------------------------------
[theme]
# Gap between cards in galleries and page grids (CSS value).
thumbnail_gap = "1rem"

# Padding around galleries and page grids (CSS value).
grid_padding = "2rem"

# Width of the thumbnail rail next to the viewed page (CSS value).
rail_width = "7rem"

# Padding around the viewed page, as CSS clamp(min, size, max).
[theme.page_padding]
size = "3vw"
min = "1rem"
max = "2.5rem"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#111111"
text_muted = "#666666"    # Breadcrumbs, page counters
border = "#e0e0e0"
link = "#333333"
link_hover = "#000000"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0a0a0a"
text = "#eeeeee"
text_muted = "#999999"
border = "#333333"
link = "#cccccc"
link_hover = "#ffffff"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel staging workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-link: {light_link};
    --color-link-hover: {light_link_hover};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-link: {dark_link};
        --color-link-hover: {dark_link_hover};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_link = colors.light.link,
        light_link_hover = colors.light.link_hover,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_link = colors.dark.link,
        dark_link_hover = colors.dark.link_hover,
    )
}

/// Generate CSS custom properties from theme config.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --thumbnail-gap: {thumbnail_gap};
    --grid-padding: {grid_padding};
    --rail-width: {rail_width};
    --page-padding: {page_padding};
}}"#,
        thumbnail_gap = theme.thumbnail_gap,
        grid_padding = theme.grid_padding,
        rail_width = theme.rail_width,
        page_padding = theme.page_padding.to_css(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Notebooks");
        assert_eq!(config.prefix, "/");
        assert_eq!(config.paths.max_path_len, 200);
        assert!(!config.build.best_effort);
        assert_eq!(config.colors.light.background, "#ffffff");
        assert_eq!(config.colors.dark.background, "#0a0a0a");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
title = "Lab Notebooks"

[colors.light]
background = "#fafafa"
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.title, "Lab Notebooks");
        assert_eq!(config.colors.light.background, "#fafafa");
        // Default values preserved
        assert_eq!(config.colors.light.text, "#111111");
        assert_eq!(config.prefix, "/");
        assert_eq!(config.paths.max_path_len, 200);
    }

    #[test]
    fn parse_paths_and_build_sections() {
        let toml = r#"
[paths]
max_path_len = 120

[build]
best_effort = true
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.max_path_len, 120);
        assert!(config.build.best_effort);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<SiteConfig>("titel = \"x\"").is_err());
        assert!(toml::from_str::<SiteConfig>("[paths]\nmax_len = 3").is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_rejects_empty_title() {
        let config = SiteConfig {
            title: "  ".into(),
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_prefix_slashes() {
        for (prefix, ok) in [("/", true), ("/notes/", true), ("notes/", false), ("/notes", false), ("", false)] {
            let config = SiteConfig {
                prefix: prefix.into(),
                ..SiteConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "prefix {prefix:?}");
        }
    }

    #[test]
    fn validate_rejects_tiny_path_limit() {
        let mut config = SiteConfig::default();
        config.paths.max_path_len = MIN_PATH_LEN - 1;
        assert!(config.validate().is_err());
        config.paths.max_path_len = MIN_PATH_LEN;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_processes() {
        let mut config = SiteConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "Notebooks");
        assert_eq!(config.colors.dark.background, "#0a0a0a");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r##"
prefix = "/notes/"

[colors.light]
background = "#123456"
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.prefix, "/notes/");
        assert_eq!(config.colors.light.background, "#123456");
        // Unspecified values should be defaults
        assert_eq!(config.colors.dark.background, "#0a0a0a");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_invalid_values_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "prefix = \"notes\"").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.title, defaults.title);
        assert_eq!(config.paths.max_path_len, defaults.paths.max_path_len);
        assert_eq!(config.theme.rail_width, defaults.theme.rail_width);
        assert_eq!(config.colors.dark.link, defaults.colors.dark.link);
        assert_eq!(config.processing.max_processes, None);
    }

    // =========================================================================
    // CSS generation tests
    // =========================================================================

    #[test]
    fn generate_css_uses_config_colors() {
        let mut colors = ColorConfig::default();
        colors.light.background = "#f0f0f0".to_string();
        colors.dark.background = "#1a1a1a".to_string();

        let css = generate_color_css(&colors);
        assert!(css.contains("--color-bg: #f0f0f0"));
        assert!(css.contains("--color-bg: #1a1a1a"));
        assert!(css.contains("@media (prefers-color-scheme: dark)"));
    }

    #[test]
    fn generate_theme_css_includes_variables() {
        let css = generate_theme_css(&ThemeConfig::default());
        assert!(css.contains("--thumbnail-gap: 1rem"));
        assert!(css.contains("--rail-width: 7rem"));
        assert!(css.contains("--page-padding: clamp(1rem, 3vw, 2.5rem)"));
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig { max_processes: None };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[paths]
max_path_len = 200
other = 1
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[paths]\nmax_path_len = 90").unwrap();
        let merged = merge_toml(base, overlay);
        let paths = merged.get("paths").unwrap();
        assert_eq!(paths.get("max_path_len").unwrap().as_integer(), Some(90));
        assert_eq!(paths.get("other").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"title = "a""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"title = "b""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("title").unwrap().as_str(), Some("b"));
    }
}
