//! On-disk naming for display names.
//!
//! Notebook and folder names are whatever the author typed on the device:
//! spaces, `+`, slashes, emoji. The display name is kept verbatim for
//! rendering; this module derives the path segment the node gets on disk and
//! in URLs.
//!
//! ## Segment rule
//!
//! - ASCII letters, ASCII digits and `-` are kept; everything else becomes `-`
//! - Runs of dashes collapse into one, leading/trailing dashes are stripped
//! - Segments are capped at [`MAX_SEGMENT_LEN`] bytes, breaking at a dash
//! - A name with nothing left (`"+++"`, `"日本語"`) becomes [`FALLBACK_SEGMENT`]
//!
//! ```text
//! "Folders Work Too"  → "Folders-Work-Too"
//! "Boxes + Arrows"    → "Boxes-Arrows"
//! "v1.2_final"        → "v1-2-final"
//! ```
//!
//! Because `_` and `.` never survive, names like `_assets` or `site.json`
//! can never be produced for a node. The builder relies on this for its own
//! files.

/// Longest segment produced by [`sanitize_segment`] before disambiguation.
pub const MAX_SEGMENT_LEN: usize = 80;

/// Segment used when a display name has no ASCII alphanumerics at all.
pub const FALLBACK_SEGMENT: &str = "untitled";

/// Sanitize a display name into a single filesystem- and URL-safe segment.
pub fn sanitize_segment(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    let mut prev_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c);
            prev_dash = false;
        } else if !prev_dash {
            collapsed.push('-');
            prev_dash = true;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    // Only ASCII remains, so byte slicing is on char boundaries.
    let capped = if trimmed.len() <= MAX_SEGMENT_LEN {
        trimmed
    } else {
        let truncated = &trimmed[..MAX_SEGMENT_LEN];
        match truncated.rfind('-') {
            Some(pos) if pos > 0 => &truncated[..pos],
            _ => truncated,
        }
    };

    if capped.is_empty() {
        FALLBACK_SEGMENT.to_string()
    } else {
        capped.to_string()
    }
}

/// The `n`th claimant of `segment` within one folder (`n >= 2`).
pub fn with_suffix(segment: &str, n: usize) -> String {
    format!("{segment}-{n}")
}

/// Key used to detect sibling collisions.
///
/// Case-folded so `Notes` and `notes` cannot overwrite each other on a
/// case-insensitive filesystem.
pub fn collision_key(segment: &str) -> String {
    segment.to_ascii_lowercase()
}
