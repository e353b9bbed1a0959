//! Page validation.
//!
//! Pages are staged byte-for-byte, never re-encoded, but a page that cannot
//! be displayed is a corrupt bundle. Raster pages get a full decode through
//! the `image` crate; SVG pages must be well-formed XML with an `<svg>` root.

use super::ImageFormat;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Check that `bytes` decode as `format`. Returns a human-readable reason on
/// failure.
pub fn validate(format: ImageFormat, bytes: &[u8]) -> Result<(), String> {
    match format {
        ImageFormat::Svg => validate_svg(bytes),
        ImageFormat::Png => validate_raster(bytes, image::ImageFormat::Png),
        ImageFormat::Jpeg => validate_raster(bytes, image::ImageFormat::Jpeg),
        ImageFormat::Webp => validate_raster(bytes, image::ImageFormat::WebP),
    }
}

fn validate_raster(bytes: &[u8], format: image::ImageFormat) -> Result<(), String> {
    image::load_from_memory_with_format(bytes, format)
        .map(|_| ())
        .map_err(|e| format!("{format:?} decode failed: {e}"))
}

fn validate_svg(bytes: &[u8]) -> Result<(), String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("SVG is not UTF-8: {e}"))?;
    let mut reader = Reader::from_str(text);

    let mut depth = 0usize;
    let mut seen_root = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if seen_root {
                        return Err("SVG has more than one root element".into());
                    }
                    if e.local_name().as_ref() != b"svg" {
                        return Err("root element is not <svg>".into());
                    }
                    seen_root = true;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    if seen_root {
                        return Err("SVG has more than one root element".into());
                    }
                    if e.local_name().as_ref() != b"svg" {
                        return Err("root element is not <svg>".into());
                    }
                    seen_root = true;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unmatched closing tag".to_string())?;
            }
            Ok(Event::Text(t)) if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) => {
                return Err("text outside the <svg> element".into());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("SVG is not well-formed: {e}")),
            _ => {}
        }
    }

    if !seen_root {
        return Err("no <svg> element".into());
    }
    if depth != 0 {
        return Err("SVG ends inside an open element".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn accepts_plain_svg() {
        let svg = br#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0L10 10"/></svg>"#;
        assert!(validate(ImageFormat::Svg, svg).is_ok());
    }

    #[test]
    fn accepts_empty_svg_element_and_doctype() {
        assert!(validate(ImageFormat::Svg, b"<svg/>").is_ok());
        let svg = b"<!DOCTYPE svg><!-- page 1 -->\n<svg><g></g></svg>\n";
        assert!(validate(ImageFormat::Svg, svg).is_ok());
    }

    #[test]
    fn accepts_prefixed_root() {
        let svg = br#"<s:svg xmlns:s="http://www.w3.org/2000/svg"></s:svg>"#;
        assert!(validate(ImageFormat::Svg, svg).is_ok());
    }

    #[test]
    fn rejects_non_svg_root() {
        assert!(validate(ImageFormat::Svg, b"<html></html>").is_err());
    }

    #[test]
    fn rejects_truncated_svg() {
        assert!(validate(ImageFormat::Svg, b"<svg><g>").is_err());
        assert!(validate(ImageFormat::Svg, b"").is_err());
        assert!(validate(ImageFormat::Svg, b"<svg></g>").is_err());
    }

    #[test]
    fn rejects_two_roots_and_stray_text() {
        assert!(validate(ImageFormat::Svg, b"<svg/><svg/>").is_err());
        assert!(validate(ImageFormat::Svg, b"junk<svg/>").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(validate(ImageFormat::Svg, &[0x3c, 0xff, 0xfe]).is_err());
    }

    #[test]
    fn accepts_real_png() {
        assert!(validate(ImageFormat::Png, &png_bytes()).is_ok());
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = png_bytes();
        assert!(validate(ImageFormat::Png, &bytes[..bytes.len() / 2]).is_err());
        assert!(validate(ImageFormat::Jpeg, b"not a jpeg").is_err());
    }

    #[test]
    fn png_bytes_under_wrong_format_rejected() {
        assert!(validate(ImageFormat::Webp, &png_bytes()).is_err());
    }
}
