use crate::config::PageGeometry;
use crate::fonts::FontSet;
use crate::model::{Signatory, TextStyle, or_placeholder};

use super::layout::{TextFormat, baseline_offset, draw_hline, draw_text};
use pdf_writer::Content;

/// Height of one row of signature blocks (signing space, line, three text lines).
pub const SIGNATURE_BLOCK_HEIGHT: f32 = 20.0; // mm
/// Gap kept between the preceding content and the signatures.
pub const SIGNATURE_MIN_GAP: f32 = 5.0; // mm
/// Extra room beyond the requirement after which the block is anchored to the bottom.
pub const SIGNATURE_SLACK: f32 = 40.0; // mm

const SIGNING_SPACE: f32 = 8.0; // mm above the signing line
const MAX_LINE_WIDTH: f32 = 60.0;
const SLOT_INSET: f32 = 3.0;
const NAME_SIZE: f32 = 8.5;
const DETAIL_SIZE: f32 = 8.0;
const MIN_FONT_SIZE: f32 = 5.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignaturePlacement {
    /// Not enough room left: the block starts near the top of a fresh page.
    NewPage,
    /// Plenty of room left: the block sits on the bottom margin.
    BottomAnchored,
    /// The block goes right below the cursor.
    BelowCursor,
}

/// Room the signature block needs below the cursor.
pub fn signature_requirement() -> f32 {
    SIGNATURE_BLOCK_HEIGHT + SIGNATURE_MIN_GAP
}

/// Decide where the signatures go given the cursor on the last page.
/// Returns the placement and, except for [`SignaturePlacement::NewPage`], the block's top y.
pub fn plan_signatures(cursor_y: f32, safe_bottom: f32) -> (SignaturePlacement, Option<f32>) {
    let available = safe_bottom - cursor_y;
    let required = signature_requirement();
    if available < required {
        (SignaturePlacement::NewPage, None)
    } else if available > required + SIGNATURE_SLACK {
        (SignaturePlacement::BottomAnchored, Some(safe_bottom - SIGNATURE_BLOCK_HEIGHT))
    } else {
        (SignaturePlacement::BelowCursor, Some(cursor_y + SIGNATURE_MIN_GAP))
    }
}

/// Size (not above `preferred`, not below the minimum) and text that fit `width`.
/// Text still too wide at the minimum size is cut and ends with an ellipsis.
fn fit_text(fonts: &FontSet, style: TextStyle, text: &str, preferred: f32, width: f32) -> (String, f32) {
    let w = fonts.text_width(style, text, preferred);
    if w <= width || w <= 0.0 {
        return (text.to_string(), preferred);
    }
    // round down to 0.1pt
    let size = ((preferred * width / w * 10.0).floor() / 10.0).max(MIN_FONT_SIZE);
    if fonts.text_width(style, text, size) <= width {
        return (text.to_string(), size);
    }
    let mut cut: String = text.to_string();
    while !cut.is_empty() && fonts.text_width(style, &format!("{cut}\u{2026}"), size) > width {
        cut.pop();
    }
    (format!("{}\u{2026}", cut.trim_end()), size)
}

fn draw_centered(
    content: &mut Content,
    fonts: &mut FontSet,
    style: TextStyle,
    preferred_size: f32,
    text: &str,
    center_x: f32,
    slot_w: f32,
    line_top: f32,
    page_height: f32,
) {
    let (text, size) = fit_text(fonts, style, text, preferred_size, slot_w);
    let fmt = TextFormat::new(style, size);
    let w = fonts.text_width(style, &text, size);
    draw_text(
        content,
        fonts,
        fmt,
        center_x - w / 2.0,
        line_top + baseline_offset(preferred_size),
        page_height,
        &text,
    );
}

/// Draw one signature slot per signatory, left to right across the content width.
pub(super) fn draw_signature_row(
    content: &mut Content,
    fonts: &mut FontSet,
    geometry: &PageGeometry,
    signatories: &[Signatory],
    top: f32,
) {
    let n = signatories.len().max(1);
    let slot_w = geometry.content_width() / n as f32;
    let text_w = (slot_w - 2.0 * SLOT_INSET).max(1.0);
    let line_w = text_w.min(MAX_LINE_WIDTH);
    let page_h = geometry.height;
    let line_y = top + SIGNING_SPACE;
    let pitch = super::layout::line_height(DETAIL_SIZE) + 0.2;

    for (i, s) in signatories.iter().enumerate() {
        let cx = geometry.margin_left + slot_w * (i as f32 + 0.5);
        draw_hline(content, cx - line_w / 2.0, cx + line_w / 2.0, line_y, page_h, 0.6);

        let name = or_placeholder(s.name.as_deref());
        let id_line = format!("DNI/CIP: {}", or_placeholder(s.id_number.as_deref()));
        let role = or_placeholder(s.role.as_deref());

        let first = line_y + 0.8;
        draw_centered(content, fonts, TextStyle::Bold, NAME_SIZE, name, cx, text_w, first, page_h);
        draw_centered(content, fonts, TextStyle::Normal, DETAIL_SIZE, &id_line, cx, text_w, first + pitch, page_h);
        draw_centered(content, fonts, TextStyle::Normal, DETAIL_SIZE, role, cx, text_w, first + 2.0 * pitch, page_h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_content_stays_inside_its_height() {
        let pitch = super::super::layout::line_height(DETAIL_SIZE) + 0.2;
        let last_line_bottom = SIGNING_SPACE + 0.8 + 2.0 * pitch + super::super::layout::line_height(DETAIL_SIZE);
        assert!(last_line_bottom <= SIGNATURE_BLOCK_HEIGHT);
    }

    #[test]
    fn names_shrink_then_truncate_to_fit() {
        let fonts = FontSet::standard();
        let name = "MARÍA DEL PILAR FERNÁNDEZ DE CÓRDOVA";
        let (text, size) = fit_text(&fonts, TextStyle::Bold, name, NAME_SIZE, 45.0);
        assert_eq!(text, name);
        assert!(size < NAME_SIZE && size >= MIN_FONT_SIZE);
        assert!(fonts.text_width(TextStyle::Bold, &text, size) <= 45.0);

        let long = name.repeat(3);
        let (text, size) = fit_text(&fonts, TextStyle::Bold, &long, NAME_SIZE, 45.0);
        assert_eq!(size, MIN_FONT_SIZE);
        assert!(text.ends_with('\u{2026}'));
        assert!(fonts.text_width(TextStyle::Bold, &text, size) <= 45.0);
    }

    #[test]
    fn short_text_keeps_its_size() {
        let fonts = FontSet::standard();
        let (text, size) = fit_text(&fonts, TextStyle::Normal, "Perito", DETAIL_SIZE, 50.0);
        assert_eq!((text.as_str(), size), ("Perito", DETAIL_SIZE));
    }
}
