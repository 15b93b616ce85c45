use std::path::Path;

use pdf_writer::{Content, Filter, Name, Pdf, Ref};

use crate::config::{Letterhead, PageGeometry, mm_to_pt};
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::model::{Alignment, HeaderStamp, TextStyle};

use super::layout::{TextFormat, TextLine, baseline_offset, build_lines, draw_hline, draw_line, draw_text, pdf_y};

const EMBLEM_TEXT_GAP: f32 = 4.0; // mm between emblem and the text block
const CAPTION_GAP: f32 = 1.0;
const RULE_GAP: f32 = 2.0;
const HEADER_BOTTOM_GAP: f32 = 4.0;
const FOOTER_FONT_SIZE: f32 = 8.0;

pub(super) const EMBLEM_NAME: &str = "Im1";

enum EmblemData {
    /// Baseline RGB JPEG, embedded as-is.
    Jpeg(Vec<u8>),
    /// zlib-compressed RGB samples and optional alpha soft mask.
    Flate { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

pub(super) struct Emblem {
    data: EmblemData,
    pixel_width: u32,
    pixel_height: u32,
}

fn decode_emblem(bytes: Vec<u8>) -> std::result::Result<Emblem, image::ImageError> {
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (w, h) = (decoded.width(), decoded.height());

    if format == image::ImageFormat::Jpeg && decoded.color() == image::ColorType::Rgb8 {
        return Ok(Emblem {
            data: EmblemData::Jpeg(bytes),
            pixel_width: w,
            pixel_height: h,
        });
    }

    let rgba: image::RgbaImage = decoded.to_rgba8();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
    let rgb_data: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);
    let alpha = has_alpha.then(|| {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
    });

    Ok(Emblem {
        data: EmblemData::Flate { rgb, alpha },
        pixel_width: w,
        pixel_height: h,
    })
}

/// Load the letterhead emblem. Failures are logged and yield `None`:
/// the document is produced without the emblem.
pub(super) fn load_emblem(path: &Path) -> Option<Emblem> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("Emblem not loaded ({}): {e}, continuing without it", path.display());
            return None;
        }
    };
    match decode_emblem(bytes) {
        Ok(emblem) => {
            log::debug!(
                "emblem {} loaded: {}x{} px",
                path.display(),
                emblem.pixel_width,
                emblem.pixel_height
            );
            Some(emblem)
        }
        Err(e) => {
            log::warn!("Emblem not decoded ({}): {e}, continuing without it", path.display());
            None
        }
    }
}

/// Write the emblem image XObject (plus its soft mask, if any).
pub(super) fn write_emblem(pdf: &mut Pdf, emblem: &Emblem, alloc: &mut impl FnMut() -> Ref) -> Ref {
    let xobj_ref = alloc();
    let (w, h) = (emblem.pixel_width as i32, emblem.pixel_height as i32);
    match &emblem.data {
        EmblemData::Jpeg(data) => {
            let mut xobj = pdf.image_xobject(xobj_ref, data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        EmblemData::Flate { rgb, alpha } => {
            let smask_ref = alpha.as_ref().map(|alpha| {
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });
            let mut xobj = pdf.image_xobject(xobj_ref, rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    xobj_ref
}

struct HeaderText {
    line: TextLine,
    fmt: TextFormat,
    x: f32,
    width: f32,
    baseline: f32,
    alignment: Alignment,
}

/// Positions of every letterhead element, computed once per document so each
/// page's header is painted from identical geometry.
pub(super) struct HeaderLayout {
    texts: Vec<HeaderText>,
    emblem_box: Option<(f32, f32, f32, f32)>, // x, top, width, height (mm)
    rule_y: Option<f32>,
    /// First y available to content on every page.
    pub(super) bottom: f32,
}

impl HeaderLayout {
    pub(super) fn compute(
        letterhead: &Letterhead,
        geometry: &PageGeometry,
        fonts: &FontSet,
        has_emblem: bool,
    ) -> Result<Self> {
        let top = geometry.margin_top;
        let emblem_box = (has_emblem && letterhead.emblem_width > 0.0 && letterhead.emblem_height > 0.0)
            .then_some((
                geometry.margin_left,
                top,
                letterhead.emblem_width,
                letterhead.emblem_height,
            ));

        let (text_x, text_w) = match emblem_box {
            Some((x, _, w, _)) => {
                let tx = x + w + EMBLEM_TEXT_GAP;
                (tx, geometry.content_right() - tx)
            }
            None => (geometry.margin_left, geometry.content_width()),
        };
        if text_w <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "emblem width {:.1}mm leaves no room for the letterhead text",
                letterhead.emblem_width
            )));
        }

        let mut texts = Vec::new();
        let mut y = top;
        let mut place = |lines: &[crate::config::LetterheadLine], alignment: Alignment, italic: bool, y: &mut f32| {
            for line in lines {
                let style = match (line.bold, italic) {
                    (true, true) => TextStyle::BoldItalic,
                    (true, false) => TextStyle::Bold,
                    (false, true) => TextStyle::Italic,
                    (false, false) => TextStyle::Normal,
                };
                let fmt = TextFormat::new(style, line.font_size);
                for wrapped in build_lines(&line.text, fonts, fmt, text_w) {
                    texts.push(HeaderText {
                        line: wrapped,
                        fmt,
                        x: text_x,
                        width: text_w,
                        baseline: *y + baseline_offset(line.font_size),
                        alignment,
                    });
                    *y += fmt.line_height();
                }
            }
        };
        place(&letterhead.lines, Alignment::Center, false, &mut y);
        if !letterhead.caption.is_empty() {
            if y > top {
                y += CAPTION_GAP;
            }
            place(&letterhead.caption, Alignment::Right, true, &mut y);
        }

        let content_bottom = match emblem_box {
            Some((_, t, _, h)) => y.max(t + h),
            None => y,
        };
        let drawn_anything = !texts.is_empty() || emblem_box.is_some();
        let rule_y = letterhead.rule.then_some(content_bottom + if drawn_anything { RULE_GAP } else { 0.0 });
        let bottom = match (rule_y, drawn_anything) {
            (Some(r), _) => r + HEADER_BOTTOM_GAP,
            (None, true) => content_bottom + HEADER_BOTTOM_GAP,
            (None, false) => top,
        };

        if bottom < top {
            return Err(Error::InvalidGeometry(format!(
                "letterhead ends at {bottom:.1}mm, above the top margin {top:.1}mm"
            )));
        }
        if bottom >= geometry.safe_bottom() {
            return Err(Error::InvalidGeometry(format!(
                "letterhead ends at {bottom:.1}mm, past the safe bottom {:.1}mm",
                geometry.safe_bottom()
            )));
        }

        Ok(Self {
            texts,
            emblem_box,
            rule_y,
            bottom,
        })
    }

    pub(super) fn paint(&self, content: &mut Content, fonts: &mut FontSet, geometry: &PageGeometry) -> HeaderStamp {
        let page_h = geometry.height;
        if let Some((x, top, w, h)) = self.emblem_box {
            content.save_state();
            content.transform([
                mm_to_pt(w),
                0.0,
                0.0,
                mm_to_pt(h),
                mm_to_pt(x),
                pdf_y(page_h, top + h),
            ]);
            content.x_object(Name(EMBLEM_NAME.as_bytes()));
            content.restore_state();
        }

        for t in &self.texts {
            draw_line(content, fonts, &t.line, t.fmt, t.alignment, t.x, t.width, t.baseline, page_h);
        }

        if let Some(y) = self.rule_y {
            draw_hline(content, geometry.margin_left, geometry.content_right(), y, page_h, 0.8);
        }

        HeaderStamp {
            lines: self.texts.iter().map(|t| t.line.text()).collect(),
            emblem: self.emblem_box.is_some(),
            rule: self.rule_y.is_some(),
            bottom: self.bottom,
        }
    }
}

/// Stamp "Página i de N" centered in the bottom margin.
pub(super) fn paint_page_number(
    content: &mut Content,
    fonts: &mut FontSet,
    geometry: &PageGeometry,
    page: usize,
    total: usize,
) {
    let fmt = TextFormat::new(TextStyle::Normal, FOOTER_FONT_SIZE);
    if geometry.margin_bottom < fmt.line_height() {
        return;
    }
    let text = format!("Página {} de {}", page + 1, total);
    let w = fonts.text_width(fmt.style, &text, fmt.font_size);
    let x = geometry.margin_left + (geometry.content_width() - w) / 2.0;
    let line_top = geometry.safe_bottom() + (geometry.margin_bottom - fmt.line_height()) / 2.0;
    draw_text(content, fonts, fmt, x, line_top + baseline_offset(fmt.font_size), geometry.height, &text);
}
