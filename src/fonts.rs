use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::config::{FontFiles, pt_to_mm};
use crate::error::{Error, Result};
use crate::model::TextStyle;

/// Advance widths (1000 units/em) of Helvetica for ASCII 32..=126,
/// from the Adobe core-font AFM.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// Map a single Unicode char to its WinAnsi (Windows-1252) byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95, // bullet
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi bytes for PDF Str encoding.
/// Unmappable characters become '?'.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match char_to_winansi(c) {
            0 => {
                log::debug!("char {c:?} (U+{:04X}) has no WinAnsi code, drawn as '?'", c as u32);
                b'?'
            }
            b => b,
        })
        .collect()
}

/// Unaccented base letter for the Latin-1 letters used in Spanish text.
fn latin1_base(c: char) -> Option<char> {
    Some(match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    })
}

fn helvetica_width(table: &[u16; 95], bold: bool, c: char) -> f32 {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        return table[(code - 0x20) as usize] as f32;
    }
    if let Some(base) = latin1_base(c) {
        return table[(base as u32 - 0x20) as usize] as f32;
    }
    match c {
        // accented i is built on the dotless i, which is wider than 'i'
        'ì'..='ï' => 278.0,
        '¡' => 333.0,
        '¿' => 611.0,
        'º' => 365.0,
        'ª' => 370.0,
        '°' => 400.0,
        '«' | '»' => 556.0,
        '·' => 278.0,
        '\u{2013}' => 556.0,
        '\u{2014}' | '\u{2026}' => 1000.0,
        '\u{2018}' | '\u{2019}' => if bold { 278.0 } else { 222.0 },
        '\u{201C}' | '\u{201D}' => if bold { 500.0 } else { 333.0 },
        '\u{2022}' => 350.0,
        '\u{00A0}' => 278.0,
        _ => 556.0,
    }
}

struct TrueTypeFace {
    ps_name: String,
    data: Mmap,
    units: f32,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: Rect,
    /// char → (glyph id, advance in 1000-units)
    glyphs: HashMap<char, (u16, f32)>,
}

/// Characters measured up front: Basic Latin through Latin Extended-B, plus
/// general punctuation and the euro sign.
fn measured_ranges() -> impl Iterator<Item = char> {
    ('\u{20}'..='\u{24F}').chain('\u{2000}'..='\u{206F}').chain(std::iter::once('\u{20AC}'))
}

fn load_truetype(path: &Path) -> Result<TrueTypeFace> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;
    let data = unsafe { Mmap::map(&file) }
        .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;
    let face = Face::parse(&data, 0)
        .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut glyphs = HashMap::new();
    for ch in measured_ranges() {
        if let Some(gid) = face.glyph_index(ch) {
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            glyphs.insert(ch, (gid.0, w));
        }
    }

    let family = face
        .names()
        .into_iter()
        .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && n.is_unicode())
        .and_then(|n| n.to_string())
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_else(|| "EmbeddedFont".to_string());
    let ps_name: String = family.chars().filter(|c| !c.is_whitespace()).collect();

    log::debug!(
        "loaded font {ps_name} from {} ({} glyphs measured)",
        path.display(),
        glyphs.len()
    );

    drop(face);
    Ok(TrueTypeFace {
        ps_name,
        data,
        units,
        ascent,
        descent,
        cap_height,
        bbox,
        glyphs,
    })
}

enum Program {
    Standard {
        base_font: &'static str,
        widths: &'static [u16; 95],
        bold: bool,
    },
    TrueType {
        face: TrueTypeFace,
        remapper: subsetter::GlyphRemapper,
        /// remapped gid → (char, advance in 1000-units)
        used: BTreeMap<u16, (char, f32)>,
    },
}

struct FontSlot {
    pdf_name: String,
    program: Program,
}

impl FontSlot {
    fn char_width_1000(&self, ch: char) -> f32 {
        match &self.program {
            Program::Standard { widths, bold, .. } => helvetica_width(widths, *bold, ch),
            Program::TrueType { face, .. } => face
                .glyphs
                .get(&ch)
                .or_else(|| face.glyphs.get(&'?'))
                .map(|&(_, w)| w)
                .unwrap_or(0.0),
        }
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        match &mut self.program {
            Program::Standard { .. } => to_winansi_bytes(text),
            Program::TrueType {
                face,
                remapper,
                used,
            } => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let (gid, w) = match face.glyphs.get(&ch) {
                        Some(&g) => g,
                        None => {
                            log::debug!("{} has no glyph for {ch:?}", face.ps_name);
                            face.glyphs.get(&'?').copied().unwrap_or((0, 0.0))
                        }
                    };
                    let new_gid = remapper.remap(gid);
                    used.entry(new_gid).or_insert((ch, w));
                    out.push((new_gid >> 8) as u8);
                    out.push((new_gid & 0xFF) as u8);
                }
                out
            }
        }
    }
}

/// The fonts of one document: one slot per distinct program, and a style → slot map
/// so unconfigured styles reuse the regular face.
pub(crate) struct FontSet {
    slots: Vec<FontSlot>,
    style_slot: [usize; 4],
}

impl FontSet {
    /// The PDF base-14 Helvetica family.
    pub(crate) fn standard() -> Self {
        let programs = [
            ("Helvetica", &HELVETICA_ASCII, false),
            ("Helvetica-Bold", &HELVETICA_BOLD_ASCII, true),
            ("Helvetica-Oblique", &HELVETICA_ASCII, false),
            ("Helvetica-BoldOblique", &HELVETICA_BOLD_ASCII, true),
        ];
        let slots = programs
            .into_iter()
            .enumerate()
            .map(|(i, (base_font, widths, bold))| FontSlot {
                pdf_name: format!("F{}", i + 1),
                program: Program::Standard {
                    base_font,
                    widths,
                    bold,
                },
            })
            .collect();
        Self {
            slots,
            style_slot: [0, 1, 2, 3],
        }
    }

    pub(crate) fn from_files(files: &FontFiles) -> Result<Self> {
        let t0 = std::time::Instant::now();
        let mut slots: Vec<FontSlot> = Vec::new();
        let mut style_slot = [0usize; 4];

        let paths = [
            Some(&files.regular),
            files.bold.as_ref(),
            files.italic.as_ref(),
            files.bold_italic.as_ref(),
        ];
        for style in TextStyle::ALL {
            let Some(path) = paths[style.index()] else {
                continue;
            };
            let face = load_truetype(path)?;
            style_slot[style.index()] = slots.len();
            slots.push(FontSlot {
                pdf_name: format!("F{}", slots.len() + 1),
                program: Program::TrueType {
                    face,
                    remapper: subsetter::GlyphRemapper::new(),
                    used: BTreeMap::new(),
                },
            });
        }

        log::debug!(
            "font files loaded: {} faces in {:.1}ms",
            slots.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Self { slots, style_slot })
    }

    fn slot(&self, style: TextStyle) -> &FontSlot {
        &self.slots[self.style_slot[style.index()]]
    }

    pub(crate) fn pdf_name(&self, style: TextStyle) -> &str {
        &self.slot(style).pdf_name
    }

    /// Width of `text` in millimetres at `font_size` points.
    pub(crate) fn text_width(&self, style: TextStyle, text: &str, font_size: f32) -> f32 {
        let slot = self.slot(style);
        let w_1000: f32 = text.chars().map(|ch| slot.char_width_1000(ch)).sum();
        pt_to_mm(w_1000 * font_size / 1000.0)
    }

    /// Encode `text` for a `Tj` operator in the font used for `style`.
    pub(crate) fn encode(&mut self, style: TextStyle, text: &str) -> Vec<u8> {
        let idx = self.style_slot[style.index()];
        self.slots[idx].encode(text)
    }

    /// Write every font object and return the (resource name, font ref) pairs.
    pub(crate) fn write(
        &self,
        pdf: &mut Pdf,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<Vec<(String, Ref)>> {
        let mut pairs = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let font_ref = alloc();
            match &slot.program {
                Program::Standard { base_font, .. } => {
                    pdf.type1_font(font_ref)
                        .base_font(Name(base_font.as_bytes()))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                }
                Program::TrueType {
                    face,
                    remapper,
                    used,
                } => embed_truetype(pdf, font_ref, face, remapper, used, alloc)?,
            }
            pairs.push((slot.pdf_name.clone(), font_ref));
        }
        Ok(pairs)
    }
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to the glyphs drawn in the document.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    face: &TrueTypeFace,
    remapper: &subsetter::GlyphRemapper,
    used: &BTreeMap<u16, (char, f32)>,
    alloc: &mut impl FnMut() -> Ref,
) -> Result<()> {
    let descriptor_ref = alloc();
    let data_ref = alloc();
    let cid_font_ref = alloc();
    let tounicode_ref = alloc();
    let ps_name = face.ps_name.as_str();

    let subset_data = subsetter::subset(&face.data, 0, remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {ps_name}: {e}, embedding the full font");
        face.data.to_vec()
    });

    let data_len = i32::try_from(subset_data.len())
        .map_err(|_| Error::Pdf(format!("font program for {ps_name} is too large")))?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(face.bbox)
        .italic_angle(0.0)
        .ascent(face.ascent)
        .descent(face.descent)
        .cap_height(face.cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !used.is_empty() {
            let mut w = cid.widths();
            for (&gid, &(_, width)) in used {
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&gid, &(ch, _)) in used {
        cmap.pair(gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    log::debug!(
        "embedded {ps_name}: {} glyphs, {} bytes (units/em {})",
        used.len(),
        subset_data.len(),
        face.units
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winansi_maps_spanish_letters_and_replaces_the_rest() {
        assert_eq!(to_winansi_bytes("Perú"), vec![b'P', b'e', b'r', 0xFA]);
        assert_eq!(to_winansi_bytes("Nº–"), vec![b'N', 0xBA, 0x96]);
        assert_eq!(to_winansi_bytes("Ω"), vec![b'?']);
    }

    #[test]
    fn bold_text_is_wider_than_regular() {
        let fonts = FontSet::standard();
        let regular = fonts.text_width(TextStyle::Normal, "Resultado", 10.0);
        let bold = fonts.text_width(TextStyle::Bold, "Resultado", 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn accented_letters_measure_like_their_base() {
        let fonts = FontSet::standard();
        let plain = fonts.text_width(TextStyle::Normal, "PERU", 12.0);
        let accented = fonts.text_width(TextStyle::Normal, "PERÚ", 12.0);
        assert!((plain - accented).abs() < 1e-4);
    }

    #[test]
    fn width_scales_with_font_size() {
        let fonts = FontSet::standard();
        // "M" is 833 units in Helvetica
        let w = fonts.text_width(TextStyle::Normal, "M", 10.0);
        assert!((w - pt_to_mm(8.33)).abs() < 1e-4);
        let w20 = fonts.text_width(TextStyle::Normal, "M", 20.0);
        assert!((w20 - 2.0 * w).abs() < 1e-4);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let files = FontFiles {
            regular: "/nonexistent/font.ttf".into(),
            ..FontFiles::default()
        };
        assert!(matches!(FontSet::from_files(&files), Err(Error::Font(_))));
    }
}
