use pdf_writer::{Content, Name, Str};

use crate::config::{mm_to_pt, pt_to_mm};
use crate::fonts::FontSet;
use crate::model::{Alignment, TextStyle};

/// Line pitch as a multiple of the font size.
pub(crate) const LINE_HEIGHT_FACTOR: f32 = 1.15;
const ASCENDER_RATIO: f32 = 0.75;

/// Height in mm of one text line at `font_size` points.
pub fn line_height(font_size: f32) -> f32 {
    pt_to_mm(font_size * LINE_HEIGHT_FACTOR)
}

/// Distance in mm from the top of a line box to its baseline.
pub(super) fn baseline_offset(font_size: f32) -> f32 {
    pt_to_mm(font_size * ((LINE_HEIGHT_FACTOR - 1.0) / 2.0 + ASCENDER_RATIO))
}

pub(super) struct WordChunk {
    pub(super) text: String,
    pub(super) x_offset: f32, // mm, relative to line start
    pub(super) width: f32,    // mm
}

pub(super) struct TextLine {
    pub(super) chunks: Vec<WordChunk>,
    pub(super) total_width: f32,
    /// Last line before an explicit newline or the end of the text; never justified.
    pub(super) ends_paragraph: bool,
}

impl TextLine {
    pub(super) fn text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy)]
pub(super) struct TextFormat {
    pub(super) style: TextStyle,
    pub(super) font_size: f32,
}

impl TextFormat {
    pub(super) fn new(style: TextStyle, font_size: f32) -> Self {
        Self { style, font_size }
    }

    pub(super) fn line_height(&self) -> f32 {
        line_height(self.font_size)
    }
}

fn finish_line(chunks: &mut Vec<WordChunk>, ends_paragraph: bool) -> TextLine {
    let total_width = chunks.last().map(|c| c.x_offset + c.width).unwrap_or(0.0);
    TextLine {
        chunks: std::mem::take(chunks),
        total_width,
        ends_paragraph,
    }
}

/// Break a word that is wider than the line into pieces that each fit.
fn split_long_word(word: &str, fonts: &FontSet, fmt: TextFormat, max_width: f32) -> Vec<(String, f32)> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_w = 0.0f32;
    let mut buf = [0u8; 4];
    for ch in word.chars() {
        let cw = fonts.text_width(fmt.style, ch.encode_utf8(&mut buf), fmt.font_size);
        if !current.is_empty() && current_w + cw > max_width {
            pieces.push((std::mem::take(&mut current), current_w));
            current_w = 0.0;
        }
        current.push(ch);
        current_w += cw;
    }
    if !current.is_empty() {
        pieces.push((current, current_w));
    }
    pieces
}

/// Wrap `text` into lines no wider than `max_width` mm.
/// Explicit newlines always start a new line; an empty text yields one empty line.
pub(super) fn build_lines(text: &str, fonts: &FontSet, fmt: TextFormat, max_width: f32) -> Vec<TextLine> {
    let space_w = fonts.text_width(fmt.style, " ", fmt.font_size);
    let mut lines: Vec<TextLine> = Vec::new();

    for hard_line in text.split('\n') {
        let mut current_chunks: Vec<WordChunk> = Vec::new();
        let mut current_x: f32 = 0.0;

        for word in hard_line.split_whitespace() {
            let ww = fonts.text_width(fmt.style, word, fmt.font_size);

            if ww > max_width {
                if !current_chunks.is_empty() {
                    lines.push(finish_line(&mut current_chunks, false));
                }
                let mut pieces = split_long_word(word, fonts, fmt, max_width);
                let (last_text, last_w) = pieces.pop().unwrap_or_default();
                for (piece, w) in pieces {
                    lines.push(TextLine {
                        chunks: vec![WordChunk {
                            text: piece,
                            x_offset: 0.0,
                            width: w,
                        }],
                        total_width: w,
                        ends_paragraph: false,
                    });
                }
                current_chunks.push(WordChunk {
                    text: last_text,
                    x_offset: 0.0,
                    width: last_w,
                });
                current_x = last_w;
                continue;
            }

            let proposed_x = if current_chunks.is_empty() {
                0.0
            } else {
                current_x + space_w
            };
            if !current_chunks.is_empty() && proposed_x + ww > max_width {
                lines.push(finish_line(&mut current_chunks, false));
                current_x = 0.0;
            } else {
                current_x = proposed_x;
            }

            current_chunks.push(WordChunk {
                text: word.to_string(),
                x_offset: current_x,
                width: ww,
            });
            current_x += ww;
        }

        lines.push(finish_line(&mut current_chunks, true));
    }

    lines
}

/// PDF user-space y (points from the bottom edge) for a top-down y in mm.
pub(super) fn pdf_y(page_height: f32, y: f32) -> f32 {
    mm_to_pt(page_height - y)
}

/// Draw one string with its baseline at `baseline_y` (mm from the top).
pub(super) fn draw_text(
    content: &mut Content,
    fonts: &mut FontSet,
    fmt: TextFormat,
    x: f32,
    baseline_y: f32,
    page_height: f32,
    text: &str,
) {
    if text.is_empty() {
        return;
    }
    let bytes = fonts.encode(fmt.style, text);
    content
        .begin_text()
        .set_font(Name(fonts.pdf_name(fmt.style).as_bytes()), fmt.font_size)
        .next_line(mm_to_pt(x), pdf_y(page_height, baseline_y))
        .show(Str(&bytes))
        .end_text();
}

/// Draw a horizontal rule from `x1` to `x2` at `y` (all mm), `thickness` in points.
pub(super) fn draw_hline(content: &mut Content, x1: f32, x2: f32, y: f32, page_height: f32, thickness: f32) {
    let py = pdf_y(page_height, y);
    content.save_state();
    content.set_line_width(thickness);
    content.move_to(mm_to_pt(x1), py);
    content.line_to(mm_to_pt(x2), py);
    content.stroke();
    content.restore_state();
}

/// Render one wrapped line inside the box `[x, x + width]` with its baseline at
/// `baseline_y`. Returns the x where the text starts and its drawn width.
pub(super) fn draw_line(
    content: &mut Content,
    fonts: &mut FontSet,
    line: &TextLine,
    fmt: TextFormat,
    alignment: Alignment,
    x: f32,
    width: f32,
    baseline_y: f32,
    page_height: f32,
) -> (f32, f32) {
    if line.chunks.is_empty() {
        return (x, 0.0);
    }

    let is_justified =
        alignment == Alignment::Justify && !line.ends_paragraph && line.chunks.len() > 1;

    let line_start_x = match alignment {
        Alignment::Center => x + (width - line.total_width) / 2.0,
        Alignment::Right => x + width - line.total_width,
        Alignment::Left | Alignment::Justify => x,
    };

    let extra_per_gap = if is_justified {
        ((width - line.total_width) / (line.chunks.len() - 1) as f32).max(0.0)
    } else {
        0.0
    };

    let y = pdf_y(page_height, baseline_y);
    content.begin_text();
    content.set_font(Name(fonts.pdf_name(fmt.style).as_bytes()), fmt.font_size);
    let mut td_x = 0.0f32;
    let mut td_y = 0.0f32;
    for (chunk_idx, chunk) in line.chunks.iter().enumerate() {
        let cx = mm_to_pt(line_start_x + chunk.x_offset + chunk_idx as f32 * extra_per_gap);
        content.next_line(cx - td_x, y - td_y);
        td_x = cx;
        td_y = y;
        let bytes = fonts.encode(fmt.style, &chunk.text);
        content.show(Str(&bytes));
    }
    content.end_text();

    let drawn_width = if is_justified {
        width
    } else {
        line.total_width
    };
    (line_start_x, drawn_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> TextFormat {
        TextFormat::new(TextStyle::Normal, 10.0)
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let fonts = FontSet::standard();
        let lines = build_lines("Acta de extracción", &fonts, fmt(), 170.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Acta de extracción");
        assert!(lines[0].ends_paragraph);
    }

    #[test]
    fn wrapped_lines_fit_the_width() {
        let fonts = FontSet::standard();
        let text = "En la ciudad de Lima, siendo las diez horas del día, se procedió a la \
                    extracción de muestras biológicas en presencia de los peritos designados.";
        let lines = build_lines(text, &fonts, fmt(), 60.0);
        assert!(lines.len() > 2);
        for line in &lines {
            assert!(line.total_width <= 60.0 + 1e-3, "line too wide: {}", line.total_width);
        }
        assert!(!lines[0].ends_paragraph);
        assert!(lines.last().unwrap().ends_paragraph);
        let rejoined: Vec<String> = lines.iter().map(TextLine::text).collect();
        assert_eq!(rejoined.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn explicit_newlines_start_lines() {
        let fonts = FontSet::standard();
        let lines = build_lines("uno\n\ndos", &fonts, fmt(), 170.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text(), "");
        assert!(lines.iter().all(|l| l.ends_paragraph));
    }

    #[test]
    fn long_words_are_broken() {
        let fonts = FontSet::standard();
        let word = "X".repeat(80);
        let lines = build_lines(&word, &fonts, fmt(), 30.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.total_width <= 30.0 + 1e-3));
        let joined: String = lines.iter().map(TextLine::text).collect();
        assert_eq!(joined, word);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let fonts = FontSet::standard();
        let lines = build_lines("", &fonts, fmt(), 100.0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].chunks.is_empty());
    }
}
