use pdf_writer::Content;

use crate::config::mm_to_pt;
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::model::{Alignment, BlockKind, TableBlock, TextStyle};

use super::canvas::Canvas;
use super::layout::{TextFormat, TextLine, baseline_offset, build_lines, draw_line, line_height, pdf_y};

pub const TABLE_FONT_SIZE: f32 = 9.0;
pub const CELL_PADDING_X: f32 = 1.5; // mm
pub const CELL_PADDING_Y: f32 = 1.2; // mm
const HEADER_FILL_GRAY: f32 = 0.86;
const GRID_LINE_WIDTH: f32 = 0.4; // pt

/// Height in mm of a table row whose tallest cell wraps to `lines` lines.
pub fn table_row_height(lines: usize) -> f32 {
    lines.max(1) as f32 * line_height(TABLE_FONT_SIZE) + 2.0 * CELL_PADDING_Y
}

fn body_format() -> TextFormat {
    TextFormat::new(TextStyle::Normal, TABLE_FONT_SIZE)
}

fn header_format() -> TextFormat {
    TextFormat::new(TextStyle::Bold, TABLE_FONT_SIZE)
}

/// Reject tables a reader could not make sense of.
pub(super) fn validate(table: &TableBlock) -> Result<()> {
    if table.header.is_empty() {
        return Err(Error::MalformedTable("table has no header columns".into()));
    }
    let ncols = table.header.len();
    for (i, row) in table.rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(Error::MalformedTable(format!(
                "row {} has {} cells, header has {}",
                i + 1,
                row.len(),
                ncols
            )));
        }
    }
    Ok(())
}

/// Column widths summing to `total`: natural widths scaled to fill the line,
/// then auto-fitted so the longest unbreakable word of each column fits within
/// the cell (including padding) where the total allows it.
fn fit_columns(table: &TableBlock, fonts: &FontSet, total: f32) -> Vec<f32> {
    let ncols = table.header.len();
    let pad = 2.0 * CELL_PADDING_X;
    let mut natural = vec![0.0f32; ncols];
    let mut min_widths = vec![0.0f32; ncols];

    let rows = std::iter::once((&table.header, header_format()))
        .chain(table.rows.iter().map(|r| (r, body_format())));
    for (row, fmt) in rows {
        for (i, cell) in row.iter().enumerate() {
            for line in cell.split('\n') {
                natural[i] = natural[i].max(fonts.text_width(fmt.style, line.trim(), fmt.font_size) + pad);
            }
            for word in cell.split_whitespace() {
                min_widths[i] = min_widths[i].max(fonts.text_width(fmt.style, word, fmt.font_size) + pad);
            }
        }
    }

    let natural_total: f32 = natural.iter().sum();
    let mut widths: Vec<f32> = if natural_total > 0.0 {
        natural.iter().map(|w| w / natural_total * total).collect()
    } else {
        vec![total / ncols as f32; ncols]
    };

    // Expand columns that need it, track how much extra space is needed
    let mut extra_needed: f32 = 0.0;
    let mut shrinkable: f32 = 0.0;
    for i in 0..ncols {
        if min_widths[i] > widths[i] {
            extra_needed += min_widths[i] - widths[i];
            widths[i] = min_widths[i];
        } else {
            shrinkable += widths[i] - min_widths[i];
        }
    }

    if extra_needed > 0.0 && shrinkable > 0.0 {
        let factor = extra_needed.min(shrinkable) / shrinkable;
        for i in 0..ncols {
            if widths[i] > min_widths[i] {
                let available = widths[i] - min_widths[i];
                widths[i] -= available * factor;
            }
        }
    }
    // Normalize to preserve total
    let new_total: f32 = widths.iter().sum();
    if new_total > 0.0 && (new_total - total).abs() > 0.01 {
        let scale = total / new_total;
        for w in &mut widths {
            *w *= scale;
        }
    }

    widths
}

struct RowLayout {
    height: f32,
    cell_lines: Vec<Vec<TextLine>>,
}

fn layout_row(cells: &[String], col_widths: &[f32], fonts: &FontSet, fmt: TextFormat) -> RowLayout {
    let cell_lines: Vec<Vec<TextLine>> = cells
        .iter()
        .zip(col_widths)
        .map(|(cell, &w)| {
            let text_w = (w - 2.0 * CELL_PADDING_X).max(1.0);
            build_lines(cell, fonts, fmt, text_w)
        })
        .collect();
    let max_lines = cell_lines.iter().map(Vec::len).max().unwrap_or(1);
    RowLayout {
        height: table_row_height(max_lines),
        cell_lines,
    }
}

fn draw_row(
    content: &mut Content,
    fonts: &mut FontSet,
    layout: &RowLayout,
    col_widths: &[f32],
    left: f32,
    top: f32,
    page_height: f32,
    fmt: TextFormat,
    fill: bool,
) {
    let bottom = top + layout.height;
    let total_w: f32 = col_widths.iter().sum();

    if fill {
        content.save_state();
        content.set_fill_gray(HEADER_FILL_GRAY);
        content.rect(
            mm_to_pt(left),
            pdf_y(page_height, bottom),
            mm_to_pt(total_w),
            mm_to_pt(layout.height),
        );
        content.fill_nonzero();
        content.restore_state();
    }

    let lh = fmt.line_height();
    let mut cell_x = left;
    for (lines, &w) in layout.cell_lines.iter().zip(col_widths) {
        let text_x = cell_x + CELL_PADDING_X;
        let text_w = (w - 2.0 * CELL_PADDING_X).max(1.0);
        for (i, line) in lines.iter().enumerate() {
            let baseline = top + CELL_PADDING_Y + i as f32 * lh + baseline_offset(fmt.font_size);
            draw_line(content, fonts, line, fmt, Alignment::Left, text_x, text_w, baseline, page_height);
        }
        cell_x += w;
    }

    // Grid: outer box plus column separators
    content.save_state();
    content.set_line_width(GRID_LINE_WIDTH);
    content.rect(
        mm_to_pt(left),
        pdf_y(page_height, bottom),
        mm_to_pt(total_w),
        mm_to_pt(layout.height),
    );
    let mut sep_x = left;
    for &w in &col_widths[..col_widths.len().saturating_sub(1)] {
        sep_x += w;
        content.move_to(mm_to_pt(sep_x), pdf_y(page_height, top));
        content.line_to(mm_to_pt(sep_x), pdf_y(page_height, bottom));
    }
    content.stroke();
    content.restore_state();
}

/// Where the table routine stopped.
pub(super) struct TableEnd {
    /// y immediately below the last drawn row, on the canvas's current page.
    pub(super) last_row_bottom: f32,
}

/// Draw `table` starting at `start_y` on the current page, breaking pages per row.
/// Every continuation page gets the letterhead and a repeated header row.
pub(super) fn render_table(canvas: &mut Canvas, table: &TableBlock, start_y: f32) -> Result<TableEnd> {
    validate(table)?;

    let left = canvas.geometry.margin_left;
    let page_h = canvas.geometry.height;
    let col_widths = fit_columns(table, &canvas.fonts, canvas.geometry.content_width());
    let head = layout_row(&table.header, &col_widths, &canvas.fonts, header_format());
    let body: Vec<RowLayout> = table
        .rows
        .iter()
        .map(|r| layout_row(r, &col_widths, &canvas.fonts, body_format()))
        .collect();

    let room = canvas.capacity() - head.height;
    for (ri, layout) in body.iter().enumerate() {
        if layout.height > room + super::canvas::FIT_EPSILON {
            return Err(Error::RowTooTall {
                row: ri + 1,
                height: layout.height,
                capacity: room,
            });
        }
    }
    if head.height > canvas.capacity() + super::canvas::FIT_EPSILON {
        return Err(Error::RowTooTall {
            row: 0,
            height: head.height,
            capacity: canvas.capacity(),
        });
    }

    // Keep the header row together with the first body row
    let mut y = start_y;
    let first_h = head.height + body.first().map_or(0.0, |r| r.height);
    if canvas.overflows(y, first_h) {
        y = canvas.start_page();
    }

    let draw_head = |canvas: &mut Canvas, y: f32| {
        let (content, fonts) = canvas.surface();
        draw_row(content, fonts, &head, &col_widths, left, y, page_h, header_format(), true);
        canvas.record(BlockKind::TableHeader, y, y + head.height);
        y + head.height
    };

    y = draw_head(canvas, y);

    for (ri, layout) in body.iter().enumerate() {
        if canvas.overflows(y, layout.height) {
            log::debug!(
                "table row {} ({:.2}mm) overflows at y={:.2}mm, continuing on a new page",
                ri + 1,
                layout.height,
                y
            );
            y = canvas.start_page();
            y = draw_head(canvas, y);
        }
        let (content, fonts) = canvas.surface();
        draw_row(content, fonts, layout, &col_widths, left, y, page_h, body_format(), false);
        canvas.record(BlockKind::TableRow, y, y + layout.height);
        y += layout.height;
    }

    Ok(TableEnd { last_row_bottom: y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let table = TableBlock {
            header: strings(&["Código", "Tipo"]),
            rows: vec![strings(&["M-01", "Sangre"]), strings(&["M-02"])],
        };
        let err = validate(&table).unwrap_err();
        assert!(matches!(err, Error::MalformedTable(_)));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn empty_header_is_rejected() {
        let table = TableBlock::default();
        assert!(matches!(validate(&table), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn columns_fill_the_width_and_fit_long_words() {
        let fonts = FontSet::standard();
        let table = TableBlock {
            header: strings(&["N°", "Descripción"]),
            rows: vec![strings(&[
                "1",
                "Hisopado bucal conservado en sobre de papel kraft rotulado y lacrado",
            ])],
        };
        let widths = fit_columns(&table, &fonts, 170.0);
        assert_eq!(widths.len(), 2);
        assert!((widths.iter().sum::<f32>() - 170.0).abs() < 0.05);
        let min_first = fonts.text_width(TextStyle::Bold, "N°", TABLE_FONT_SIZE) + 2.0 * CELL_PADDING_X;
        assert!(widths[0] + 1e-3 >= min_first);
        assert!(widths[1] > widths[0]);
    }

    #[test]
    fn row_height_grows_with_wrapped_lines() {
        assert!(table_row_height(3) > table_row_height(1));
        assert_eq!(table_row_height(0), table_row_height(1));
    }
}
