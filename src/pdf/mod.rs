mod canvas;
mod header;
mod layout;
mod signatures;
mod table;

use std::time::Instant;

use pdf_writer::{Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::config::{DocumentConfig, PageGeometry, mm_to_pt};
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::model::{
    Alignment, Block, BlockKind, DocumentDefinition, HeaderStamp, ParagraphOptions, Placement, Signatory,
    TableBlock, TextStyle,
};

use canvas::{Canvas, FIT_EPSILON};
use header::{EMBLEM_NAME, HeaderLayout, load_emblem, paint_page_number, write_emblem};
use layout::{TextFormat, baseline_offset, build_lines, draw_hline, draw_line};

pub use layout::line_height;
pub use signatures::{
    SIGNATURE_BLOCK_HEIGHT, SIGNATURE_MIN_GAP, SIGNATURE_SLACK, SignaturePlacement, plan_signatures,
    signature_requirement,
};
pub use table::{CELL_PADDING_X, CELL_PADDING_Y, TABLE_FONT_SIZE, table_row_height};

pub const TITLE_FONT_SIZE: f32 = 12.0;
/// Space left under a title.
pub const TITLE_SPACING: f32 = 4.0; // mm
/// Space left under a table, measured from its last row.
pub const TABLE_BOTTOM_MARGIN: f32 = 5.0; // mm
pub const NAME_VALUE_FONT_SIZE: f32 = 10.0;
/// Offset of the value column from the left margin.
pub const VALUE_COLUMN: f32 = 55.0; // mm
const LABEL_GAP: f32 = 2.0;
const TITLE_UNDERLINE_DROP: f32 = 0.8;
const CREATOR: &str = concat!("mesa-partes-pdf ", env!("CARGO_PKG_VERSION"));

/// Lays blocks onto pages top to bottom, breaking pages before any unit would
/// cross the safe bottom, and renders the result to PDF bytes.
pub struct DocumentBuilder {
    canvas: Canvas,
    cursor_y: f32,
    title: String,
    subject: Option<String>,
    author: Option<String>,
    page_numbers: bool,
}

impl DocumentBuilder {
    /// Prepare fonts and letterhead, then draw the first page's header.
    /// A missing or unreadable emblem only produces a warning.
    pub fn initialize(config: &DocumentConfig) -> Result<Self> {
        let t0 = Instant::now();
        config.validate()?;
        let geometry = config.geometry;

        let fonts = match &config.fonts {
            Some(files) => FontSet::from_files(files)?,
            None => FontSet::standard(),
        };

        let letterhead = &config.letterhead;
        let wants_emblem = letterhead.emblem_width > 0.0 && letterhead.emblem_height > 0.0;
        let emblem = match &letterhead.emblem_path {
            Some(path) if wants_emblem => load_emblem(path),
            _ => None,
        };

        let header = HeaderLayout::compute(letterhead, &geometry, &fonts, emblem.is_some())?;
        let mut canvas = Canvas::new(geometry, fonts, header, emblem);
        let cursor_y = canvas.start_page();

        log::debug!(
            "builder ready in {:.1}ms: header bottom {:.2}mm, capacity {:.2}mm",
            t0.elapsed().as_secs_f64() * 1000.0,
            cursor_y,
            canvas.capacity()
        );

        Ok(Self {
            canvas,
            cursor_y,
            title: String::new(),
            subject: None,
            author: config.author.clone(),
            page_numbers: config.page_numbers,
        })
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_subject(&mut self, subject: Option<&str>) -> &mut Self {
        self.subject = subject.map(str::to_string);
        self
    }

    /// Refuse a unit that could never fit, even on an empty page.
    fn check_unit(&self, height: f32, what: &str) -> Result<()> {
        let capacity = self.canvas.capacity();
        if height > capacity + FIT_EPSILON {
            return Err(Error::InvalidBlock(format!(
                "{what} is {height:.2}mm tall, a page holds {capacity:.2}mm"
            )));
        }
        Ok(())
    }

    /// Start a new page when a unit `height` tall does not fit under the cursor.
    fn ensure_space(&mut self, height: f32) {
        if self.canvas.overflows(self.cursor_y, height) {
            log::debug!(
                "page break: {:.2}mm at y={:.2}mm passes the safe bottom {:.2}mm",
                height,
                self.cursor_y,
                self.canvas.geometry.safe_bottom()
            );
            self.cursor_y = self.canvas.start_page();
        }
    }

    /// Centered bold title, each line underlined. The whole title moves to the
    /// next page when it does not fit.
    pub fn add_title(&mut self, text: &str) -> Result<&mut Self> {
        let geometry = self.canvas.geometry;
        let fmt = TextFormat::new(TextStyle::Bold, TITLE_FONT_SIZE);
        let width = geometry.content_width();
        let lines = build_lines(text, &self.canvas.fonts, fmt, width);
        let lh = fmt.line_height();
        let height = lines.len() as f32 * lh;

        self.check_unit(height, "title")?;
        self.ensure_space(height);

        for line in &lines {
            let top = self.cursor_y;
            let baseline = top + baseline_offset(fmt.font_size);
            let (content, fonts) = self.canvas.surface();
            let (x, w) = draw_line(
                content,
                fonts,
                line,
                fmt,
                Alignment::Center,
                geometry.margin_left,
                width,
                baseline,
                geometry.height,
            );
            if w > 0.0 {
                draw_hline(content, x, x + w, baseline + TITLE_UNDERLINE_DROP, geometry.height, 0.6);
            }
            self.canvas.record(BlockKind::Title, top, top + lh);
            self.cursor_y += lh;
        }
        // Spacing under a title at the foot of the page is absorbed by the page end.
        self.cursor_y = (self.cursor_y + TITLE_SPACING).min(geometry.safe_bottom());
        self.canvas.finish_block();
        Ok(self)
    }

    /// Wrapped text, broken across pages line by line.
    pub fn add_paragraph(&mut self, text: &str, options: &ParagraphOptions) -> Result<&mut Self> {
        let geometry = self.canvas.geometry;
        if !options.font_size.is_finite() || options.font_size <= 0.0 {
            return Err(Error::InvalidBlock(format!(
                "paragraph font size must be positive, got {}",
                options.font_size
            )));
        }
        let room = geometry.content_width() - options.x_offset;
        if !options.x_offset.is_finite() || options.x_offset < 0.0 || room <= 0.0 {
            return Err(Error::InvalidBlock(format!(
                "paragraph offset {}mm is outside the content width {:.1}mm",
                options.x_offset,
                geometry.content_width()
            )));
        }
        let width = match options.max_width {
            Some(w) if !w.is_finite() || w <= 0.0 => {
                return Err(Error::InvalidBlock(format!("paragraph width must be positive, got {w}")));
            }
            Some(w) => w.min(room),
            None => room,
        };

        let fmt = TextFormat::new(options.style, options.font_size);
        let lh = fmt.line_height();
        self.check_unit(lh, "paragraph line")?;

        let x = geometry.margin_left + options.x_offset;
        let lines = build_lines(text, &self.canvas.fonts, fmt, width);
        for line in &lines {
            self.ensure_space(lh);
            let top = self.cursor_y;
            let (content, fonts) = self.canvas.surface();
            draw_line(
                content,
                fonts,
                line,
                fmt,
                options.align,
                x,
                width,
                top + baseline_offset(fmt.font_size),
                geometry.height,
            );
            self.canvas.record(BlockKind::Paragraph, top, top + lh);
            self.cursor_y += lh;
        }
        self.canvas.finish_block();
        Ok(self)
    }

    /// Bold label at the left margin, value at the value column. Long values wrap
    /// under the value column, one page-break check per line.
    pub fn add_name_value(&mut self, label: &str, value: &str) -> Result<&mut Self> {
        let geometry = self.canvas.geometry;
        let label_fmt = TextFormat::new(TextStyle::Bold, NAME_VALUE_FONT_SIZE);
        let value_fmt = TextFormat::new(TextStyle::Normal, NAME_VALUE_FONT_SIZE);
        let lh = label_fmt.line_height();
        self.check_unit(lh, "name/value line")?;

        // The label may take at most half the line.
        let label_max = geometry.content_width() / 2.0 - LABEL_GAP;
        let label_w = self
            .canvas
            .fonts
            .text_width(label_fmt.style, label, label_fmt.font_size)
            .min(label_max);
        let column = VALUE_COLUMN.max(label_w + LABEL_GAP).min(geometry.content_width() / 2.0);
        let value_x = geometry.margin_left + column;
        let value_w = geometry.content_width() - column;

        let label_lines = build_lines(label, &self.canvas.fonts, label_fmt, label_max);
        let value_lines = build_lines(value, &self.canvas.fonts, value_fmt, value_w);
        let n = label_lines.len().max(value_lines.len());

        for i in 0..n {
            self.ensure_space(lh);
            let top = self.cursor_y;
            let baseline = top + baseline_offset(NAME_VALUE_FONT_SIZE);
            let (content, fonts) = self.canvas.surface();
            if let Some(line) = label_lines.get(i) {
                draw_line(
                    content,
                    fonts,
                    line,
                    label_fmt,
                    Alignment::Left,
                    geometry.margin_left,
                    label_max,
                    baseline,
                    geometry.height,
                );
            }
            if let Some(line) = value_lines.get(i) {
                draw_line(
                    content,
                    fonts,
                    line,
                    value_fmt,
                    Alignment::Left,
                    value_x,
                    value_w,
                    baseline,
                    geometry.height,
                );
            }
            self.canvas.record(BlockKind::NameValue, top, top + lh);
            self.cursor_y += lh;
        }
        self.canvas.finish_block();
        Ok(self)
    }

    /// Grid table with a bold header row, repeated on every continuation page.
    /// The cursor ends [`TABLE_BOTTOM_MARGIN`] below the last row.
    pub fn add_table(&mut self, header: &[String], rows: &[Vec<String>]) -> Result<&mut Self> {
        let table = TableBlock {
            header: header.to_vec(),
            rows: rows.to_vec(),
        };
        self.add_table_block(&table)
    }

    fn add_table_block(&mut self, table: &TableBlock) -> Result<&mut Self> {
        let end = table::render_table(&mut self.canvas, table, self.cursor_y)?;
        self.cursor_y = end.last_row_bottom + TABLE_BOTTOM_MARGIN;
        if self.cursor_y > self.canvas.geometry.safe_bottom() + FIT_EPSILON {
            log::debug!(
                "table ends at y={:.2}mm past the safe bottom, starting a new page",
                self.cursor_y
            );
            self.cursor_y = self.canvas.start_page();
        }
        self.canvas.finish_block();
        Ok(self)
    }

    /// Vertical gap of `height` mm. A gap that does not fit is moved to the next page.
    pub fn add_space(&mut self, height: f32) -> Result<&mut Self> {
        if !height.is_finite() || height < 0.0 {
            return Err(Error::InvalidBlock(format!("spacer height must be non-negative, got {height}")));
        }
        self.check_unit(height, "spacer")?;
        self.ensure_space(height);
        let top = self.cursor_y;
        self.canvas.record(BlockKind::Spacer, top, top + height);
        self.cursor_y += height;
        self.canvas.finish_block();
        Ok(self)
    }

    /// Draw the signature row on the last page. Returns where it went, or `None`
    /// for an empty list.
    pub fn draw_signatures(&mut self, signatories: &[Signatory]) -> Result<Option<SignaturePlacement>> {
        if signatories.is_empty() {
            self.canvas.finish_block();
            return Ok(None);
        }
        self.check_unit(signature_requirement(), "signature block")?;

        self.canvas.jump_to_last_page();
        let geometry = self.canvas.geometry;
        let (placement, top) = plan_signatures(self.cursor_y, geometry.safe_bottom());
        let top = match top {
            Some(top) => top,
            None => self.canvas.start_page() + SIGNATURE_MIN_GAP,
        };
        log::debug!(
            "{} signatories {:?} at y={:.2}mm on page {}",
            signatories.len(),
            placement,
            top,
            self.canvas.current_page() + 1
        );

        let (content, fonts) = self.canvas.surface();
        signatures::draw_signature_row(content, fonts, &geometry, signatories, top);
        let bottom = top + SIGNATURE_BLOCK_HEIGHT;
        self.canvas.record(BlockKind::Signatures, top, bottom);
        self.cursor_y = bottom;
        self.canvas.finish_block();
        Ok(Some(placement))
    }

    /// Lay out one block.
    pub fn append(&mut self, block: &Block) -> Result<&mut Self> {
        match block {
            Block::Title { text } => self.add_title(text),
            Block::Paragraph { text, options } => self.add_paragraph(text, options),
            Block::NameValue { label, value } => self.add_name_value(label, value),
            Block::Table(table) => self.add_table_block(table),
            Block::Signatures { signatories } => {
                self.draw_signatures(signatories)?;
                Ok(self)
            }
            Block::Spacer { height } => self.add_space(*height),
        }
    }

    /// Take over the definition's metadata and lay out its blocks in order.
    pub fn build(&mut self, definition: &DocumentDefinition) -> Result<&mut Self> {
        let t0 = Instant::now();
        self.set_title(&definition.title);
        self.set_subject(definition.subject.as_deref());
        for block in &definition.blocks {
            self.append(block)?;
        }
        log::info!(
            "Layout: {} blocks on {} pages in {:.1}ms",
            definition.blocks.len(),
            self.page_count(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(self)
    }

    pub fn cursor_y(&self) -> f32 {
        self.cursor_y
    }

    pub fn page_count(&self) -> usize {
        self.canvas.page_count()
    }

    /// 0-based index of the page being written.
    pub fn current_page(&self) -> usize {
        self.canvas.current_page()
    }

    /// First y available to content on every page.
    pub fn header_bottom(&self) -> f32 {
        self.canvas.header.bottom
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.canvas.geometry
    }

    pub fn placements(&self) -> &[Placement] {
        self.canvas.placements()
    }

    /// What the letterhead painted, one entry per page.
    pub fn headers(&self) -> &[HeaderStamp] {
        self.canvas.headers()
    }

    pub fn emblem_loaded(&self) -> bool {
        self.canvas.emblem.is_some()
    }

    /// Finish the document: page numbers, fonts, emblem, page tree and metadata.
    pub fn render(self) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        let DocumentBuilder {
            canvas,
            title,
            subject,
            author,
            page_numbers,
            ..
        } = self;
        let (geometry, mut fonts, emblem, mut contents) = canvas.into_parts();
        let n = contents.len();

        if page_numbers {
            for (i, content) in contents.iter_mut().enumerate() {
                paint_page_number(content, &mut fonts, &geometry, i, n);
            }
        }

        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let font_pairs = fonts.write(&mut pdf, &mut alloc)?;
        let t_fonts = t0.elapsed();

        let emblem_ref = emblem.as_ref().map(|e| write_emblem(&mut pdf, e, &mut alloc));

        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        for (i, c) in contents.into_iter().enumerate() {
            let raw = c.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        let media_box = Rect::new(0.0, 0.0, mm_to_pt(geometry.width), mm_to_pt(geometry.height));
        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(media_box)
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (name, font_ref) in &font_pairs {
                    fonts.pair(Name(name.as_bytes()), *font_ref);
                }
            }
            if let Some(xobj_ref) = emblem_ref {
                resources.x_objects().pair(Name(EMBLEM_NAME.as_bytes()), xobj_ref);
            }
        }

        {
            let mut info = pdf.document_info(info_id);
            if !title.is_empty() {
                info.title(TextStr(&title));
            }
            if let Some(subject) = &subject {
                info.subject(TextStr(subject));
            }
            if let Some(author) = &author {
                info.author(TextStr(author));
            }
            info.creator(TextStr(CREATOR));
        }

        let bytes = pdf.finish();
        log::info!(
            "Render: {} pages, fonts={:.1}ms, assembly={:.1}ms, {} bytes",
            n,
            t_fonts.as_secs_f64() * 1000.0,
            (t0.elapsed() - t_fonts).as_secs_f64() * 1000.0,
            bytes.len()
        );
        Ok(bytes)
    }
}
