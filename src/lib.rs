mod config;
mod definitions;
mod error;
mod fonts;
mod model;
mod pdf;

pub use config::{
    DocumentConfig, EMBLEM_ENV, FontFiles, Letterhead, LetterheadLine, MM_TO_PT, PageGeometry, mm_to_pt, pt_to_mm,
};
pub use definitions::{
    CaseRecord, DocumentKind, ExamResult, ExaminedPerson, Sample, acta_extraccion, format_date, informe_pericial,
    long_date,
};
pub use error::{Error, Result};
pub use model::{
    Alignment, Block, BlockKind, DocumentDefinition, HeaderStamp, PLACEHOLDER, ParagraphOptions, Placement, Signatory,
    TableBlock, TextStyle, or_placeholder,
};
pub use pdf::{
    CELL_PADDING_X, CELL_PADDING_Y, DocumentBuilder, NAME_VALUE_FONT_SIZE, SIGNATURE_BLOCK_HEIGHT, SIGNATURE_MIN_GAP,
    SIGNATURE_SLACK, SignaturePlacement, TABLE_BOTTOM_MARGIN, TABLE_FONT_SIZE, TITLE_FONT_SIZE, TITLE_SPACING,
    VALUE_COLUMN, line_height, plan_signatures, signature_requirement, table_row_height,
};

use std::path::Path;
use std::time::Instant;

/// Lay out `definition` with `config` and return the PDF bytes.
pub fn render_definition(definition: &DocumentDefinition, config: &DocumentConfig) -> Result<Vec<u8>> {
    let mut builder = DocumentBuilder::initialize(config)?;
    builder.build(definition)?;
    builder.render()
}

/// Produce the `kind` document for one case.
pub fn generate(kind: DocumentKind, record: &CaseRecord, config: &DocumentConfig) -> Result<Vec<u8>> {
    render_definition(&kind.definition(record), config)
}

/// Read a case JSON file and write the `kind` document to `output`.
pub fn generate_to_file(kind: DocumentKind, input: &Path, output: &Path, config: &DocumentConfig) -> Result<()> {
    let t0 = Instant::now();

    let text = std::fs::read_to_string(input)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, input.display()))))?;
    let record: CaseRecord = serde_json::from_str(&text)?;
    let t_parse = t0.elapsed();

    let bytes = generate(kind, &record, config)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms ({} {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        kind,
        bytes.len(),
    );

    Ok(())
}
