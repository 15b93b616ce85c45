use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a document generation.
///
/// A missing or undecodable emblem is deliberately absent: it is logged and the
/// document is produced without it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("table row {row} is {height:.1}mm tall but a page only holds {capacity:.1}mm")]
    RowTooTall { row: usize, height: f32, capacity: f32 },

    #[error("font error: {0}")]
    Font(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}
