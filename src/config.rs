use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that overrides the letterhead emblem path.
pub const EMBLEM_ENV: &str = "MESA_PARTES_EMBLEM";

pub const MM_TO_PT: f32 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * MM_TO_PT
}

pub fn pt_to_mm(pt: f32) -> f32 {
    pt / MM_TO_PT
}

/// Page size and margins in millimetres. The origin is the top-left corner and
/// y grows downwards, matching the builder's write cursor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 25.0,
            margin_left: 20.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y any content may reach.
    pub fn safe_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn content_right(&self) -> f32 {
        self.width - self.margin_right
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("width", self.width),
            ("height", self.height),
            ("margin_top", self.margin_top),
            ("margin_right", self.margin_right),
            ("margin_bottom", self.margin_bottom),
            ("margin_left", self.margin_left),
        ];
        for (name, v) in dims {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidGeometry(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        if self.content_width() <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "margins leave no content width ({:.1}mm page, {:.1}+{:.1}mm margins)",
                self.width, self.margin_left, self.margin_right
            )));
        }
        if self.margin_top >= self.safe_bottom() {
            return Err(Error::InvalidGeometry(format!(
                "margin_top {:.1}mm is below the safe bottom {:.1}mm",
                self.margin_top,
                self.safe_bottom()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterheadLine {
    pub text: String,
    pub bold: bool,
    pub font_size: f32, // points
}

impl Default for LetterheadLine {
    fn default() -> Self {
        Self {
            text: String::new(),
            bold: true,
            font_size: 9.0,
        }
    }
}

impl LetterheadLine {
    pub fn bold(text: &str, font_size: f32) -> Self {
        Self {
            text: text.to_string(),
            bold: true,
            font_size,
        }
    }

    pub fn normal(text: &str, font_size: f32) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
            font_size,
        }
    }
}

/// Institutional header repeated identically at the top of every page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Letterhead {
    /// Organization chain, drawn centered from the top margin down.
    pub lines: Vec<LetterheadLine>,
    /// Right-aligned lines under the organization chain (e.g. the year motto).
    pub caption: Vec<LetterheadLine>,
    pub emblem_path: Option<PathBuf>,
    pub emblem_width: f32,  // mm
    pub emblem_height: f32, // mm
    pub rule: bool,
}

impl Default for Letterhead {
    fn default() -> Self {
        Self {
            lines: vec![
                LetterheadLine::bold("POLICÍA NACIONAL DEL PERÚ", 10.0),
                LetterheadLine::bold("DIRECCIÓN EJECUTIVA DE CRIMINALÍSTICA", 9.0),
                LetterheadLine::normal("OFICINA DE CRIMINALÍSTICA - MESA DE PARTES", 8.0),
            ],
            caption: Vec::new(),
            emblem_path: None,
            emblem_width: 18.0,
            emblem_height: 18.0,
            rule: true,
        }
    }
}

impl Letterhead {
    /// Reject sizes that would move the header bottom above the top margin.
    pub fn validate(&self) -> Result<()> {
        for line in self.lines.iter().chain(&self.caption) {
            if !line.font_size.is_finite() || line.font_size <= 0.0 {
                return Err(Error::InvalidGeometry(format!(
                    "letterhead line '{}' needs a positive font size, got {}",
                    line.text, line.font_size
                )));
            }
        }
        for (name, v) in [("emblem_width", self.emblem_width), ("emblem_height", self.emblem_height)] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidGeometry(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        Ok(())
    }

    /// A letterhead without text or emblem; its bottom is the top margin.
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            caption: Vec::new(),
            emblem_path: None,
            emblem_width: 0.0,
            emblem_height: 0.0,
            rule: false,
        }
    }
}

/// TrueType/OpenType files used instead of the built-in Helvetica family.
/// Styles that are not configured fall back to `regular`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontFiles {
    pub regular: PathBuf,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub geometry: PageGeometry,
    pub letterhead: Letterhead,
    pub fonts: Option<FontFiles>,
    pub author: Option<String>,
    /// Stamp "Página i de N" in the bottom margin of every page.
    pub page_numbers: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            letterhead: Letterhead::default(),
            fonts: None,
            author: None,
            page_numbers: true,
        }
    }
}

impl DocumentConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        let config: DocumentConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.letterhead.validate()
    }

    /// Apply `MESA_PARTES_EMBLEM` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var(EMBLEM_ENV) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                self.letterhead.emblem_path = Some(PathBuf::from(trimmed));
            }
        }
        self
    }
}
