use serde::{Deserialize, Serialize};

/// Rendered in place of any missing caller-supplied value.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl TextStyle {
    pub const ALL: [TextStyle; 4] = [
        TextStyle::Normal,
        TextStyle::Bold,
        TextStyle::Italic,
        TextStyle::BoldItalic,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            TextStyle::Normal => 0,
            TextStyle::Bold => 1,
            TextStyle::Italic => 2,
            TextStyle::BoldItalic => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphOptions {
    pub align: Alignment,
    pub style: TextStyle,
    pub font_size: f32, // points
    pub x_offset: f32,  // mm from the left margin
    pub max_width: Option<f32>, // mm; None = rest of the content width
}

impl Default for ParagraphOptions {
    fn default() -> Self {
        Self {
            align: Alignment::Justify,
            style: TextStyle::Normal,
            font_size: 10.0,
            x_offset: 0.0,
            max_width: None,
        }
    }
}

impl ParagraphOptions {
    pub fn aligned(align: Alignment) -> Self {
        Self {
            align,
            ..Self::default()
        }
    }

    pub fn styled(style: TextStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signatory {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub role: Option<String>,
}

impl Signatory {
    pub fn new(name: &str, id_number: &str, role: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            id_number: Some(id_number.to_string()),
            role: Some(role.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    Title {
        text: String,
    },
    Paragraph {
        text: String,
        #[serde(default)]
        options: ParagraphOptions,
    },
    NameValue {
        label: String,
        value: String,
    },
    Table(TableBlock),
    Signatures {
        signatories: Vec<Signatory>,
    },
    Spacer {
        height: f32, // mm
    },
}

impl Block {
    pub fn title(text: impl Into<String>) -> Self {
        Block::Title { text: text.into() }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            options: ParagraphOptions::default(),
        }
    }

    pub fn paragraph_with(text: impl Into<String>, options: ParagraphOptions) -> Self {
        Block::Paragraph {
            text: text.into(),
            options,
        }
    }

    pub fn name_value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Block::NameValue {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn table(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Block::Table(TableBlock { header, rows })
    }

    pub fn spacer(height: f32) -> Self {
        Block::Spacer { height }
    }
}

/// Kind of a drawn unit, as recorded in a [`Placement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Title,
    Paragraph,
    NameValue,
    TableHeader,
    TableRow,
    Signatures,
    Spacer,
}

/// Where one unit of content landed. Units are title lines, paragraph lines,
/// name/value lines, table rows, signature blocks and spacers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Index of the appended block that produced this unit (0-based, in append order).
    pub block: usize,
    pub kind: BlockKind,
    /// 0-based page index.
    pub page: usize,
    pub top: f32,    // mm
    pub bottom: f32, // mm
}

/// Ordered list of blocks making up one document, plus its metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDefinition {
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub blocks: Vec<Block>,
}

impl DocumentDefinition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: None,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }
}

/// The value itself, or [`PLACEHOLDER`] when it is missing or blank.
pub fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

/// What the letterhead painted on one page.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderStamp {
    pub lines: Vec<String>,
    pub emblem: bool,
    pub rule: bool,
    pub bottom: f32, // mm
}
