//! Case records as the backend returns them, and the two document recipes
//! built from them.

use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{
    Alignment, Block, DocumentDefinition, PLACEHOLDER, ParagraphOptions, Signatory, TextStyle, or_placeholder,
};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExaminedPerson {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "dni")]
    pub id_number: Option<String>,
    #[serde(alias = "edad")]
    pub age: Option<u32>,
    #[serde(alias = "sexo")]
    pub sex: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    #[serde(alias = "codigo")]
    pub code: Option<String>,
    #[serde(alias = "tipo")]
    pub kind: Option<String>,
    #[serde(alias = "descripcion")]
    pub description: Option<String>,
    #[serde(alias = "fecha_extraccion")]
    pub extracted_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamResult {
    #[serde(alias = "codigo_muestra")]
    pub sample_code: Option<String>,
    #[serde(alias = "examen")]
    pub exam: Option<String>,
    #[serde(alias = "resultado")]
    pub result: Option<String>,
    #[serde(alias = "metodo")]
    pub method: Option<String>,
}

/// One case as stored by Mesa de Partes. Every field is optional; whatever is
/// missing prints as `N/A`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseRecord {
    #[serde(alias = "numero_oficio")]
    pub oficio_number: Option<String>,
    #[serde(alias = "numero_registro")]
    pub registry_number: Option<String>,
    #[serde(alias = "fecha_recepcion")]
    pub received_on: Option<String>,
    #[serde(alias = "fecha_extraccion")]
    pub extracted_on: Option<String>,
    #[serde(alias = "fecha_emision")]
    pub issued_on: Option<String>,
    #[serde(alias = "autoridad_solicitante")]
    pub requesting_authority: Option<String>,
    #[serde(alias = "tipo_caso")]
    pub case_type: Option<String>,
    #[serde(alias = "tipo_examen")]
    pub exam_type: Option<String>,
    #[serde(alias = "examinado")]
    pub person: ExaminedPerson,
    #[serde(alias = "lugar")]
    pub place: Option<String>,
    #[serde(alias = "muestras")]
    pub samples: Vec<Sample>,
    #[serde(alias = "resultados")]
    pub results: Vec<ExamResult>,
    #[serde(alias = "observaciones")]
    pub observations: Option<String>,
    #[serde(alias = "conclusiones")]
    pub conclusions: Vec<String>,
    #[serde(alias = "firmantes")]
    pub signatories: Vec<Signatory>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Acta de extracción de muestras.
    Acta,
    /// Informe pericial (dictamen).
    Informe,
}

impl DocumentKind {
    pub fn definition(self, record: &CaseRecord) -> DocumentDefinition {
        match self {
            DocumentKind::Acta => acta_extraccion(record),
            DocumentKind::Informe => informe_pericial(record),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Acta => "acta",
            DocumentKind::Informe => "informe",
        })
    }
}

fn text(value: &Option<String>) -> String {
    or_placeholder(value.as_deref()).to_string()
}

/// `dd/mm/yyyy`, with `hh:mm` when the value carries a time. Unparseable
/// values are printed as given.
pub fn format_date(value: Option<&str>) -> String {
    let raw = or_placeholder(value);
    if raw == PLACEHOLDER {
        return raw.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%d/%m/%Y %H:%M").to_string();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format("%d/%m/%Y").to_string();
    }
    raw.to_string()
}

/// "5 de marzo de 2024".
pub fn long_date(date: NaiveDate) -> String {
    format!("{} de {} de {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

fn parse_day(value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}

/// Issue date of the record, today when it has none.
fn issue_date(record: &CaseRecord) -> String {
    let date = parse_day(record.issued_on.as_deref()).unwrap_or_else(|| Local::now().date_naive());
    long_date(date)
}

fn heading(label: &str) -> Block {
    Block::paragraph_with(
        label,
        ParagraphOptions {
            align: Alignment::Left,
            style: TextStyle::Bold,
            font_size: 10.5,
            ..ParagraphOptions::default()
        },
    )
}

fn with_placeholder_row(rows: Vec<Vec<String>>, ncols: usize) -> Vec<Vec<String>> {
    if rows.is_empty() {
        vec![vec![PLACEHOLDER.to_string(); ncols]]
    } else {
        rows
    }
}

fn samples_table(samples: &[Sample], with_dates: bool) -> Block {
    let mut header = vec!["N°", "Código", "Tipo de muestra", "Descripción"];
    if with_dates {
        header.push("Fecha y hora");
    }
    let rows: Vec<Vec<String>> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut row = vec![(i + 1).to_string(), text(&s.code), text(&s.kind), text(&s.description)];
            if with_dates {
                row.push(format_date(s.extracted_at.as_deref()));
            }
            row
        })
        .collect();
    let ncols = header.len();
    Block::table(
        header.into_iter().map(String::from).collect(),
        with_placeholder_row(rows, ncols),
    )
}

fn results_table(results: &[ExamResult]) -> Block {
    let header = ["Muestra", "Examen", "Resultado", "Método"];
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| vec![text(&r.sample_code), text(&r.exam), text(&r.result), text(&r.method)])
        .collect();
    Block::table(
        header.iter().map(|h| h.to_string()).collect(),
        with_placeholder_row(rows, header.len()),
    )
}

fn case_data(record: &CaseRecord) -> Vec<Block> {
    vec![
        Block::name_value("Oficio N°:", text(&record.oficio_number)),
        Block::name_value("Registro N°:", text(&record.registry_number)),
        Block::name_value("Fecha de recepción:", format_date(record.received_on.as_deref())),
        Block::name_value("Autoridad solicitante:", text(&record.requesting_authority)),
        Block::name_value("Tipo de caso:", text(&record.case_type)),
        Block::name_value("Tipo de examen:", text(&record.exam_type)),
    ]
}

fn subject(record: &CaseRecord) -> Option<String> {
    record
        .registry_number
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| format!("Registro {r}"))
}

/// Acta de extracción de muestras: case data, the extraction narrative, the
/// samples taken, observations and the signatures of everyone present.
pub fn acta_extraccion(record: &CaseRecord) -> DocumentDefinition {
    let person = &record.person;
    let age = person
        .age
        .map(|a| format!("{a} años de edad"))
        .unwrap_or_else(|| format!("edad {PLACEHOLDER}"));

    let mut doc = DocumentDefinition::new("ACTA DE EXTRACCIÓN DE MUESTRAS");
    doc.subject = subject(record);
    doc.push(Block::title("ACTA DE EXTRACCIÓN DE MUESTRAS"));
    doc.blocks.extend(case_data(record));
    doc.push(Block::spacer(4.0));
    doc.push(Block::paragraph(format!(
        "En {}, siendo {}, en presencia de los peritos que suscriben, se procedió a la \
         extracción de muestras a {}, identificado(a) con DNI N° {}, de {}, sexo {}, en \
         atención a lo solicitado por {} mediante Oficio N° {}.",
        text(&record.place),
        format_date(record.extracted_on.as_deref()),
        text(&person.name),
        text(&person.id_number),
        age,
        text(&person.sex),
        text(&record.requesting_authority),
        text(&record.oficio_number),
    )));
    doc.push(Block::spacer(4.0));
    doc.push(heading("MUESTRAS EXTRAÍDAS"));
    doc.push(Block::spacer(1.5));
    doc.push(samples_table(&record.samples, true));
    doc.push(heading("OBSERVACIONES"));
    doc.push(Block::paragraph(text(&record.observations)));
    doc.push(Block::spacer(4.0));
    doc.push(Block::paragraph(
        "Siendo la hora indicada se da por concluida la presente diligencia, firmando los \
         intervinientes en señal de conformidad.",
    ));

    let mut signatories = vec![Signatory {
        name: person.name.clone(),
        id_number: person.id_number.clone(),
        role: Some("Examinado(a)".to_string()),
    }];
    signatories.extend(record.signatories.iter().cloned());
    doc.push(Block::Signatures { signatories });
    doc
}

/// Informe pericial: numbered sections from antecedentes to conclusiones,
/// dated at the place of issue and signed by the peritos.
pub fn informe_pericial(record: &CaseRecord) -> DocumentDefinition {
    let title = format!("INFORME PERICIAL N° {}", text(&record.registry_number));
    let mut doc = DocumentDefinition::new(title.clone());
    doc.subject = subject(record);
    doc.push(Block::title(title));
    doc.blocks.extend(case_data(record));
    doc.push(Block::spacer(4.0));

    doc.push(heading("I. ANTECEDENTES"));
    doc.push(Block::paragraph(format!(
        "Mediante Oficio N° {} recibido el {}, {} solicita se practique el examen de {} \
         en el caso de {} seguido respecto de {}, identificado(a) con DNI N° {}.",
        text(&record.oficio_number),
        format_date(record.received_on.as_deref()),
        text(&record.requesting_authority),
        text(&record.exam_type),
        text(&record.case_type),
        text(&record.person.name),
        text(&record.person.id_number),
    )));
    doc.push(Block::spacer(3.0));

    doc.push(heading("II. MUESTRAS"));
    doc.push(Block::spacer(1.5));
    doc.push(samples_table(&record.samples, false));

    doc.push(heading("III. EXAMEN"));
    doc.push(Block::paragraph(format!(
        "Las muestras fueron sometidas al examen de {}, aplicando los métodos que se \
         indican en el cuadro de resultados.",
        text(&record.exam_type)
    )));
    doc.push(Block::spacer(3.0));

    doc.push(heading("IV. RESULTADOS"));
    doc.push(Block::spacer(1.5));
    doc.push(results_table(&record.results));

    doc.push(heading("V. CONCLUSIONES"));
    let numbered = ParagraphOptions {
        x_offset: 5.0,
        ..ParagraphOptions::default()
    };
    let conclusions: Vec<&str> = record
        .conclusions
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if conclusions.is_empty() {
        doc.push(Block::paragraph_with(PLACEHOLDER, numbered));
    } else {
        for (i, c) in conclusions.iter().enumerate() {
            doc.push(Block::paragraph_with(format!("{}. {c}", i + 1), numbered.clone()));
        }
    }
    doc.push(Block::spacer(6.0));
    doc.push(Block::paragraph_with(
        format!("{}, {}", text(&record.place), issue_date(record)),
        ParagraphOptions::aligned(Alignment::Right),
    ));

    let signatories = if record.signatories.is_empty() {
        vec![Signatory {
            role: Some("Perito".to_string()),
            ..Signatory::default()
        }]
    } else {
        record.signatories.clone()
    };
    doc.push(Block::Signatures { signatories });
    doc
}
