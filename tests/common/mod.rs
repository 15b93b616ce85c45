#![allow(dead_code)]

use mesa_partes_pdf::{
    CaseRecord, DocumentBuilder, DocumentConfig, ExamResult, ExaminedPerson, Letterhead, PageGeometry, Sample,
    Signatory,
};

pub const EPS: f32 = 1e-3;

/// Page with 20mm margins all round (unless overridden) and the given height.
pub fn geometry(height: f32) -> PageGeometry {
    PageGeometry {
        width: 210.0,
        height,
        margin_top: 20.0,
        margin_right: 20.0,
        margin_bottom: 20.0,
        margin_left: 20.0,
    }
}

/// No letterhead: content starts at the top margin.
pub fn bare_config(geometry: PageGeometry) -> DocumentConfig {
    DocumentConfig {
        geometry,
        letterhead: Letterhead::empty(),
        ..DocumentConfig::default()
    }
}

pub fn bare_builder(geometry: PageGeometry) -> DocumentBuilder {
    DocumentBuilder::initialize(&bare_config(geometry)).expect("initialize")
}

pub fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPS
}

/// Every recorded unit lies between the header bottom and the safe bottom.
pub fn assert_inside_content_area(builder: &DocumentBuilder) {
    let safe_bottom = builder.geometry().safe_bottom();
    let top_limit = builder.header_bottom();
    assert!(top_limit >= builder.geometry().margin_top);
    for p in builder.placements() {
        assert!(p.top + EPS >= top_limit, "{p:?} starts above {top_limit}");
        assert!(p.bottom <= safe_bottom + EPS, "{p:?} passes the safe bottom {safe_bottom}");
        assert!(p.page < builder.page_count(), "{p:?} on a page that does not exist");
    }
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Inflated bytes of every zlib stream in the document.
pub fn inflated_streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    const START: &[u8] = b">>\nstream\n";
    const END: &[u8] = b"\nendstream";
    let mut streams = Vec::new();
    let mut rest = pdf;
    while let Some(at) = rest.windows(START.len()).position(|w| w == START) {
        rest = &rest[at + START.len()..];
        let Some(len) = rest.windows(END.len()).position(|w| w == END) else {
            break;
        };
        if let Ok(data) = miniz_oxide::inflate::decompress_to_vec_zlib(&rest[..len]) {
            streams.push(data);
        }
        rest = &rest[len + END.len()..];
    }
    streams
}

pub fn assert_is_pdf(bytes: &[u8]) {
    assert!(bytes.starts_with(b"%PDF-"), "missing PDF header");
    assert!(contains(&bytes[bytes.len().saturating_sub(32)..], b"%%EOF"), "missing EOF marker");
}

pub fn sample_record() -> CaseRecord {
    CaseRecord {
        oficio_number: Some("1542-2024-DIRCRI-PNP".into()),
        registry_number: Some("MP-2024-000871".into()),
        received_on: Some("2024-03-05".into()),
        extracted_on: Some("2024-03-06T09:45:00".into()),
        issued_on: Some("2024-03-12".into()),
        requesting_authority: Some("Fiscalía Provincial Penal de Lima".into()),
        case_type: Some("Lesiones".into()),
        exam_type: Some("Dosaje etílico".into()),
        person: ExaminedPerson {
            name: Some("Carlos Alberto Huamán Rojas".into()),
            id_number: Some("45871236".into()),
            age: Some(29),
            sex: Some("Masculino".into()),
        },
        place: Some("Lima".into()),
        samples: vec![
            Sample {
                code: Some("M-01".into()),
                kind: Some("Sangre venosa".into()),
                description: Some("Tubo con EDTA, 5 ml, rotulado y lacrado".into()),
                extracted_at: Some("2024-03-06T09:50:00".into()),
            },
            Sample {
                code: Some("M-02".into()),
                kind: Some("Orina".into()),
                description: None,
                extracted_at: None,
            },
        ],
        results: vec![ExamResult {
            sample_code: Some("M-01".into()),
            exam: Some("Alcoholemia".into()),
            result: Some("0.82 g/L".into()),
            method: Some("Cromatografía de gases".into()),
        }],
        observations: Some("La persona examinada se encontraba consciente y colaboró con la diligencia.".into()),
        conclusions: vec![
            "La muestra M-01 presenta 0.82 g/L de alcohol etílico en sangre.".into(),
            "La muestra M-02 no fue analizada por no haberse solicitado.".into(),
        ],
        signatories: vec![
            Signatory::new("Ana Lucía Ríos Paredes", "CIP 31415926", "Perito químico"),
            Signatory {
                name: Some("Jorge Mendoza".into()),
                id_number: None,
                role: None,
            },
        ],
    }
}
