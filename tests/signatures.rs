mod common;

use common::{approx, bare_builder, bare_config, contains, strings};
use mesa_partes_pdf::{
    BlockKind, DocumentBuilder, DocumentConfig, PageGeometry, Placement, SIGNATURE_BLOCK_HEIGHT, SIGNATURE_MIN_GAP,
    SignaturePlacement, Signatory, plan_signatures, signature_requirement,
};

/// 297mm page with a 50mm bottom margin: the safe bottom is at 247mm.
fn tall_margin_page() -> PageGeometry {
    PageGeometry {
        margin_bottom: 50.0,
        ..common::geometry(297.0)
    }
}

fn peritos() -> Vec<Signatory> {
    vec![
        Signatory::new("Ana Lucía Ríos Paredes", "CIP 31415926", "Perito químico"),
        Signatory::new("Jorge Mendoza Salas", "CIP 27182818", "Perito biólogo"),
    ]
}

/// Builder with its cursor moved to `y` on the first page.
fn builder_at(y: f32) -> DocumentBuilder {
    let mut builder = bare_builder(tall_margin_page());
    let start = builder.cursor_y();
    builder.add_space(y - start).unwrap();
    assert!(approx(builder.cursor_y(), y));
    builder
}

fn signature_block(builder: &DocumentBuilder) -> Placement {
    *builder
        .placements()
        .iter()
        .rfind(|p| p.kind == BlockKind::Signatures)
        .expect("signature block recorded")
}

#[test]
fn placement_policy_with_literal_fixtures() {
    let safe_bottom = tall_margin_page().safe_bottom();
    assert_eq!(safe_bottom, 247.0);
    assert_eq!(plan_signatures(240.0, safe_bottom), (SignaturePlacement::NewPage, None));
    assert_eq!(
        plan_signatures(150.0, safe_bottom),
        (SignaturePlacement::BottomAnchored, Some(247.0 - SIGNATURE_BLOCK_HEIGHT))
    );
    assert_eq!(
        plan_signatures(220.0, safe_bottom),
        (SignaturePlacement::BelowCursor, Some(220.0 + SIGNATURE_MIN_GAP))
    );
}

#[test]
fn exactly_the_requirement_fits_below_the_cursor() {
    let cursor = 247.0 - signature_requirement();
    let (placement, _) = plan_signatures(cursor, 247.0);
    assert_eq!(placement, SignaturePlacement::BelowCursor);
}

#[test]
fn little_room_moves_signatures_to_a_new_page() {
    let mut builder = builder_at(240.0);
    let placement = builder.draw_signatures(&peritos()).unwrap();
    assert_eq!(placement, Some(SignaturePlacement::NewPage));
    assert_eq!(builder.page_count(), 2);

    let block = signature_block(&builder);
    assert_eq!(block.page, 1);
    assert!(approx(block.top, builder.header_bottom() + SIGNATURE_MIN_GAP));
    assert!(approx(builder.cursor_y(), block.bottom));
}

#[test]
fn plenty_of_room_anchors_signatures_to_the_bottom() {
    let mut builder = builder_at(150.0);
    let placement = builder.draw_signatures(&peritos()).unwrap();
    assert_eq!(placement, Some(SignaturePlacement::BottomAnchored));
    assert_eq!(builder.page_count(), 1);

    let block = signature_block(&builder);
    assert!(approx(block.top, 227.0));
    assert!(approx(block.bottom, 247.0));
}

#[test]
fn some_room_places_signatures_below_the_cursor() {
    let mut builder = builder_at(220.0);
    let placement = builder.draw_signatures(&peritos()).unwrap();
    assert_eq!(placement, Some(SignaturePlacement::BelowCursor));
    assert_eq!(builder.page_count(), 1);
    assert!(approx(signature_block(&builder).top, 225.0));
}

#[test]
fn signatures_go_on_the_last_page() {
    let mut builder = bare_builder(tall_margin_page());
    let rows: Vec<Vec<String>> = (1..=60).map(|i| strings(&[&i.to_string(), "Hisopado"])).collect();
    builder.add_table(&strings(&["N°", "Muestra"]), &rows).unwrap();
    builder.draw_signatures(&peritos()).unwrap();

    let block = signature_block(&builder);
    assert_eq!(block.page, builder.page_count() - 1);
    assert!(block.bottom <= builder.geometry().safe_bottom() + common::EPS);
}

#[test]
fn missing_fields_render_as_placeholders() {
    let config = DocumentConfig {
        page_numbers: false,
        ..bare_config(PageGeometry::a4())
    };
    let mut builder = DocumentBuilder::initialize(&config).unwrap();
    let unknown = vec![
        Signatory::default(),
        Signatory {
            name: Some("Rosa Quispe".into()),
            id_number: Some("   ".into()),
            role: None,
        },
    ];
    assert!(builder.draw_signatures(&unknown).unwrap().is_some());
    let bytes = builder.render().unwrap();
    common::assert_is_pdf(&bytes);

    let page = common::inflated_streams(&bytes).concat();
    assert!(contains(&page, b"(N/A)"));
    assert!(contains(&page, b"(DNI/CIP: N/A)"));
    assert!(contains(&page, b"(Rosa Quispe)"));
    assert!(!contains(&page, b"()"));
}

#[test]
fn no_signatories_draws_nothing() {
    let mut builder = bare_builder(PageGeometry::a4());
    let before = builder.cursor_y();
    assert_eq!(builder.draw_signatures(&[]).unwrap(), None);
    assert!(builder.placements().is_empty());
    assert_eq!(builder.cursor_y(), before);
}

#[test]
fn many_signatories_share_the_row() {
    let config = bare_config(PageGeometry::a4());
    let mut builder = DocumentBuilder::initialize(&config).unwrap();
    let crowd: Vec<Signatory> = (1..=6)
        .map(|i| Signatory::new(&format!("Perito número {i} de la Oficina"), "CIP 00000000", "Perito"))
        .collect();
    builder.draw_signatures(&crowd).unwrap();
    assert_eq!(builder.placements().len(), 1);
    assert!(builder.render().is_ok());
}
