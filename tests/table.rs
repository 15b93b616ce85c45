mod common;

use common::{approx, assert_inside_content_area, bare_builder, geometry, strings};
use mesa_partes_pdf::{BlockKind, Error, PageGeometry, TABLE_BOTTOM_MARGIN, table_row_height};

fn sample_rows(n: usize) -> Vec<Vec<String>> {
    (1..=n)
        .map(|i| vec![i.to_string(), format!("M-{i:02}"), "Sangre venosa".to_string()])
        .collect()
}

#[test]
fn forty_rows_span_four_pages() {
    let rh = table_row_height(1);
    // 72mm of room: a header row plus ten body rows, but not an eleventh
    let g = geometry(112.0);
    assert!(11.0 * rh + TABLE_BOTTOM_MARGIN <= 72.0);
    assert!(12.0 * rh > 72.0);

    let mut builder = bare_builder(g);
    builder
        .add_table(&strings(&["N°", "Código", "Tipo de muestra"]), &sample_rows(40))
        .unwrap();

    assert_eq!(builder.page_count(), 4);
    assert_eq!(builder.current_page(), 3);
    assert_inside_content_area(&builder);

    let placements = builder.placements();
    let header_pages: Vec<usize> = placements
        .iter()
        .filter(|p| p.kind == BlockKind::TableHeader)
        .map(|p| p.page)
        .collect();
    assert_eq!(header_pages, vec![0, 1, 2, 3]);

    for page in 0..4 {
        let rows = placements
            .iter()
            .filter(|p| p.kind == BlockKind::TableRow && p.page == page)
            .count();
        assert_eq!(rows, 10, "page {page}");
    }

    let last = placements.last().unwrap();
    assert_eq!(last.kind, BlockKind::TableRow);
    assert!(approx(builder.cursor_y(), last.bottom + TABLE_BOTTOM_MARGIN));
}

#[test]
fn continuation_pages_start_with_the_header_row() {
    let mut builder = bare_builder(geometry(112.0));
    builder
        .add_table(&strings(&["N°", "Código", "Tipo de muestra"]), &sample_rows(15))
        .unwrap();
    let second_page: Vec<_> = builder.placements().iter().filter(|p| p.page == 1).collect();
    assert_eq!(second_page[0].kind, BlockKind::TableHeader);
    assert!(approx(second_page[0].top, builder.header_bottom()));
    assert!(approx(second_page[1].top, second_page[0].bottom));
}

#[test]
fn header_row_stays_with_the_first_row() {
    let rh = table_row_height(1);
    let mut builder = bare_builder(PageGeometry::a4());
    let safe_bottom = builder.geometry().safe_bottom();
    builder.add_space(safe_bottom - builder.cursor_y() - 1.5 * rh).unwrap();
    builder
        .add_table(&strings(&["Código", "Tipo"]), &[strings(&["M-01", "Sangre"])])
        .unwrap();

    let table: Vec<_> = builder
        .placements()
        .iter()
        .filter(|p| p.kind != BlockKind::Spacer)
        .collect();
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|p| p.page == 1));
}

#[test]
fn malformed_tables_are_rejected() {
    let mut builder = bare_builder(PageGeometry::a4());
    let ragged = vec![strings(&["M-01", "Sangre"]), strings(&["M-02"])];
    let result = builder.add_table(&strings(&["Código", "Tipo"]), &ragged);
    assert!(matches!(result, Err(Error::MalformedTable(msg)) if msg.contains("row 2")));

    let result = builder.add_table(&[], &[]);
    assert!(matches!(result, Err(Error::MalformedTable(_))));

    assert!(builder.placements().is_empty());
    assert_eq!(builder.page_count(), 1);
}

#[test]
fn rows_taller_than_a_page_are_refused() {
    let mut builder = bare_builder(geometry(112.0));
    let tall = "línea\n".repeat(30);
    let result = builder.add_table(&strings(&["Descripción"]), &[vec![tall]]);
    assert!(matches!(result, Err(Error::RowTooTall { row: 1, .. })));
}

#[test]
fn empty_body_draws_only_the_header() {
    let mut builder = bare_builder(PageGeometry::a4());
    let start = builder.cursor_y();
    builder.add_table(&strings(&["Código", "Tipo"]), &[]).unwrap();
    let placements = builder.placements();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].kind, BlockKind::TableHeader);
    assert!(approx(builder.cursor_y(), start + table_row_height(1) + TABLE_BOTTOM_MARGIN));
}
