use std::path::PathBuf;

use mesa_partes_pdf::{DocumentBuilder, DocumentConfig, EMBLEM_ENV, Error, Letterhead, LetterheadLine, PageGeometry};

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "geometry": {"margin_bottom": 30},
            "letterhead": {"caption": [{"text": "Año de la recuperación", "bold": false, "font_size": 7}]},
            "author": "Mesa de Partes",
            "page_numbers": false
        }"#,
    )
    .unwrap();

    let config = DocumentConfig::from_json_file(&path).unwrap();
    assert_eq!(config.geometry.margin_bottom, 30.0);
    assert_eq!(config.geometry.height, PageGeometry::a4().height);
    assert_eq!(config.letterhead.lines.len(), 3);
    assert_eq!(config.letterhead.caption.len(), 1);
    assert_eq!(config.author.as_deref(), Some("Mesa de Partes"));
    assert!(!config.page_numbers);
}

#[test]
fn impossible_geometry_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"geometry": {"margin_top": 150, "margin_bottom": 150}}"#).unwrap();
    assert!(matches!(
        DocumentConfig::from_json_file(&path),
        Err(Error::InvalidGeometry(_))
    ));
}

#[test]
fn negative_letterhead_font_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"letterhead": {"lines": [
            {"text": "POLICÍA NACIONAL DEL PERÚ", "font_size": -40},
            {"text": "MESA DE PARTES", "font_size": -40}
        ]}}"#,
    )
    .unwrap();
    assert!(matches!(
        DocumentConfig::from_json_file(&path),
        Err(Error::InvalidGeometry(_))
    ));
}

#[test]
fn letterhead_sizes_are_checked_before_layout() {
    let shrunk = DocumentConfig {
        letterhead: Letterhead {
            caption: vec![LetterheadLine::normal("Año del bicentenario", f32::NAN)],
            ..Letterhead::default()
        },
        ..DocumentConfig::default()
    };
    assert!(matches!(
        DocumentBuilder::initialize(&shrunk),
        Err(Error::InvalidGeometry(_))
    ));

    let inverted = DocumentConfig {
        letterhead: Letterhead {
            emblem_width: -18.0,
            ..Letterhead::default()
        },
        ..DocumentConfig::default()
    };
    assert!(matches!(
        DocumentBuilder::initialize(&inverted),
        Err(Error::InvalidGeometry(_))
    ));

    let builder = DocumentBuilder::initialize(&DocumentConfig::default()).unwrap();
    assert!(builder.header_bottom() >= builder.geometry().margin_top);
}

#[test]
fn emblem_path_comes_from_the_environment() {
    // Only test in this binary that touches the variable.
    unsafe { std::env::set_var(EMBLEM_ENV, "/srv/mesa-partes/escudo.png") };
    let config = DocumentConfig::default().with_env_overrides();
    assert_eq!(
        config.letterhead.emblem_path,
        Some(PathBuf::from("/srv/mesa-partes/escudo.png"))
    );

    unsafe { std::env::set_var(EMBLEM_ENV, "  ") };
    let config = DocumentConfig::default().with_env_overrides();
    assert_eq!(config.letterhead.emblem_path, None);
    unsafe { std::env::remove_var(EMBLEM_ENV) };
}
