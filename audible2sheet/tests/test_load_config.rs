use audible2sheet::load_config::{load_config, sheet_token, SHEETS_TOKEN_ENV};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
fn full_config_loads_every_section() {
    let file = config_file(
        r#"
root_dir: ./tmp/audible
audible:
  locale: uk
  session_file: ./tmp/session.json
  page_size: 20
  max_pages: 5
filters:
  omit_content_types: ["Speech"]
  omit_asins: ["B000000001"]
  min_duration_minutes: 10
sheet:
  spreadsheet_id: "1AbC"
  sheet_name: Books
  sheet_id: 42
"#,
    );

    let config = load_config(file.path()).expect("Config should load");
    let core = config.core_config();

    assert_eq!(core.root_dir, PathBuf::from("./tmp/audible"));
    assert_eq!(core.fetch.page_size, 20);
    assert_eq!(core.fetch.max_pages, 5);
    assert!(core.filters.omit_asins.contains("B000000001"));
    assert_eq!(core.filters.min_duration_minutes, 10);
    assert_eq!(core.book_cache().path(), PathBuf::from("./tmp/audible/library.txt"));

    let audible = config.audible();
    assert_eq!(audible.locale, "uk");
    assert_eq!(audible.session_file, PathBuf::from("./tmp/session.json"));

    let sheet = config.sheet().expect("sheet section");
    assert_eq!(sheet.spreadsheet_id, "1AbC");
    assert_eq!(sheet.sheet_id, 42);
}

#[test]
fn minimal_config_uses_defaults() {
    let file = config_file("root_dir: /data\naudible:\n  session_file: /data/session.json\n");

    let config = load_config(file.path()).expect("Config should load");
    let core = config.core_config();

    assert_eq!(config.audible().locale, "us");
    assert_eq!(core.fetch.page_size, 50);
    assert_eq!(core.fetch.max_pages, 1000);
    assert!(core.filters.omit_content_types.contains("Speech"));
    assert!(core.filters.omit_content_types.contains("Newspaper / Magazine"));
    assert_eq!(core.filters.min_duration_minutes, 1);
    assert!(config.sheet().is_err(), "sheet is only required for sync");
}

#[test]
fn unknown_locale_is_rejected() {
    let file = config_file("root_dir: /data\naudible:\n  locale: xx\n  session_file: /s.json\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Unknown audible locale"), "{err}");
}

#[test]
fn zero_page_size_is_rejected() {
    let file =
        config_file("root_dir: /data\naudible:\n  session_file: /s.json\n  page_size: 0\n");
    assert!(load_config(file.path()).is_err());
}

#[test]
fn missing_session_file_key_is_a_parse_error() {
    let file = config_file("root_dir: /data\naudible:\n  locale: us\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"), "{err}");
}

#[test]
fn missing_file_is_reported() {
    let err = load_config("/definitely/not/a/config.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn sheet_token_comes_from_the_environment() {
    env::set_var(SHEETS_TOKEN_ENV, "  ya29.token\n");
    assert_eq!(sheet_token().unwrap(), "ya29.token");

    env::set_var(SHEETS_TOKEN_ENV, "   ");
    assert!(sheet_token().is_err());

    env::remove_var(SHEETS_TOKEN_ENV);
    assert!(sheet_token().is_err());
}
