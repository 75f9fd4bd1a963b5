use chrono::{TimeZone, Utc};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use redline_text::{Anchor, Document, EditError, EditorConfig};

const SESSION: &str = "
author: Reviewer
date: 2024-05-01T10:00:00Z
markdown: true
continue_on_error: true
";

#[test]
fn test_yaml_config_drives_an_editing_session() {
    let config = EditorConfig::from_yaml(SESSION).unwrap();
    assert!(config.compare_normalize_whitespace);
    assert!(!config.include_deleted);

    let mut document = Document::from_texts(["Hello world"]).with_config(config);
    document.insert(Anchor::after("Hello"), " **brave**").unwrap();
    assert_snapshot!(document.to_string(), @"Hello[+ brave+] world");

    let changes = document.tracked_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].author, "Reviewer");
    assert_eq!(changes[0].date, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
}

#[test]
fn test_yaml_round_trip() {
    let config = EditorConfig::default()
        .with_author("Reviewer")
        .with_date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        .with_markdown(true);

    let yaml = config.to_yaml().unwrap();
    assert_eq!(EditorConfig::from_yaml(&yaml), Ok(config));
}

#[test]
fn test_empty_yaml_is_the_default_config() {
    assert_eq!(EditorConfig::from_yaml("{}"), Ok(EditorConfig::default()));
    assert!(matches!(
        EditorConfig::from_yaml("markdown: maybe"),
        Err(EditError::InvalidConfig(_))
    ));
}
