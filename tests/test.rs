
use std::{collections::BTreeSet, fs, path::Path};

use chrono::{TimeZone, Utc};
use example_document::ExampleDocument;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use redline_text::{
    Anchor, ChangeKind, ChangeTarget, Content, Document, EditError, EditorConfig, Paragraph, Run,
    TextQuery, TrackedWrapper, compare,
};

#[test]
fn test_examples_render_expected_markup() {
    for example in &get_all_examples() {
        let document = example.run();
        example.assert_expected(&document);
        assert_eq!(document.validate(), Ok(()), "{}", example.name());
    }
}

#[test]
fn test_examples_accept_all() {
    for example in &get_all_examples() {
        let Some(accepted) = example.accepted() else {
            continue;
        };

        let mut document = example.run();
        document.accept_all().unwrap();
        assert_eq!(document.text(), accepted, "{}", example.name());
        assert!(document.tracked_changes().is_empty(), "{}", example.name());
    }
}

#[test]
fn test_examples_reject_all_restores_original() {
    for example in &get_all_examples() {
        let mut document = example.run();
        document.reject_all().unwrap();
        assert_eq!(document.text(), example.original_text(), "{}", example.name());
    }
}

fn get_all_examples() -> Vec<ExampleDocument> {
    let examples_dir = Path::new("tests/examples");
    let mut paths = fs::read_dir(examples_dir)
        .expect("Failed to read examples directory")
        .map(|entry| entry.expect("Failed to read directory entry").path())
        .filter(|path| path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("yml"))
        .collect::<Vec<_>>();
    paths.sort();

    let examples = paths
        .iter()
        .flat_map(|path| ExampleDocument::all_from_yaml(path))
        .collect::<Vec<_>>();
    assert!(!examples.is_empty(), "No examples found");
    examples
}

fn reviewer_document(texts: &[&str]) -> Document {
    Document::from_texts(texts).with_config(
        EditorConfig::default()
            .with_author("Reviewer")
            .with_date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
    )
}

#[test]
fn test_span_over_differently_formatted_runs() {
    let bold = redline_text::Formatting::default().with_bold();
    let italic = redline_text::Formatting::default().with_italic();
    let document = Document::new(vec![
        Paragraph::new()
            .with_run(Run::new("The qu"))
            .with_run(Run::formatted("ick ", bold))
            .with_run(Run::formatted("brown", italic))
            .with_run(Run::new(" fox")),
    ]);

    let matches = document.find_text(&"quick brown f".into()).unwrap();
    assert_eq!(matches.len(), 1);

    let span = &matches[0].span;
    assert_eq!((span.start(), span.end()), (4, 17));
    assert_eq!(span.pieces.len(), 4);

    let single = document.find_text(&"row".into()).unwrap();
    assert_eq!(single[0].span.pieces.len(), 1);
}

#[test]
fn test_failed_edit_leaves_document_untouched() {
    let mut document = reviewer_document(&["Hello world", "Goodbye world"]);
    document.insert(Anchor::after("Hello"), " brave").unwrap();
    let before = document.clone();

    assert!(matches!(
        document.delete("world"),
        Err(EditError::AmbiguousText { count: 2, .. })
    ));
    assert!(matches!(
        document.insert(Anchor::after("missing"), "text"),
        Err(EditError::TextNotFound { .. })
    ));
    assert!(matches!(
        document.replace(TextQuery::regex("(unclosed"), "text"),
        Err(EditError::InvalidPattern { .. })
    ));

    assert_eq!(document, before);
    assert_eq!(document.text(), before.text());
}

#[test]
fn test_replace_failing_after_its_deletion_is_rolled_back() {
    let date = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    let mut document = Document::new(vec![
        Paragraph::new()
            .with_run(Run::new("The "))
            .with_tracked(TrackedWrapper::with_runs(
                ChangeKind::Insertion,
                redline_text::ChangeInfo::new(10, "Alice", date),
                vec![
                    Run::new("qu"),
                    Run::formatted("ick", redline_text::Formatting::default().with_bold()),
                    Run::new(" brown"),
                ],
            ))
            .with_run(Run::new(" fox")),
    ])
    .with_config(EditorConfig::default().with_author("Bob").with_date(date));
    let before = document.clone();
    assert_eq!(document.next_change_id(), 11);

    assert!(matches!(
        document.replace("uick b", "X"),
        Err(EditError::AlreadyTracked { id: 10, .. })
    ));

    assert_eq!(document, before);
    assert_eq!(document.next_change_id(), 11);
    assert_eq!(document.modified_parts().count(), 0);
    assert_snapshot!(document.to_string(), @"The [+quick brown+] fox");
}

fn has_nested_deletion(content: &[Content], inside: bool) -> bool {
    content.iter().any(|node| match node {
        Content::Run(_) => false,
        Content::Tracked(wrapper) => {
            let deletion = wrapper.kind == ChangeKind::Deletion;
            (deletion && inside) || has_nested_deletion(&wrapper.content, inside || deletion)
        }
    })
}

#[test]
fn test_deleting_deleted_paragraph_is_already_tracked() {
    let mut document = reviewer_document(&["Intro", "Obsolete clause", "Outro"]);
    document.delete_paragraph("Obsolete clause").unwrap();

    let error = document.delete("Obsolete clause").unwrap_err();
    assert!(matches!(error, EditError::AlreadyTracked { id: 1, .. }));

    let error = document
        .delete_paragraph(TextQuery::new("Obsolete").include_deleted(true))
        .unwrap_err();
    assert!(matches!(error, EditError::AlreadyTracked { .. }));

    assert!(
        !document.parts()[0]
            .paragraphs()
            .iter()
            .any(|paragraph| has_nested_deletion(paragraph.content(), false))
    );
}

#[test]
fn test_ambiguous_introduction() {
    let mut document =
        reviewer_document(&["Introduction", "Body text", "Back to the Introduction"]);

    let Err(EditError::AmbiguousText {
        count, locations, ..
    }) = document.delete("Introduction")
    else {
        panic!("expected an ambiguity error");
    };

    assert_eq!(count, 2);
    assert_eq!(
        locations
            .iter()
            .map(|location| location.paragraph)
            .collect::<Vec<_>>(),
        vec![0, 2]
    );

    document
        .delete(TextQuery::new("Introduction").first())
        .unwrap();
    assert_snapshot!(document.to_string(), @r"
    [-Introduction-]
    Body text
    Back to the Introduction
    ");
}

fn moved_document() -> Document {
    let mut document = reviewer_document(&[
        "Section one.",
        "Move this sentence. Keep this one.",
        "Section three.",
        "Section four.",
    ]);
    document
        .move_text("Move this sentence. ", Anchor::after("Section four."))
        .unwrap();
    document
}

#[test]
fn test_move_creates_linked_pair() {
    let document = moved_document();
    assert_snapshot!(document.to_string(), @r"
    Section one.
    [<move1:Move this sentence. <]Keep this one.
    Section three.
    Section four.[>move1:Move this sentence. >]
    ");

    let changes = document.tracked_changes();
    assert_eq!(changes.len(), 2);
    assert_eq!(
        changes
            .iter()
            .map(|change| (change.id, change.kind.clone(), change.move_name.clone()))
            .collect::<Vec<_>>(),
        vec![
            (1, ChangeKind::MoveFrom, Some("move1".to_owned())),
            (2, ChangeKind::MoveTo, Some("move1".to_owned())),
        ]
    );
    assert!(
        changes
            .iter()
            .all(|change| change.target == ChangeTarget::Content)
    );
}

#[test]
fn test_move_resolution() {
    let mut accepted = moved_document();
    assert_eq!(accepted.accept_move("move1"), Ok(2));
    assert_eq!(
        accepted.text(),
        "Section one.\nKeep this one.\nSection three.\nSection four.Move this sentence. "
    );

    let mut rejected = moved_document();
    assert_eq!(rejected.reject_move("move1"), Ok(2));
    assert_eq!(
        rejected.text(),
        "Section one.\nMove this sentence. Keep this one.\nSection three.\nSection four."
    );

    let mut half = moved_document();
    let before = half.clone();
    assert!(matches!(
        half.accept_change(1),
        Err(EditError::InvalidOperation(_))
    ));
    assert!(matches!(
        half.reject_changes(&[2]),
        Err(EditError::InvalidOperation(_))
    ));
    assert_eq!(half, before);

    assert_eq!(half.accept_changes(&[1, 2]), Ok(2));
    assert_eq!(half.text(), accepted.text());
}

#[test]
fn test_move_into_itself_is_invalid() {
    let mut document = reviewer_document(&["abc def"]);
    assert!(matches!(
        document.move_text("abc def", Anchor::before("def")),
        Err(EditError::InvalidOperation(_))
    ));
}

#[test]
fn test_comparator_counts() {
    let added = compare(
        &reviewer_document(&["Line 1", "Line 3"]),
        &Document::from_texts(["Line 1", "Line 2", "Line 3"]),
    )
    .unwrap();
    assert_eq!(added.changes, 1);
    assert_eq!(
        added
            .document
            .tracked_changes()
            .iter()
            .filter(|change| change.kind == ChangeKind::Insertion)
            .map(|change| change.id)
            .collect::<BTreeSet<_>>()
            .len(),
        1
    );

    let replaced = compare(
        &reviewer_document(&["A", "B", "C"]),
        &Document::from_texts(["X", "Y", "Z"]),
    )
    .unwrap();
    assert_eq!(replaced.changes, 6);

    let kinds = replaced
        .document
        .tracked_changes()
        .into_iter()
        .map(|change| change.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == ChangeKind::Deletion)
            .count(),
        3
    );
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == ChangeKind::Insertion)
            .count(),
        3
    );
}

#[test]
fn test_changes_by_other_authors_are_respected() {
    let date = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    let mut document = Document::new(vec![
        Paragraph::new()
            .with_run(Run::new("Draft "))
            .with_tracked(TrackedWrapper::with_runs(
                ChangeKind::Insertion,
                redline_text::ChangeInfo::new(10, "Alice", date),
                vec![Run::new("proposal")],
            ))
            .with_run(Run::new(" text")),
    ])
    .with_config(EditorConfig::default().with_author("Bob").with_date(date));

    assert!(matches!(
        document.insert(Anchor::after("prop"), "!"),
        Err(EditError::AlreadyTracked { id: 10, .. })
    ));

    document.delete("proposal").unwrap();
    assert_snapshot!(document.to_string(), @"Draft [+[-proposal-]+] text");

    assert_eq!(document.reject_by_author("Bob"), Ok(1));
    assert_eq!(document.accept_by_author("Alice"), Ok(1));
    assert_eq!(document.text(), "Draft proposal text");
    assert_eq!(document.next_change_id(), 12);
}
