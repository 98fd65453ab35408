use std::fs;

use caml_merge::metadata::{parse_records, read_record_file, record_files};
use caml_merge::{DocType, MatchError, MetadataIndex, MetadataRow, MetadataSource};

fn row(session: u8, chapter: &str) -> MetadataRow {
    MetadataRow {
        session,
        chapter: chapter.to_string(),
        measure_type: "AB".to_string(),
        measure_num: "1".to_string(),
        ..MetadataRow::default()
    }
}

#[test]
fn source_from_file_name() {
    assert_eq!(MetadataSource::from_file_name("Statutes.xml"), MetadataSource { doc_type: DocType::Statute, session: 0 });
    assert_eq!(MetadataSource::from_file_name("Resolutions_1ES.xml"), MetadataSource { doc_type: DocType::Resolution, session: 1 });
    assert_eq!(MetadataSource::from_file_name("statutes 2ex.XML"), MetadataSource { doc_type: DocType::Statute, session: 2 });
    assert_eq!(MetadataSource::from_file_name("Measures.xml"), MetadataSource { doc_type: DocType::Statute, session: 0 });
}

#[test]
fn parses_record_rows() {
    let xml = r#"<?xml version="1.0"?>
<dataroot>
  <Statutes>
    <MeasureType>AB</MeasureType>
    <MeasureNum>12</MeasureNum>
    <ChapterNum>7</ChapterNum>
    <AuthorName>o'connell</AuthorName>
    <AuthorText>Introduced by Assembly Member O&apos;Connell</AuthorText>
    <Notes>ignored</Notes>
  </Statutes>
  <Statutes>
    <MeasureType>SB</MeasureType>
    <ChapterNumber></ChapterNumber>
  </Statutes>
</dataroot>"#;
    let rows = parse_records(xml, 3).expect("parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].session, 3);
    assert_eq!(rows[0].chapter, "7");
    assert_eq!(rows[0].measure_num, "12");
    assert_eq!(rows[0].author_name, "o'connell");
    assert_eq!(rows[0].author_text, "Introduced by Assembly Member O'Connell");
    assert_eq!(rows[1].measure_type, "SB");
    assert!(!rows[1].has_chapter());
}

#[test]
fn rejects_truncated_record_file() {
    assert!(parse_records("<dataroot><row><ChapterNum>1</ChapterNum>", 0).is_err());
}

#[test]
fn reads_record_files_from_folder() {
    let td = tempfile::tempdir().unwrap();
    fs::write(td.path().join("Resolutions_1ES.xml"), "<root><r><ChapterNum>2</ChapterNum></r></root>").unwrap();
    fs::write(td.path().join("readme.txt"), "not metadata").unwrap();
    let files = record_files(td.path()).expect("list");
    assert_eq!(files.len(), 1);
    let (source, rows) = read_record_file(&files[0]).expect("read");
    assert_eq!(source, MetadataSource { doc_type: DocType::Resolution, session: 1 });
    assert_eq!(rows[0].session, 1);
    assert_eq!(rows[0].chapter_number(), Some(2));
}

#[test]
fn match_consumes_exactly_once() {
    let mut index = MetadataIndex::new();
    index.load(DocType::Statute, vec![row(0, "0007"), row(0, "8")]);

    let hit = index.match_row(DocType::Statute, 0, 7).expect("match");
    assert!(hit.consumed);
    assert_eq!(hit.chapter, "0007");

    let again = index.match_row(DocType::Statute, 0, 7).unwrap_err();
    assert_eq!(again, MatchError::MissingMetadata { doc_type: DocType::Statute, session: 0, chapter: 7 });

    let unmatched = index.unmatched_rows(DocType::Statute);
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].chapter, "8");
}

#[test]
fn match_is_scoped_by_type_and_session() {
    let mut index = MetadataIndex::new();
    index.load(DocType::Statute, vec![row(1, "5")]);
    assert!(index.match_row(DocType::Statute, 0, 5).is_err());
    assert!(index.match_row(DocType::Resolution, 1, 5).is_err());
    assert!(index.match_row(DocType::Statute, 1, 5).is_ok());
}

#[test]
fn duplicates_fail_and_stay_unconsumed() {
    let mut index = MetadataIndex::new();
    index.load(DocType::Resolution, vec![row(0, "5"), row(0, "05")]);

    for _ in 0..2 {
        match index.match_row(DocType::Resolution, 0, 5) {
            Err(MatchError::DuplicateMetadata { count, excess, .. }) => {
                assert_eq!(count, 2);
                assert_eq!(excess, 1);
            }
            other => panic!("expected DuplicateMetadata, got {:?}", other),
        }
    }
    let err = index.match_row(DocType::Resolution, 0, 5).unwrap_err();
    assert!(err.to_string().contains("1 too many"));
    assert_eq!(index.unmatched_rows(DocType::Resolution).len(), 2);
}

#[test]
fn unmatched_rows_skip_blank_chapters() {
    let mut index = MetadataIndex::new();
    index.load(DocType::Statute, vec![row(0, "  "), row(0, "0007"), row(0, "abc")]);
    let unmatched = index.unmatched_rows(DocType::Statute);
    assert_eq!(unmatched.len(), 2);

    let message = unmatched[0].missing_file_message(DocType::Statute, 1930);
    assert!(message.contains("CHP19300007"), "{}", message);
    assert!(message.contains("missing or named incorrectly"));
}

#[test]
fn concurrent_matching_assigns_each_row_once() {
    let mut index = MetadataIndex::new();
    index.load(DocType::Statute, (1..=100).map(|n| row(0, &n.to_string())).collect());

    let wins: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = &index;
                s.spawn(move || (1..=100u16).filter(|c| index.match_row(DocType::Statute, 0, *c).is_ok()).count())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(wins, 100);
    assert!(index.unmatched_rows(DocType::Statute).is_empty());
}
