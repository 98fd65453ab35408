use std::fs;

use caml_merge::report::{no_errors_line, report_path};
use caml_merge::{DocType, ErrorAggregator};

#[test]
fn empty_logs_write_the_sentinel() {
    let td = tempfile::tempdir().unwrap();
    let errors = ErrorAggregator::new();
    let paths = errors.flush_year(1930, td.path()).expect("flush");
    assert_eq!(paths.len(), 2);

    let resolutions = fs::read_to_string(td.path().join("1930_resolution_errors.txt")).unwrap();
    assert_eq!(resolutions, "No errors found in Resolutions for this year.\n");
    let statutes = fs::read_to_string(report_path(td.path(), 1930, DocType::Statute)).unwrap();
    assert_eq!(statutes, format!("{}\n", no_errors_line(DocType::Statute)));
}

#[test]
fn lines_are_timestamped_and_cleared_after_flush() {
    let td = tempfile::tempdir().unwrap();
    let errors = ErrorAggregator::new();
    errors.record(DocType::Statute, "CHP19300009.xml: MissingMetadata");
    errors.record(DocType::Statute, "CHP19300008 is missing or named incorrectly");
    assert_eq!(errors.entries(DocType::Statute).len(), 2);
    assert!(errors.entries(DocType::Resolution).is_empty());

    errors.flush_year(1930, td.path()).expect("flush");
    let body = fs::read_to_string(td.path().join("1930_statute_errors.txt")).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        // [YYYY-MM-DD HH:MM:SS] message
        assert!(line.starts_with('['), "{}", line);
        assert_eq!(&line[20..22], "] ", "{}", line);
    }
    assert!(lines[0].ends_with("CHP19300009.xml: MissingMetadata"));
    assert!(lines[1].ends_with("CHP19300008 is missing or named incorrectly"));

    assert!(errors.entries(DocType::Statute).is_empty());
    errors.flush_year(1931, td.path()).expect("flush");
    let next = fs::read_to_string(td.path().join("1931_statute_errors.txt")).unwrap();
    assert_eq!(next, "No errors found in Statutes for this year.\n");
}

#[test]
fn failed_report_write_does_not_leak_into_next_year() {
    let td = tempfile::tempdir().unwrap();
    // a folder where the resolution report should go makes that write fail
    fs::create_dir(td.path().join("1930_resolution_errors.txt")).unwrap();
    let errors = ErrorAggregator::new();
    errors.record(DocType::Resolution, "CHR193010002.xml: MissingMetadata");
    errors.record(DocType::Statute, "CHP19300009.xml: MissingMetadata");

    assert!(errors.flush_year(1930, td.path()).is_err());
    assert!(errors.entries(DocType::Resolution).is_empty());
    assert!(errors.entries(DocType::Statute).is_empty());

    let statutes_1930 = fs::read_to_string(td.path().join("1930_statute_errors.txt")).unwrap();
    assert!(statutes_1930.contains("CHP19300009.xml: MissingMetadata"));
    let setup = errors.setup_errors();
    assert_eq!(setup.len(), 2);
    assert!(setup[0].contains("1930_resolution_errors.txt"));
    assert!(setup[1].ends_with("CHR193010002.xml: MissingMetadata"));

    errors.flush_year(1931, td.path()).expect("flush");
    let statutes_1931 = fs::read_to_string(td.path().join("1931_statute_errors.txt")).unwrap();
    assert_eq!(statutes_1931, "No errors found in Statutes for this year.\n");
    let resolutions_1931 = fs::read_to_string(td.path().join("1931_resolution_errors.txt")).unwrap();
    assert_eq!(resolutions_1931, "No errors found in Resolutions for this year.\n");
}

#[test]
fn unusable_report_folder_moves_both_logs_to_setup() {
    let td = tempfile::tempdir().unwrap();
    let blocker = td.path().join("reports");
    fs::write(&blocker, "file, not a folder").unwrap();
    let errors = ErrorAggregator::new();
    errors.record(DocType::Resolution, "r1");
    errors.record(DocType::Statute, "s1");

    assert!(errors.flush_year(1930, &blocker).is_err());
    let setup = errors.setup_errors();
    assert_eq!(setup.len(), 4);
    assert!(setup.iter().any(|l| l.ends_with("] r1")));
    assert!(setup.iter().any(|l| l.ends_with("] s1")));

    let good = td.path().join("ok");
    errors.flush_year(1931, &good).expect("flush");
    let statutes = fs::read_to_string(good.join("1931_statute_errors.txt")).unwrap();
    assert_eq!(statutes, "No errors found in Statutes for this year.\n");
}

#[test]
fn setup_errors_accumulate_across_years() {
    let td = tempfile::tempdir().unwrap();
    let errors = ErrorAggregator::new();
    errors.record_setup("1931: Documents folder not found");
    errors.flush_year(1930, td.path()).expect("flush");
    errors.record_setup("WriteError: disk full");
    assert_eq!(errors.setup_error_count(), 2);
    assert!(errors.setup_errors()[1].ends_with("WriteError: disk full"));
}

#[test]
fn concurrent_records_are_all_kept() {
    let errors = ErrorAggregator::new();
    std::thread::scope(|s| {
        for t in 0..4 {
            let errors = &errors;
            s.spawn(move || {
                for i in 0..25 {
                    errors.record(DocType::Resolution, format!("worker {} item {}", t, i));
                }
            });
        }
    });
    assert_eq!(errors.entries(DocType::Resolution).len(), 100);
}
