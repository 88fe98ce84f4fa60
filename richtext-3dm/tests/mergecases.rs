//! Merge cases loaded from `tests/fixtures/mergecases/`.
//!
//! Each case directory holds `origin.html`, `left.html` and `right.html`.
//! A case with an `expected.html` must merge without conflicts into that
//! document; a case without one must be reported as conflicting.

use std::fs;
use std::path::{Path, PathBuf};

use richtext_3dm::{normalize_markup, parse_file, ThreeWayDiff};

/// A merge case read from disk.
#[derive(Debug, Clone)]
struct MergeCase {
    name: String,
    origin: PathBuf,
    left: PathBuf,
    right: PathBuf,
    expected: Option<PathBuf>,
}

/// Outcome of running a merge case.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CaseResult {
    Ok,
    /// Merged output differs from `expected.html`
    WrongMerge { actual: String, expected: String },
    /// Conflict verdict differs from the case's expectation
    WrongVerdict { conflicting: bool },
    Error(String),
}

fn mergecases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mergecases")
}

fn discover_cases(dir: &Path) -> Vec<MergeCase> {
    let mut cases = vec![];
    let Ok(entries) = fs::read_dir(dir) else {
        return cases;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && path.join("origin.html").exists() {
            cases.push(load_case(&path));
        }
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    cases
}

fn load_case(dir: &Path) -> MergeCase {
    let expected = dir.join("expected.html");
    MergeCase {
        name: dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string(),
        origin: dir.join("origin.html"),
        left: dir.join("left.html"),
        right: dir.join("right.html"),
        expected: expected.exists().then_some(expected),
    }
}

fn run_case(case: &MergeCase) -> CaseResult {
    let parse = |path: &Path| parse_file(path).map_err(|e| format!("{}: {}", path.display(), e));
    let trees = parse(&case.origin).and_then(|o| Ok((o, parse(&case.left)?, parse(&case.right)?)));
    let (origin, left, right) = match trees {
        Ok(trees) => trees,
        Err(e) => return CaseResult::Error(e),
    };

    let diff = ThreeWayDiff::new(&origin, &left, &right);
    let conflicting = diff.is_conflicting();

    match &case.expected {
        None if conflicting => CaseResult::Ok,
        None => CaseResult::WrongVerdict { conflicting },
        Some(_) if conflicting => CaseResult::WrongVerdict { conflicting },
        Some(path) => {
            let expected = match fs::read_to_string(path) {
                Ok(s) => normalize_markup(&s),
                Err(e) => return CaseResult::Error(format!("{}: {}", path.display(), e)),
            };
            let actual = normalize_markup(&diff.merged_markup());
            if actual == expected {
                CaseResult::Ok
            } else {
                CaseResult::WrongMerge { actual, expected }
            }
        }
    }
}

fn run_named(name: &str) -> CaseResult {
    let case = load_case(&mergecases_dir().join(name));
    run_case(&case)
}

#[test]
fn test_all_mergecases() {
    let cases = discover_cases(&mergecases_dir());
    assert!(!cases.is_empty(), "no merge cases found");

    let mut failures = vec![];
    for case in &cases {
        let result = run_case(case);
        println!("  {}: {:?}", case.name, result);
        if result != CaseResult::Ok {
            failures.push((case.name.clone(), result));
        }
    }

    println!("\n  Total: {} | Failed: {}", cases.len(), failures.len());
    assert!(failures.is_empty(), "failed merge cases: {:#?}", failures);
}

#[test]
fn test_changes_in_different_paragraphs() {
    assert_eq!(run_named("paragraph-changes-in-different-paragraphs"), CaseResult::Ok);
}

#[test]
fn test_changes_in_same_paragraph() {
    assert_eq!(run_named("paragraph-changes-in-same-paragraph"), CaseResult::Ok);
}

#[test]
fn test_row_and_column_in_same_table() {
    assert_eq!(run_named("table-row-and-column-same-table"), CaseResult::Ok);
}

#[test]
fn test_document_with_head_and_body() {
    assert_eq!(run_named("document-with-head-and-body"), CaseResult::Ok);
}

#[test]
fn test_insertions_at_different_locations_in_same_cell() {
    assert_eq!(
        run_named("table-insertions-at-different-locations-same-cell"),
        CaseResult::Ok
    );
}

#[test]
fn test_insertions_at_same_location_in_same_cell() {
    assert_eq!(run_named("table-insertions-at-same-location-same-cell"), CaseResult::Ok);
}

#[test]
fn test_column_and_row_removals() {
    assert_eq!(run_named("table-add-column-remove-column"), CaseResult::Ok);
    assert_eq!(run_named("table-add-row-remove-row"), CaseResult::Ok);
    assert_eq!(run_named("table-add-column-remove-row"), CaseResult::Ok);
}

#[test]
fn test_change_in_moved_paragraph() {
    assert_eq!(run_named("paragraph-change-in-moved-paragraph"), CaseResult::Ok);
}
