//! Overwrites the fixed schema fields of a repaired document with values
//! from its matched metadata row.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::document::DocType;
use crate::metadata::MetadataRow;
use crate::xml::{Document, Element, XmlError};

pub const MEASURE_STATE: &str = "CHP";
pub const DIGEST_NOTICE: &str =
    "The Legislative Counsel's Digest is not available for this chapter; see the chaptered text for its contents.";

const ROOT: &str = "MeasureDoc";
const LEGISLATIVE_INFO: &[&str] = &["Description", "LegislativeInfo"];
const AUTHOR_ENTRY: &[&str] = &["Description", "Authors", "Legislator|Committee"];
const DESCRIPTION: &[&str] = &["Description"];

// `&gt;` right after the start tag of an injected field: an escaped leading
// `>` of the metadata value. Document body text is never matched.
static INJECTED_ESCAPED_GT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(<(?:[A-Za-z_][\w.\-]*:)?",
        r"(?:SessionNum|MeasureType|MeasureNum|MeasureState|ChapterType|ChapterNum|Name|House|AuthorText|DigestText)",
        r"(?:\s[^>]*)?>)&gt;"
    ))
    .unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("FieldMissing: {0}")]
    Missing(String),
    #[error("FieldDuplicate: {field} appears {count} times")]
    Duplicate { field: String, count: usize },
    #[error("FieldEmpty: metadata value for {0} is blank")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("{0}")]
    Markup(#[from] XmlError),
    #[error("metadata injection failed: {}", join_errors(.0))]
    Fields(Vec<FieldError>),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

struct FieldUpdate {
    path: &'static [&'static str],
    name: &'static str,
    value: Result<String, FieldError>,
}

fn required(name: &str, raw: &str) -> Result<String, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        Err(FieldError::Empty(name.to_string()))
    } else {
        Ok(value.to_string())
    }
}

pub fn chapter_type(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::Resolution => "RCHP",
        DocType::Statute => "CHP",
    }
}

/// `ASSEMBLY` for measure types starting with `A`, otherwise `SENATE`.
pub fn house_for(measure_type: &str) -> &'static str {
    if measure_type.trim().starts_with('A') {
        "ASSEMBLY"
    } else {
        "SENATE"
    }
}

/// Title-case the name (a letter following any non-alphanumeric character
/// starts a word), then upper-case the letter after every `Mac`, `Mc` and
/// apostrophe.
pub fn capitalize_name(raw: &str) -> String {
    let mut titled = String::with_capacity(raw.len());
    let mut word_start = true;
    for c in raw.to_lowercase().chars() {
        if word_start {
            titled.extend(c.to_uppercase());
        } else {
            titled.push(c);
        }
        word_start = !c.is_alphanumeric();
    }

    let mut chars: Vec<char> = titled.chars().collect();
    for i in 0..chars.len() {
        let step = if starts_with_ci(&chars[i..], "mac") {
            3
        } else if starts_with_ci(&chars[i..], "mc") {
            2
        } else if chars[i] == '\'' {
            1
        } else {
            continue;
        };
        if let Some(next) = chars.get(i + step).copied() {
            chars[i + step] = next.to_uppercase().next().unwrap_or(next);
        }
    }
    chars.into_iter().collect()
}

fn starts_with_ci(chars: &[char], pattern: &str) -> bool {
    let mut it = chars.iter();
    pattern.chars().all(|p| it.next().map_or(false, |c| c.to_ascii_lowercase() == p))
}

fn updates(row: &MetadataRow, doc_type: DocType) -> Vec<FieldUpdate> {
    let field = |path, name, value| FieldUpdate { path, name, value };
    vec![
        field(LEGISLATIVE_INFO, "SessionNum", Ok(row.session.to_string())),
        field(LEGISLATIVE_INFO, "MeasureType", required("MeasureType", &row.measure_type)),
        field(LEGISLATIVE_INFO, "MeasureNum", required("MeasureNum", &row.measure_num)),
        field(LEGISLATIVE_INFO, "MeasureState", Ok(MEASURE_STATE.to_string())),
        field(LEGISLATIVE_INFO, "ChapterType", Ok(chapter_type(doc_type).to_string())),
        field(LEGISLATIVE_INFO, "ChapterNum", required("ChapterNum", &row.chapter)),
        field(AUTHOR_ENTRY, "Name", Ok(capitalize_name(&row.author_name))),
        field(AUTHOR_ENTRY, "House", Ok(house_for(&row.measure_type).to_string())),
        field(DESCRIPTION, "AuthorText", Ok(row.author_text.trim().to_string())),
        field(DESCRIPTION, "DigestText", Ok(DIGEST_NOTICE.to_string())),
    ]
}

/// Walk `path` (each step may list `|`-separated alternatives) and return
/// the single `name` element at its end.
fn locate<'a>(root: &'a mut Element, path: &[&str], name: &str) -> Result<&'a mut Element, FieldError> {
    let mut current = root;
    for step in path.iter().copied().chain(std::iter::once(name)) {
        let names: Vec<&str> = step.split('|').collect();
        let hits = current.child_positions(&names);
        let container = names.join(" or ");
        let index = match hits.as_slice() {
            [] if step == name => return Err(FieldError::Missing(name.to_string())),
            [] => return Err(FieldError::Missing(format!("{} (container {} not found)", name, container))),
            [i] => *i,
            _ if step == name => return Err(FieldError::Duplicate { field: name.to_string(), count: hits.len() }),
            _ => {
                let field = format!("{} (container {})", name, container);
                return Err(FieldError::Duplicate { field, count: hits.len() });
            }
        };
        current = current.child_mut(index).ok_or_else(|| FieldError::Missing(name.to_string()))?;
    }
    Ok(current)
}

/// Parse `text`, set every field from `row`, and serialize. All field
/// problems are collected before failing.
pub fn inject_metadata(text: &str, row: &MetadataRow, doc_type: DocType) -> Result<String, InjectError> {
    let mut doc = Document::parse(text)?;
    let root = doc.root_mut().ok_or(XmlError::NoRoot)?;
    let mut errors = Vec::new();
    if root.local_name() != ROOT {
        errors.push(FieldError::Missing(format!("{} root element", ROOT)));
    } else {
        for update in updates(row, doc_type) {
            let target = locate(root, update.path, update.name);
            match (target, update.value) {
                (Ok(el), Ok(value)) => el.set_text(&value),
                (Err(e), _) | (Ok(_), Err(e)) => errors.push(e),
            }
        }
    }
    if !errors.is_empty() {
        return Err(InjectError::Fields(errors));
    }
    Ok(fix_serialization_artifacts(&doc.to_xml()?))
}

/// Post-serialization cleanup: drop the `&gt;` glued to the start tag of an
/// injected field.
pub fn fix_serialization_artifacts(text: &str) -> String {
    INJECTED_ESCAPED_GT_RE.replace_all(text, "${1}").into_owned()
}
