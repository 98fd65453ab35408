//! Text-level repair passes. Each pass is a function of the document text
//! (plus an id source where fresh identifiers are minted); order matters.

pub mod common;
pub mod resolution;
pub mod statute;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::document::DocType;
use crate::ids::IdGenerator;

pub use common::repair_common;
pub use resolution::repair_resolution;
pub use statute::repair_statute;

static PARAGRAPH_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<html:p\b[^>]*>").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepairError {
    #[error("MissingDeclaration: no <?xml declaration found")]
    MissingDeclaration,
}

/// The type-specific stage for `doc_type`.
pub fn repair_typed(doc_type: DocType, text: &str, ids: &dyn IdGenerator) -> String {
    match doc_type {
        DocType::Resolution => repair_resolution(text, ids),
        DocType::Statute => repair_statute(text, ids),
    }
}

pub(crate) fn leading_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Text of the first paragraph when `rest` opens with one.
pub(crate) fn paragraph_text_after(rest: &str) -> Option<&str> {
    let rest = rest.trim_start();
    let open = PARAGRAPH_OPEN_RE.find(rest)?;
    let body = &rest[open.end()..];
    Some(body.find('<').map_or(body, |at| &body[..at]))
}
