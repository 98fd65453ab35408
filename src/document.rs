use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CH([PR])(\d{4})(\d)(\d{4})\.(?i:xml|caml)$").unwrap());

/// The two CAML document variants. Also the two error-report categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    Resolution,
    Statute,
}

impl DocType {
    pub const ALL: [DocType; 2] = [DocType::Resolution, DocType::Statute];

    /// File name prefix used for documents of this type (`CHR` / `CHP`).
    pub fn prefix(self) -> &'static str {
        match self {
            DocType::Resolution => "CHR",
            DocType::Statute => "CHP",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            DocType::Resolution => "Resolutions",
            DocType::Statute => "Statutes",
        }
    }

    /// Best-effort category for a file whose name has no valid identity.
    pub fn guess_from_file_name(name: &str) -> DocType {
        if name.get(..3).map_or(false, |p| p.eq_ignore_ascii_case("CHR")) {
            DocType::Resolution
        } else {
            DocType::Statute
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocType::Resolution => f.write_str("Resolution"),
            DocType::Statute => f.write_str("Statute"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub doc_type: DocType,
    pub year: u16,
    pub session: u8,
    pub chapter: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("FilenameFormatError: {0} does not match CH<P|R><year><session><chapter>.xml")]
pub struct FilenameFormatError(pub String);

impl DocumentIdentity {
    /// Parse `CH{P|R}{year:4}{session:1}{chapter:4}.{xml|caml}`.
    pub fn from_file_name(name: &str) -> Result<Self, FilenameFormatError> {
        let bad = || FilenameFormatError(name.to_string());
        let caps = FILENAME_RE.captures(name).ok_or_else(bad)?;
        let doc_type = if &caps[1] == "R" { DocType::Resolution } else { DocType::Statute };
        // all-digit captures of bounded width always fit
        let year = caps[2].parse::<u16>().map_err(|_| bad())?;
        let session = caps[3].parse::<u8>().map_err(|_| bad())?;
        let chapter = caps[4].parse::<u16>().map_err(|_| bad())?;
        Ok(DocumentIdentity { doc_type, year, session, chapter })
    }

    /// Canonical stem, e.g. `CHR193012345`.
    pub fn label(&self) -> String {
        chapter_label(self.doc_type, self.year, self.session, &self.chapter.to_string())
    }
}

/// `<prefix><year><session><4-digit chapter>`; non-numeric chapters are zero padded as text.
pub fn chapter_label(doc_type: DocType, year: u16, session: u8, chapter: &str) -> String {
    let chapter = chapter.trim();
    let padded = match chapter.parse::<u16>() {
        Ok(n) => format!("{:04}", n),
        Err(_) => format!("{:0>4}", chapter),
    };
    format!("{}{}{}{}", doc_type.prefix(), year, session, padded)
}
