use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::RepairError;

const DECLARATION: &str = "<?xml";

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG_PADDING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\s*([^<>]*?)\s*>").unwrap());
static BAD_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^A-Za-z/?!])").unwrap());
static END_NO_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^<])/([A-Za-z][\w:.\-]*)>").unwrap());
static END_NO_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(</[A-Za-z][\w:.\-]*)([^\w:.\->]|$)").unwrap());
static AUTHORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(<caml:Authors\b[^>]*>)(.*?)(</caml:Authors>)").unwrap());
static LEGISLATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<caml:Legislator\b[^>]*>.*?</caml:Legislator>\s*").unwrap());
static NON_ASCII_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F§¶‘’“”–—…•½]+\s*").unwrap());
static AUTHOR_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)caml:authortext\b").unwrap());
static PARAGRAPH_CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)html:P\b").unwrap());

const LITERAL_FIXES: &[(&str, &str)] = &[
    ("encoding=\"utf-8\"", "encoding=\"UTF-8\""),
    ("caml:DateApproved", "caml:ApprovalDate"),
    ("caml:ApprovedDate", "caml:ApprovalDate"),
    ("<caml:Subject>N/A</caml:Subject>", "<caml:Subject></caml:Subject>"),
    ("Legilsator", "Legislator"),
    ("ASSMEBLY", "ASSEMBLY"),
];

/// Repairs shared by both document types, applied in order.
pub fn repair_common(text: &str) -> Result<String, RepairError> {
    let text = trim_before_declaration(text)?;
    let text = strip_comments(text);
    let text = trim_tag_padding(&text);
    let text = drop_malformed_openers(&text);
    let text = add_missing_end_opener(&text);
    let text = add_missing_end_closer(&text);
    let text = keep_first_legislator(&text);
    let text = strip_non_ascii(&text);
    let text = AUTHOR_TEXT_RE.replace_all(&text, "caml:AuthorText").into_owned();
    Ok(apply_literal_fixes(&text))
}

pub fn trim_before_declaration(text: &str) -> Result<&str, RepairError> {
    text.find(DECLARATION).map(|at| &text[at..]).ok_or(RepairError::MissingDeclaration)
}

pub fn strip_comments(text: &str) -> String {
    COMMENT_RE.replace_all(text, "").into_owned()
}

/// `< caml:Foo  >` -> `<caml:Foo>`
pub fn trim_tag_padding(text: &str) -> String {
    TAG_PADDING_RE.replace_all(text, "<${1}>").into_owned()
}

/// Drops a `<` that cannot start a tag.
pub fn drop_malformed_openers(text: &str) -> String {
    let mut out = text.to_string();
    // `<<<` needs more than one sweep since matches cannot overlap
    while BAD_OPEN_RE.is_match(&out) {
        out = BAD_OPEN_RE.replace_all(&out, "${1}").into_owned();
    }
    while out.ends_with('<') {
        out.pop();
    }
    out
}

/// `/caml:Foo>` -> `</caml:Foo>`
pub fn add_missing_end_opener(text: &str) -> String {
    END_NO_OPEN_RE.replace_all(text, "${1}</${2}>").into_owned()
}

/// `</caml:Foo<` -> `</caml:Foo><`
pub fn add_missing_end_closer(text: &str) -> String {
    END_NO_CLOSE_RE.replace_all(text, "${1}>${2}").into_owned()
}

/// Only the first legislator inside the authors list survives.
pub fn keep_first_legislator(text: &str) -> String {
    AUTHORS_RE
        .replace_all(text, |caps: &Captures| {
            let mut seen = false;
            let body = LEGISLATOR_RE.replace_all(&caps[2], |m: &Captures| {
                if seen {
                    String::new()
                } else {
                    seen = true;
                    m[0].to_string()
                }
            });
            format!("{}{}{}", &caps[1], body, &caps[3])
        })
        .into_owned()
}

pub fn strip_non_ascii(text: &str) -> String {
    NON_ASCII_RE.replace_all(text, "").into_owned()
}

pub fn apply_literal_fixes(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in LITERAL_FIXES {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    PARAGRAPH_CASE_RE.replace_all(&out, "<${1}html:p").into_owned()
}
