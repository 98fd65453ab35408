use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::ids::IdGenerator;

use super::{leading_chars, paragraph_text_after};

const WHEREAS_CUES: &[&str] = &["whereas", "eas"];

static ID_BILL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\b(id|href)="(#?)bill""#).unwrap());
static BILL_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<caml:Bill(\s[^>]*)?>").unwrap());
static PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<caml:Preamble\b[^>]*>.*?</caml:Preamble>\s*").unwrap());
static NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<caml:Num\b[^>]*>.*?</caml:Num>\s*").unwrap());
static SECTION_CONTENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<caml:BillSection(?:\s[^>]*)?>(\s*)</?caml:Content>").unwrap());
static UNTAGGED_WHEREAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<caml:WhereasClause>").unwrap());
static ROOT_THEN_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<caml:Resolution\b[^>]*>\s*)<caml:BillSection(?:\s[^>]*)?>").unwrap());
static WHEREAS_TO_RESOLVED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(</caml:WhereasClause>.*?)<caml:BillSection(?:\s[^>]*)?>(.*?</caml:ResolvedClause>)").unwrap()
});
static SECTION_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)caml:(BillSection|WhereasClause|ResolvedClause)\b[^>]*>").unwrap());
static RESOLVED_ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<html:p\b[^>]*>)([^<]{0,9}?)((?i:resolved)\b)").unwrap());
static CONTENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(<caml:Content\b[^>]*>)(.*?)(</caml:Content>)").unwrap());
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(<html:p\b[^>]*>)(.*?)(</html:p>)").unwrap());
static NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S)\n").unwrap());

/// Restructure a bill-shaped document into whereas/resolved clauses.
pub fn repair_resolution(text: &str, ids: &dyn IdGenerator) -> String {
    let text = rename_bill_ids(text);
    let text = convert_root(&text);
    let text = drop_bill_only_elements(&text);
    let text = classify_sections(&text, ids);
    let text = tag_untagged_whereas(&text, ids);
    let text = classify_first_section(&text, ids);
    let text = classify_resolved_between(&text, ids);
    let text = retype_generic_ends(&text);
    let text = italicize_resolved(&text);
    pad_paragraph_newlines(&text)
}

pub fn rename_bill_ids(text: &str) -> String {
    ID_BILL_RE.replace_all(text, "${1}=\"${2}resolution\"").into_owned()
}

pub fn convert_root(text: &str) -> String {
    let text = BILL_START_RE.replace_all(text, "<caml:Resolution${1}>");
    text.replace("</caml:Bill>", "</caml:Resolution>")
}

pub fn drop_bill_only_elements(text: &str) -> String {
    let text = PREAMBLE_RE.replace_all(text, "");
    NUM_RE.replace_all(&text, "").into_owned()
}

fn is_whereas(paragraph_start: &str) -> bool {
    let lead = leading_chars(paragraph_start, 10).to_lowercase();
    WHEREAS_CUES.iter().any(|cue| lead.contains(cue))
}

/// A generic section directly holding content becomes a whereas clause when
/// its first paragraph opens with the cue, otherwise a resolved clause.
pub fn classify_sections(text: &str, ids: &dyn IdGenerator) -> String {
    SECTION_CONTENT_RE
        .replace_all(text, |caps: &Captures| {
            let end = caps.get(0).map_or(0, |m| m.end());
            let kind = match paragraph_text_after(&text[end..]) {
                Some(p) if is_whereas(p) => "WhereasClause",
                _ => "ResolvedClause",
            };
            format!("<caml:{} id=\"{}\">{}<caml:Content>", kind, ids.next_id(), &caps[1])
        })
        .into_owned()
}

pub fn tag_untagged_whereas(text: &str, ids: &dyn IdGenerator) -> String {
    UNTAGGED_WHEREAS_RE
        .replace_all(text, |_: &Captures| format!("<caml:WhereasClause id=\"{}\">", ids.next_id()))
        .into_owned()
}

/// The section right after the resolution root is always preamble.
pub fn classify_first_section(text: &str, ids: &dyn IdGenerator) -> String {
    ROOT_THEN_SECTION_RE
        .replace_all(text, |caps: &Captures| format!("{}<caml:WhereasClause id=\"{}\">", &caps[1], ids.next_id()))
        .into_owned()
}

/// Between a whereas end and the next resolved end, a generic section is operative.
pub fn classify_resolved_between(text: &str, ids: &dyn IdGenerator) -> String {
    if !text.contains("</caml:ResolvedClause>") {
        return text.to_string();
    }
    WHEREAS_TO_RESOLVED_RE
        .replace_all(text, |caps: &Captures| {
            format!("{}<caml:ResolvedClause id=\"{}\">{}", &caps[1], ids.next_id(), &caps[2])
        })
        .into_owned()
}

/// Generic end tags closing a typed clause take the clause's name. A
/// generic end that closes its own generic start is left alone.
pub fn retype_generic_ends(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<String> = Vec::new();
    let mut last = 0;
    for caps in SECTION_TAG_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[2];
        if caps[1].is_empty() {
            open.push(name.to_string());
            continue;
        }
        let top = open.pop();
        if name == "BillSection" {
            if let Some(typed) = top.filter(|t| t != "BillSection") {
                out.push_str(&text[last..whole.start()]);
                out.push_str(&format!("</caml:{}>", typed));
                last = whole.end();
            }
        }
    }
    out.push_str(&text[last..]);
    out
}

pub fn italicize_resolved(text: &str) -> String {
    RESOLVED_ITALIC_RE.replace_all(text, "${1}${2}<html:i>${3}</html:i>").into_owned()
}

/// Inside content blocks, a newline right after text gets a space before it.
pub fn pad_paragraph_newlines(text: &str) -> String {
    CONTENT_RE
        .replace_all(text, |content: &Captures| {
            let body = PARAGRAPH_RE.replace_all(&content[2], |p: &Captures| {
                format!("{}{}{}", &p[1], NEWLINE_RE.replace_all(&p[2], "${1} \n"), &p[3])
            });
            format!("{}{}{}", &content[1], body, &content[3])
        })
        .into_owned()
}
