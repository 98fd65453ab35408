use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::ids::IdGenerator;

const SPLIT_PHRASE: &str = "to read: ";

static SECTION_TYPO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bSECTON\b").unwrap());
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(<html:p\b[^>]*>)(.*?)(</html:p>)").unwrap());
static ID_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bid="[^"]*""#).unwrap());
static UNLABELED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<caml:(BillSection|LawSection|LawSectionVersion)>").unwrap());
static CONTENT_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<caml:Content(?:\s[^>]*)?>|</caml:Content>|</caml:(?:LawSectionVersion|LawSection|BillSection)>").unwrap()
});

pub fn repair_statute(text: &str, ids: &dyn IdGenerator) -> String {
    let text = SECTION_TYPO_RE.replace_all(text, "SECTION");
    let text = split_to_read(&text);
    let text = regenerate_ids(&text, ids);
    let text = label_sections(&text, ids);
    close_content_blocks(&text)
}

/// `<html:p>... to read: rest</html:p>` becomes two paragraphs.
pub fn split_to_read(text: &str) -> String {
    PARAGRAPH_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[2];
            match body.find(SPLIT_PHRASE) {
                Some(at) => {
                    let head = &body[..at + SPLIT_PHRASE.len() - 1];
                    let tail = &body[at + SPLIT_PHRASE.len()..];
                    format!("{}{}</html:p><html:p>{}{}", &caps[1], head, tail, &caps[3])
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Existing ids are frequently duplicated across elements; replace them all.
pub fn regenerate_ids(text: &str, ids: &dyn IdGenerator) -> String {
    ID_ATTR_RE
        .replace_all(text, |_: &Captures| format!("id=\"{}\"", ids.next_id()))
        .into_owned()
}

pub fn label_sections(text: &str, ids: &dyn IdGenerator) -> String {
    UNLABELED_RE
        .replace_all(text, |caps: &Captures| format!("<caml:{} id=\"{}\">", &caps[1], ids.next_id()))
        .into_owned()
}

/// Every content block is closed before its section closes. Late or stray
/// content ends are dropped so the result nests.
pub fn close_content_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut open = false;
    let mut last = 0;
    for m in CONTENT_TAG_RE.find_iter(text) {
        let tag = m.as_str();
        if tag == "</caml:Content>" {
            if open {
                open = false;
            } else {
                out.push_str(&text[last..m.start()]);
                last = m.end();
            }
        } else if tag.starts_with("</") {
            if open {
                out.push_str(&text[last..m.start()]);
                out.push_str("</caml:Content>");
                last = m.start();
                open = false;
            }
        } else if !tag.ends_with("/>") {
            if open {
                // a new block starts before the previous one closed
                out.push_str(&text[last..m.start()]);
                out.push_str("</caml:Content>");
                last = m.start();
            }
            open = true;
        }
    }
    out.push_str(&text[last..]);
    out
}
