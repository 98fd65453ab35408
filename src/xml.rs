//! Minimal owned element tree over quick-xml events. Everything that is
//! not an element is kept as the original event so serialization
//! reproduces the input apart from the edits made through [`Element`].

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("malformed markup: {0}")]
    Syntax(String),
    #[error("malformed markup: end tag </{0}> without a matching start tag")]
    UnexpectedEnd(String),
    #[error("malformed markup: <{0}> is never closed")]
    Unclosed(String),
    #[error("malformed markup: no root element")]
    NoRoot,
    #[error("malformed markup: more than one root element")]
    MultipleRoots,
    #[error("failed to serialize markup: {0}")]
    Write(String),
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    empty: bool,
    pub children: Vec<Node>,
}

impl Element {
    fn new(start: BytesStart<'static>, empty: bool) -> Self {
        Element { start, empty, children: Vec::new() }
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> String {
        String::from_utf8_lossy(self.start.local_name().as_ref()).into_owned()
    }

    /// Indices of element children whose local name is one of `names`.
    pub fn child_positions(&self, names: &[&str]) -> Vec<usize> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Node::Element(e) if names.iter().any(|name| e.local_name() == *name) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index) {
            Some(Node::Element(e)) => Some(e),
            _ => None,
        }
    }

    /// Replace all children with a single text node. Only `<`, `>` and `&`
    /// are escaped, so apostrophes in names stay literal.
    pub fn set_text(&mut self, value: &str) {
        let text = BytesText::from_escaped(partial_escape(value)).into_owned();
        self.children = vec![Node::Other(Event::Text(text))];
        self.empty = false;
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        if self.empty && self.children.is_empty() {
            return writer.write_event(Event::Empty(self.start.borrow())).map_err(write_error);
        }
        writer.write_event(Event::Start(self.start.borrow())).map_err(write_error)?;
        for child in &self.children {
            write_node(child, writer)?;
        }
        writer.write_event(Event::End(self.start.to_end())).map_err(write_error)
    }
}

fn write_node(node: &Node, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
    match node {
        Node::Element(e) => e.write(writer),
        Node::Other(ev) => writer.write_event(ev.borrow()).map_err(write_error),
    }
}

fn write_error<E: std::fmt::Display>(e: E) -> XmlError {
    XmlError::Write(e.to_string())
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse `text`, failing on any nesting or syntax problem.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();

        fn attach(stack: &mut [Element], nodes: &mut Vec<Node>, node: Node) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Syntax(e.to_string()))?;
            match event {
                Event::Start(s) => {
                    check_attributes(&s)?;
                    stack.push(Element::new(s.into_owned(), false));
                }
                Event::Empty(s) => {
                    check_attributes(&s)?;
                    attach(&mut stack, &mut nodes, Node::Element(Element::new(s.into_owned(), true)));
                }
                Event::End(e) => {
                    let done = stack
                        .pop()
                        .ok_or_else(|| XmlError::UnexpectedEnd(String::from_utf8_lossy(e.name().as_ref()).into_owned()))?;
                    attach(&mut stack, &mut nodes, Node::Element(done));
                }
                Event::Eof => break,
                other => attach(&mut stack, &mut nodes, Node::Other(other.into_owned())),
            }
        }
        if let Some(open) = stack.last() {
            return Err(XmlError::Unclosed(open.local_name()));
        }
        let roots = nodes.iter().filter(|n| matches!(n, Node::Element(_))).count();
        match roots {
            0 => Err(XmlError::NoRoot),
            1 => Ok(Document { nodes }),
            _ => Err(XmlError::MultipleRoots),
        }
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(node, &mut writer)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
    }
}

fn check_attributes(start: &BytesStart<'_>) -> Result<(), XmlError> {
    for attr in start.attributes() {
        attr.map_err(|e| XmlError::Syntax(e.to_string()))?;
    }
    Ok(())
}
