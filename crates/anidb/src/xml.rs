//! Owned XML element tree.
//!
//! AniDB detail payloads are small, so they are read into a tree with
//! quick-xml and decoded by walking it. The bulk title index is streamed
//! instead (see `titles`).

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::AnidbError;
use crate::Result;

/// An element with its attributes, child elements and concatenated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Element::from_start(&e)?),
                Event::Empty(e) => {
                    let element = Element::from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| AnidbError::decode("unbalanced end tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e.unescape().map_err(|e| AnidbError::decode(e.to_string()))?;
                        current.append_text(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.append_text(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(AnidbError::decode("unexpected end of document"));
        }
        root.ok_or_else(|| AnidbError::decode("document has no root element"))
    }

    /// Segments around inline children are joined by one space
    fn append_text(&mut self, segment: &str) {
        if !self.text.is_empty() && !segment.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(segment);
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| AnidbError::decode(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Attribute value by qualified name (`"id"`, `"xml:lang"`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Text of a child element, `None` when the child is absent or empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text).filter(|t| !t.is_empty())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(AnidbError::decode("multiple root elements")),
    }
    Ok(())
}
