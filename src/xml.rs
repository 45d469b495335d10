//! Lossless element tree for WordprocessingML parts.
//!
//! Parts are parsed with quick-xml into a plain tree that keeps qualified
//! names, attribute order, whitespace text and comments, and can be written
//! back byte-stable. Element matching is done on local names so templates
//! produced with unusual namespace prefixes still resolve.

use std::fmt::Write as _;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// A node inside an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Child element
    Element(Element),
    /// Character data (unescaped)
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content
    Comment(String),
    /// Processing instruction content
    Instruction(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name, e.g. `w:p`
    pub name: String,
    /// Attributes in document order (qualified name, unescaped value)
    pub attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<Node>,
}

/// Strip the namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: add a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: add a text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Local part of the element name.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether the element has the given local name.
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value looked up by local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| local_name(name) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing one with the same qualified name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local))
    }

    /// First child element with the given local name, mutably.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// All child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.is(local))
    }

    /// `w:val`-style attribute of the named child, e.g. `pStyle/@val`.
    pub fn child_val(&self, local: &str) -> Option<&str> {
        self.child(local).and_then(|c| c.attr("val"))
    }

    /// Whether any descendant (or self) has the given local name.
    pub fn contains(&self, local: &str) -> bool {
        self.is(local) || self.elements().any(|e| e.contains(local))
    }

    /// Remove every child element with the given local name.
    pub fn remove_children(&mut self, local: &str) {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.is(local)));
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize the element (without XML declaration).
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Element(e) => collect_text(e, out),
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            _ => {}
        }
    }
}

/// A parsed XML part: optional declaration, prolog nodes and the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Declaration content without the `<?` `?>` delimiters
    pub declaration: Option<String>,
    /// Comments and instructions before the root element
    pub prolog: Vec<Node>,
    /// Root element
    pub root: Element,
}

impl XmlDocument {
    /// Parse an XML part.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(strip_bom(data))
            .map_err(|e| Error::TemplateInvalid(format!("XML is not UTF-8: {}", e)))?;
        let mut reader = Reader::from_str(text);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::TemplateInvalid(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Decl(decl) => {
                    declaration = Some(String::from_utf8_lossy(&decl).into_owned());
                }
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::TemplateInvalid("XML has an unmatched end tag".into())
                    })?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::Text(t) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = t.unescape()?;
                        parent.children.push(Node::Text(value.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&c).into_owned();
                        parent.children.push(Node::CData(value));
                    }
                }
                Event::Comment(c) => {
                    let node = Node::Comment(String::from_utf8_lossy(&c).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None if root.is_none() => prolog.push(node),
                        None => {}
                    }
                }
                Event::PI(pi) => {
                    let node = Node::Instruction(String::from_utf8_lossy(&pi).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None if root.is_none() => prolog.push(node),
                        None => {}
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(Error::TemplateInvalid(format!(
                "XML ended inside <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or("?")
            )));
        }

        let root = root.ok_or_else(|| Error::TemplateInvalid("XML has no root element".into()))?;
        Ok(Self {
            declaration,
            prolog,
            root,
        })
    }

    /// Serialize the document.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            let _ = write!(out, "<?{}?>\r\n", decl);
        }
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        write_element(&self.root, &mut out);
        out
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(data)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::TemplateInvalid(format!("XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => match node {
            Node::Element(element) if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            Node::Element(_) => Err(Error::TemplateInvalid(
                "XML has more than one root element".into(),
            )),
            _ => Ok(()),
        },
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", name, escape(value.as_str()));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for node in &element.children {
        write_node(node, out);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => write_element(e, out),
        Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
        Node::CData(c) => {
            let _ = write!(out, "<![CDATA[{}]]>", c);
        }
        Node::Comment(c) => {
            let _ = write!(out, "<!--{}-->", c);
        }
        Node::Instruction(pi) => {
            let _ = write!(out, "<?{}?>", pi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t xml:space="preserve">Fish &amp; Chips </w:t></w:r></w:p><!-- note --><w:sectPr/></w:body></w:document>"#;

    #[test]
    fn test_parse_and_navigate() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert!(doc.root.is("document"));
        let body = doc.root.child("body").unwrap();
        let p = body.child("p").unwrap();
        assert_eq!(p.child("pPr").unwrap().child_val("pStyle"), Some("Heading1"));
        assert_eq!(p.text(), "Fish & Chips ");
        assert!(body.child("sectPr").is_some());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let first = doc.to_xml();
        let again = XmlDocument::parse(first.as_bytes()).unwrap();
        assert_eq!(doc, again);
        assert_eq!(first, again.to_xml());
        assert!(first.contains("Fish &amp; Chips"));
        assert!(first.contains("<!-- note -->"));
    }

    #[test]
    fn test_attribute_escaping() {
        let e = Element::new("w:t").with_attr("w:val", "a\"b<c");
        assert_eq!(e.to_xml(), "<w:t w:val=\"a&quot;b&lt;c\"/>");
    }

    #[test]
    fn test_remove_children_and_contains() {
        let mut p = Element::new("w:p")
            .with_child(Element::new("w:pPr").with_child(Element::new("w:jc")))
            .with_child(Element::new("w:r"));
        assert!(p.contains("jc"));
        p.remove_children("pPr");
        assert!(!p.contains("jc"));
        assert_eq!(p.elements().count(), 1);
    }

    #[test]
    fn test_malformed_xml_is_template_invalid() {
        let result = XmlDocument::parse(b"<w:document><w:body></w:document>");
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));

        let result = XmlDocument::parse(b"");
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("w:pStyle"), "pStyle");
        assert_eq!(local_name("body"), "body");
    }
}
