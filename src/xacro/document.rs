//! XacroDocument - an XML document with the nodes that precede its root
//! element (processing instructions, comments) kept for output.

use crate::error::XacroError;
use std::io::Write;
use xmltree::{Element, XMLNode};

/// A complete document: preamble plus root element.
///
/// DOCTYPE declarations are not preserved; xmltree discards them.
#[derive(Debug, Clone, PartialEq)]
pub struct XacroDocument {
    /// Nodes that appear before the root element, in order
    pub preamble: Vec<XMLNode>,

    pub root: Element,
}

impl XacroDocument {
    /// Parse a document, splitting off everything before the root element.
    ///
    /// # Errors
    ///
    /// Returns [`XacroError::Xml`] for malformed XML and
    /// [`XacroError::InvalidXml`] when there is no root or more than one.
    pub fn parse<R: std::io::Read>(reader: R) -> Result<Self, XacroError> {
        let mut preamble = Vec::new();
        let mut root = None;

        for node in Element::parse_all(reader)? {
            match node {
                XMLNode::Element(elem) => {
                    if root.is_some() {
                        return Err(XacroError::InvalidXml(
                            "Document has multiple root elements".into(),
                        ));
                    }
                    root = Some(elem);
                }
                node if root.is_none() => preamble.push(node),
                XMLNode::Text(text) if text.trim().is_empty() => {}
                node => log::warn!("Discarding node after root element: {:?}", node),
            }
        }

        let root =
            root.ok_or_else(|| XacroError::InvalidXml("Document has no root element".into()))?;

        Ok(XacroDocument { preamble, root })
    }

    pub fn from_root(root: Element) -> Self {
        XacroDocument {
            preamble: Vec::new(),
            root,
        }
    }

    /// Write the document pretty-printed with two-space indentation.
    ///
    /// Output starts with `<?xml version="1.0" ?>`, followed by the preamble
    /// and the root element.
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
    ) -> Result<(), XacroError> {
        writeln!(writer, "<?xml version=\"1.0\" ?>")?;

        for node in &self.preamble {
            match node {
                XMLNode::ProcessingInstruction(target, data) => {
                    if target.eq_ignore_ascii_case("xml") {
                        return Err(XacroError::InvalidXml(
                            "Processing instruction target cannot be 'xml' (reserved)".into(),
                        ));
                    }
                    match data.as_ref().filter(|d| !d.is_empty()) {
                        Some(d) => writeln!(writer, "<?{} {}?>", target, d)?,
                        None => writeln!(writer, "<?{}?>", target)?,
                    }
                }
                XMLNode::Comment(comment) => {
                    if comment.contains("--") || comment.ends_with('-') {
                        return Err(XacroError::InvalidXml(
                            "Comments cannot contain '--' or end with '-'".into(),
                        ));
                    }
                    writeln!(writer, "<!--{}-->", comment)?;
                }
                XMLNode::Text(text) if text.trim().is_empty() => {}
                other => {
                    return Err(XacroError::InvalidXml(format!(
                        "Unexpected node before root element: {:?}",
                        other
                    )));
                }
            }
        }

        self.root.write_with_config(
            &mut *writer,
            xmltree::EmitterConfig::new()
                .perform_indent(true)
                .write_document_declaration(false)
                .indent_string("  ")
                .pad_self_closing(false),
        )?;
        writeln!(writer)?;

        Ok(())
    }

    /// Serialize to a string (see [`XacroDocument::write`]).
    pub fn to_xml_string(&self) -> Result<String, XacroError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
