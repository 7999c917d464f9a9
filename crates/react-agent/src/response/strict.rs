//! Strict XML reader (quick-xml)
//!
//! Rejects anything that is not well-formed: mismatched or unclosed tags,
//! unescaped `&`, unknown entities, text outside the root element.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use super::tree::XmlElement;

/// A document that could not be read as a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed XML at byte {position}: {message}")]
pub struct XmlSyntaxError {
    pub position: u64,
    pub message: String,
}

impl XmlSyntaxError {
    pub fn new(position: u64, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<XmlElement, XmlSyntaxError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| XmlSyntaxError::new(position, e.to_string()))?;

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement::new(name));
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attach(&mut stack, &mut root, XmlElement::new(name), position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlSyntaxError::new(position, "closing tag without opening tag"))?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlSyntaxError::new(position, e.to_string()))?;
                push_text(&mut stack, &text, position)?;
            }
            Event::CData(cdata) => {
                let inner = cdata.into_inner();
                let text = String::from_utf8_lossy(&inner);
                match stack.last_mut() {
                    Some(parent) => parent.push_cdata(&text),
                    None => return Err(XmlSyntaxError::new(position, "CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlSyntaxError::new(
            input.len() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }

    root.ok_or_else(|| XmlSyntaxError::new(0, "document has no root element"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    position: u64,
) -> Result<(), XmlSyntaxError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlSyntaxError::new(
            position,
            format!("second root element <{}>", element.name),
        )),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str, position: u64) -> Result<(), XmlSyntaxError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlSyntaxError::new(position, "text outside the root element")),
    }
}
