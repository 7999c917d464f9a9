//! Error-tolerant reader built on an HTML5 parser (scraper)
//!
//! The HTML tree builder recovers from unbalanced tags, bare `&` and stray
//! markup. Before parsing, every tag is renamed into a custom-element namespace
//! so names such as `input`, `link` or `title` get no special HTML treatment,
//! self-closing tags are expanded, and CDATA sections become escaped text
//! inside a marker element that user tags can never be renamed to.

use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Node};

use super::strict::XmlSyntaxError;
use super::tree::XmlElement;

const TAG_PREFIX: &str = "x-";
const CDATA_TAG: &str = "x--cdata";

static CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)(?:\]\]>|$)").expect("valid cdata regex"));

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([A-Za-z_][A-Za-z0-9_.:\-]*)([^<>]*?)(/?)>").expect("valid tag regex")
});

pub(crate) fn parse(input: &str) -> Result<XmlElement, XmlSyntaxError> {
    let fragment = Html::parse_fragment(&prepare(input));

    let response = fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| local_name(el.value().name()).eq_ignore_ascii_case("response"))
        .ok_or_else(|| XmlSyntaxError::new(0, "no <response> element could be recovered"))?;

    Ok(convert(response))
}

fn prepare(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in CDATA.captures_iter(input) {
        let (Some(section), Some(content)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&rename_tags(&input[last..section.start()]));
        let _ = write!(out, "<{CDATA_TAG}>{}</{CDATA_TAG}>", escape_text(content.as_str()));
        last = section.end();
    }
    out.push_str(&rename_tags(&input[last..]));
    out
}

fn rename_tags(markup: &str) -> String {
    TAG.replace_all(markup, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            format!("</{TAG_PREFIX}{name}>")
        } else if !caps[4].is_empty() {
            format!("<{TAG_PREFIX}{name}></{TAG_PREFIX}{name}>")
        } else {
            format!("<{TAG_PREFIX}{name}>")
        }
    })
    .into_owned()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn local_name(name: &str) -> &str {
    name.strip_prefix(TAG_PREFIX).unwrap_or(name)
}

fn convert(element: ElementRef<'_>) -> XmlElement {
    let mut out = XmlElement::new(local_name(element.value().name()));

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => match ElementRef::wrap(child) {
                Some(el) if el.value().name() == CDATA_TAG => {
                    out.push_cdata(&el.text().collect::<String>())
                }
                Some(el) => out.push_element(convert(el)),
                None => {}
            },
            _ => {}
        }
    }

    out
}
