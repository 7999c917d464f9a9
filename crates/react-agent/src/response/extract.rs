//! Locate the XML payload inside free-form model output

use once_cell::sync::Lazy;
use regex::Regex;

static XML_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```xml\s*(.*?)\s*```").expect("valid fence regex"));

static RESPONSE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<response\b.*?</response\s*>").expect("valid response regex"));

/// Extract the XML payload from model output.
///
/// Prefers the first ```` ```xml ```` fenced block; otherwise the first
/// `<response>...</response>` span. Returns `None` when neither exists.
pub fn extract_xml(content: &str) -> Option<&str> {
    if let Some(inner) = XML_FENCE.captures(content).and_then(|caps| caps.get(1)) {
        if !inner.as_str().trim().is_empty() {
            return Some(inner.as_str());
        }
    }

    RESPONSE_ELEMENT.find(content).map(|m| m.as_str())
}
