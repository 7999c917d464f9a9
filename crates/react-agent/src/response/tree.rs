//! Element tree shared by the strict and lenient readers

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// Character data from a CDATA section, kept exactly as written
    CData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append text, merging with a preceding text node
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Append CDATA content, merging with a preceding CDATA node
    pub fn push_cdata(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(XmlNode::CData(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::CData(text.to_string()));
        }
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.is(n))
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First direct child matching any of `names`
    pub fn child(&self, names: &[&str]) -> Option<&XmlElement> {
        self.elements().find(|el| el.is_any(names))
    }

    /// First descendant (pre-order) matching any of `names`
    pub fn descendant(&self, names: &[&str]) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.is_any(names) {
                return Some(el);
            }
            if let Some(found) = el.descendant(names) {
                return Some(found);
            }
        }
        None
    }

    /// All text below this element, without surrounding formatting whitespace
    pub fn text(&self) -> String {
        self.text_excluding(&[])
    }

    /// Text below this element, skipping subtrees named in `skip`
    ///
    /// Whitespace at the edges of plain text is indentation and gets trimmed.
    /// CDATA content is kept verbatim, edges included.
    pub fn text_excluding(&self, skip: &[&str]) -> String {
        let mut segments = Vec::new();
        self.collect_text(skip, &mut segments);

        let start = segments.iter().position(|s| !is_indentation(s)).unwrap_or(segments.len());
        let end = segments.iter().rposition(|s| !is_indentation(s)).map_or(start, |i| i + 1);
        let kept = &segments[start..end];
        let last = kept.len().saturating_sub(1);

        let mut out = String::new();
        for (i, &(text, verbatim)) in kept.iter().enumerate() {
            let mut text = text;
            if !verbatim && i == 0 {
                text = text.trim_start();
            }
            if !verbatim && i == last {
                text = text.trim_end();
            }
            out.push_str(text);
        }
        out
    }

    fn collect_text<'a>(&'a self, skip: &[&str], out: &mut Vec<(&'a str, bool)>) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push((text.as_str(), false)),
                XmlNode::CData(text) => out.push((text.as_str(), true)),
                XmlNode::Element(el) if !el.is_any(skip) => el.collect_text(skip, out),
                XmlNode::Element(_) => {}
            }
        }
    }
}

fn is_indentation(&(text, verbatim): &(&str, bool)) -> bool {
    !verbatim && text.trim().is_empty()
}
