//! Minimal element tree shared by the strict and tag-soup parse stages.

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Name as written, including any prefix.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Case-insensitive local name comparison. The tag-soup stage lowercases
    /// names, so this is how every lookup is done.
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Attribute value by local name, ignoring prefixes (`l:href`,
    /// `xlink:href` and `href` all match `"href"`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| local_name(key).eq_ignore_ascii_case(name) && !is_xmlns(key))
            .map(|(_, value)| value.as_str())
    }

    /// Non-blank attribute value, trimmed.
    pub fn attr_trimmed(&self, name: &str) -> Option<String> {
        self.attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Namespace declarations (`xmlns` and `xmlns:*`) on this element.
    pub fn namespaces(&self) -> Vec<(String, String)> {
        self.attrs
            .iter()
            .filter(|(key, _)| is_xmlns(key))
            .map(|(key, value)| {
                let prefix = key.strip_prefix("xmlns").unwrap_or_default();
                (prefix.trim_start_matches(':').to_string(), value.clone())
            })
            .collect()
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.is(name))
    }

    /// Concatenated descendant text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Descendant text with whitespace runs collapsed; `None` when blank.
    pub fn text_trimmed(&self) -> Option<String> {
        let text = collapse_whitespace(&self.text());
        (!text.is_empty()).then_some(text)
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }
}

pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn is_xmlns(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

/// Collapse every whitespace run to one space and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deepest element nesting either parser will build.
pub(crate) const MAX_DEPTH: usize = 256;

/// Incremental tree construction driven by either parser.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    stack: Vec<XmlElement>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    /// Open a child of the innermost element. Fails past [`MAX_DEPTH`].
    pub fn open(&mut self, name: String, attrs: Vec<(String, String)>) -> Result<(), String> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(format!("<{name}> nested deeper than {MAX_DEPTH} elements"));
        }
        self.push(name, attrs);
        Ok(())
    }

    /// Like [`open`](Self::open), but at [`MAX_DEPTH`] the innermost element
    /// is closed first so the new one becomes its sibling.
    pub fn open_bounded(&mut self, name: String, attrs: Vec<(String, String)>) {
        if self.stack.len() >= MAX_DEPTH {
            self.close();
        }
        self.push(name, attrs);
    }

    fn push(&mut self, name: String, attrs: Vec<(String, String)>) {
        self.stack.push(XmlElement {
            name,
            attrs,
            children: Vec::new(),
        });
    }

    /// Close the innermost open element. Returns false if none is open.
    pub fn close(&mut self) -> bool {
        let Some(element) = self.stack.pop() else {
            return false;
        };
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(XmlNode::Element(element)),
            None => {
                if self.root.is_none() {
                    self.root = Some(element);
                }
            }
        }
        true
    }

    /// Close the nearest open element called `name`, implicitly closing
    /// anything opened inside it. Unmatched end tags are ignored.
    pub fn close_named(&mut self, name: &str) -> bool {
        let Some(pos) = self.stack.iter().rposition(|el| el.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };
        while self.stack.len() > pos {
            self.close();
        }
        true
    }

    /// Append text to the innermost open element. Text outside the root is
    /// dropped.
    pub fn text(&mut self, text: &str) {
        let Some(current) = self.stack.last_mut() else {
            return;
        };
        if let Some(XmlNode::Text(last)) = current.children.last_mut() {
            last.push_str(text);
        } else {
            current.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Root element if the document was balanced.
    pub fn finish_balanced(self) -> Result<XmlElement, String> {
        if let Some(open) = self.stack.last() {
            return Err(format!("unclosed element <{}>", open.name));
        }
        self.root.ok_or_else(|| "no root element".to_string())
    }

    /// Root element, closing anything still open.
    pub fn finish_lenient(mut self) -> Option<XmlElement> {
        while self.close() {}
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_ignores_prefix() {
        let mut el = XmlElement::new("image");
        el.attrs.push(("xmlns:l".into(), "http://www.w3.org/1999/xlink".into()));
        el.attrs.push(("l:href".into(), "#cover.jpg".into()));
        assert_eq!(el.attr("href"), Some("#cover.jpg"));
        assert_eq!(el.attr("l"), None);
        assert_eq!(
            el.namespaces(),
            vec![("l".to_string(), "http://www.w3.org/1999/xlink".to_string())]
        );
    }

    #[test]
    fn test_builder_merges_adjacent_text() {
        let mut builder = TreeBuilder::default();
        builder.open("p".into(), Vec::new()).unwrap();
        builder.text("a");
        builder.text("b");
        builder.close();
        let root = builder.finish_balanced().unwrap();
        assert_eq!(root.children, vec![XmlNode::Text("ab".into())]);
    }

    #[test]
    fn test_close_named_closes_inner_elements() {
        let mut builder = TreeBuilder::default();
        builder.open("section".into(), Vec::new()).unwrap();
        builder.open("p".into(), Vec::new()).unwrap();
        builder.text("one");
        builder.open("strong".into(), Vec::new()).unwrap();
        assert!(!builder.close_named("body"));
        assert!(builder.close_named("SECTION"));
        let root = builder.finish_lenient().unwrap();
        assert_eq!(root.name, "section");
        assert_eq!(root.text(), "one");
        assert_eq!(root.child("p").unwrap().elements().count(), 1);
    }

    #[test]
    fn test_unbalanced_is_reported() {
        let mut builder = TreeBuilder::default();
        builder.open("a".into(), Vec::new()).unwrap();
        assert!(builder.finish_balanced().is_err());
    }

    #[test]
    fn test_depth_cap() {
        let mut strict = TreeBuilder::default();
        for _ in 0..MAX_DEPTH {
            strict.open("p".into(), Vec::new()).unwrap();
        }
        assert!(strict.open("p".into(), Vec::new()).is_err());
        assert_eq!(strict.depth(), MAX_DEPTH);

        let mut lenient = TreeBuilder::default();
        for _ in 0..MAX_DEPTH + 10 {
            lenient.open_bounded("p".into(), Vec::new());
        }
        assert_eq!(lenient.depth(), MAX_DEPTH);
        assert!(lenient.finish_lenient().is_some());
    }

    #[test]
    fn test_text_trimmed_collapses_whitespace() {
        let mut el = XmlElement::new("p");
        el.children.push(XmlNode::Text("  Hello \n\t  world ".into()));
        assert_eq!(el.text_trimmed().as_deref(), Some("Hello world"));
        assert_eq!(XmlElement::new("p").text_trimmed(), None);
    }
}
