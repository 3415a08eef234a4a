//! Version-specific document tree handed over by the schema parser.
//!
//! The crate never reads XML itself: a per-version parser produces this tree
//! and `from_specific` consumes it.

use hashbrown::HashMap;

/// Value the schema uses for "present but unset".
pub const DEFAULT_SENTINEL: &str = "__default__";

/// One node of a parsed, version-specific SDFormat document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecificElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<SpecificElement>,
}

impl SpecificElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SpecificElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append a leaf child holding only text, e.g. `<static>true</static>`.
    #[must_use]
    pub fn with_value(self, tag: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_child(SpecificElement::new(tag).with_text(text))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&SpecificElement> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a SpecificElement> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Trimmed text content, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Value of a field spelled either as an attribute or as a leaf child.
    /// The unset sentinel reads as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .or_else(|| self.child(name).and_then(SpecificElement::text))
            .filter(|v| *v != DEFAULT_SENTINEL)
    }
}
