use crate::element::{Element, Fields, Normalize};
use crate::error::Result;
use crate::specific::SpecificElement;

/// Simulator plugin. The body is opaque to this crate and kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub filename: String,
    pub body: Vec<SpecificElement>,
}

impl Element for Plugin {
    const TAG: &'static str = "plugin";

    fn from_specific(node: &SpecificElement, _cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            name: fields.required("name")?,
            filename: fields.required("filename")?,
            body: node.children.clone(),
        })
    }
}
