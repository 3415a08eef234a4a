//! Shared normalization machinery: the [`Element`] protocol, the
//! [`Normalize`] context and the field readers every element type uses.

use std::fmt;

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::error::{Result, SdfError};
use crate::include::{DocumentParser, UriResolver};
use crate::specific::SpecificElement;
use crate::version::{Capabilities, SdfVersion};

/// Default bound on `<include>` recursion.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// A canonical, version-agnostic node built from a version-specific one.
pub trait Element: Sized {
    /// Tag of the raw element, singular as the schema spells it.
    const TAG: &'static str;

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self>;

    /// Zero value used when a structured sub-element is absent.
    fn zero(cx: &mut Normalize<'_>) -> Result<Self> {
        Self::from_specific(&SpecificElement::new(Self::TAG), cx)
    }
}

/// Non-fatal finding produced while normalizing a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Element kind without normalization logic; a stub was produced.
    Unsupported { element: String, version: SdfVersion },
    /// Legacy spelling that was migrated to its canonical field.
    Deprecated {
        element: &'static str,
        field: &'static str,
        replacement: &'static str,
        version: SdfVersion,
    },
    /// Optional value that could not be parsed; the default was kept.
    InvalidValue {
        element: &'static str,
        field: &'static str,
        value: String,
    },
    /// `<include>` left as a directive because no fetcher was configured.
    UnresolvedInclude { uri: String },
    /// Population distribution without an expansion rule.
    UnsupportedDistribution {
        population: String,
        distribution: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unsupported { element, version } => {
                write!(f, "<{element}> is not supported (SDFormat {version}), kept as a stub")
            }
            Diagnostic::Deprecated {
                element,
                field,
                replacement,
                version,
            } => write!(
                f,
                "<{element}> uses deprecated '{field}' (SDFormat {version}), use '{replacement}'"
            ),
            Diagnostic::InvalidValue {
                element,
                field,
                value,
            } => write!(f, "ignoring invalid {field} '{value}' on <{element}>"),
            Diagnostic::UnresolvedInclude { uri } => {
                write!(f, "include of '{uri}' left unresolved, no fetcher configured")
            }
            Diagnostic::UnsupportedDistribution {
                population,
                distribution,
            } => write!(
                f,
                "population '{population}' uses unsupported distribution '{distribution}'"
            ),
        }
    }
}

/// Placeholder for an element kind without normalization logic.
#[derive(Debug, Clone, PartialEq)]
pub struct Unsupported {
    pub sdf_version: SdfVersion,
    pub tag: String,
}

#[derive(Clone, Copy)]
pub(crate) struct Fetcher<'a> {
    pub(crate) resolver: &'a dyn UriResolver,
    pub(crate) parser: &'a dyn DocumentParser,
}

/// State threaded through one normalization run.
pub struct Normalize<'a> {
    capabilities: Capabilities,
    diagnostics: Vec<Diagnostic>,
    fetcher: Option<Fetcher<'a>>,
    include_depth: usize,
    max_include_depth: usize,
}

impl<'a> Normalize<'a> {
    pub fn new(version: SdfVersion) -> Self {
        Self {
            capabilities: version.capabilities(),
            diagnostics: Vec::new(),
            fetcher: None,
            include_depth: 0,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Enable `<include>` resolution through the given collaborators.
    #[must_use]
    pub fn with_fetcher(
        mut self,
        resolver: &'a dyn UriResolver,
        parser: &'a dyn DocumentParser,
    ) -> Self {
        self.fetcher = Some(Fetcher { resolver, parser });
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn version(&self) -> SdfVersion {
        self.capabilities.version
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn deprecated(
        &mut self,
        element: &'static str,
        field: &'static str,
        replacement: &'static str,
    ) {
        let diagnostic = Diagnostic::Deprecated {
            element,
            field,
            replacement,
            version: self.version(),
        };
        // once per run
        if !self.diagnostics.contains(&diagnostic) {
            self.report(diagnostic);
        }
    }

    /// Stub for a node kind that has no normalization logic.
    pub(crate) fn unsupported(&mut self, node: &SpecificElement) -> Unsupported {
        let version = self.version();
        self.report(Diagnostic::Unsupported {
            element: node.tag.clone(),
            version,
        });
        Unsupported {
            sdf_version: version,
            tag: node.tag.clone(),
        }
    }

    pub(crate) fn fetcher(&self) -> Option<Fetcher<'a>> {
        self.fetcher
    }

    /// Run `f` for a fetched document of `version`, one include level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        uri: &str,
        version: SdfVersion,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.include_depth >= self.max_include_depth {
            return Err(SdfError::IncludeDepth {
                uri: uri.to_string(),
                depth: self.max_include_depth,
            });
        }
        debug!(uri, %version, depth = self.include_depth + 1, "normalizing included document");
        let saved = std::mem::replace(&mut self.capabilities, version.capabilities());
        self.include_depth += 1;
        let out = f(self);
        self.include_depth -= 1;
        self.capabilities = saved;
        out
    }
}

/// Scalar that can be read from an attribute or a leaf element's text.
pub trait FromSdf: Sized {
    fn from_sdf(text: &str) -> Option<Self>;
}

impl FromSdf for bool {
    fn from_sdf(text: &str) -> Option<Self> {
        match text {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl FromSdf for f64 {
    fn from_sdf(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl FromSdf for u32 {
    fn from_sdf(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl FromSdf for String {
    fn from_sdf(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FromSdf for Vector3<f64> {
    fn from_sdf(text: &str) -> Option<Self> {
        floats::<3>(text).map(Vector3::from)
    }
}

impl FromSdf for [f64; 4] {
    fn from_sdf(text: &str) -> Option<Self> {
        floats::<4>(text)
    }
}

/// Exactly `N` whitespace-separated floats.
pub(crate) fn floats<const N: usize>(text: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split_whitespace();
    for slot in out.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    parts.next().is_none().then_some(out)
}

/// Field reader over one raw node.
pub(crate) struct Fields<'n> {
    node: &'n SpecificElement,
    element: &'static str,
}

impl<'n> Fields<'n> {
    pub(crate) fn new(node: &'n SpecificElement, element: &'static str) -> Self {
        Self { node, element }
    }

    /// Optional scalar. Absent or sentinel reads as `None`; unparseable
    /// values are reported and also read as `None`.
    pub(crate) fn value<T: FromSdf>(&self, cx: &mut Normalize<'_>, name: &'static str) -> Option<T> {
        let raw = self.node.field(name)?;
        let parsed = T::from_sdf(raw);
        if parsed.is_none() {
            cx.report(Diagnostic::InvalidValue {
                element: self.element,
                field: name,
                value: raw.to_string(),
            });
        }
        parsed
    }

    pub(crate) fn value_or<T: FromSdf>(
        &self,
        cx: &mut Normalize<'_>,
        name: &'static str,
        default: T,
    ) -> T {
        self.value(cx, name).unwrap_or(default)
    }

    pub(crate) fn required(&self, name: &'static str) -> Result<String> {
        self.node
            .field(name)
            .map(str::to_string)
            .ok_or(SdfError::MissingField {
                element: self.element,
                field: name,
            })
    }

    /// Structured sub-element; absent reads as the element's zero value.
    pub(crate) fn element<E: Element>(&self, cx: &mut Normalize<'_>, name: &str) -> Result<E> {
        match self.node.child(name) {
            Some(child) => E::from_specific(child, cx),
            None => E::zero(cx),
        }
    }

    pub(crate) fn optional<E: Element>(
        &self,
        cx: &mut Normalize<'_>,
        name: &str,
    ) -> Result<Option<E>> {
        self.node
            .child(name)
            .map(|child| E::from_specific(child, cx))
            .transpose()
    }

    /// Every child spelled `E::TAG`, normalized in document order.
    pub(crate) fn list<E: Element>(&self, cx: &mut Normalize<'_>) -> Result<Vec<E>> {
        self.node
            .children_named(E::TAG)
            .map(|child| E::from_specific(child, cx))
            .collect()
    }

    /// Stub for an optional sub-element this crate does not normalize.
    pub(crate) fn unsupported(&self, cx: &mut Normalize<'_>, name: &str) -> Option<Unsupported> {
        self.node.child(name).map(|child| cx.unsupported(child))
    }

    pub(crate) fn unsupported_list(&self, cx: &mut Normalize<'_>, name: &str) -> Vec<Unsupported> {
        self.node
            .children_named(name)
            .map(|child| cx.unsupported(child))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Limit {
        lower: f64,
        upper: f64,
    }

    impl Element for Limit {
        const TAG: &'static str = "limit";

        fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
            let fields = Fields::new(node, Self::TAG);
            Ok(Self {
                lower: fields.value_or(cx, "lower", -1.0),
                upper: fields.value_or(cx, "upper", 1.0),
            })
        }
    }

    #[test]
    fn deprecations_are_reported_once() {
        let mut cx = Normalize::new(SdfVersion::V1_5);
        cx.deprecated("link", "origin", "pose");
        cx.deprecated("joint", "origin", "pose");
        cx.deprecated("link", "origin", "pose");
        assert_eq!(cx.diagnostics().len(), 2);
    }

    #[test]
    fn absent_sub_element_is_zero_value() {
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let axis = SpecificElement::new("axis");
        let limit: Limit = Fields::new(&axis, "axis").element(&mut cx, "limit").unwrap();
        assert_eq!(limit, Limit { lower: -1.0, upper: 1.0 });
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn sentinel_and_invalid_values_keep_default() {
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let node = SpecificElement::new("limit")
            .with_value("lower", "__default__")
            .with_value("upper", "lots");
        let limit = Limit::from_specific(&node, &mut cx).unwrap();
        assert_eq!(limit, Limit { lower: -1.0, upper: 1.0 });
        assert_eq!(
            cx.diagnostics(),
            &[Diagnostic::InvalidValue {
                element: "limit",
                field: "upper",
                value: "lots".to_string()
            }]
        );
    }

    #[test]
    fn list_maps_every_child() {
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let node = SpecificElement::new("joint")
            .with_child(SpecificElement::new("limit").with_value("lower", "-2"))
            .with_child(SpecificElement::new("other"))
            .with_child(SpecificElement::new("limit").with_value("upper", "3"));
        let limits: Vec<Limit> = Fields::new(&node, "joint").list(&mut cx).unwrap();
        assert_eq!(
            limits,
            vec![
                Limit { lower: -2.0, upper: 1.0 },
                Limit { lower: -1.0, upper: 3.0 }
            ]
        );
        let none: Vec<Limit> = Fields::new(&SpecificElement::new("joint"), "joint")
            .list(&mut cx)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn unsupported_yields_stub_and_diagnostic() {
        let mut cx = Normalize::new(SdfVersion::V1_6);
        let node = SpecificElement::new("link").with_child(SpecificElement::new("projector"));
        let stub = Fields::new(&node, "link").unsupported(&mut cx, "projector").unwrap();
        assert_eq!(stub.tag, "projector");
        assert_eq!(stub.sdf_version, SdfVersion::V1_6);
        assert_eq!(cx.diagnostics().len(), 1);
    }

    #[test]
    fn float_lists() {
        assert_eq!(floats::<3>(" 1 2.5 -3 "), Some([1.0, 2.5, -3.0]));
        assert_eq!(floats::<3>("1 2"), None);
        assert_eq!(floats::<3>("1 2 3 4"), None);
        assert_eq!(floats::<3>("1 b 3"), None);
    }
}
