//! `<include>` directives and the collaborators that fetch their documents.

use std::fmt;

use tracing::debug;

use crate::element::{Diagnostic, Element, Fields, Normalize};
use crate::error::{Result, SdfError};
use crate::model::Model;
use crate::plugin::Plugin;
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

/// Fetches the document behind an include URI.
pub trait UriResolver {
    /// Document text and its declared SDFormat version string.
    fn resolve_uri(&self, uri: &str) -> Result<(String, String)>;
}

impl<F> UriResolver for F
where
    F: Fn(&str) -> Result<(String, String)>,
{
    fn resolve_uri(&self, uri: &str) -> Result<(String, String)> {
        self(uri)
    }
}

/// Turns a fetched document into its version-specific tree. The returned
/// node is the document's `<sdf>` element.
pub trait DocumentParser {
    fn parse(&self, document: &str, version: SdfVersion) -> Result<SpecificElement>;
}

impl<F> DocumentParser for F
where
    F: Fn(&str, SdfVersion) -> Result<SpecificElement>,
{
    fn parse(&self, document: &str, version: SdfVersion) -> Result<SpecificElement> {
        self(document, version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Model,
    Actor,
    Light,
}

impl FragmentKind {
    pub fn tag(self) -> &'static str {
        match self {
            FragmentKind::Model => "model",
            FragmentKind::Actor => "actor",
            FragmentKind::Light => "light",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Order in which fragment kinds are looked for in a fetched document.
pub const DEFAULT_PRIORITY: &[FragmentKind] =
    &[FragmentKind::Model, FragmentKind::Actor, FragmentKind::Light];

/// Reference to an external model, with the overrides to splice into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub sdf_version: SdfVersion,
    pub uri: String,
    pub name: Option<String>,
    pub static_: Option<bool>,
    pub pose: Option<Pose>,
    pub placement_frame: Option<String>,
    pub plugins: Vec<Plugin>,
}

impl Include {
    /// Normalize the first fragment found in `priority` order and apply the
    /// overrides to it.
    pub fn resolve(&self, cx: &mut Normalize<'_>, priority: &[FragmentKind]) -> Result<Model> {
        let fetcher = cx
            .fetcher()
            .ok_or_else(|| SdfError::fetch(self.uri.as_str(), "no URI resolver configured"))?;
        let (document, version) = fetcher.resolver.resolve_uri(&self.uri)?;
        let version: SdfVersion = version.parse()?;
        let root = fetcher.parser.parse(&document, version)?;
        debug!(uri = %self.uri, %version, "fetched included document");

        let kind = priority
            .iter()
            .copied()
            .find(|kind| root.child(kind.tag()).is_some())
            .ok_or_else(|| SdfError::NoFragments {
                uri: self.uri.clone(),
            })?;
        let node = match (kind, root.child(kind.tag())) {
            (FragmentKind::Model, Some(node)) => node,
            (kind, _) => return Err(SdfError::UnimplementedFragment { kind }),
        };
        let model = cx.nested(&self.uri, version, |cx| Model::from_specific(node, cx))?;
        self.splice(model)
    }

    fn splice(&self, mut model: Model) -> Result<Model> {
        if let Some(name) = &self.name {
            model.name = name.clone();
        }
        if let Some(static_) = self.static_ {
            model.static_ = static_;
        }
        if let Some(pose) = &self.pose {
            model.pose = pose.clone();
        }
        if let Some(placement_frame) = &self.placement_frame {
            model.placement_frame = placement_frame.clone();
        }
        model.plugins.extend(self.plugins.iter().cloned());
        model.canonical_link = model.resolve_canonical_link()?;
        Ok(model)
    }
}

impl Element for Include {
    const TAG: &'static str = "include";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let uri = fields.required("uri")?;
        let pose = node
            .child(Pose::TAG)
            .map(|pose| Pose::from_specific(pose, cx))
            .transpose()?;
        let placement_frame = if cx.capabilities().placement_frame {
            fields
                .value::<String>(cx, "placement_frame")
                .filter(|frame| !frame.is_empty())
        } else {
            None
        };
        if placement_frame.is_some() && pose.is_none() {
            return Err(SdfError::PlacementWithoutPose { uri });
        }
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.value(cx, "name"),
            static_: fields.value(cx, "static"),
            pose,
            placement_frame,
            plugins: fields.list(cx)?,
            uri,
        })
    }
}

pub(crate) fn resolve_includes(
    includes: Vec<Include>,
    cx: &mut Normalize<'_>,
) -> Result<(Vec<Model>, Vec<Include>)> {
    if cx.fetcher().is_none() {
        for include in &includes {
            cx.report(Diagnostic::UnresolvedInclude {
                uri: include.uri.clone(),
            });
        }
        return Ok((Vec::new(), includes));
    }
    let models = includes
        .iter()
        .map(|include| include.resolve(cx, DEFAULT_PRIORITY))
        .collect::<Result<Vec<_>>>()?;
    Ok((models, Vec::new()))
}
