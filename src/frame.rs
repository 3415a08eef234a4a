//! Explicit `<frame>` elements.

use crate::element::{Element, Fields, Normalize};
use crate::error::{Result, SdfError};
use crate::graph::{attach_rigid, FrameGraph, FrameGraphElement, FrameId, FrameRegistry, Scaffolding};
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

/// A named frame rigidly attached to another frame of its scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub pose: Pose,
    pub attached_to: Option<String>,
}

impl Frame {
    /// Default both the attachment and the pose frame to `scope_frame`.
    pub(crate) fn default_attachment(&mut self, scope_frame: &str) {
        if self.attached_to.is_none() {
            self.attached_to = Some(scope_frame.to_string());
        }
        self.pose.default_relative_to(scope_frame);
    }

    pub(crate) fn wire_static(
        &self,
        key: &str,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
    ) -> Result<FrameId> {
        self.pose.to_static_graph(frames, graph, key)
    }

    pub(crate) fn wire_dynamic(
        &self,
        key: &str,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        let attached_to = self.attached_to.as_deref().ok_or(SdfError::MissingField {
            element: Self::TAG,
            field: "attached_to",
        })?;
        attach_rigid(frames, graph, scaffolding, key, attached_to)?;
        frames.get(key)
    }
}

impl Element for Frame {
    const TAG: &'static str = "frame";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let attached_to = if cx.capabilities().frame_attached_to {
            fields
                .value::<String>(cx, "attached_to")
                .filter(|frame| !frame.is_empty())
        } else {
            None
        };
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            pose: Pose::of(node, Self::TAG, cx)?,
            attached_to,
        })
    }
}

impl FrameGraphElement for Frame {
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry> {
        let mut frames = FrameRegistry::new();
        frames.declare(self.name.as_str(), graph.add_frame(self.name.as_str()))?;
        Ok(frames)
    }

    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        self.wire_static(&self.name, frames, graph)
    }

    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        self.wire_dynamic(&self.name, frames, graph, scaffolding)
    }
}
