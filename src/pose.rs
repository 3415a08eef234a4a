//! Position + orientation value with an optional reference frame.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use tracing::debug;

use crate::element::{floats, Diagnostic, Element, Normalize};
use crate::error::{Result, SdfError};
use crate::graph::{FrameEdge, FrameGraph, FrameId, FrameRegistry};
use crate::specific::SpecificElement;
use crate::transform::Transform;

/// `x y z roll pitch yaw`, expressed in `relative_to` (or in whatever the
/// owning element decides when that is `None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub value: [f64; 6],
    pub relative_to: Option<String>,
}

impl Pose {
    pub fn new(value: [f64; 6], relative_to: Option<String>) -> Self {
        Self {
            value,
            relative_to: relative_to.filter(|frame| !frame.is_empty()),
        }
    }

    #[must_use]
    pub fn with_relative_to(mut self, frame: impl Into<String>) -> Self {
        let frame = frame.into();
        self.relative_to = (!frame.is_empty()).then_some(frame);
        self
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.value[0], self.value[1], self.value[2])
    }

    /// Child frame expressed in parent frame: rotate (extrinsic roll, pitch,
    /// yaw about x, y, z) then translate.
    pub fn to_tf_link(&self) -> Transform {
        let [x, y, z, roll, pitch, yaw] = self.value;
        Transform::from_isometry(Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        ))
    }

    pub fn from_transform(transform: &Transform, relative_to: Option<String>) -> Self {
        let t = transform.translation_part();
        let (roll, pitch, yaw) = transform.rotation_part().euler_angles();
        Self::new([t.x, t.y, t.z, roll, pitch, yaw], relative_to)
    }

    /// Back-fill the frame this pose is expressed in, keeping an explicit one.
    pub(crate) fn default_relative_to(&mut self, frame: &str) {
        if self.relative_to.is_none() {
            self.relative_to = Some(frame.to_string());
        }
    }

    /// Pose of a container element, wherever this version spells it.
    pub(crate) fn of(
        node: &SpecificElement,
        element: &'static str,
        cx: &mut Normalize<'_>,
    ) -> Result<Pose> {
        if cx.capabilities().pose_in_origin {
            let Some(origin) = node.child("origin") else {
                return Ok(Pose::default());
            };
            cx.deprecated(element, "origin", "pose");
            return Ok(match origin.attribute("pose") {
                Some(text) => Pose::new(parse_value(text, cx), None),
                None => Pose::default(),
            });
        }
        match node.child(Self::TAG) {
            Some(pose) => Pose::from_specific(pose, cx),
            None => Ok(Pose::default()),
        }
    }

    /// Wire `child` to `relative_to` with this pose as the edge.
    pub fn to_static_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        child: &str,
    ) -> Result<FrameId> {
        let parent = self.relative_to.as_deref().ok_or(SdfError::MissingField {
            element: "pose",
            field: "relative_to",
        })?;
        let child_id = frames.get(child)?;
        let parent_id = frames.get(parent)?;
        debug!(child, parent, "wiring static pose");
        graph.attach(child_id, parent_id, FrameEdge::Rigid(self.to_tf_link()))?;
        Ok(child_id)
    }
}

fn parse_value(text: &str, cx: &mut Normalize<'_>) -> [f64; 6] {
    floats::<6>(text).unwrap_or_else(|| {
        cx.report(Diagnostic::InvalidValue {
            element: "pose",
            field: "value",
            value: text.to_string(),
        });
        [0.0; 6]
    })
}

impl Element for Pose {
    const TAG: &'static str = "pose";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let value = match node.text() {
            Some(text) => parse_value(text, cx),
            None => [0.0; 6],
        };
        let relative_to = match cx.capabilities().pose_frame_attribute {
            Some(attribute) => {
                let frame = node.attribute(attribute).map(str::to_string);
                if attribute == "frame" && frame.is_some() {
                    cx.deprecated("pose", "frame", "relative_to");
                }
                frame
            }
            None => None,
        };
        Ok(Pose::new(value, relative_to))
    }
}
