//! Joints: normalization, staging frames and parametric dynamic edges.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use tracing::debug;

use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::{Result, SdfError};
use crate::frame::Frame;
use crate::graph::{FrameEdge, FrameGraph, FrameGraphElement, FrameId, FrameRegistry, Scaffolding};
use crate::pose::Pose;
use crate::sensor::Sensor;
use crate::specific::SpecificElement;
use crate::transform::{JointTransform, Transform};
use crate::version::SdfVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    Continuous,
    Revolute,
    Gearbox,
    Revolute2,
    Prismatic,
    Ball,
    Screw,
    Universal,
    Fixed,
    Hinge,
}

impl JointType {
    pub fn as_str(self) -> &'static str {
        match self {
            JointType::Continuous => "continuous",
            JointType::Revolute => "revolute",
            JointType::Gearbox => "gearbox",
            JointType::Revolute2 => "revolute2",
            JointType::Prismatic => "prismatic",
            JointType::Ball => "ball",
            JointType::Screw => "screw",
            JointType::Universal => "universal",
            JointType::Fixed => "fixed",
            JointType::Hinge => "hinge",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "continuous" => JointType::Continuous,
            "revolute" => JointType::Revolute,
            "gearbox" => JointType::Gearbox,
            "revolute2" => JointType::Revolute2,
            "prismatic" => JointType::Prismatic,
            "ball" => JointType::Ball,
            "screw" => JointType::Screw,
            "universal" => JointType::Universal,
            "fixed" => JointType::Fixed,
            "hinge" => JointType::Hinge,
            other => {
                return Err(SdfError::invalid_value(
                    "joint",
                    "type",
                    format!("unknown joint type '{other}'"),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointLimit {
    pub lower: f64,
    pub upper: f64,
    pub effort: f64,
    pub velocity: f64,
    pub stiffness: f64,
    pub dissipation: f64,
}

impl Element for JointLimit {
    const TAG: &'static str = "limit";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            lower: fields.value_or(cx, "lower", -1e16),
            upper: fields.value_or(cx, "upper", 1e16),
            effort: fields.value_or(cx, "effort", -1.0),
            velocity: fields.value_or(cx, "velocity", -1.0),
            stiffness: fields.value_or(cx, "stiffness", 1e8),
            dissipation: fields.value_or(cx, "dissipation", 1.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointDynamics {
    pub damping: f64,
    pub friction: f64,
    pub spring_reference: f64,
    pub spring_stiffness: f64,
}

impl Element for JointDynamics {
    const TAG: &'static str = "dynamics";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            damping: fields.value_or(cx, "damping", 0.0),
            friction: fields.value_or(cx, "friction", 0.0),
            spring_reference: fields.value_or(cx, "spring_reference", 0.0),
            spring_stiffness: fields.value_or(cx, "spring_stiffness", 0.0),
        })
    }
}

/// Motion axis. After [`Joint`] normalization `expressed_in` always names a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointAxis {
    pub xyz: Vector3<f64>,
    pub expressed_in: String,
    /// Legacy flag, kept to record that the document used it.
    pub use_parent_model_frame: bool,
    pub initial_position: Option<f64>,
    pub limit: JointLimit,
    pub dynamics: JointDynamics,
}

impl Element for JointAxis {
    const TAG: &'static str = "axis";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let expressed_in = match node.child("xyz") {
            Some(xyz) if cx.capabilities().axis_expressed_in => {
                xyz.attribute("expressed_in").unwrap_or_default().to_string()
            }
            _ => String::new(),
        };
        let use_parent_model_frame = cx.capabilities().axis_use_parent_model_frame
            && fields.value_or(cx, "use_parent_model_frame", false);
        if use_parent_model_frame {
            cx.deprecated("axis", "use_parent_model_frame", "xyz expressed_in");
        }
        Ok(Self {
            xyz: fields.value_or(cx, "xyz", Vector3::z()),
            expressed_in,
            use_parent_model_frame,
            initial_position: fields.value(cx, "initial_position"),
            limit: fields.element(cx, JointLimit::TAG)?,
            dynamics: fields.element(cx, JointDynamics::TAG)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub pose: Pose,
    pub axis: JointAxis,
    pub axis2: JointAxis,
    pub gearbox_ratio: f64,
    pub gearbox_reference_body: Option<String>,
    pub thread_pitch: f64,
    pub physics: Option<Unsupported>,
    pub sensors: Vec<Sensor>,
    /// Deprecated joint-scoped frames, declared as `joint::frame`.
    pub frames: Vec<Frame>,
}

impl Joint {
    pub fn parent_staging_frame(&self) -> String {
        format!("{}_parent", self.name)
    }

    pub fn child_staging_frame(&self) -> String {
        format!("{}_child", self.name)
    }

    fn scoped(&self, name: &str) -> String {
        format!("{}::{name}", self.name)
    }

    /// Edge between the child and parent staging frames.
    fn motion_edge(&self, scaffolding: &Scaffolding<'_>) -> Result<FrameEdge> {
        let axis_in_joint = || -> Result<Vector3<f64>> {
            let rotation = scaffolding.offset(&self.axis.expressed_in, &self.name)?;
            Ok(rotation.apply_vector(&self.axis.xyz))
        };
        let limit = &self.axis.limit;
        Ok(match self.joint_type {
            JointType::Revolute => FrameEdge::Joint(JointTransform::revolute(
                axis_in_joint()?,
                self.axis.initial_position.unwrap_or(0.0),
                limit.lower,
                limit.upper,
            )),
            JointType::Prismatic => FrameEdge::Joint(JointTransform::prismatic(
                axis_in_joint()?,
                self.axis.initial_position.unwrap_or(1.0),
                limit.lower,
                limit.upper,
            )),
            JointType::Fixed => FrameEdge::Rigid(Transform::translation(Vector3::zeros())),
            other => FrameEdge::Degraded(other),
        })
    }
}

/// Frame the axis is expressed in when the document does not say: the child
/// link, or the parent when the legacy `use_parent_model_frame` is set.
fn resolve_axis_frame(axis: &mut JointAxis, parent: &str, child: &str) {
    if axis.expressed_in.is_empty() {
        let frame = if axis.use_parent_model_frame { parent } else { child };
        axis.expressed_in = frame.to_string();
    }
}

impl Element for Joint {
    const TAG: &'static str = "joint";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let name = fields.required("name")?;
        let joint_type: JointType = fields.required("type")?.parse()?;

        let (parent, child) = if cx.capabilities().joint_links_as_attributes {
            let link_of = |tag: &'static str| {
                node.child(tag)
                    .and_then(|n| n.attribute("link"))
                    .map(str::to_string)
                    .ok_or(SdfError::MissingField {
                        element: Self::TAG,
                        field: tag,
                    })
            };
            (link_of("parent")?, link_of("child")?)
        } else {
            (fields.required("parent")?, fields.required("child")?)
        };

        let mut sensors: Vec<Sensor> = fields.list(cx)?;
        let mut frames: Vec<Frame> = if cx.capabilities().frames_in_links {
            fields.list(cx)?
        } else {
            Vec::new()
        };
        if !frames.is_empty() {
            cx.deprecated(Self::TAG, "frame", "model frame attached_to the joint");
        }
        for sensor in &mut sensors {
            sensor.pose.default_relative_to(&name);
        }
        for frame in &mut frames {
            frame.default_attachment(&name);
        }

        let mut joint = Self {
            sdf_version: cx.version(),
            name,
            joint_type,
            parent,
            child,
            pose: Pose::of(node, Self::TAG, cx)?,
            axis: fields.element(cx, JointAxis::TAG)?,
            axis2: fields.element(cx, "axis2")?,
            gearbox_ratio: fields.value_or(cx, "gearbox_ratio", 1.0),
            gearbox_reference_body: fields.value(cx, "gearbox_reference_body"),
            thread_pitch: fields.value_or(cx, "thread_pitch", 1.0),
            physics: fields.unsupported(cx, "physics"),
            sensors,
            frames,
        };
        resolve_axis_frame(&mut joint.axis, &joint.parent, &joint.child);
        resolve_axis_frame(&mut joint.axis2, &joint.parent, &joint.child);
        Ok(joint)
    }
}

impl FrameGraphElement for Joint {
    /// The joint frame, its two staging frames, and its sensors and frames
    /// under `joint::`.
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry> {
        let mut frames = FrameRegistry::new();
        for name in [
            self.name.clone(),
            self.parent_staging_frame(),
            self.child_staging_frame(),
        ] {
            frames.declare(name.as_str(), graph.add_frame(name.as_str()))?;
        }
        for sensor in &self.sensors {
            let key = self.scoped(&sensor.name);
            frames.declare(key.as_str(), graph.add_frame(key.as_str()))?;
        }
        for frame in &self.frames {
            let key = self.scoped(&frame.name);
            frames.declare(key.as_str(), graph.add_frame(key.as_str()))?;
        }
        Ok(frames)
    }

    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        let joint = self.pose.to_static_graph(frames, graph, &self.name)?;
        for staging in [self.parent_staging_frame(), self.child_staging_frame()] {
            graph.attach(
                frames.get(&staging)?,
                joint,
                FrameEdge::Rigid(Transform::identity()),
            )?;
        }
        for sensor in &self.sensors {
            sensor.wire_static(&self.scoped(&sensor.name), frames, graph)?;
        }
        for frame in &self.frames {
            frame.wire_static(&self.scoped(&frame.name), frames, graph)?;
        }
        Ok(joint)
    }

    /// parent <- `_parent` <- (motion) <- `_child` <- child, with the joint
    /// frame riding on `_child`.
    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        let joint = frames.get(&self.name)?;
        let parent_staging = self.parent_staging_frame();
        let child_staging = self.child_staging_frame();

        let parent_offset = scaffolding.offset(&self.name, &self.parent)?;
        graph.attach(
            frames.get(&parent_staging)?,
            frames.get(&self.parent)?,
            FrameEdge::Rigid(parent_offset),
        )?;

        debug!(joint = %self.name, joint_type = %self.joint_type, "wiring joint motion");
        graph.attach(
            frames.get(&child_staging)?,
            frames.get(&parent_staging)?,
            self.motion_edge(scaffolding)?,
        )?;

        let child_offset = scaffolding.offset(&self.child, &self.name)?;
        graph.attach(
            frames.get(&self.child)?,
            frames.get(&child_staging)?,
            FrameEdge::Rigid(child_offset),
        )?;
        graph.attach(
            joint,
            frames.get(&child_staging)?,
            FrameEdge::Rigid(Transform::identity()),
        )?;

        for sensor in &self.sensors {
            sensor.wire_dynamic(&self.scoped(&sensor.name), &self.name, frames, graph, scaffolding)?;
        }
        for frame in &self.frames {
            frame.wire_dynamic(&self.scoped(&frame.name), frames, graph, scaffolding)?;
        }
        Ok(joint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Diagnostic;

    fn revolute() -> SpecificElement {
        SpecificElement::new("joint")
            .with_attribute("name", "hinge")
            .with_attribute("type", "revolute")
            .with_value("parent", "base")
            .with_value("child", "arm")
    }

    #[test]
    fn axis_defaults_to_child_frame() {
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let joint = Joint::from_specific(&revolute(), &mut cx).unwrap();
        assert_eq!(joint.axis.expressed_in, "arm");
        assert_eq!(joint.axis.xyz, Vector3::z());
        assert_eq!(joint.axis.limit.lower, -1e16);
        assert_eq!(joint.axis2.expressed_in, "arm");
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn legacy_parent_model_frame() {
        let node = revolute().with_child(
            SpecificElement::new("axis")
                .with_value("xyz", "1 0 0")
                .with_value("use_parent_model_frame", "true"),
        );
        let mut cx = Normalize::new(SdfVersion::V1_6);
        let joint = Joint::from_specific(&node, &mut cx).unwrap();
        assert_eq!(joint.axis.expressed_in, "base");
        assert!(matches!(
            cx.diagnostics(),
            [Diagnostic::Deprecated { field: "use_parent_model_frame", .. }]
        ));
    }

    #[test]
    fn expressed_in_wins_over_legacy_flag() {
        let node = revolute().with_child(
            SpecificElement::new("axis")
                .with_child(
                    SpecificElement::new("xyz")
                        .with_attribute("expressed_in", "__model__")
                        .with_text("0 1 0"),
                )
                .with_value("use_parent_model_frame", "true"),
        );
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let joint = Joint::from_specific(&node, &mut cx).unwrap();
        assert_eq!(joint.axis.expressed_in, "__model__");
        assert_eq!(joint.axis.xyz, Vector3::y());
        assert!(!joint.axis.use_parent_model_frame);
    }

    #[test]
    fn version_1_0_link_attributes() {
        let node = SpecificElement::new("joint")
            .with_attribute("name", "hinge")
            .with_attribute("type", "prismatic")
            .with_child(SpecificElement::new("parent").with_attribute("link", "base"))
            .with_child(SpecificElement::new("child").with_attribute("link", "arm"));
        let mut cx = Normalize::new(SdfVersion::V1_0);
        let joint = Joint::from_specific(&node, &mut cx).unwrap();
        assert_eq!((joint.parent.as_str(), joint.child.as_str()), ("base", "arm"));
        assert_eq!(joint.joint_type, JointType::Prismatic);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let node = SpecificElement::new("joint")
            .with_attribute("name", "j")
            .with_attribute("type", "wobble")
            .with_value("parent", "a")
            .with_value("child", "b");
        let mut cx = Normalize::new(SdfVersion::V1_8);
        assert!(matches!(
            Joint::from_specific(&node, &mut cx),
            Err(SdfError::InvalidValue { field: "type", .. })
        ));
    }

    #[test]
    fn declares_staging_frames() {
        let node = revolute().with_child(
            SpecificElement::new("sensor")
                .with_attribute("name", "torque")
                .with_attribute("type", "force_torque"),
        );
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let joint = Joint::from_specific(&node, &mut cx).unwrap();
        assert_eq!(joint.sensors[0].pose.relative_to.as_deref(), Some("hinge"));

        let mut graph = FrameGraph::new();
        let frames = joint.declared_frames(&mut graph).unwrap();
        assert_eq!(
            frames.names(),
            vec!["hinge", "hinge::torque", "hinge_child", "hinge_parent"]
        );
    }
}
