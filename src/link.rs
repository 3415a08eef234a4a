//! Links and their physical sub-elements.

use hashbrown::HashSet;
use nalgebra::{Matrix3, Matrix6};

use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::Result;
use crate::frame::Frame;
use crate::graph::{FrameGraph, FrameGraphElement, FrameId, FrameRegistry, Scaffolding};
use crate::pose::Pose;
use crate::sensor::Sensor;
use crate::spatial_inertial::to_local_spatial_inertial;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct Inertia {
    pub ixx: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyy: f64,
    pub iyz: f64,
    pub izz: f64,
}

impl Inertia {
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, self.ixy, self.ixz, //
            self.ixy, self.iyy, self.iyz, //
            self.ixz, self.iyz, self.izz,
        )
    }
}

impl Element for Inertia {
    const TAG: &'static str = "inertia";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            ixx: fields.value_or(cx, "ixx", 1.0),
            ixy: fields.value_or(cx, "ixy", 0.0),
            ixz: fields.value_or(cx, "ixz", 0.0),
            iyy: fields.value_or(cx, "iyy", 1.0),
            iyz: fields.value_or(cx, "iyz", 0.0),
            izz: fields.value_or(cx, "izz", 1.0),
        })
    }
}

/// Mass properties. `pose` locates the center of mass in the link frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Inertial {
    pub sdf_version: SdfVersion,
    pub mass: f64,
    pub pose: Pose,
    pub inertia: Inertia,
}

impl Inertial {
    /// 6x6 spatial inertia expressed in the link frame, `[angular; linear]`.
    pub fn spatial_inertia(&self) -> Matrix6<f64> {
        to_local_spatial_inertial(&self.pose.to_tf_link(), &self.inertia.matrix(), self.mass)
    }
}

impl Element for Inertial {
    const TAG: &'static str = "inertial";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            mass: fields.value_or(cx, "mass", 1.0),
            pose: Pose::of(node, Self::TAG, cx)?,
            inertia: fields.element(cx, Inertia::TAG)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VelocityDecay {
    pub linear: f64,
    pub angular: f64,
}

impl Element for VelocityDecay {
    const TAG: &'static str = "velocity_decay";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            linear: fields.value_or(cx, "linear", 0.0),
            angular: fields.value_or(cx, "angular", 0.0),
        })
    }
}

/// Shape payload of a collision or visual; shapes are kept as stubs.
fn geometry(node: &SpecificElement, cx: &mut Normalize<'_>) -> Option<Unsupported> {
    let geometry = node.child("geometry")?;
    Some(match geometry.children.first() {
        Some(shape) => cx.unsupported(shape),
        None => cx.unsupported(geometry),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub pose: Pose,
    pub laser_retro: f64,
    pub max_contacts: u32,
    pub geometry: Option<Unsupported>,
    pub surface: Option<Unsupported>,
}

impl Element for Collision {
    const TAG: &'static str = "collision";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            pose: Pose::of(node, Self::TAG, cx)?,
            laser_retro: fields.value_or(cx, "laser_retro", 0.0),
            max_contacts: fields.value_or(cx, "max_contacts", 10),
            geometry: geometry(node, cx),
            surface: fields.unsupported(cx, "surface"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub pose: Pose,
    pub cast_shadows: bool,
    pub laser_retro: f64,
    pub transparency: f64,
    pub geometry: Option<Unsupported>,
    pub material: Option<Unsupported>,
}

impl Element for Visual {
    const TAG: &'static str = "visual";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            pose: Pose::of(node, Self::TAG, cx)?,
            cast_shadows: fields.value_or(cx, "cast_shadows", true),
            laser_retro: fields.value_or(cx, "laser_retro", 0.0),
            transparency: fields.value_or(cx, "transparency", 0.0),
            geometry: geometry(node, cx),
            material: fields.unsupported(cx, "material"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub name: String,
    pub voltage: f64,
}

impl Element for Battery {
    const TAG: &'static str = "battery";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            name: fields.required("name")?,
            voltage: fields.value_or(cx, "voltage", 0.0),
        })
    }
}

/// A rigid body. Sensors and deprecated link frames are declared as `link::name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub gravity: bool,
    pub enable_wind: bool,
    pub self_collide: bool,
    pub kinematic: bool,
    pub must_be_base_link: bool,
    pub pose: Pose,
    pub velocity_decay: VelocityDecay,
    pub inertial: Inertial,
    pub collisions: Vec<Collision>,
    pub visuals: Vec<Visual>,
    pub sensors: Vec<Sensor>,
    pub batteries: Vec<Battery>,
    pub projector: Option<Unsupported>,
    pub audio_sources: Vec<Unsupported>,
    pub frames: Vec<Frame>,
}

impl Link {
    fn scoped(&self, name: &str) -> String {
        format!("{}::{name}", self.name)
    }

    /// Default sensor and frame references to the link, and rewrite references
    /// to sibling sensors or frames into their `link::name` keys.
    fn namespace_children(&mut self) {
        let local: HashSet<String> = self
            .sensors
            .iter()
            .map(|sensor| sensor.name.clone())
            .chain(self.frames.iter().map(|frame| frame.name.clone()))
            .collect();
        let link = self.name.clone();
        let rewrite = |reference: &mut Option<String>| match reference {
            None => *reference = Some(link.clone()),
            Some(name) if local.contains(name.as_str()) => *name = format!("{link}::{name}"),
            Some(_) => {}
        };
        for sensor in &mut self.sensors {
            rewrite(&mut sensor.pose.relative_to);
        }
        for frame in &mut self.frames {
            rewrite(&mut frame.attached_to);
            rewrite(&mut frame.pose.relative_to);
        }
    }
}

impl Element for Link {
    const TAG: &'static str = "link";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let frames: Vec<Frame> = if cx.capabilities().frames_in_links {
            fields.list(cx)?
        } else {
            Vec::new()
        };
        if !frames.is_empty() {
            cx.deprecated(Self::TAG, "frame", "model frame attached_to the link");
        }

        let mut link = Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            gravity: fields.value_or(cx, "gravity", true),
            enable_wind: fields.value_or(cx, "enable_wind", false),
            self_collide: fields.value_or(cx, "self_collide", false),
            kinematic: fields.value_or(cx, "kinematic", false),
            must_be_base_link: fields.value_or(cx, "must_be_base_link", false),
            pose: Pose::of(node, Self::TAG, cx)?,
            velocity_decay: fields.element(cx, VelocityDecay::TAG)?,
            inertial: fields.element(cx, Inertial::TAG)?,
            collisions: fields.list(cx)?,
            visuals: fields.list(cx)?,
            sensors: fields.list(cx)?,
            batteries: fields.list(cx)?,
            projector: fields.unsupported(cx, "projector"),
            audio_sources: fields.unsupported_list(cx, "audio_source"),
            frames,
        };
        link.namespace_children();
        Ok(link)
    }
}

impl FrameGraphElement for Link {
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry> {
        let mut frames = FrameRegistry::new();
        frames.declare(self.name.as_str(), graph.add_frame(self.name.as_str()))?;
        let children = self
            .sensors
            .iter()
            .map(|sensor| &sensor.name)
            .chain(self.frames.iter().map(|frame| &frame.name));
        for name in children {
            let key = self.scoped(name);
            frames.declare(key.as_str(), graph.add_frame(key.as_str()))?;
        }
        Ok(frames)
    }

    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        let link = self.pose.to_static_graph(frames, graph, &self.name)?;
        for sensor in &self.sensors {
            sensor.wire_static(&self.scoped(&sensor.name), frames, graph)?;
        }
        for frame in &self.frames {
            frame.wire_static(&self.scoped(&frame.name), frames, graph)?;
        }
        Ok(link)
    }

    /// Wires what rides on the link. The link's own parent edge is decided by
    /// the enclosing model.
    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        for sensor in &self.sensors {
            sensor.wire_dynamic(&self.scoped(&sensor.name), &self.name, frames, graph, scaffolding)?;
        }
        for frame in &self.frames {
            frame.wire_dynamic(&self.scoped(&frame.name), frames, graph, scaffolding)?;
        }
        frames.get(&self.name)
    }
}
