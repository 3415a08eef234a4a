//! Worlds: the root scope owning the `world` frame.

use nalgebra::Vector3;

use crate::actor::Actor;
use crate::element::{Element, Fields, FromSdf, Normalize, Unsupported};
use crate::error::Result;
use crate::frame::Frame;
use crate::graph::{FrameGraph, FrameGraphElement, FrameId, FrameRegistry, Scaffolding, WORLD_FRAME};
use crate::include::{resolve_includes, Include};
use crate::joint::Joint;
use crate::light::Light;
use crate::model::Model;
use crate::plugin::Plugin;
use crate::population::Population;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

const DEFAULT_GRAVITY: [f64; 3] = [0.0, 0.0, -9.8];
const DEFAULT_MAGNETIC_FIELD: [f64; 3] = [5.5645e-6, 22.8758e-6, -42.3884e-6];

#[derive(Debug, Clone, PartialEq)]
pub struct Physics {
    pub name: String,
    pub default: bool,
    pub engine: String,
    pub max_step_size: f64,
    pub real_time_factor: f64,
    pub real_time_update_rate: f64,
    pub max_contacts: u32,
}

impl Element for Physics {
    const TAG: &'static str = "physics";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            name: fields.value_or(cx, "name", "default_physics".to_string()),
            default: fields.value_or(cx, "default", false),
            engine: fields.value_or(cx, "type", "ode".to_string()),
            max_step_size: fields.value_or(cx, "max_step_size", 0.001),
            real_time_factor: fields.value_or(cx, "real_time_factor", 1.0),
            real_time_update_rate: fields.value_or(cx, "real_time_update_rate", 1000.0),
            max_contacts: fields.value_or(cx, "max_contacts", 20),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub ambient: [f64; 4],
    pub background: [f64; 4],
    pub shadows: bool,
    pub grid: bool,
    pub origin_visual: bool,
    pub sky: Option<Unsupported>,
    pub fog: Option<Unsupported>,
}

impl Element for Scene {
    const TAG: &'static str = "scene";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            ambient: fields.value_or(cx, "ambient", [0.4, 0.4, 0.4, 1.0]),
            background: fields.value_or(cx, "background", [0.7, 0.7, 0.7, 1.0]),
            shadows: fields.value_or(cx, "shadows", true),
            grid: fields.value_or(cx, "grid", true),
            origin_visual: fields.value_or(cx, "origin_visual", true),
            sky: fields.unsupported(cx, "sky"),
            fog: fields.unsupported(cx, "fog"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    pub linear_velocity: Vector3<f64>,
}

impl Element for Wind {
    const TAG: &'static str = "wind";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        Ok(Self {
            linear_velocity: Fields::new(node, Self::TAG).value_or(
                cx,
                "linear_velocity",
                Vector3::zeros(),
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub gravity: Vector3<f64>,
    pub magnetic_field: Vector3<f64>,
    pub wind: Wind,
    pub atmosphere: Option<Unsupported>,
    pub physics: Vec<Physics>,
    pub scene: Scene,
    pub lights: Vec<Light>,
    pub models: Vec<Model>,
    pub actors: Vec<Actor>,
    pub frames: Vec<Frame>,
    /// World-level joints, a legacy spelling.
    pub joints: Vec<Joint>,
    pub includes: Vec<Include>,
    pub populations: Vec<Population>,
    pub states: Vec<Unsupported>,
    pub plugins: Vec<Plugin>,
}

impl World {
    /// World named `default` holding top-level payloads, so that they have a
    /// `world` frame to be placed in.
    pub(crate) fn implicit(
        version: SdfVersion,
        models: Vec<Model>,
        lights: Vec<Light>,
        actors: Vec<Actor>,
    ) -> Result<Self> {
        let node = SpecificElement::new(Self::TAG).with_attribute("name", "default");
        let mut world = World::from_specific(&node, &mut Normalize::new(version))?;
        world.models = models;
        world.lights = lights;
        world.actors = actors;
        world.backfill();
        Ok(world)
    }

    fn backfill(&mut self) {
        for model in &mut self.models {
            model.pose.default_relative_to(WORLD_FRAME);
        }
        for frame in &mut self.frames {
            frame.default_attachment(WORLD_FRAME);
        }
        for joint in &mut self.joints {
            joint.pose.default_relative_to(WORLD_FRAME);
        }
        for light in &mut self.lights {
            light.pose.default_relative_to(WORLD_FRAME);
        }
        for actor in &mut self.actors {
            actor.pose.default_relative_to(WORLD_FRAME);
        }
    }
}

impl Element for World {
    const TAG: &'static str = "world";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let capabilities = *cx.capabilities();

        let gravity = match fields.value::<Vector3<f64>>(cx, "gravity") {
            Some(gravity) => gravity,
            None => match node.child(Physics::TAG).and_then(|physics| physics.field("gravity")) {
                Some(text) => {
                    cx.deprecated(Physics::TAG, "gravity", "world gravity");
                    Vector3::from_sdf(text).unwrap_or_else(|| Vector3::from(DEFAULT_GRAVITY))
                }
                None => Vector3::from(DEFAULT_GRAVITY),
            },
        };

        let joints: Vec<Joint> = fields.list(cx)?;
        if !joints.is_empty() {
            cx.deprecated(Self::TAG, "joint", "model joint");
        }

        let mut models: Vec<Model> = fields.list(cx)?;
        let (resolved, includes) = resolve_includes(fields.list(cx)?, cx)?;
        models.extend(resolved);
        let populations: Vec<Population> = fields.list(cx)?;
        for population in &populations {
            models.extend(population.expand(cx));
        }

        let mut world = Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            gravity,
            magnetic_field: fields.value_or(cx, "magnetic_field", Vector3::from(DEFAULT_MAGNETIC_FIELD)),
            wind: fields.element(cx, Wind::TAG)?,
            atmosphere: fields.unsupported(cx, "atmosphere"),
            physics: fields.list(cx)?,
            scene: fields.element(cx, Scene::TAG)?,
            lights: fields.list(cx)?,
            models,
            actors: fields.list(cx)?,
            frames: if capabilities.explicit_frames {
                fields.list(cx)?
            } else {
                Vec::new()
            },
            joints,
            includes,
            populations,
            states: fields.unsupported_list(cx, "state"),
            plugins: fields.list(cx)?,
        };
        world.backfill();
        Ok(world)
    }
}

impl FrameGraphElement for World {
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry> {
        let mut frames = FrameRegistry::new();
        frames.declare(WORLD_FRAME, graph.add_frame(WORLD_FRAME))?;
        for model in &self.models {
            let nested = model.declared_frames(graph)?;
            frames.nest(&model.name, nested, graph)?;
        }
        for frame in &self.frames {
            frames.extend(frame.declared_frames(graph)?)?;
        }
        for joint in &self.joints {
            frames.extend(joint.declared_frames(graph)?)?;
        }
        let bodies = self
            .lights
            .iter()
            .map(|light| &light.name)
            .chain(self.actors.iter().map(|actor| &actor.name));
        for name in bodies {
            frames.declare(name.as_str(), graph.add_frame(name.as_str()))?;
        }
        Ok(frames)
    }

    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        let world = frames.get(WORLD_FRAME)?;
        for model in &self.models {
            model.to_static_graph(&frames.scope(&model.name), graph)?;
            model.wire_placement(frames, graph)?;
        }
        for frame in &self.frames {
            frame.to_static_graph(frames, graph)?;
        }
        for joint in &self.joints {
            joint.to_static_graph(frames, graph)?;
        }
        for light in &self.lights {
            light.wire_static(frames, graph)?;
        }
        for actor in &self.actors {
            actor.wire_static(frames, graph)?;
        }
        Ok(world)
    }

    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        let world = frames.get(WORLD_FRAME)?;
        for joint in &self.joints {
            graph.mark_driven(frames.get(&joint.child)?);
        }
        for model in &self.models {
            model.to_dynamic_graph(
                &frames.scope(&model.name),
                graph,
                &scaffolding.scope(&model.name),
            )?;
        }
        for joint in &self.joints {
            joint.to_dynamic_graph(frames, graph, scaffolding)?;
        }
        for frame in &self.frames {
            frame.to_dynamic_graph(frames, graph, scaffolding)?;
        }
        for light in &self.lights {
            light.wire_dynamic(frames, graph, scaffolding)?;
        }
        for actor in &self.actors {
            actor.wire_dynamic(frames, graph, scaffolding)?;
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::element::Diagnostic;
    use crate::graph::FrameGraphs;

    fn world() -> SpecificElement {
        SpecificElement::new("world").with_attribute("name", "default")
    }

    fn model(name: &str) -> SpecificElement {
        SpecificElement::new("model")
            .with_attribute("name", name)
            .with_child(SpecificElement::new("link").with_attribute("name", "body"))
    }

    #[test]
    fn defaults_and_backfill() {
        let node = world()
            .with_child(model("box"))
            .with_child(SpecificElement::new("frame").with_attribute("name", "spot"));
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let world = World::from_specific(&node, &mut cx).unwrap();
        assert_eq!(world.gravity, Vector3::new(0.0, 0.0, -9.8));
        assert_eq!(world.scene.ambient, [0.4, 0.4, 0.4, 1.0]);
        assert!(world.physics.is_empty());
        assert_eq!(world.models[0].pose.relative_to.as_deref(), Some(WORLD_FRAME));
        assert_eq!(world.frames[0].attached_to.as_deref(), Some(WORLD_FRAME));
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn legacy_gravity_and_joints() {
        let node = world()
            .with_child(SpecificElement::new("physics").with_value("gravity", "0 0 -3.7"))
            .with_child(model("a"))
            .with_child(model("b"))
            .with_child(
                SpecificElement::new("joint")
                    .with_attribute("name", "weld")
                    .with_attribute("type", "fixed")
                    .with_value("parent", "a::body")
                    .with_value("child", "b::body"),
            );
        let mut cx = Normalize::new(SdfVersion::V1_5);
        let world = World::from_specific(&node, &mut cx).unwrap();
        assert_eq!(world.gravity, Vector3::new(0.0, 0.0, -3.7));
        assert_eq!(world.joints.len(), 1);
        assert_eq!(
            cx.diagnostics()
                .iter()
                .filter(|d| matches!(d, Diagnostic::Deprecated { .. }))
                .count(),
            2
        );

        let graphs = FrameGraphs::build(&world).unwrap();
        let b = graphs.dynamic_frames.get("b::body").unwrap();
        let a = graphs.dynamic_frames.get("a::body").unwrap();
        assert_eq!(graphs.dynamic_graph.depth(b), graphs.dynamic_graph.depth(a) + 3);
    }

    #[test]
    fn lights_and_populations_become_frames() {
        let node = world()
            .with_child(
                SpecificElement::new("light")
                    .with_attribute("name", "sun")
                    .with_child(SpecificElement::new("pose").with_text("0 0 10 0 0 0")),
            )
            .with_child(
                SpecificElement::new("population")
                    .with_attribute("name", "pair")
                    .with_value("model_count", "2")
                    .with_child(SpecificElement::new("box").with_value("size", "4 4 0"))
                    .with_child(SpecificElement::new("distribution").with_value("type", "linear-y"))
                    .with_child(model("crate")),
            );
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let world = World::from_specific(&node, &mut cx).unwrap();
        assert_eq!(world.models.len(), 2);

        let graphs = FrameGraphs::build(&world).unwrap();
        let sun = graphs.dynamic_transform("sun", WORLD_FRAME).unwrap();
        assert_relative_eq!(sun.translation_part(), Vector3::new(0.0, 0.0, 10.0), epsilon = 1e-12);
        let clone = graphs.static_transform("crate_clone_1::body", WORLD_FRAME).unwrap();
        assert_relative_eq!(clone.translation_part(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
