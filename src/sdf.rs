//! The `<sdf>` root and its version-dependent payload shape.

use crate::actor::Actor;
use crate::element::{Diagnostic, Element, Fields, Normalize};
use crate::error::{Result, SdfError};
use crate::graph::FrameGraphs;
use crate::light::Light;
use crate::model::Model;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Worlds(Vec<World>),
    Model(Box<Model>),
    Light(Light),
    Actor(Actor),
    /// Before 1.8, worlds and top-level models, lights and actors coexist.
    Legacy {
        worlds: Vec<World>,
        models: Vec<Model>,
        lights: Vec<Light>,
        actors: Vec<Actor>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sdf {
    pub sdf_version: SdfVersion,
    pub payload: Payload,
}

impl Sdf {
    /// Normalize a parsed document declared as `version`, without include
    /// resolution.
    pub fn from_versioned(node: &SpecificElement, version: &str) -> Result<(Self, Vec<Diagnostic>)> {
        let mut cx = Normalize::new(version.parse()?);
        let sdf = Self::from_specific(node, &mut cx)?;
        Ok((sdf, cx.into_diagnostics()))
    }

    pub fn worlds(&self) -> &[World] {
        match &self.payload {
            Payload::Worlds(worlds) | Payload::Legacy { worlds, .. } => worlds,
            _ => &[],
        }
    }

    /// Static and dynamic graphs of every world. Payloads without a world
    /// are placed in an implicit one; top-level elements next to legacy
    /// worlds are not part of any graph.
    pub fn frame_graphs(&self) -> Result<Vec<FrameGraphs>> {
        let implicit = |models: Vec<Model>, lights: Vec<Light>, actors: Vec<Actor>| {
            World::implicit(self.sdf_version, models, lights, actors)
                .and_then(|world| FrameGraphs::build(&world))
                .map(|graphs| vec![graphs])
        };
        match &self.payload {
            Payload::Worlds(worlds) => worlds.iter().map(FrameGraphs::build).collect(),
            Payload::Model(model) => implicit(vec![model.as_ref().clone()], Vec::new(), Vec::new()),
            Payload::Light(light) => implicit(Vec::new(), vec![light.clone()], Vec::new()),
            Payload::Actor(actor) => implicit(Vec::new(), Vec::new(), vec![actor.clone()]),
            Payload::Legacy {
                worlds,
                models,
                lights,
                actors,
            } => {
                if worlds.is_empty() {
                    implicit(models.clone(), lights.clone(), actors.clone())
                } else {
                    worlds.iter().map(FrameGraphs::build).collect()
                }
            }
        }
    }
}

impl Element for Sdf {
    const TAG: &'static str = "sdf";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let version = cx.version();
        let worlds: Vec<World> = fields.list(cx)?;
        let mut models: Vec<Model> = fields.list(cx)?;
        let mut lights: Vec<Light> = fields.list(cx)?;
        let mut actors: Vec<Actor> = fields.list(cx)?;

        let payload = if cx.capabilities().exclusive_payload {
            match (worlds.len(), models.len(), lights.len(), actors.len()) {
                (1, 0, 0, 0) => Payload::Worlds(worlds),
                (0, 1, 0, 0) => Payload::Model(Box::new(models.remove(0))),
                (0, 0, 1, 0) => Payload::Light(lights.remove(0)),
                (0, 0, 0, 1) => Payload::Actor(actors.remove(0)),
                (0, 0, 0, 0) => {
                    return Err(SdfError::invalid_payload(version.as_str(), "document is empty"))
                }
                (w, m, l, a) => {
                    return Err(SdfError::invalid_payload(
                        version.as_str(),
                        format!(
                            "expected exactly one world, model, light or actor; \
                             found {w} worlds, {m} models, {l} lights, {a} actors"
                        ),
                    ))
                }
            }
        } else {
            if !worlds.is_empty() && !(models.is_empty() && lights.is_empty() && actors.is_empty()) {
                cx.deprecated(Self::TAG, "top-level model, light or actor", "world contents");
            }
            Payload::Legacy {
                worlds,
                models,
                lights,
                actors,
            }
        };
        Ok(Self {
            sdf_version: version,
            payload,
        })
    }
}
