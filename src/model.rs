//! Models: canonical link and placement frame resolution, nested scopes and
//! kinematic wiring.

use tracing::debug;

use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::{Result, SdfError};
use crate::frame::Frame;
use crate::graph::{
    attach_rigid, FrameEdge, FrameGraph, FrameGraphElement, FrameId, FrameRegistry, Scaffolding,
    MODEL_FRAME, WORLD_FRAME,
};
use crate::include::{resolve_includes, Include};
use crate::joint::Joint;
use crate::link::Link;
use crate::plugin::Plugin;
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::transform::Transform;
use crate::version::SdfVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct Gripper {
    pub name: String,
    pub gripper_links: Vec<String>,
    pub palm_link: String,
    pub grasp_check: Option<Unsupported>,
}

impl Element for Gripper {
    const TAG: &'static str = "gripper";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            name: fields.required("name")?,
            gripper_links: node
                .children_named("gripper_link")
                .filter_map(SpecificElement::text)
                .map(str::to_string)
                .collect(),
            palm_link: fields.required("palm_link")?,
            grasp_check: fields.unsupported(cx, "grasp_check"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub sdf_version: SdfVersion,
    pub name: String,
    /// Resolved kinematic root: the explicit attribute, `world` for static
    /// models, else the first link, else the first nested model.
    pub canonical_link: String,
    /// `canonical_link` as authored, if it was.
    pub canonical_link_attribute: Option<String>,
    pub placement_frame: String,
    pub static_: bool,
    pub self_collide: bool,
    pub allow_auto_disable: bool,
    pub enable_wind: bool,
    pub pose: Pose,
    pub links: Vec<Link>,
    pub joints: Vec<Joint>,
    pub plugins: Vec<Plugin>,
    pub grippers: Vec<Gripper>,
    pub models: Vec<Model>,
    pub frames: Vec<Frame>,
    /// Includes left unresolved because no fetcher was configured.
    pub includes: Vec<Include>,
}

impl Model {
    pub(crate) fn resolve_canonical_link(&self) -> Result<String> {
        if let Some(explicit) = &self.canonical_link_attribute {
            return Ok(explicit.clone());
        }
        if self.static_ {
            return Ok(WORLD_FRAME.to_string());
        }
        self.links
            .first()
            .map(|link| link.name.clone())
            .or_else(|| self.models.first().map(|model| model.name.clone()))
            .ok_or_else(|| SdfError::NoCanonicalLink {
                model: self.name.clone(),
            })
    }

    fn backfill(&mut self) {
        for model in &mut self.models {
            model.pose.default_relative_to(MODEL_FRAME);
        }
        for frame in &mut self.frames {
            frame.default_attachment(MODEL_FRAME);
        }
        for link in &mut self.links {
            link.pose.default_relative_to(MODEL_FRAME);
        }
        for joint in &mut self.joints {
            joint.pose.default_relative_to(MODEL_FRAME);
        }
    }

    /// `frames` is the parent's registry.
    pub(crate) fn wire_placement(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
    ) -> Result<FrameId> {
        let model = frames.get(&self.name)?;
        let parent = self.pose.relative_to.as_deref().ok_or(SdfError::MissingField {
            element: "pose",
            field: "relative_to",
        })?;
        let placement = if self.placement_frame == MODEL_FRAME {
            Transform::identity()
        } else {
            let placement = frames.get(&format!("{}::{}", self.name, self.placement_frame))?;
            graph.transform(placement, model)?
        };
        debug!(model = %self.name, parent, placement_frame = %self.placement_frame, "placing model");
        graph.attach(
            model,
            frames.get(parent)?,
            FrameEdge::Rigid(self.pose.to_tf_link() * placement.inverse()),
        )?;
        Ok(model)
    }

    // Without a world, a nested subtree ends in a root of its own.
    fn attach_free_root(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<()> {
        let mut root = frames.get(&self.name)?;
        while let Some(parent) = graph.parent(root) {
            root = parent;
        }
        if graph.is_driven(root) {
            return Ok(());
        }
        let key = frames
            .names()
            .into_iter()
            .find(|name| frames.get(name).ok() == Some(root))
            .ok_or_else(|| SdfError::UndeclaredFrame(graph.name(root).to_string()))?;
        attach_rigid(frames, graph, scaffolding, key, MODEL_FRAME)
    }
}

impl Element for Model {
    const TAG: &'static str = "model";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let capabilities = *cx.capabilities();
        let name = fields.required("name")?;

        let links: Vec<Link> = fields.list(cx)?;
        if links.is_empty() && !capabilities.empty_models {
            return Err(SdfError::invalid_value(
                Self::TAG,
                "link",
                format!("model '{name}' needs at least one link in SDFormat {}", cx.version()),
            ));
        }
        let mut models: Vec<Model> = if capabilities.nested_models {
            fields.list(cx)?
        } else {
            Vec::new()
        };
        let frames: Vec<Frame> = if capabilities.explicit_frames {
            fields.list(cx)?
        } else {
            Vec::new()
        };
        let (resolved, includes) = resolve_includes(fields.list(cx)?, cx)?;
        models.extend(resolved);

        let canonical_link_attribute = if capabilities.canonical_link_attribute {
            fields
                .value::<String>(cx, "canonical_link")
                .filter(|link| !link.is_empty())
        } else {
            None
        };
        let placement_frame = if capabilities.placement_frame {
            fields
                .value::<String>(cx, "placement_frame")
                .filter(|frame| !frame.is_empty())
        } else {
            None
        };

        let mut model = Self {
            sdf_version: cx.version(),
            name,
            canonical_link: String::new(),
            canonical_link_attribute,
            placement_frame: placement_frame.unwrap_or_else(|| MODEL_FRAME.to_string()),
            static_: fields.value_or(cx, "static", false),
            self_collide: fields.value_or(cx, "self_collide", false),
            allow_auto_disable: fields.value_or(cx, "allow_auto_disable", true),
            enable_wind: fields.value_or(cx, "enable_wind", false),
            pose: Pose::of(node, Self::TAG, cx)?,
            links,
            joints: fields.list(cx)?,
            plugins: fields.list(cx)?,
            grippers: fields.list(cx)?,
            models,
            frames,
            includes,
        };
        model.canonical_link = model.resolve_canonical_link()?;
        model.backfill();
        Ok(model)
    }
}

impl FrameGraphElement for Model {
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry> {
        let mut frames = FrameRegistry::new();
        frames.declare(MODEL_FRAME, graph.add_frame(MODEL_FRAME))?;
        for link in &self.links {
            frames.extend(link.declared_frames(graph)?)?;
        }
        for joint in &self.joints {
            frames.extend(joint.declared_frames(graph)?)?;
        }
        for frame in &self.frames {
            frames.extend(frame.declared_frames(graph)?)?;
        }
        for model in &self.models {
            let nested = model.declared_frames(graph)?;
            frames.nest(&model.name, nested, graph)?;
        }
        Ok(frames)
    }

    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        let model = frames.get(MODEL_FRAME)?;
        for nested in &self.models {
            nested.to_static_graph(&frames.scope(&nested.name), graph)?;
            nested.wire_placement(frames, graph)?;
        }
        for frame in &self.frames {
            frame.to_static_graph(frames, graph)?;
        }
        for link in &self.links {
            link.to_static_graph(frames, graph)?;
        }
        for joint in &self.joints {
            joint.to_static_graph(frames, graph)?;
        }
        Ok(model)
    }

    /// Joint children hang off their joints. The model frame rides on the
    /// canonical link, unless a joint drives the model frame itself, in which
    /// case the canonical link rides on the model frame. Remaining bodies are
    /// free: they float in the world, or sit on the model frame when the
    /// model is static.
    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        let model = frames.get(MODEL_FRAME)?;
        for joint in &self.joints {
            graph.mark_driven(frames.get(&joint.child)?);
        }
        let model_driven = graph.is_driven(model);
        if model_driven && !self.static_ {
            graph.mark_driven(frames.get(&self.canonical_link)?);
        }

        let in_world = frames.contains(WORLD_FRAME);
        for nested in &self.models {
            nested.to_dynamic_graph(
                &frames.scope(&nested.name),
                graph,
                &scaffolding.scope(&nested.name),
            )?;
            if !in_world && nested.name != self.canonical_link {
                nested.attach_free_root(frames, graph, scaffolding)?;
            }
        }

        if self.static_ {
            if !model_driven && in_world {
                attach_rigid(frames, graph, scaffolding, MODEL_FRAME, WORLD_FRAME)?;
            }
        } else if model_driven {
            attach_rigid(frames, graph, scaffolding, &self.canonical_link, MODEL_FRAME)?;
        } else {
            attach_rigid(frames, graph, scaffolding, MODEL_FRAME, &self.canonical_link)?;
        }

        for link in &self.links {
            if !graph.is_driven(frames.get(&link.name)?) {
                let anchor = if self.static_ {
                    Some(MODEL_FRAME)
                } else if in_world {
                    Some(WORLD_FRAME)
                } else if link.name == self.canonical_link {
                    None
                } else {
                    Some(MODEL_FRAME)
                };
                if let Some(anchor) = anchor {
                    attach_rigid(frames, graph, scaffolding, &link.name, anchor)?;
                }
            }
            link.to_dynamic_graph(frames, graph, scaffolding)?;
        }
        for joint in &self.joints {
            joint.to_dynamic_graph(frames, graph, scaffolding)?;
        }
        for frame in &self.frames {
            frame.to_dynamic_graph(frames, graph, scaffolding)?;
        }
        Ok(model)
    }
}
