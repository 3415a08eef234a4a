use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::Result;
use crate::graph::{attach_rigid, FrameGraph, FrameId, FrameRegistry, Scaffolding, WORLD_FRAME};
use crate::plugin::Plugin;
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub filename: String,
    pub scale: f64,
}

impl Element for Skin {
    const TAG: &'static str = "skin";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            filename: fields.required("filename")?,
            scale: fields.value_or(cx, "scale", 1.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub filename: String,
    pub scale: f64,
    pub interpolate_x: bool,
}

impl Element for Animation {
    const TAG: &'static str = "animation";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            name: fields.required("name")?,
            filename: fields.required("filename")?,
            scale: fields.value_or(cx, "scale", 1.0),
            interpolate_x: fields.value_or(cx, "interpolate_x", false),
        })
    }
}

/// Animated, non-physical figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub pose: Pose,
    pub skin: Option<Skin>,
    pub animations: Vec<Animation>,
    pub script: Option<Unsupported>,
    pub plugins: Vec<Plugin>,
}

impl Actor {
    pub(crate) fn wire_static(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        self.pose.to_static_graph(frames, graph, &self.name)
    }

    pub(crate) fn wire_dynamic(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        attach_rigid(frames, graph, scaffolding, &self.name, WORLD_FRAME)?;
        frames.get(&self.name)
    }
}

impl Element for Actor {
    const TAG: &'static str = "actor";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            pose: Pose::of(node, Self::TAG, cx)?,
            skin: fields.optional(cx, Skin::TAG)?,
            animations: fields.list(cx)?,
            script: fields.unsupported(cx, "script"),
            plugins: fields.list(cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skin_and_animations() {
        let node = SpecificElement::new("actor")
            .with_attribute("name", "walker")
            .with_child(SpecificElement::new("skin").with_value("filename", "walk.dae"))
            .with_child(
                SpecificElement::new("animation")
                    .with_attribute("name", "walking")
                    .with_value("filename", "walk.dae")
                    .with_value("interpolate_x", "true"),
            )
            .with_child(SpecificElement::new("script"));
        let mut cx = Normalize::new(SdfVersion::V1_6);
        let actor = Actor::from_specific(&node, &mut cx).unwrap();
        assert_eq!(actor.skin.as_ref().map(|s| s.scale), Some(1.0));
        assert!(actor.animations[0].interpolate_x);
        assert!(actor.script.is_some());
        assert_eq!(cx.diagnostics().len(), 1);
    }
}
