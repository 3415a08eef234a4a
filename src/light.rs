use nalgebra::Vector3;

use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::Result;
use crate::graph::{attach_rigid, FrameGraph, FrameId, FrameRegistry, Scaffolding, WORLD_FRAME};
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct Attenuation {
    pub range: f64,
    pub linear: f64,
    pub constant: f64,
    pub quadratic: f64,
}

impl Element for Attenuation {
    const TAG: &'static str = "attenuation";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            range: fields.value_or(cx, "range", 10.0),
            linear: fields.value_or(cx, "linear", 1.0),
            constant: fields.value_or(cx, "constant", 1.0),
            quadratic: fields.value_or(cx, "quadratic", 0.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub sdf_version: SdfVersion,
    pub name: String,
    /// `point`, `directional` or `spot`.
    pub light_type: String,
    pub cast_shadows: bool,
    pub intensity: f64,
    pub diffuse: [f64; 4],
    pub specular: [f64; 4],
    pub attenuation: Attenuation,
    pub direction: Vector3<f64>,
    pub spot: Option<Unsupported>,
    pub pose: Pose,
}

impl Light {
    pub(crate) fn wire_static(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId> {
        self.pose.to_static_graph(frames, graph, &self.name)
    }

    /// Lights never move with a body; they stay where the world put them.
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

impl Element for Light {
    const TAG: &'static str = "light";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            light_type: fields.value_or(cx, "type", "point".to_string()),
            cast_shadows: fields.value_or(cx, "cast_shadows", false),
            intensity: fields.value_or(cx, "intensity", 1.0),
            diffuse: fields.value_or(cx, "diffuse", [1.0, 1.0, 1.0, 1.0]),
            specular: fields.value_or(cx, "specular", [0.1, 0.1, 0.1, 1.0]),
            attenuation: fields.element(cx, Attenuation::TAG)?,
            direction: fields.value_or(cx, "direction", Vector3::new(0.0, 0.0, -1.0)),
            spot: fields.unsupported(cx, "spot"),
            pose: Pose::of(node, Self::TAG, cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun() {
        let node = SpecificElement::new("light")
            .with_attribute("name", "sun")
            .with_attribute("type", "directional")
            .with_value("cast_shadows", "true")
            .with_value("direction", "-0.5 0.1 -0.9");
        let mut cx = Normalize::new(SdfVersion::V1_6);
        let light = Light::from_specific(&node, &mut cx).unwrap();
        assert_eq!(light.light_type, "directional");
        assert!(light.cast_shadows);
        assert_eq!(light.direction, Vector3::new(-0.5, 0.1, -0.9));
        assert_eq!(light.attenuation.range, 10.0);
        assert_eq!(light.diffuse, [1.0; 4]);
    }
}
