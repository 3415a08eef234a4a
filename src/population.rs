//! `<population>`: many copies of one model laid out by a distribution.

use nalgebra::Vector3;

use crate::element::{Diagnostic, Element, Fields, Normalize};
use crate::error::{Result, SdfError};
use crate::model::Model;
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::transform::Transform;
use crate::version::SdfVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Random,
    Uniform,
    Grid,
    LinearX,
    LinearY,
    LinearZ,
}

impl DistributionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionKind::Random => "random",
            DistributionKind::Uniform => "uniform",
            DistributionKind::Grid => "grid",
            DistributionKind::LinearX => "linear-x",
            DistributionKind::LinearY => "linear-y",
            DistributionKind::LinearZ => "linear-z",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(match text {
            "random" => DistributionKind::Random,
            "uniform" => DistributionKind::Uniform,
            "grid" => DistributionKind::Grid,
            "linear-x" => DistributionKind::LinearX,
            "linear-y" => DistributionKind::LinearY,
            "linear-z" => DistributionKind::LinearZ,
            other => {
                return Err(SdfError::invalid_value(
                    "distribution",
                    "type",
                    format!("unknown distribution '{other}'"),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub kind: DistributionKind,
    pub rows: u32,
    pub cols: u32,
    pub step: Vector3<f64>,
}

impl Element for Distribution {
    const TAG: &'static str = "distribution";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let kind = match node.field("type") {
            Some(text) => DistributionKind::parse(text)?,
            None => DistributionKind::Random,
        };
        Ok(Self {
            kind,
            rows: fields.value_or(cx, "rows", 1),
            cols: fields.value_or(cx, "cols", 1),
            step: fields.value_or(cx, "step", Vector3::new(0.5, 0.5, 0.0)),
        })
    }
}

/// Area the clones are spread over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    Box { size: Vector3<f64> },
    Cylinder { radius: f64, length: f64 },
}

impl Region {
    fn extent(&self) -> Vector3<f64> {
        match *self {
            Region::Box { size } => size,
            Region::Cylinder { radius, length } => Vector3::new(2.0 * radius, 2.0 * radius, length),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub pose: Pose,
    pub model_count: u32,
    pub distribution: Distribution,
    pub region: Option<Region>,
    /// Template every clone is copied from.
    pub model: Model,
}

impl Population {
    /// Offsets of the clones from the population pose.
    fn offsets(&self, cx: &mut Normalize<'_>) -> Vec<Vector3<f64>> {
        let Distribution {
            kind,
            rows,
            cols,
            step,
        } = self.distribution;
        let extent = self.region.map_or_else(Vector3::zeros, |region| region.extent());
        let linear = |axis: usize| -> Vec<Vector3<f64>> {
            let count = self.model_count.max(1);
            (0..count)
                .map(|i| {
                    let mut offset = Vector3::zeros();
                    offset[axis] = extent[axis] * ((f64::from(i) + 0.5) / f64::from(count) - 0.5);
                    offset
                })
                .collect()
        };
        match kind {
            DistributionKind::Grid => (0..rows)
                .flat_map(|row| {
                    (0..cols).map(move |col| {
                        Vector3::new(f64::from(col) * step.x, f64::from(row) * step.y, 0.0)
                    })
                })
                .collect(),
            DistributionKind::LinearX => linear(0),
            DistributionKind::LinearY => linear(1),
            DistributionKind::LinearZ => linear(2),
            DistributionKind::Random | DistributionKind::Uniform => {
                cx.report(Diagnostic::UnsupportedDistribution {
                    population: self.name.clone(),
                    distribution: kind.as_str().to_string(),
                });
                vec![Vector3::zeros(); self.model_count as usize]
            }
        }
    }

    /// Clones named `{model}_clone_{i}`, each placed at the population pose
    /// shifted by its offset and then by the template's own pose.
    pub fn expand(&self, cx: &mut Normalize<'_>) -> Vec<Model> {
        let origin = self.pose.to_tf_link();
        let template = self.model.pose.to_tf_link();
        self.offsets(cx)
            .into_iter()
            .enumerate()
            .map(|(i, offset)| {
                let placed = origin * Transform::translation(offset) * template;
                let mut clone = self.model.clone();
                clone.name = format!("{}_clone_{i}", self.model.name);
                clone.pose = Pose::from_transform(&placed, self.pose.relative_to.clone());
                clone
            })
            .collect()
    }
}

impl Element for Population {
    const TAG: &'static str = "population";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let region = if let Some(region) = node.child("box") {
            Some(Region::Box {
                size: Fields::new(region, "box").value_or(cx, "size", Vector3::new(1.0, 1.0, 1.0)),
            })
        } else if let Some(region) = node.child("cylinder") {
            let region = Fields::new(region, "cylinder");
            Some(Region::Cylinder {
                radius: region.value_or(cx, "radius", 1.0),
                length: region.value_or(cx, "length", 1.0),
            })
        } else {
            None
        };
        let template = node.child(Model::TAG).ok_or(SdfError::MissingField {
            element: Self::TAG,
            field: "model",
        })?;
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            pose: Pose::of(node, Self::TAG, cx)?,
            model_count: fields.value_or(cx, "model_count", 1),
            distribution: fields.element(cx, Distribution::TAG)?,
            region,
            model: Model::from_specific(template, cx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn population(distribution: SpecificElement) -> SpecificElement {
        SpecificElement::new("population")
            .with_attribute("name", "crates")
            .with_value("model_count", "3")
            .with_child(SpecificElement::new("pose").with_text("10 0 0 0 0 0"))
            .with_child(SpecificElement::new("box").with_value("size", "6 2 1"))
            .with_child(distribution)
            .with_child(
                SpecificElement::new("model")
                    .with_attribute("name", "crate")
                    .with_child(SpecificElement::new("link").with_attribute("name", "body")),
            )
    }

    #[test]
    fn grid_layout() {
        let node = population(
            SpecificElement::new("distribution")
                .with_value("type", "grid")
                .with_value("rows", "2")
                .with_value("cols", "2")
                .with_value("step", "1 3 0"),
        );
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let clones = Population::from_specific(&node, &mut cx).unwrap().expand(&mut cx);
        let names: Vec<&str> = clones.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["crate_clone_0", "crate_clone_1", "crate_clone_2", "crate_clone_3"]
        );
        assert_relative_eq!(clones[3].pose.position(), Vector3::new(11.0, 3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn linear_layout_is_centered() {
        let node = population(SpecificElement::new("distribution").with_value("type", "linear-x"));
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let clones = Population::from_specific(&node, &mut cx).unwrap().expand(&mut cx);
        let xs: Vec<f64> = clones.iter().map(|m| m.pose.value[0]).collect();
        assert_eq!(xs.len(), 3);
        for (x, expected) in xs.iter().zip([8.0, 10.0, 12.0]) {
            assert_relative_eq!(*x, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn random_is_reported() {
        let node = population(SpecificElement::new("distribution").with_value("type", "random"));
        let mut cx = Normalize::new(SdfVersion::V1_7);
        let clones = Population::from_specific(&node, &mut cx).unwrap().expand(&mut cx);
        assert_eq!(clones.len(), 3);
        assert!(matches!(
            cx.diagnostics(),
            [Diagnostic::UnsupportedDistribution { distribution, .. }] if distribution == "random"
        ));
    }
}
