//! Version-agnostic SDFormat model and reference-frame graph builder.
//!
//! A per-version parser hands over a [`SpecificElement`] tree; `from_specific`
//! normalizes it into one canonical tree ([`Sdf`] → [`World`] → [`Model`] →
//! [`Link`]/[`Joint`] → ...), migrating renamed and deprecated fields along the
//! way. From that tree [`FrameGraphs::build`] wires a static graph (authored
//! poses) and a dynamic graph (kinematic connectivity with settable joints).
//!
//! ```
//! use generic_sdf::{Sdf, SpecificElement};
//!
//! let doc = SpecificElement::new("sdf").with_child(
//!     SpecificElement::new("model")
//!         .with_attribute("name", "robot")
//!         .with_child(SpecificElement::new("link").with_attribute("name", "base")),
//! );
//! let (sdf, diagnostics) = Sdf::from_versioned(&doc, "1.8").unwrap();
//! assert!(diagnostics.is_empty());
//! let graphs = sdf.frame_graphs().unwrap();
//! assert!(graphs[0].dynamic_transform("robot::base", "world").is_ok());
//! ```

mod actor;
mod bfs;
mod element;
mod error;
mod frame;
mod graph;
mod include;
mod joint;
mod light;
mod link;
mod model;
mod plugin;
mod population;
mod pose;
mod sdf;
mod sensor;
mod spatial_inertial;
mod specific;
mod transform;
mod version;
mod world;

pub use actor::{Actor, Animation, Skin};
pub use element::{Diagnostic, Element, FromSdf, Normalize, Unsupported, DEFAULT_MAX_INCLUDE_DEPTH};
pub use error::{Result, SdfError};
pub use frame::Frame;
pub use graph::{
    FrameEdge, FrameGraph, FrameGraphElement, FrameGraphs, FrameId, FrameRegistry, Scaffolding,
    MODEL_FRAME, WORLD_FRAME,
};
pub use include::{DocumentParser, FragmentKind, Include, UriResolver, DEFAULT_PRIORITY};
pub use joint::{Joint, JointAxis, JointDynamics, JointLimit, JointType};
pub use light::{Attenuation, Light};
pub use link::{Battery, Collision, Inertia, Inertial, Link, VelocityDecay, Visual};
pub use model::{Gripper, Model};
pub use plugin::Plugin;
pub use population::{Distribution, DistributionKind, Population, Region};
pub use pose::Pose;
pub use sdf::{Payload, Sdf};
pub use sensor::{Camera, CameraClip, CameraImage, Sensor, SensorPayload};
pub use specific::{SpecificElement, DEFAULT_SENTINEL};
pub use transform::{Axis, JointMotion, JointTransform, Transform};
pub use version::{Capabilities, SdfVersion};
pub use world::{Physics, Scene, Wind, World};
