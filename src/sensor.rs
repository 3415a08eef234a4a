//! Sensors and the camera payload.

use crate::element::{Element, Fields, Normalize, Unsupported};
use crate::error::Result;
use crate::graph::{attach_rigid, FrameGraph, FrameId, FrameRegistry, Scaffolding};
use crate::pose::Pose;
use crate::specific::SpecificElement;
use crate::version::SdfVersion;

// sensor payload elements without normalization logic
const UNSUPPORTED_PAYLOADS: &[&str] = &[
    "air_pressure",
    "altimeter",
    "contact",
    "force_torque",
    "gps",
    "imu",
    "lidar",
    "logical_camera",
    "magnetometer",
    "navsat",
    "ray",
    "rfid",
    "rfidtag",
    "sonar",
    "transceiver",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SensorPayload {
    None,
    Camera(Camera),
    Unsupported(Unsupported),
}

/// A sensor attached to a link or a joint. It owns one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub sdf_version: SdfVersion,
    pub name: String,
    pub sensor_type: String,
    pub always_on: bool,
    pub update_rate: f64,
    pub visualize: bool,
    pub topic: Option<String>,
    pub pose: Pose,
    pub payload: SensorPayload,
}

impl Sensor {
    pub fn camera(&self) -> Option<&Camera> {
        match &self.payload {
            SensorPayload::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Wire this sensor's frame, declared as `key`, along its pose.
    pub(crate) fn wire_static(
        &self,
        key: &str,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
    ) -> Result<FrameId> {
        self.pose.to_static_graph(frames, graph, key)
    }

    /// Rigidly attach this sensor's frame to the body that carries it.
    pub(crate) fn wire_dynamic(
        &self,
        key: &str,
        body: &str,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId> {
        attach_rigid(frames, graph, scaffolding, key, body)?;
        frames.get(key)
    }
}

impl Element for Sensor {
    const TAG: &'static str = "sensor";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        let payload = if let Some(camera) = fields.optional::<Camera>(cx, Camera::TAG)? {
            SensorPayload::Camera(camera)
        } else if let Some(tag) = UNSUPPORTED_PAYLOADS
            .iter()
            .find(|tag| node.child(tag).is_some())
        {
            fields
                .unsupported(cx, tag)
                .map_or(SensorPayload::None, SensorPayload::Unsupported)
        } else {
            SensorPayload::None
        };

        Ok(Self {
            sdf_version: cx.version(),
            name: fields.required("name")?,
            sensor_type: fields.required("type")?,
            always_on: fields.value_or(cx, "always_on", false),
            update_rate: fields.value_or(cx, "update_rate", 0.0),
            visualize: fields.value_or(cx, "visualize", false),
            topic: fields.value(cx, "topic"),
            pose: Pose::of(node, Self::TAG, cx)?,
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl Element for CameraImage {
    const TAG: &'static str = "image";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            width: fields.value_or(cx, "width", 320),
            height: fields.value_or(cx, "height", 240),
            format: fields.value_or(cx, "format", "R8G8B8".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraClip {
    pub near: f64,
    pub far: f64,
}

impl Element for CameraClip {
    const TAG: &'static str = "clip";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            near: fields.value_or(cx, "near", 0.1),
            far: fields.value_or(cx, "far", 100.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub sdf_version: SdfVersion,
    pub name: Option<String>,
    pub horizontal_fov: f64,
    pub image: CameraImage,
    pub clip: CameraClip,
    pub pose: Pose,
}

impl Element for Camera {
    const TAG: &'static str = "camera";

    fn from_specific(node: &SpecificElement, cx: &mut Normalize<'_>) -> Result<Self> {
        let fields = Fields::new(node, Self::TAG);
        Ok(Self {
            sdf_version: cx.version(),
            name: fields.value(cx, "name"),
            horizontal_fov: fields.value_or(cx, "horizontal_fov", 1.047),
            image: fields.element(cx, CameraImage::TAG)?,
            clip: fields.element(cx, CameraClip::TAG)?,
            pose: Pose::of(node, Self::TAG, cx)?,
        })
    }
}
