//! SDFormat versions and the per-version capability table.

use std::fmt;
use std::str::FromStr;

use crate::error::SdfError;

/// Supported SDFormat schema generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SdfVersion {
    V1_0,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V1_6,
    V1_7,
    V1_8,
}

impl SdfVersion {
    /// Every supported version, oldest first.
    pub const ALL: [SdfVersion; 8] = [
        SdfVersion::V1_0,
        SdfVersion::V1_2,
        SdfVersion::V1_3,
        SdfVersion::V1_4,
        SdfVersion::V1_5,
        SdfVersion::V1_6,
        SdfVersion::V1_7,
        SdfVersion::V1_8,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SdfVersion::V1_0 => "1.0",
            SdfVersion::V1_2 => "1.2",
            SdfVersion::V1_3 => "1.3",
            SdfVersion::V1_4 => "1.4",
            SdfVersion::V1_5 => "1.5",
            SdfVersion::V1_6 => "1.6",
            SdfVersion::V1_7 => "1.7",
            SdfVersion::V1_8 => "1.8",
        }
    }

    /// Behavior switches of this schema generation.
    pub fn capabilities(self) -> Capabilities {
        Capabilities::for_version(self)
    }
}

impl fmt::Display for SdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdfVersion {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SdfVersion::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| SdfError::UnsupportedVersion(s.to_string()))
    }
}

/// Version-conditional behavior, computed once per document and passed down
/// instead of comparing version strings at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub version: SdfVersion,
    /// Poses are spelled `<origin pose="..."/>`.
    pub pose_in_origin: bool,
    /// Attribute naming the frame a `<pose>` is expressed in, if any.
    pub pose_frame_attribute: Option<&'static str>,
    /// Joint parent/child are `<parent link=".."/>` attributes.
    pub joint_links_as_attributes: bool,
    /// `<axis><use_parent_model_frame>` is part of the schema.
    pub axis_use_parent_model_frame: bool,
    /// `<axis><xyz expressed_in="..">` is part of the schema.
    pub axis_expressed_in: bool,
    /// Links and joints may carry their own `<frame>` children.
    pub frames_in_links: bool,
    /// Models and worlds may declare `<frame>` elements.
    pub explicit_frames: bool,
    /// `<frame attached_to="..">`.
    pub frame_attached_to: bool,
    /// Models may nest `<model>` elements.
    pub nested_models: bool,
    /// Models may have zero links.
    pub empty_models: bool,
    /// `<model canonical_link="..">`.
    pub canonical_link_attribute: bool,
    /// `<model placement_frame="..">` and `<include><placement_frame>`.
    pub placement_frame: bool,
    /// `<sdf>` holds exactly one kind of payload.
    pub exclusive_payload: bool,
}

impl Capabilities {
    pub fn for_version(version: SdfVersion) -> Self {
        use SdfVersion::*;

        let since = |v: SdfVersion| version >= v;
        Self {
            version,
            pose_in_origin: version == V1_0,
            pose_frame_attribute: match version {
                V1_5 | V1_6 => Some("frame"),
                V1_7 | V1_8 => Some("relative_to"),
                _ => None,
            },
            joint_links_as_attributes: version == V1_0,
            axis_use_parent_model_frame: matches!(version, V1_5 | V1_6),
            axis_expressed_in: since(V1_7),
            frames_in_links: matches!(version, V1_5 | V1_6),
            explicit_frames: since(V1_5),
            frame_attached_to: since(V1_7),
            nested_models: since(V1_5),
            empty_models: since(V1_5),
            canonical_link_attribute: since(V1_7),
            placement_frame: since(V1_8),
            exclusive_payload: since(V1_8),
        }
    }
}
