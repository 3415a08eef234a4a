//! Error types for normalization and frame-graph construction.

use thiserror::Error;

use crate::include::FragmentKind;

/// Errors that abort normalization of a subtree or construction of a frame graph.
///
/// Recoverable conditions (unsupported elements, deprecated spellings) are not
/// errors; they are reported as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, Error)]
pub enum SdfError {
    /// Version string outside the supported set.
    #[error("unsupported SDFormat version: {0}")]
    UnsupportedVersion(String),

    /// Required field absent from the version-specific tree.
    #[error("missing required {field} on <{element}>")]
    MissingField {
        /// Element kind that should carry the field.
        element: &'static str,
        /// The missing field.
        field: &'static str,
    },

    /// Required field present but not interpretable.
    #[error("invalid value for {field} on <{element}>: {message}")]
    InvalidValue {
        /// Element kind carrying the field.
        element: &'static str,
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A model has nothing that could serve as its kinematic root.
    #[error("model '{model}' has no link, nested model or canonical_link to anchor its frame")]
    NoCanonicalLink {
        /// Name of the model.
        model: String,
    },

    /// `<include>` names a placement frame but no pose to place it with.
    #[error("include of '{uri}' sets placement_frame without a pose")]
    PlacementWithoutPose {
        /// URI of the include.
        uri: String,
    },

    /// Root payload shape is not allowed for the declared version.
    #[error("invalid <sdf> payload for version {version}: {message}")]
    InvalidPayload {
        /// Declared version.
        version: String,
        /// Which shape rule was broken.
        message: String,
    },

    /// Two frames with the same name in one scope.
    #[error("duplicate frame name '{0}' in scope")]
    DuplicateFrame(String),

    /// Frame referenced before `declared_frames()` produced it.
    #[error("frame '{0}' was not declared before wiring")]
    UndeclaredFrame(String),

    /// A frame can only have one parent edge per graph.
    #[error("frame '{child}' is already attached to '{parent}'")]
    AlreadyAttached {
        /// The frame being attached.
        child: String,
        /// The parent it already has.
        parent: String,
    },

    /// Attaching would close a loop of frames.
    #[error("attaching '{child}' to '{parent}' would form a cycle")]
    FrameCycle {
        /// The frame being attached.
        child: String,
        /// The requested parent.
        parent: String,
    },

    /// No chain of edges links the two frames.
    #[error("no path between frames '{from}' and '{to}'")]
    Disconnected {
        /// Source frame.
        from: String,
        /// Target frame.
        to: String,
    },

    /// Joint state set on a frame that is not driven by a parametric joint.
    #[error("frame '{0}' is not driven by a parametric joint")]
    NotAJoint(String),

    /// The fetched document holds no model, actor or light.
    #[error("no model, actor or light fragments found in '{uri}'")]
    NoFragments {
        /// URI of the include.
        uri: String,
    },

    /// Fragment kind whose include resolution has no implementation.
    #[error("resolving included {kind} fragments is not implemented")]
    UnimplementedFragment {
        /// The fragment kind that was selected.
        kind: FragmentKind,
    },

    /// Includes nested deeper than the configured limit.
    #[error("include of '{uri}' exceeds the maximum nesting depth of {depth}")]
    IncludeDepth {
        /// URI of the innermost include.
        uri: String,
        /// The configured limit.
        depth: usize,
    },

    /// The URI resolver or document parser failed.
    #[error("failed to fetch '{uri}': {message}")]
    Fetch {
        /// URI being fetched.
        uri: String,
        /// Collaborator's error message.
        message: String,
    },
}

impl SdfError {
    /// Create an invalid value error.
    pub fn invalid_value(
        element: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            element,
            field,
            message: message.into(),
        }
    }

    /// Create a payload shape error.
    pub fn invalid_payload(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Create a fetch error from a collaborator failure.
    pub fn fetch(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create a disconnected frames error.
    pub fn disconnected(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Disconnected {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Result type for normalization and graph operations.
pub type Result<T> = std::result::Result<T, SdfError>;
