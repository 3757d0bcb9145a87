//! `tfgraph-types` – shared vocabulary for the frame graph crates.
//!
//! Holds the types that cross crate boundaries: the [`FrameError`] taxonomy,
//! the [`TransformKind`] tag, the unordered [`FramePair`] edge key and the
//! [`JointType`] enumeration used by both the store's joint side table and
//! the model importer.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three disjoint transform collections kept by a frame graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// A fixed rigid pose.
    Static,
    /// A pose supplied at runtime by a producer.
    Dynamic,
    /// An illustrative pose, never used for chain resolution.
    Example,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Static => write!(f, "static"),
            TransformKind::Dynamic => write!(f, "dynamic"),
            TransformKind::Example => write!(f, "example"),
        }
    }
}

/// Unordered pair of frame names, used as the identity of an edge.
///
/// `FramePair::new("a", "b") == FramePair::new("b", "a")`.  The names are
/// stored sorted so the type can key ordered maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FramePair {
    lo: String,
    hi: String,
}

impl FramePair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }
}

impl fmt::Display for FramePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.lo, self.hi)
    }
}

/// Kinds of joints understood by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    /// Rigid connection, never movable.
    Fixed,
    /// Rotation about an axis within `[lower, upper]`.
    Revolute,
    /// Unbounded rotation about an axis.
    Continuous,
    /// Translation along an axis within `[lower, upper]`.
    Prismatic,
}

impl JointType {
    /// `false` for joint types that have no movable axis.
    pub fn has_axis(self) -> bool {
        !matches!(self, JointType::Fixed)
    }

    /// `true` when motion along the axis is a rotation.
    pub fn is_rotational(self) -> bool {
        matches!(self, JointType::Revolute | JointType::Continuous)
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointType::Fixed => write!(f, "fixed"),
            JointType::Revolute => write!(f, "revolute"),
            JointType::Continuous => write!(f, "continuous"),
            JointType::Prismatic => write!(f, "prismatic"),
        }
    }
}

/// Errors raised by the frame graph, the chain resolver and the importer.
///
/// Messages are kept short; callers are expected to wrap them with their own
/// context before showing them to a user.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameError {
    #[error("no transformation chain from {from} to {to}")]
    TransformationNotFound { from: String, to: String },

    #[error("frame {0} is not declared")]
    MissingFrame(String),

    #[error("a {kind} transform between {from} and {to} is already registered")]
    DuplicateTransform {
        kind: TransformKind,
        from: String,
        to: String,
    },

    #[error("frame names must not be empty")]
    EmptyFrameName,

    #[error("joint {joint} references unknown link {link}")]
    UnknownLink { joint: String, link: String },
}

impl FrameError {
    pub fn not_found(from: &str, to: &str) -> Self {
        FrameError::TransformationNotFound {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
