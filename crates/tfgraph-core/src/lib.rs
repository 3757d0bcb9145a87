//! `tfgraph-core` – frames, transforms and chain resolution.
//!
//! # Modules
//!
//! - [`geometry`] – [`Pose`][geometry::Pose], [`Quaternion`][geometry::Quaternion]
//!   and [`Vec3`][geometry::Vec3]: rigid-body poses and their composition.
//! - [`producer`] – [`Producer`][producer::Producer]: identity-only handle to
//!   whatever supplies a dynamic transform at runtime.
//! - [`graph`] – [`FrameGraph`][graph::FrameGraph]: the store of declared
//!   frames and of static, dynamic and example transforms between them.
//! - [`chain`] – [`ChainResolver`][chain::ChainResolver]: breadth-first
//!   shortest-chain search over a graph, with per-call edge
//!   [`Overrides`][chain::Overrides], and [`Chain::partition`][chain::Chain::partition]
//!   into static and dynamic links.
//!
//! A graph is filled first and queried afterwards; queries only borrow it
//! immutably, so a finished graph can be shared between threads.  Use
//! [`FrameGraph::dup`][graph::FrameGraph::dup] to branch off a variant.

pub mod chain;
pub mod geometry;
pub mod graph;
pub mod producer;

pub use chain::{Chain, ChainResolver, EdgeOverride, Overrides, Partition};
pub use geometry::{Pose, Quaternion, Vec3};
pub use graph::{FrameGraph, RegisteredJoint, Transform, TransformLink};
pub use producer::Producer;
pub use tfgraph_types::{FrameError, FramePair, JointType, TransformKind};
