//! Frame Graph Store.
//!
//! [`FrameGraph`] holds the set of declared frame names and three independent
//! collections of transform edges: static, dynamic and example.  Static and
//! dynamic edges are keyed by the unordered [`FramePair`] of their endpoints,
//! so an edge registered `a => b` is also the edge looked up for `b => a`,
//! traversed in reverse.  Example edges are kept apart and never take part in
//! chain resolution.
//!
//! # Example
//!
//! ```rust
//! use tfgraph_core::geometry::{Pose, Vec3};
//! use tfgraph_core::graph::FrameGraph;
//!
//! let mut graph = FrameGraph::new();
//! graph.static_transform(Pose::from_translation(Vec3::new(1.0, 0.0, 0.0)), "base", "world")?;
//!
//! let reversed = graph.transformation_for("world", "base")?;
//! assert!(reversed.inverted);
//! assert_eq!(reversed.from(), "world");
//! assert!((reversed.pose().unwrap().translation.x + 1.0).abs() < 1e-9);
//! # Ok::<(), tfgraph_types::FrameError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tfgraph_types::{FrameError, FramePair, JointType, TransformKind};
use tracing::debug;

use crate::chain::ChainResolver;
use crate::geometry::Pose;
use crate::producer::Producer;

// ────────────────────────────────────────────────────────────────────────────
// Transform
// ────────────────────────────────────────────────────────────────────────────

/// A transform edge as stored, in its registration direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Static {
        from: String,
        to: String,
        pose: Pose,
    },
    Dynamic {
        from: String,
        to: String,
        producer: Producer,
    },
    Example {
        from: String,
        to: String,
        pose: Pose,
    },
}

impl Transform {
    pub fn from(&self) -> &str {
        match self {
            Transform::Static { from, .. }
            | Transform::Dynamic { from, .. }
            | Transform::Example { from, .. } => from,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            Transform::Static { to, .. }
            | Transform::Dynamic { to, .. }
            | Transform::Example { to, .. } => to,
        }
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            Transform::Static { .. } => TransformKind::Static,
            Transform::Dynamic { .. } => TransformKind::Dynamic,
            Transform::Example { .. } => TransformKind::Example,
        }
    }

    pub fn pair(&self) -> FramePair {
        FramePair::new(self.from(), self.to())
    }

    /// The stored pose; `None` for dynamic transforms.
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            Transform::Static { pose, .. } | Transform::Example { pose, .. } => Some(pose),
            Transform::Dynamic { .. } => None,
        }
    }

    /// The bound producer; `None` for static and example transforms.
    pub fn producer(&self) -> Option<&Producer> {
        match self {
            Transform::Dynamic { producer, .. } => Some(producer),
            Transform::Static { .. } | Transform::Example { .. } => None,
        }
    }

    fn rename(&mut self, mapping: &HashMap<String, String>) {
        let (from, to) = match self {
            Transform::Static { from, to, .. }
            | Transform::Dynamic { from, to, .. }
            | Transform::Example { from, to, .. } => (from, to),
        };
        if let Some(new) = mapping.get(from.as_str()) {
            *from = new.clone();
        }
        if let Some(new) = mapping.get(to.as_str()) {
            *to = new.clone();
        }
    }
}

/// A transform together with the direction it is traversed in.
///
/// `inverted` is `true` when the requested direction is the reverse of the
/// stored one; the accessors then report the requested orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformLink {
    pub transform: Transform,
    pub inverted: bool,
}

impl TransformLink {
    pub fn new(transform: Transform, inverted: bool) -> Self {
        Self {
            transform,
            inverted,
        }
    }

    /// View `transform` as leaving `from`.
    pub fn oriented(transform: &Transform, from: &str) -> Self {
        Self::new(transform.clone(), transform.from() != from)
    }

    pub fn from(&self) -> &str {
        if self.inverted {
            self.transform.to()
        } else {
            self.transform.from()
        }
    }

    pub fn to(&self) -> &str {
        if self.inverted {
            self.transform.from()
        } else {
            self.transform.to()
        }
    }

    pub fn kind(&self) -> TransformKind {
        self.transform.kind()
    }

    /// The pose of `from()` in `to()`; `None` for dynamic transforms.
    pub fn pose(&self) -> Option<Pose> {
        self.transform
            .pose()
            .map(|p| if self.inverted { p.inverse() } else { *p })
    }

    pub fn producer(&self) -> Option<&Producer> {
        self.transform.producer()
    }
}

/// Introspection record for a movable joint, keyed in the graph by its
/// `(post, pre)` frame pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredJoint {
    /// Scoped joint name, e.g. `"arm::elbow"`.
    pub name: String,
    pub joint_type: JointType,
    /// Frame of the parent link.
    pub parent: String,
    /// Frame of the child link.
    pub child: String,
    pub lower: f64,
    pub upper: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// FrameGraph
// ────────────────────────────────────────────────────────────────────────────

/// Named frames and the transforms that relate them.
///
/// At most one static and one dynamic edge may exist per unordered frame
/// pair (both may coexist); any number of example edges may be added.
/// Cloning, or [`FrameGraph::dup`], produces a fully independent copy.
#[derive(Debug, Clone, Default)]
pub struct FrameGraph {
    frames: BTreeSet<String>,
    static_transforms: BTreeMap<FramePair, Transform>,
    dynamic_transforms: BTreeMap<FramePair, Transform>,
    example_transforms: Vec<Transform>,
    joints: BTreeMap<(String, String), RegisteredJoint>,
}

impl FrameGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Frames ───────────────────────────────────────────────────────────────

    /// Declare frames.  Already known names are left alone.
    ///
    /// # Errors
    ///
    /// [`FrameError::EmptyFrameName`] if any name is empty; nothing is
    /// declared in that case.
    pub fn declare_frames<I, S>(&mut self, names: I) -> Result<(), FrameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        if names.iter().any(|n| n.as_ref().is_empty()) {
            return Err(FrameError::EmptyFrameName);
        }
        for name in names {
            let name = name.as_ref();
            if self.frames.insert(name.to_string()) {
                debug!(frame = name, "declared frame");
            }
        }
        Ok(())
    }

    pub fn declare_frame(&mut self, name: &str) -> Result<(), FrameError> {
        self.declare_frames([name])
    }

    pub fn has_frame(&self, name: &str) -> bool {
        self.frames.contains(name)
    }

    /// Fail on the first of `names` that was never declared.
    ///
    /// # Errors
    ///
    /// [`FrameError::MissingFrame`] naming that frame.
    pub fn check_frames<'a, I>(&self, names: I) -> Result<(), FrameError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match names.into_iter().find(|n| !self.has_frame(n)) {
            Some(missing) => Err(FrameError::MissingFrame(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Declared frames, in sorted order.
    pub fn frames(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    // ── Transforms ───────────────────────────────────────────────────────────

    /// `true` when a static or dynamic edge connects `a` and `b`, in either
    /// direction.  Example edges do not count.
    pub fn has_transform(&self, a: &str, b: &str) -> bool {
        let pair = FramePair::new(a, b);
        self.static_transforms.contains_key(&pair) || self.dynamic_transforms.contains_key(&pair)
    }

    /// Register a fixed pose between `from` and `to`, declaring both frames.
    ///
    /// `pose` is the pose of `from` expressed in `to`.
    ///
    /// # Errors
    ///
    /// [`FrameError::DuplicateTransform`] if a static edge already connects
    /// the two frames (in either direction).
    pub fn static_transform(
        &mut self,
        pose: Pose,
        from: &str,
        to: &str,
    ) -> Result<Transform, FrameError> {
        self.insert(Transform::Static {
            from: from.to_string(),
            to: to.to_string(),
            pose,
        })
    }

    /// Shorthand for a static transform with the identity pose.
    pub fn identity_transform(&mut self, from: &str, to: &str) -> Result<Transform, FrameError> {
        self.static_transform(Pose::identity(), from, to)
    }

    /// Register a transform whose value is supplied at runtime by `producer`.
    ///
    /// # Errors
    ///
    /// [`FrameError::DuplicateTransform`] if a dynamic edge already connects
    /// the two frames.
    pub fn dynamic_transform(
        &mut self,
        producer: impl Into<Producer>,
        from: &str,
        to: &str,
    ) -> Result<Transform, FrameError> {
        self.insert(Transform::Dynamic {
            from: from.to_string(),
            to: to.to_string(),
            producer: producer.into(),
        })
    }

    /// Register an illustrative pose.  Never fails on collisions.
    pub fn example_transform(
        &mut self,
        pose: Pose,
        from: &str,
        to: &str,
    ) -> Result<Transform, FrameError> {
        self.insert(Transform::Example {
            from: from.to_string(),
            to: to.to_string(),
            pose,
        })
    }

    fn insert(&mut self, transform: Transform) -> Result<Transform, FrameError> {
        let (from, to) = (transform.from(), transform.to());
        if from.is_empty() || to.is_empty() {
            return Err(FrameError::EmptyFrameName);
        }
        let pair = transform.pair();
        let kind = transform.kind();
        let collection = match kind {
            TransformKind::Static => Some(&self.static_transforms),
            TransformKind::Dynamic => Some(&self.dynamic_transforms),
            TransformKind::Example => None,
        };
        if collection.is_some_and(|c| c.contains_key(&pair)) {
            return Err(FrameError::DuplicateTransform {
                kind,
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.declare_frames([from, to])?;
        debug!(from, to, kind = %kind, "registered transform");
        match kind {
            TransformKind::Static => {
                self.static_transforms.insert(pair, transform.clone());
            }
            TransformKind::Dynamic => {
                self.dynamic_transforms.insert(pair, transform.clone());
            }
            TransformKind::Example => self.example_transforms.push(transform.clone()),
        }
        Ok(transform)
    }

    /// The static edge between `from` and `to`, falling back to the dynamic
    /// one, oriented so that `.from() == from`.
    ///
    /// # Errors
    ///
    /// [`FrameError::TransformationNotFound`] if neither exists.
    pub fn transformation_for(&self, from: &str, to: &str) -> Result<TransformLink, FrameError> {
        let pair = FramePair::new(from, to);
        self.static_transforms
            .get(&pair)
            .or_else(|| self.dynamic_transforms.get(&pair))
            .map(|t| TransformLink::oriented(t, from))
            .ok_or_else(|| FrameError::not_found(from, to))
    }

    /// The first example edge registered between `from` and `to`, oriented
    /// so that `.from() == from`.
    pub fn example_transform_for(
        &self,
        from: &str,
        to: &str,
    ) -> Result<TransformLink, FrameError> {
        let pair = FramePair::new(from, to);
        self.example_transforms
            .iter()
            .find(|t| t.pair() == pair)
            .map(|t| TransformLink::oriented(t, from))
            .ok_or_else(|| FrameError::not_found(from, to))
    }

    /// Static then dynamic transforms.  Example transforms are excluded.
    pub fn transforms(&self) -> impl Iterator<Item = &Transform> {
        self.static_transforms
            .values()
            .chain(self.dynamic_transforms.values())
    }

    pub fn static_transforms(&self) -> impl Iterator<Item = &Transform> {
        self.static_transforms.values()
    }

    pub fn dynamic_transforms(&self) -> impl Iterator<Item = &Transform> {
        self.dynamic_transforms.values()
    }

    pub fn example_transforms(&self) -> impl Iterator<Item = &Transform> {
        self.example_transforms.iter()
    }

    /// Number of static and dynamic transforms.
    pub fn transform_count(&self) -> usize {
        self.static_transforms.len() + self.dynamic_transforms.len()
    }

    // ── Joints ───────────────────────────────────────────────────────────────

    /// Record which joint produced the `post => pre` edge.  A later
    /// registration for the same pair replaces the earlier one.
    pub fn register_joint(&mut self, post: &str, pre: &str, joint: RegisteredJoint) {
        debug!(post, pre, joint = %joint.name, "registered joint");
        self.joints
            .insert((post.to_string(), pre.to_string()), joint);
    }

    pub fn joint_for(&self, post: &str, pre: &str) -> Option<&RegisteredJoint> {
        self.joints.get(&(post.to_string(), pre.to_string()))
    }

    /// Registered joints as `((post, pre), joint)`.
    pub fn joints(&self) -> impl Iterator<Item = (&(String, String), &RegisteredJoint)> {
        self.joints.iter()
    }

    // ── Whole-graph operations ───────────────────────────────────────────────

    /// Rename frames everywhere they appear.  Names absent from `mapping` are
    /// kept.  The graph is left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// [`FrameError::EmptyFrameName`] if a frame would be renamed to `""`,
    /// [`FrameError::DuplicateTransform`] if two edges would collapse onto
    /// the same frame pair.
    pub fn rename_frames(&mut self, mapping: &HashMap<String, String>) -> Result<(), FrameError> {
        if mapping.values().any(String::is_empty) {
            return Err(FrameError::EmptyFrameName);
        }
        let rename = |name: &String| mapping.get(name).cloned().unwrap_or_else(|| name.clone());

        let frames: BTreeSet<String> = self.frames.iter().map(rename).collect();
        let static_transforms = rekey(&self.static_transforms, mapping)?;
        let dynamic_transforms = rekey(&self.dynamic_transforms, mapping)?;
        let example_transforms = self
            .example_transforms
            .iter()
            .cloned()
            .map(|mut t| {
                t.rename(mapping);
                t
            })
            .collect();
        let joints = self
            .joints
            .iter()
            .map(|((post, pre), joint)| {
                let mut joint = joint.clone();
                joint.parent = rename(&joint.parent);
                joint.child = rename(&joint.child);
                ((rename(post), rename(pre)), joint)
            })
            .collect();

        self.frames = frames;
        self.static_transforms = static_transforms;
        self.dynamic_transforms = dynamic_transforms;
        self.example_transforms = example_transforms;
        self.joints = joints;
        debug!(renamed = mapping.len(), "renamed frames");
        Ok(())
    }

    /// Remove every frame, transform and joint registration.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.static_transforms.clear();
        self.dynamic_transforms.clear();
        self.example_transforms.clear();
        self.joints.clear();
    }

    /// An independent copy of this graph.
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// A chain resolver over the current state of this graph.
    pub fn resolver(&self) -> ChainResolver<'_> {
        ChainResolver::new(self)
    }
}

fn rekey(
    edges: &BTreeMap<FramePair, Transform>,
    mapping: &HashMap<String, String>,
) -> Result<BTreeMap<FramePair, Transform>, FrameError> {
    let mut out = BTreeMap::new();
    for transform in edges.values() {
        let mut transform = transform.clone();
        transform.rename(mapping);
        let pair = transform.pair();
        if out.contains_key(&pair) {
            return Err(FrameError::DuplicateTransform {
                kind: transform.kind(),
                from: transform.from().to_string(),
                to: transform.to().to_string(),
            });
        }
        out.insert(pair, transform);
    }
    Ok(out)
}
