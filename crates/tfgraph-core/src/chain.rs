//! Chain Resolver.
//!
//! Finds a shortest sequence of transforms connecting two frames of a
//! [`FrameGraph`].  Static and dynamic edges form an undirected multigraph;
//! each edge can be walked in either direction and the walk direction is
//! recorded on the resulting [`TransformLink`].  Example edges never take
//! part.
//!
//! Per-call [`Overrides`] can forbid an edge, or replace it by a dynamic
//! edge bound to another producer, without touching the graph.
//!
//! # Example
//!
//! ```rust
//! use tfgraph_core::chain::Overrides;
//! use tfgraph_core::graph::FrameGraph;
//!
//! let mut graph = FrameGraph::new();
//! graph.identity_transform("a", "b")?;
//! graph.dynamic_transform("imu", "c", "b")?;
//!
//! let chain = graph.resolver().transformation_chain("a", "c", &Overrides::new())?;
//! assert_eq!(chain.inversions(), [false, true]);
//!
//! let forbidden = Overrides::new().forbid("b", "c");
//! assert!(graph.resolver().transformation_chain("a", "c", &forbidden).is_err());
//! # Ok::<(), tfgraph_types::FrameError>(())
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tfgraph_types::{FrameError, FramePair, TransformKind};
use tracing::trace;

use crate::geometry::Pose;
use crate::graph::{FrameGraph, Transform, TransformLink};
use crate::producer::Producer;

// ────────────────────────────────────────────────────────────────────────────
// Overrides
// ────────────────────────────────────────────────────────────────────────────

/// What to do with the edge between a pair of frames for one resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeOverride {
    /// Drop any stored edge for the pair.
    Forbid,
    /// Drop any stored edge for the pair and use a dynamic edge
    /// `from => to` bound to `producer` instead.
    Replace {
        from: String,
        to: String,
        producer: Producer,
    },
}

/// Per-call edge overrides, keyed by unordered frame pair.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: BTreeMap<FramePair, EdgeOverride>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbid the edge between `a` and `b`, whichever way it is stored.
    pub fn forbid(mut self, a: &str, b: &str) -> Self {
        self.entries.insert(FramePair::new(a, b), EdgeOverride::Forbid);
        self
    }

    /// Resolve `from => to` through `producer`.  Works whether or not the
    /// graph has an edge for the pair.
    pub fn replace(mut self, producer: impl Into<Producer>, from: &str, to: &str) -> Self {
        self.entries.insert(
            FramePair::new(from, to),
            EdgeOverride::Replace {
                from: from.to_string(),
                to: to.to_string(),
                producer: producer.into(),
            },
        );
        self
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&EdgeOverride> {
        self.entries.get(&FramePair::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn covers(&self, pair: &FramePair) -> bool {
        self.entries.contains_key(pair)
    }

    fn replacements(&self) -> impl Iterator<Item = Transform> + '_ {
        self.entries.values().filter_map(|o| match o {
            EdgeOverride::Forbid => None,
            EdgeOverride::Replace { from, to, producer } => Some(Transform::Dynamic {
                from: from.clone(),
                to: to.clone(),
                producer: producer.clone(),
            }),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chain
// ────────────────────────────────────────────────────────────────────────────

/// An ordered sequence of transforms leading from one frame to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    from: String,
    to: String,
    links: Vec<TransformLink>,
}

impl Chain {
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn links(&self) -> &[TransformLink] {
        &self.links
    }

    /// The stored transforms, in chain order.
    pub fn transforms(&self) -> Vec<Transform> {
        self.links.iter().map(|l| l.transform.clone()).collect()
    }

    pub fn inversions(&self) -> Vec<bool> {
        self.links.iter().map(|l| l.inverted).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Split into static and dynamic links, each in chain order.
    pub fn partition(&self) -> Partition {
        let mut partition = Partition::default();
        for link in &self.links {
            match link.kind() {
                TransformKind::Static => partition.statics.push(link.clone()),
                TransformKind::Dynamic => partition.dynamics.push(link.clone()),
                TransformKind::Example => {}
            }
        }
        partition
    }

    /// Pose of `from()` expressed in `to()`, or `None` when the chain goes
    /// through a dynamic edge.
    pub fn pose(&self) -> Option<Pose> {
        self.links
            .iter()
            .try_fold(Pose::identity(), |acc, link| link.pose().map(|p| p * acc))
    }
}

/// The static and dynamic halves of a [`Chain`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub statics: Vec<TransformLink>,
    pub dynamics: Vec<TransformLink>,
}

impl Partition {
    /// Sequential product of the static links, each inverted when its
    /// inversion flag is set.
    pub fn static_pose(&self) -> Pose {
        self.statics.iter().fold(Pose::identity(), |acc, link| {
            link.pose().map_or(acc, |p| p * acc)
        })
    }

    /// Producers that must run for the dynamic links, in chain order.
    pub fn producers(&self) -> Vec<&Producer> {
        self.dynamics.iter().filter_map(|l| l.producer()).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ChainResolver
// ────────────────────────────────────────────────────────────────────────────

/// Shortest-chain queries over a borrowed [`FrameGraph`].
pub struct ChainResolver<'g> {
    graph: &'g FrameGraph,
}

impl<'g> ChainResolver<'g> {
    pub fn new(graph: &'g FrameGraph) -> Self {
        Self { graph }
    }

    /// Shortest chain (by edge count) from `from` to `to` over static and
    /// dynamic edges, after applying `overrides`.
    ///
    /// Among equally short chains, the first discovered wins; edges are
    /// explored static before dynamic, then replacements, each in frame-pair
    /// order.
    ///
    /// # Errors
    ///
    /// [`FrameError::TransformationNotFound`] when either frame is undeclared
    /// or no chain exists.
    pub fn transformation_chain(
        &self,
        from: &str,
        to: &str,
        overrides: &Overrides,
    ) -> Result<Chain, FrameError> {
        let edges: Vec<Transform> = self
            .graph
            .static_transforms()
            .chain(self.graph.dynamic_transforms())
            .filter(|t| !overrides.covers(&t.pair()))
            .cloned()
            .chain(overrides.replacements())
            .collect();
        self.search(from, to, &edges)
    }

    /// Like [`ChainResolver::transformation_chain`] but over static edges
    /// only: fails instead of going through a dynamic edge.
    pub fn resolve_static_chain(&self, from: &str, to: &str) -> Result<Chain, FrameError> {
        let edges: Vec<Transform> = self.graph.static_transforms().cloned().collect();
        self.search(from, to, &edges)
    }

    fn search(&self, from: &str, to: &str, edges: &[Transform]) -> Result<Chain, FrameError> {
        if !self.graph.has_frame(from) || !self.graph.has_frame(to) {
            return Err(FrameError::not_found(from, to));
        }
        if from == to {
            return Ok(Chain {
                from: from.to_string(),
                to: to.to_string(),
                links: Vec::new(),
            });
        }

        let mut adjacency: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, edge) in edges.iter().enumerate() {
            adjacency.entry(edge.from()).or_default().push(idx);
            if edge.to() != edge.from() {
                adjacency.entry(edge.to()).or_default().push(idx);
            }
        }

        // BFS; `reached_by[frame] = (previous frame, edge index)`.
        let mut reached_by: HashMap<&str, (&str, usize)> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            let Some(incident) = adjacency.get(current) else {
                continue;
            };
            for &idx in incident {
                let edge = &edges[idx];
                let next = if edge.from() == current {
                    edge.to()
                } else {
                    edge.from()
                };
                if !visited.insert(next) {
                    continue;
                }
                trace!(from = current, to = next, kind = %edge.kind(), "chain search step");
                reached_by.insert(next, (current, idx));
                if next == to {
                    return Ok(self.build_chain(from, to, edges, &reached_by));
                }
                queue.push_back(next);
            }
        }

        Err(FrameError::not_found(from, to))
    }

    fn build_chain(
        &self,
        from: &str,
        to: &str,
        edges: &[Transform],
        reached_by: &HashMap<&str, (&str, usize)>,
    ) -> Chain {
        let mut links = Vec::new();
        let mut current = to;
        while current != from {
            let Some(&(previous, idx)) = reached_by.get(current) else {
                break;
            };
            links.push(TransformLink::oriented(&edges[idx], previous));
            current = previous;
        }
        links.reverse();
        Chain {
            from: from.to_string(),
            to: to.to_string(),
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quaternion, Vec3};
    use std::f64::consts::FRAC_PI_2;

    fn abcd() -> FrameGraph {
        let mut g = FrameGraph::new();
        g.declare_frames(["a", "b", "c", "d"]).unwrap();
        g
    }

    #[test]
    fn resolves_a_transformation_chain() {
        let mut g = abcd();
        let a_b = g.identity_transform("a", "b").unwrap();
        let b_c = g.dynamic_transform("test", "b", "c").unwrap();
        let c_d = g.identity_transform("c", "d").unwrap();
        let chain = g
            .resolver()
            .transformation_chain("a", "d", &Overrides::new())
            .unwrap();
        assert_eq!(chain.transforms(), [a_b, b_c, c_d]);
        assert_eq!(chain.inversions(), [false, false, false]);
        assert_eq!((chain.from(), chain.to()), ("a", "d"));
    }

    #[test]
    fn inverts_dynamic_links_if_needed() {
        let mut g = abcd();
        let a_b = g.identity_transform("a", "b").unwrap();
        let c_b = g.dynamic_transform("test", "c", "b").unwrap();
        let c_d = g.identity_transform("c", "d").unwrap();
        let chain = g
            .resolver()
            .transformation_chain("a", "d", &Overrides::new())
            .unwrap();
        assert_eq!(chain.transforms(), [a_b, c_b, c_d]);
        assert_eq!(chain.inversions(), [false, true, false]);
    }

    #[test]
    fn inverts_static_links_if_needed() {
        let mut g = abcd();
        let a_b = g.identity_transform("a", "b").unwrap();
        let c_b = g.identity_transform("c", "b").unwrap();
        let c_d = g.identity_transform("c", "d").unwrap();
        let chain = g
            .resolver()
            .transformation_chain("a", "d", &Overrides::new())
            .unwrap();
        assert_eq!(chain.transforms(), [a_b, c_b, c_d]);
        assert_eq!(chain.inversions(), [false, true, false]);
        assert_eq!(chain.links()[1].from(), "b");
        assert_eq!(chain.links()[1].to(), "c");
    }

    #[test]
    fn resolves_the_shortest_path() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.identity_transform("c", "b").unwrap();
        let c_d = g.identity_transform("c", "d").unwrap();
        let a_c = g.identity_transform("a", "c").unwrap();
        let chain = g
            .resolver()
            .transformation_chain("a", "d", &Overrides::new())
            .unwrap();
        assert_eq!(chain.transforms(), [a_c, c_d]);
        assert_eq!(chain.inversions(), [false, false]);
    }

    #[test]
    fn same_frame_resolves_to_empty_chain() {
        let g = abcd();
        let chain = g
            .resolver()
            .transformation_chain("a", "a", &Overrides::new())
            .unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.pose(), Some(Pose::identity()));
    }

    #[test]
    fn undeclared_frame_is_not_found() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        let err = g
            .resolver()
            .transformation_chain("a", "ghost", &Overrides::new())
            .unwrap_err();
        assert_eq!(err, FrameError::not_found("a", "ghost"));
    }

    #[test]
    fn disconnected_frames_are_not_found() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.identity_transform("c", "d").unwrap();
        assert!(
            g.resolver()
                .transformation_chain("a", "d", &Overrides::new())
                .is_err()
        );
    }

    #[test]
    fn example_edges_are_never_used() {
        let mut g = abcd();
        g.example_transform(Pose::identity(), "a", "b").unwrap();
        assert!(
            g.resolver()
                .transformation_chain("a", "b", &Overrides::new())
                .is_err()
        );
    }

    #[test]
    fn forbidden_static_edge_breaks_the_chain_for_one_call() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.identity_transform("b", "c").unwrap();
        g.identity_transform("c", "d").unwrap();
        let resolver = g.resolver();

        assert!(resolver.transformation_chain("a", "d", &Overrides::new()).is_ok());
        let err = resolver
            .transformation_chain("a", "d", &Overrides::new().forbid("b", "c"))
            .unwrap_err();
        assert_eq!(err, FrameError::not_found("a", "d"));
        assert!(resolver.transformation_chain("a", "d", &Overrides::new()).is_ok());
    }

    #[test]
    fn forbidding_works_in_either_direction() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.dynamic_transform("test", "b", "c").unwrap();
        g.identity_transform("c", "d").unwrap();
        let resolver = g.resolver();
        assert!(
            resolver
                .transformation_chain("a", "d", &Overrides::new().forbid("c", "b"))
                .is_err()
        );
        assert!(
            resolver
                .transformation_chain("a", "d", &Overrides::new().forbid("b", "c"))
                .is_err()
        );
    }

    #[test]
    fn forbidding_removes_both_static_and_dynamic_edges_of_a_pair() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.dynamic_transform("test", "a", "b").unwrap();
        assert!(
            g.resolver()
                .transformation_chain("a", "b", &Overrides::new().forbid("a", "b"))
                .is_err()
        );
    }

    #[test]
    fn replacement_substitutes_the_producer() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.dynamic_transform("original", "b", "c").unwrap();
        let overrides = Overrides::new().replace("other", "c", "b");
        let chain = g
            .resolver()
            .transformation_chain("a", "c", &overrides)
            .unwrap();
        assert_eq!(chain.inversions(), [false, true]);
        assert_eq!(chain.links()[1].producer(), Some(&Producer::new("other")));
        // The graph itself is untouched.
        let stored = g.transformation_for("b", "c").unwrap();
        assert_eq!(stored.producer(), Some(&Producer::new("original")));
    }

    #[test]
    fn replacement_can_add_a_missing_edge() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        let overrides = Overrides::new().replace("bridge", "b", "c");
        let chain = g
            .resolver()
            .transformation_chain("a", "c", &overrides)
            .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.links()[1].kind(), TransformKind::Dynamic);
    }

    #[test]
    fn partition_preserves_order() {
        let mut g = FrameGraph::new();
        g.identity_transform("a", "b").unwrap();
        g.dynamic_transform("p1", "c", "b").unwrap();
        g.identity_transform("c", "d").unwrap();
        g.dynamic_transform("p2", "d", "e").unwrap();
        g.identity_transform("f", "e").unwrap();
        let chain = g
            .resolver()
            .transformation_chain("a", "f", &Overrides::new())
            .unwrap();
        let partition = chain.partition();
        let statics: Vec<_> = partition.statics.iter().map(|l| (l.from(), l.to())).collect();
        assert_eq!(statics, [("a", "b"), ("c", "d"), ("e", "f")]);
        let producers: Vec<_> = partition.producers().iter().map(|p| p.name()).collect();
        assert_eq!(producers, ["p1", "p2"]);
        assert!(partition.dynamics[0].inverted);
        assert!(chain.pose().is_none());
    }

    #[test]
    fn chain_pose_composes_inverted_links() {
        // base is 1 m along x of world, rotated 90° about z; camera is 1 m
        // along x of base.  The camera -> world chain walks base -> world
        // forward and camera -> base forward.
        let mut g = FrameGraph::new();
        g.static_transform(
            Pose::new(
                Vec3::unit_x(),
                Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_2),
            ),
            "base",
            "world",
        )
        .unwrap();
        g.static_transform(Pose::from_translation(Vec3::unit_x()), "camera", "base")
            .unwrap();

        let chain = g.resolver().resolve_static_chain("camera", "world").unwrap();
        let pose = chain.pose().unwrap();
        assert!(pose.translation.approx_eq(&Vec3::new(1.0, 1.0, 0.0), 1e-9));
        assert!(pose.approx_eq(&chain.partition().static_pose(), 1e-9));

        let back = g.resolver().resolve_static_chain("world", "camera").unwrap();
        assert_eq!(back.inversions(), [true, true]);
        assert!(back.pose().unwrap().approx_eq(&pose.inverse(), 1e-9));
    }

    #[test]
    fn static_chain_refuses_dynamic_edges() {
        let mut g = abcd();
        g.identity_transform("a", "b").unwrap();
        g.dynamic_transform("test", "b", "c").unwrap();
        assert!(g.resolver().resolve_static_chain("a", "b").is_ok());
        assert_eq!(
            g.resolver().resolve_static_chain("a", "c").unwrap_err(),
            FrameError::not_found("a", "c")
        );
    }
}
