//! Model Importer.
//!
//! Walks a [`Document`] and fills a [`FrameGraph`]:
//!
//! - every world, model and link gets a frame.  Model frames are named by
//!   joining the names of their enclosing models with `::` (worlds are not
//!   part of the name); link frames live under their model's frame.
//! - links are tied to their model frame by a static transform carrying the
//!   link pose, unless the link is driven by a joint.
//! - a rigid joint becomes one static transform `child => parent`.
//! - a movable joint `j` gets two extra frames, `j_pre` (attached to the
//!   parent) and `j_post` (attached to the child), an example transform
//!   `j_post => j_pre` at the middle of its range and, when the resolver
//!   provides one, a dynamic transform bound to a producer.
//! - a model that is not statically connected to its parent after all this
//!   is tied to it by its nominal pose: static for immovable models, example
//!   otherwise.
//!
//! # Example
//!
//! ```rust
//! use tfgraph_core::graph::FrameGraph;
//! use tfgraph_core::producer::Producer;
//! use tfgraph_sdf::description::Document;
//! use tfgraph_sdf::importer::{JointRef, SdfImporter};
//!
//! let doc = Document::from_toml_str(r#"
//! [[model]]
//! name = "arm"
//! [[model.link]]
//! name = "base"
//! [[model.link]]
//! name = "tool"
//! [[model.joint]]
//! name = "wrist"
//! type = "continuous"
//! parent = "base"
//! child = "tool"
//! "#)?;
//!
//! let mut graph = FrameGraph::new();
//! let summary = SdfImporter::new(&mut graph)
//!     .with_resolver(|j: &JointRef<'_>| Some(Producer::new(format!("{}_driver", j.joint.name))))
//!     .import(&doc)?;
//!
//! assert_eq!(summary.dynamic_bindings, 1);
//! assert!(graph.has_transform("arm::wrist_post", "arm::wrist_pre"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{HashSet, VecDeque};

use tfgraph_core::geometry::Pose;
use tfgraph_core::graph::{FrameGraph, RegisteredJoint};
use tfgraph_core::producer::Producer;
use tfgraph_types::FrameError;
use tracing::{debug, info, warn};

use crate::description::{scoped, Document, Joint, Model, WORLD_LINK};

/// What the producer resolver sees of a movable joint.
#[derive(Debug, Clone, Copy)]
pub struct JointRef<'a> {
    /// Joint name scoped under its model frame, e.g. `"arm::wrist"`.
    pub scoped_name: &'a str,
    /// Enclosing world, if any.
    pub world: Option<&'a str>,
    pub parent_frame: &'a str,
    pub child_frame: &'a str,
    pub joint: &'a Joint,
}

impl JointRef<'_> {
    /// Scoped name prefixed by the world name, e.g. `"lab::arm::wrist"`.
    pub fn full_name(&self) -> String {
        match self.world {
            Some(world) => scoped(world, self.scoped_name),
            None => self.scoped_name.to_string(),
        }
    }
}

/// Counters reported by [`SdfImporter::import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub worlds: usize,
    pub models: usize,
    pub links: usize,
    pub joints: usize,
    pub movable_joints: usize,
    pub dynamic_bindings: usize,
    pub excluded_models: usize,
}

type NoResolver = fn(&JointRef<'_>) -> Option<Producer>;

fn no_producer(_: &JointRef<'_>) -> Option<Producer> {
    None
}

/// Imports a [`Document`] into a [`FrameGraph`].
pub struct SdfImporter<'g, F> {
    graph: &'g mut FrameGraph,
    resolver: F,
    excluded: HashSet<String>,
    summary: ImportSummary,
}

impl<'g> SdfImporter<'g, NoResolver> {
    /// An importer that binds no producers: movable joints only get example
    /// transforms.
    pub fn new(graph: &'g mut FrameGraph) -> Self {
        Self {
            graph,
            resolver: no_producer,
            excluded: HashSet::new(),
            summary: ImportSummary::default(),
        }
    }
}

/// Where a model sits while walking the hierarchy.
#[derive(Clone, Copy)]
struct Scope<'a> {
    /// Naming prefix, empty at top level.
    prefix: &'a str,
    /// Frame the model is attached to.
    parent: Option<&'a str>,
    world: Option<&'a str>,
    /// Pose of `parent` in the world.
    parent_in_world: Pose,
}

/// A link of a model or of one of its nested submodels.
struct ScopedLink {
    /// Name relative to the model, `submodel::link` for nested links.
    relative: String,
    /// Pose in the model frame.
    pose: Pose,
    nested: bool,
}

impl<'g, F> SdfImporter<'g, F>
where
    F: FnMut(&JointRef<'_>) -> Option<Producer>,
{
    /// Use `resolver` to find a runtime producer for each movable joint.
    pub fn with_resolver<G>(self, resolver: G) -> SdfImporter<'g, G>
    where
        G: FnMut(&JointRef<'_>) -> Option<Producer>,
    {
        SdfImporter {
            graph: self.graph,
            resolver,
            excluded: self.excluded,
            summary: self.summary,
        }
    }

    /// Skip models with these names, together with everything they contain.
    pub fn exclude_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    /// Import every world and top-level model of `doc`.
    ///
    /// # Errors
    ///
    /// [`FrameError::UnknownLink`] when a joint names a link that does not
    /// exist in its model, [`FrameError::DuplicateTransform`] when the
    /// description ties the same pair of frames twice.  Frames and transforms
    /// added before the error are kept.
    pub fn import(mut self, doc: &Document) -> Result<ImportSummary, FrameError> {
        for world in &doc.worlds {
            self.graph.declare_frame(&world.name)?;
            self.summary.worlds += 1;
            let scope = Scope {
                prefix: "",
                parent: Some(world.name.as_str()),
                world: Some(world.name.as_str()),
                parent_in_world: Pose::identity(),
            };
            for model in &world.models {
                self.import_model(model, scope, &HashSet::new())?;
            }
        }

        let scope = Scope {
            prefix: "",
            parent: None,
            world: None,
            parent_in_world: Pose::identity(),
        };
        for model in &doc.models {
            self.import_model(model, scope, &HashSet::new())?;
        }

        info!(
            worlds = self.summary.worlds,
            models = self.summary.models,
            links = self.summary.links,
            joints = self.summary.joints,
            dynamic = self.summary.dynamic_bindings,
            "imported model description"
        );
        Ok(self.summary)
    }

    fn is_excluded(&mut self, model: &Model) -> bool {
        if self.excluded.contains(&model.name) {
            info!(model = %model.name, "skipping excluded model");
            self.summary.excluded_models += 1;
            true
        } else {
            false
        }
    }

    /// `driven` holds link frames that are the child of a joint in an
    /// enclosing model.
    fn import_model(
        &mut self,
        model: &Model,
        scope: Scope<'_>,
        driven: &HashSet<String>,
    ) -> Result<(), FrameError> {
        if self.is_excluded(model) {
            return Ok(());
        }
        let frame = scoped(scope.prefix, &model.name);
        self.graph.declare_frame(&frame)?;
        self.summary.models += 1;
        debug!(model = %frame, "importing model");

        let model_in_world = scope.parent_in_world * model.pose;
        let links = self.collect_links(model);
        for link in &links {
            self.graph.declare_frame(&scoped(&frame, &link.relative))?;
        }
        self.summary.links += links.iter().filter(|l| !l.nested).count();

        let mut joint_children = HashSet::new();
        for joint in &model.joints {
            self.import_joint(joint, &frame, &links, scope.world, model_in_world)?;
            joint_children.insert(joint.child.as_str());
        }

        self.link_root_links(model, &frame, &links, &joint_children, driven)?;

        let mut nested_driven = driven.clone();
        nested_driven.extend(
            joint_children
                .iter()
                .filter(|child| **child != WORLD_LINK)
                .map(|child| scoped(&frame, child)),
        );
        let nested_scope = Scope {
            prefix: &frame,
            parent: Some(frame.as_str()),
            world: scope.world,
            parent_in_world: model_in_world,
        };
        for submodel in &model.models {
            self.import_model(submodel, nested_scope, &nested_driven)?;
        }

        if let Some(parent) = scope.parent {
            self.attach_to_parent(model, &frame, parent)?;
        }
        Ok(())
    }

    /// Links of `model` and of its (non-excluded) submodels, with their pose
    /// in the model frame.
    fn collect_links(&self, model: &Model) -> Vec<ScopedLink> {
        let mut links: Vec<ScopedLink> = model
            .links
            .iter()
            .map(|l| ScopedLink {
                relative: l.name.clone(),
                pose: l.pose,
                nested: false,
            })
            .collect();

        // (submodel, name relative to `model`, submodel pose in `model`)
        let mut pending: VecDeque<(&Model, String, Pose)> = model
            .models
            .iter()
            .map(|m| (m, m.name.clone(), m.pose))
            .collect();
        while let Some((submodel, relative, pose)) = pending.pop_front() {
            if self.excluded.contains(&submodel.name) {
                continue;
            }
            links.extend(submodel.links.iter().map(|l| ScopedLink {
                relative: scoped(&relative, &l.name),
                pose: pose * l.pose,
                nested: true,
            }));
            pending.extend(
                submodel
                    .models
                    .iter()
                    .map(|m| (m, scoped(&relative, &m.name), pose * m.pose)),
            );
        }
        links
    }

    /// Tie every own link that no joint drives to the model frame.  A
    /// declared canonical link that is missing or driven is ignored.
    fn link_root_links(
        &mut self,
        model: &Model,
        frame: &str,
        links: &[ScopedLink],
        joint_children: &HashSet<&str>,
        driven: &HashSet<String>,
    ) -> Result<(), FrameError> {
        let roots: Vec<(&ScopedLink, String)> = links
            .iter()
            .filter(|l| !l.nested && !joint_children.contains(l.relative.as_str()))
            .map(|l| (l, scoped(frame, &l.relative)))
            .filter(|(_, link_frame)| !driven.contains(link_frame))
            .collect();

        if let Some(name) = model.canonical_link.as_deref() {
            if !roots.iter().any(|(l, _)| l.relative == name) {
                warn!(
                    model = %frame,
                    link = name,
                    "canonical link is missing or driven by a joint, ignoring it"
                );
            }
        }

        for (link, link_frame) in roots {
            self.graph.static_transform(link.pose, &link_frame, frame)?;
        }
        Ok(())
    }

    fn import_joint(
        &mut self,
        joint: &Joint,
        frame: &str,
        links: &[ScopedLink],
        world: Option<&str>,
        model_in_world: Pose,
    ) -> Result<(), FrameError> {
        let scoped_name = scoped(frame, &joint.name);
        self.summary.joints += 1;

        // Frame and pose in the model of one end of the joint.  The world has
        // no pose of its own; it sits at the inverse of the model's pose.
        let endpoint = |name: &str| -> Result<(String, Pose), FrameError> {
            if name == WORLD_LINK {
                let world_frame = world.unwrap_or(WORLD_LINK).to_string();
                return Ok((world_frame, model_in_world.inverse()));
            }
            links
                .iter()
                .find(|l| l.relative == name)
                .map(|l| (scoped(frame, name), l.pose))
                .ok_or_else(|| FrameError::UnknownLink {
                    joint: scoped_name.clone(),
                    link: name.to_string(),
                })
        };
        let (parent_frame, parent_in_model) = endpoint(&joint.parent)?;
        let (child_frame, child_in_model) = endpoint(&joint.child)?;

        let child_to_parent = parent_in_model.inverse() * child_in_model;
        let joint_to_child = joint.pose;
        let joint_to_parent = child_to_parent * joint_to_child;

        if joint.is_rigid() {
            debug!(joint = %scoped_name, "rigid joint");
            self.graph
                .static_transform(child_to_parent, &child_frame, &parent_frame)?;
            return Ok(());
        }

        let mut axis = joint.axis_xyz();
        if joint.axis_in_model_frame() {
            let joint_to_model = child_in_model * joint_to_child;
            axis = joint_to_model.rotation.inverse().rotate(axis);
        }
        let (lower, upper) = joint.range();
        let post_to_pre = joint.motion((lower + upper) / 2.0, axis);

        let pre = scoped(frame, &format!("{}_pre", joint.name));
        let post = scoped(frame, &format!("{}_post", joint.name));
        self.summary.movable_joints += 1;
        self.graph.register_joint(
            &post,
            &pre,
            RegisteredJoint {
                name: scoped_name.clone(),
                joint_type: joint.joint_type,
                parent: parent_frame.clone(),
                child: child_frame.clone(),
                lower,
                upper,
            },
        );
        self.graph.static_transform(joint_to_child, &post, &child_frame)?;
        self.graph.static_transform(joint_to_parent, &pre, &parent_frame)?;

        let joint_ref = JointRef {
            scoped_name: &scoped_name,
            world,
            parent_frame: &parent_frame,
            child_frame: &child_frame,
            joint,
        };
        if let Some(producer) = (self.resolver)(&joint_ref) {
            debug!(joint = %scoped_name, producer = %producer, "bound joint producer");
            self.graph.dynamic_transform(producer, &post, &pre)?;
            self.summary.dynamic_bindings += 1;
        }
        self.graph.example_transform(post_to_pre, &post, &pre)?;
        Ok(())
    }

    /// Tie `frame` to `parent` by the model's nominal pose, unless a joint to
    /// the world anchors it or a static chain already connects them.
    fn attach_to_parent(
        &mut self,
        model: &Model,
        frame: &str,
        parent: &str,
    ) -> Result<(), FrameError> {
        let anchored_to_world = model
            .joints
            .iter()
            .any(|j| j.parent == WORLD_LINK || j.child == WORLD_LINK);
        if anchored_to_world {
            debug!(model = %frame, "model anchored by a world joint");
            return Ok(());
        }
        if self
            .graph
            .resolver()
            .resolve_static_chain(frame, parent)
            .is_ok()
        {
            debug!(model = %frame, parent, "model already statically connected");
            return Ok(());
        }
        if model.is_static {
            self.graph.static_transform(model.pose, frame, parent)?;
        } else {
            self.graph.example_transform(model.pose, frame, parent)?;
        }
        Ok(())
    }
}
