//! The loaded frame graph and the queries the shell runs against it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tfgraph_core::chain::{Chain, Overrides};
use tfgraph_core::graph::FrameGraph;
use tfgraph_core::producer::Producer;
use tfgraph_sdf::importer::{ImportSummary, JointRef, SdfImporter};
use tfgraph_sdf::loader::{self, LoadError};
use tfgraph_types::FrameError;
use tracing::info;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("import failed: {0}")]
    Import(#[from] FrameError),
}

/// Shell state: the active configuration and the graph built from the last
/// successfully imported description.
#[derive(Debug, Default)]
pub struct Session {
    pub config: Config,
    graph: FrameGraph,
    source: Option<PathBuf>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    /// File the current graph was imported from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Import the description at `path` into a fresh graph.  The current
    /// graph is kept when loading or importing fails.
    pub fn load(&mut self, path: &Path) -> Result<ImportSummary, SessionError> {
        let doc = loader::load(path)?;
        let mut graph = FrameGraph::new();
        let importer =
            SdfImporter::new(&mut graph).exclude_models(self.config.exclude_models.iter().cloned());
        let summary = if self.config.resolve_joints {
            importer.with_resolver(placeholder_producer).import(&doc)?
        } else {
            importer.import(&doc)?
        };

        info!(path = %path.display(), frames = graph.frame_count(), "loaded model description");
        self.graph = graph;
        self.source = Some(path.to_path_buf());
        self.config.model_path = Some(path.display().to_string());
        Ok(summary)
    }

    pub fn chain(&self, from: &str, to: &str) -> Result<Chain, FrameError> {
        self.graph.check_frames([from, to])?;
        self.graph
            .resolver()
            .transformation_chain(from, to, &Overrides::new())
    }

    pub fn static_chain(&self, from: &str, to: &str) -> Result<Chain, FrameError> {
        self.graph.check_frames([from, to])?;
        self.graph.resolver().resolve_static_chain(from, to)
    }

    /// Shortest chain that avoids any edge between `a` and `b`.
    pub fn chain_avoiding(
        &self,
        from: &str,
        to: &str,
        a: &str,
        b: &str,
    ) -> Result<Chain, FrameError> {
        self.graph.check_frames([from, to])?;
        let overrides = Overrides::new().forbid(a, b);
        self.graph.resolver().transformation_chain(from, to, &overrides)
    }
}

fn placeholder_producer(joint: &JointRef<'_>) -> Option<Producer> {
    Some(Producer::new(joint.full_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tfgraph_types::TransformKind;

    const ARM: &str = r#"
[[world]]
name = "lab"

[[world.model]]
name = "arm"
static = true

[[world.model.link]]
name = "base"

[[world.model.link]]
name = "forearm"
pose = { translation = [0.0, 0.0, 0.3] }

[[world.model.joint]]
name = "elbow"
type = "revolute"
parent = "base"
child = "forearm"
axis = { xyz = [0.0, 1.0, 0.0], limit = { lower = -1.5, upper = 1.5 } }

[[world.model]]
name = "ground_plane"
static = true
"#;

    fn write_arm(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("arm.toml");
        fs::write(&path, ARM).unwrap();
        path
    }

    #[test]
    fn load_without_resolver_leaves_joints_unbound() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::default();
        let summary = session.load(&path).unwrap();

        assert_eq!(summary.dynamic_bindings, 0);
        assert_eq!(session.source(), Some(path.as_path()));
        assert!(session.chain("arm::forearm", "lab").is_err());
        assert!(session.chain("arm::base", "lab").is_ok());
    }

    #[test]
    fn resolve_joints_binds_placeholder_producers() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::new(Config {
            resolve_joints: true,
            ..Config::default()
        });
        session.load(&path).unwrap();

        let chain = session.chain("arm::forearm", "lab").unwrap();
        let partition = chain.partition();
        assert_eq!(partition.producers(), [&Producer::new("lab::arm::elbow")]);
        assert!(session.static_chain("arm::forearm", "lab").is_err());
    }

    #[test]
    fn forbidding_the_only_route_fails() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::default();
        session.load(&path).unwrap();

        assert!(
            session
                .chain_avoiding("arm::base", "lab", "arm", "lab")
                .is_err()
        );
        let chain = session.static_chain("arm::base", "lab").unwrap();
        assert!(chain.links().iter().all(|l| l.kind() == TransformKind::Static));
    }

    #[test]
    fn chain_to_undeclared_frame_names_it() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::default();
        session.load(&path).unwrap();
        assert_eq!(
            session.chain("arm::base", "arm::gripper").unwrap_err(),
            FrameError::MissingFrame("arm::gripper".into())
        );
    }

    #[test]
    fn excluded_models_come_from_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::new(Config {
            exclude_models: vec!["ground_plane".into()],
            ..Config::default()
        });
        let summary = session.load(&path).unwrap();
        assert_eq!(summary.excluded_models, 1);
        assert!(!session.graph().has_frame("ground_plane"));
    }

    #[test]
    fn failed_load_keeps_previous_graph() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_arm(&dir);
        let mut session = Session::default();
        session.load(&path).unwrap();

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[[model]]\nname = 3\n").unwrap();
        assert!(matches!(session.load(&bad), Err(SessionError::Load(_))));
        assert!(session.graph().has_frame("arm::base"));
        assert_eq!(session.source(), Some(path.as_path()));
    }
}
