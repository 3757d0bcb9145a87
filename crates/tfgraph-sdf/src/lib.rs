//! `tfgraph-sdf` – builds a frame graph from a hierarchical model description.
//!
//! # Modules
//!
//! - [`description`] – serde data model of worlds, models, links and joints.
//! - [`loader`] – reads a [`Document`] from a TOML or JSON file.
//! - [`importer`] – [`SdfImporter`]: walks a document and registers its
//!   frames, static link and joint transforms, example joint poses and,
//!   through a caller-supplied resolver, dynamic joint transforms.

pub mod description;
pub mod importer;
pub mod loader;

pub use description::{Axis, Document, Joint, Limit, Link, Model, World, SEPARATOR, WORLD_LINK};
pub use importer::{ImportSummary, JointRef, SdfImporter};
pub use loader::{load, LoadError};
