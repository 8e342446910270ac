//! Node paths for the Grove object tree.
//!
//! Every node in a Grove tree is addressed by an absolute, `/`-separated
//! path. This crate owns the rules for those paths and the names they are
//! made of; it knows nothing about stores or nodes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for path handling
//! - [`path`] -- [`NodePath`], the normalised absolute path
//! - [`names`] -- strict name validation and the advisory natural-name check
//! - [`translate`] -- [`NameMap`], front-end <-> store name translation

pub mod error;
pub mod names;
pub mod path;
pub mod translate;

pub use error::{PathError, PathResult};
pub use names::{has_reserved_prefix, is_natural_name, validate_name, SEPARATOR};
pub use path::NodePath;
pub use translate::NameMap;
