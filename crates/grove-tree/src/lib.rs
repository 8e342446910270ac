//! Live object tree over a hierarchical store.
//!
//! A [`File`] session presents the groups and leaves of a store as a tree
//! of [`Node`] handles with stable identity: while a node stays attached,
//! every lookup of its path returns the same instance, and renames, moves
//! and copies keep that instance consistent with the store.
//!
//! # Modules
//!
//! - [`file`] -- sessions: open modes, close, flush, the public API
//! - [`node`] -- node handles, front-end members, locators
//! - [`ops`] -- create, remove, move and copy
//! - [`attrs`] -- persisted attributes and the system attribute names
//! - [`undo`] -- undo/redo log with marks
//! - [`walk`] -- lazy traversal
//! - [`flavor`] -- leaf data representations
//! - [`warning`] -- advisory warnings and the warning policy
//! - [`config`] -- session configuration
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use grove_store::InMemoryStore;
//! use grove_tree::{File, FileMode, SessionConfig};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let file = File::from_store(store, SessionConfig::with_mode(FileMode::Append))?;
//! let group = file.create_group("/", "agroup", Some("Group title"))?;
//! file.rename_node(&group, "renamed", false)?;
//! assert!(file.get_node("/renamed")?.ptr_eq(&group));
//! file.close()?;
//! assert!(group.is_closed());
//! # Ok::<(), grove_tree::TreeError>(())
//! ```

pub mod attrs;
mod cache;
pub mod config;
pub mod error;
pub mod file;
pub mod flavor;
pub mod node;
pub mod ops;
mod session;
pub mod undo;
pub mod walk;
pub mod warning;

#[cfg(test)]
pub(crate) mod testutil;

pub use attrs::AttributeSet;
pub use config::{FileMode, SessionConfig};
pub use error::{NodeError, TreeError, TreeResult};
pub use file::File;
pub use flavor::{Flavor, LeafData};
pub use node::{Locator, Member, Node, NodeClass};
pub use ops::{CopyOptions, NodeSpec};
pub use undo::MarkId;
pub use walk::{Walk, WalkOrder};
pub use warning::{Warning, WarningPolicy};
