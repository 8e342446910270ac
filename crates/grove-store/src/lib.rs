//! Hierarchical store boundary for the Grove object tree.
//!
//! The object tree (`grove-tree`) sits on top of any store that exposes
//! groups, leaves and per-entry attributes. This crate defines that
//! boundary and ships the reference backend.
//!
//! # Entries
//!
//! - **Groups** hold uniquely named children.
//! - **Leaves** hold a [`Payload`]: an array, a table, or opaque bytes of a
//!   type this reader cannot decode ([`LeafClass::Unsupported`]).
//! - Every entry carries a map of [`AttrValue`] attributes.
//!
//! # Storage Backends
//!
//! All backends implement the [`HierStore`] trait:
//!
//! - [`InMemoryStore`] -- arena-based store for tests and embedding
//! - [`image`] -- loads and saves an [`InMemoryStore`] as a single file,
//!   and probes files for the image format
//!
//! # Design Rules
//!
//! 1. Entry handles ([`EntryId`]) are stable across renames and moves.
//! 2. Deletion is bottom-up: only leaves and empty groups can be deleted.
//! 3. The store never interprets attributes or payload contents.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod image;
pub mod memory;
pub mod traits;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use image::{probe_format, FORMAT_VERSION};
pub use memory::InMemoryStore;
pub use traits::{EntryId, EntryInfo, EntryKind, HierStore};
pub use value::{AttrValue, LeafClass, Payload, Scalar, SliceRange, Table};
