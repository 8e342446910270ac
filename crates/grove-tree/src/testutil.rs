//! Shared fixtures for unit tests.

use std::sync::Arc;

use grove_store::{HierStore, InMemoryStore, Scalar, Table};

use crate::config::{FileMode, SessionConfig};
use crate::file::File;
use crate::warning::WarningPolicy;

pub(crate) fn ints(values: &[i64]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::Int(*v)).collect()
}

pub(crate) fn config(mode: FileMode) -> SessionConfig {
    SessionConfig {
        title: Some("Title example".into()),
        ..SessionConfig::with_mode(mode)
    }
}

/// A writable session over a fresh in-memory store.
pub(crate) fn empty_file() -> (File, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let dyn_store: Arc<dyn HierStore> = store.clone();
    let file = File::from_store(dyn_store, config(FileMode::Append)).unwrap();
    (file, store)
}

/// Same, with warnings escalated to errors.
pub(crate) fn strict_file() -> File {
    let store: Arc<dyn HierStore> = Arc::new(InMemoryStore::new());
    let config = SessionConfig {
        warning_policy: WarningPolicy::Error,
        ..config(FileMode::Append)
    };
    File::from_store(store, config).unwrap()
}

/// Populate the standard tree:
///
/// ```text
/// /
/// ├── agroup
/// │   ├── agroup3
/// │   ├── anarray1   [1, 2]
/// │   └── anarray2   [1, 2, 3]
/// ├── agroup2
/// ├── anarray        [1, 2, 3, 4, 5, 6]
/// └── atable         var1: 0..4
/// ```
pub(crate) fn populate(file: &File) {
    file.create_array("/", "anarray", ints(&[1, 2, 3, 4, 5, 6]), Some("Array title"))
        .unwrap();
    let mut table = Table::new(["var1"]);
    for i in 0..4 {
        table.push_row(vec![Scalar::Int(i)]).unwrap();
    }
    file.create_table("/", "atable", table, Some("Table title"))
        .unwrap();
    let group = file.create_group("/", "agroup", Some("Group title")).unwrap();
    file.create_group("/", "agroup2", None).unwrap();
    file.create_array(&group, "anarray1", ints(&[1, 2]), Some("Array title 1"))
        .unwrap();
    file.create_array(&group, "anarray2", ints(&[1, 2, 3]), Some("Array title 2"))
        .unwrap();
    file.create_group(&group, "agroup3", Some("Group title 3"))
        .unwrap();
}

pub(crate) fn populated_file() -> (File, Arc<InMemoryStore>) {
    let (file, store) = empty_file();
    populate(&file);
    (file, store)
}
