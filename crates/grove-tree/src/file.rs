//! File sessions.
//!
//! A [`File`] owns one session over a hierarchical store: either an image
//! file on disk or a caller-provided [`HierStore`]. The session is the
//! single lock around the node cache, the store handle and the undo log;
//! every operation holds it from lookup to mutation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use grove_path::NodePath;
use grove_store::{
    image, AttrValue, HierStore, InMemoryStore, Payload, Scalar, StoreError, Table,
};
use tracing::{info, warn};

use crate::attrs::TITLE;
use crate::cache::NodeCache;
use crate::config::{FileMode, SessionConfig};
use crate::error::{NodeError, TreeError, TreeResult};
use crate::node::{Locator, Node, NodeClass};
use crate::ops::{delete_subtree, CopyOptions, NodeSpec};
use crate::session::OpenSession;
use crate::undo::{MarkId, UndoLog};
use crate::walk::{Walk, WalkOrder};
use crate::warning::{Warning, WarningLog};

enum Source {
    Image(PathBuf),
    Store(Arc<dyn HierStore>),
}

enum SessionState {
    Closed,
    Open(Box<OpenSession>),
}

pub(crate) struct FileShared {
    source: Source,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl FileShared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the open session, or fail with `ClosedFile`.
    pub(crate) fn with_open<T>(
        &self,
        f: impl FnOnce(&mut OpenSession) -> TreeResult<T>,
    ) -> TreeResult<T> {
        match &mut *self.lock() {
            SessionState::Open(session) => f(session),
            SessionState::Closed => Err(TreeError::ClosedFile),
        }
    }

    fn image_path(&self) -> Option<&Path> {
        match &self.source {
            Source::Image(path) => Some(path),
            Source::Store(_) => None,
        }
    }
}

impl Drop for FileShared {
    fn drop(&mut self) {
        let state = std::mem::replace(
            self.state.get_mut().unwrap_or_else(PoisonError::into_inner),
            SessionState::Closed,
        );
        if let SessionState::Open(session) = state {
            if let Err(e) = (*session).shutdown(self.image_path()) {
                warn!(error = %e, "failed to close file session on drop");
            }
        }
    }
}

fn load_image(path: &Path) -> TreeResult<InMemoryStore> {
    image::load(path).map_err(|e| match e {
        StoreError::Io(e) => TreeError::Io(e),
        StoreError::Format(reason) => TreeError::Format {
            path: path.to_path_buf(),
            reason,
        },
        other @ (StoreError::ChecksumMismatch { .. } | StoreError::Serialization(_)) => {
            TreeError::Format {
                path: path.to_path_buf(),
                reason: other.to_string(),
            }
        }
        other => other.into(),
    })
}

/// Remove every child and attribute of the store root.
fn clear_store(store: &dyn HierStore) -> TreeResult<()> {
    let root = store.root();
    for name in store.children(root)? {
        if let Some(child) = store.lookup(root, &name)? {
            delete_subtree(store, child)?;
        }
    }
    for name in store.attr_names(root)? {
        store.delete_attr(root, &name)?;
    }
    Ok(())
}

fn is_blank(store: &dyn HierStore) -> TreeResult<bool> {
    let root = store.root();
    Ok(store.children(root)?.is_empty() && store.attr_names(root)?.is_empty())
}

/// A file session over a hierarchical store.
///
/// Cloning a `File` yields another handle to the same session.
#[derive(Clone)]
pub struct File {
    shared: Arc<FileShared>,
}

impl File {
    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open an image file in `mode`.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> TreeResult<Self> {
        Self::open_with(path, SessionConfig::with_mode(mode))
    }

    /// Open an image file with full configuration.
    pub fn open_with(path: impl AsRef<Path>, config: SessionConfig) -> TreeResult<Self> {
        Self::start(Source::Image(path.as_ref().to_path_buf()), config)
    }

    /// Open a session over an existing store.
    pub fn from_store(store: Arc<dyn HierStore>, config: SessionConfig) -> TreeResult<Self> {
        Self::start(Source::Store(store), config)
    }

    fn start(source: Source, config: SessionConfig) -> TreeResult<Self> {
        let mode = config.mode;
        let file = Self {
            shared: Arc::new(FileShared {
                source,
                config,
                state: Mutex::new(SessionState::Closed),
            }),
        };
        file.open_session(mode)?;
        Ok(file)
    }

    pub(crate) fn from_shared(shared: Arc<FileShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &FileShared {
        &self.shared
    }

    fn open_session(&self, mode: FileMode) -> TreeResult<()> {
        let shared = &self.shared;
        let config = &shared.config;
        let (store, image, fresh) = match &shared.source {
            Source::Image(path) => {
                let (loaded, fresh) = match mode {
                    FileMode::ReadOnly | FileMode::ReadWrite => (load_image(path)?, false),
                    FileMode::Append if path.exists() => (load_image(path)?, false),
                    FileMode::Append | FileMode::TruncateCreate => (InMemoryStore::new(), true),
                };
                let loaded = Arc::new(loaded);
                let store: Arc<dyn HierStore> = loaded.clone();
                (store, Some(loaded), fresh)
            }
            Source::Store(store) => {
                if mode == FileMode::TruncateCreate {
                    clear_store(store.as_ref())?;
                }
                let fresh = mode.is_writable() && is_blank(store.as_ref())?;
                (Arc::clone(store), None, fresh)
            }
        };

        let mut session = OpenSession {
            mode,
            root_entry: store.root(),
            store,
            image,
            cache: NodeCache::default(),
            undo: None,
            warnings: WarningLog::new(config.warning_policy),
            names: config.name_map.clone(),
            shared: Arc::downgrade(shared),
        };
        if fresh {
            let title = config.title.as_deref().unwrap_or("");
            session.stamp(session.root_entry, NodeClass::Group, Some(title))?;
        }
        if let Some(root) = &config.root_path {
            let path = NodePath::parse(root)?;
            let entry = session
                .store
                .resolve_from(session.store.root(), &path)?
                .ok_or(TreeError::NoSuchNode { path: path.clone() })?;
            if !session.store.info(entry)?.kind.is_group() {
                return Err(NodeError::NotAGroup { path }.into());
            }
            session.root_entry = entry;
        }
        session.check_format()?;
        if config.enable_undo && mode.is_writable() {
            session.undo = Some(UndoLog::new());
        }

        info!(
            mode = %mode,
            path = ?shared.image_path(),
            root = ?config.root_path,
            "opened file session"
        );
        *shared.lock() = SessionState::Open(Box::new(session));
        Ok(())
    }

    /// Close the session: every attached node becomes closed, the undo
    /// area is purged and a writable store is persisted.
    ///
    /// Closing a closed file does nothing.
    pub fn close(&self) -> TreeResult<()> {
        let state = std::mem::replace(&mut *self.shared.lock(), SessionState::Closed);
        match state {
            SessionState::Open(session) => (*session).shutdown(self.shared.image_path()),
            SessionState::Closed => Ok(()),
        }
    }

    /// Close (if open) and open again in `mode`.
    pub fn reopen(&self, mode: FileMode) -> TreeResult<()> {
        self.close()?;
        self.open_session(mode)
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.shared.lock(), SessionState::Open(_))
    }

    /// The open mode.
    pub fn mode(&self) -> TreeResult<FileMode> {
        self.shared.with_open(|s| Ok(s.mode))
    }

    /// The image file path, for file-backed sessions.
    pub fn filename(&self) -> Option<&Path> {
        self.shared.image_path()
    }

    /// Persist pending changes. A no-op in read-only mode.
    pub fn flush(&self) -> TreeResult<()> {
        let path = self.shared.image_path();
        self.shared.with_open(|s| {
            if s.mode.is_writable() {
                s.persist(path)?;
            }
            Ok(())
        })
    }

    /// Write a copy of the visible tree to a new image file.
    pub fn copy_file(&self, dst: impl AsRef<Path>, overwrite: bool) -> TreeResult<()> {
        let dst = dst.as_ref();
        self.shared.with_open(|s| {
            if dst.exists() && !overwrite {
                return Err(TreeError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", dst.display()),
                )));
            }
            let copy = s.export()?;
            image::save(&copy, dst)?;
            info!(dst = %dst.display(), "copied file");
            Ok(())
        })
    }

    /// Drain the warnings recorded under [`WarningPolicy::Log`](crate::WarningPolicy::Log).
    pub fn take_warnings(&self) -> TreeResult<Vec<Warning>> {
        self.shared.with_open(|s| Ok(s.warnings.take()))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn root(&self) -> TreeResult<Node> {
        self.shared.with_open(|s| s.root_node())
    }

    /// The file title (the root's `TITLE`), or an empty string.
    pub fn title(&self) -> TreeResult<String> {
        self.shared.with_open(|s| {
            let root = s.root_node()?;
            Ok(s.attr_get(&root, TITLE)?
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default())
        })
    }

    /// Resolve a path (or check a handle) to the attached node.
    pub fn get_node<'a>(&self, at: impl Into<Locator<'a>>) -> TreeResult<Node> {
        let at = at.into();
        self.shared.with_open(|s| s.locate(at))
    }

    pub fn get_child<'a>(&self, parent: impl Into<Locator<'a>>, name: &str) -> TreeResult<Node> {
        let parent = parent.into();
        self.shared.with_open(|s| {
            let parent = s.locate(parent)?;
            s.child(&parent, name)
        })
    }

    /// Returns `true` if `path` names a node.
    pub fn contains(&self, path: &str) -> TreeResult<bool> {
        let path = NodePath::parse(path)?;
        self.shared.with_open(|s| s.contains(&path))
    }

    /// Sorted names of a group's children.
    pub fn list_children<'a>(&self, group: impl Into<Locator<'a>>) -> TreeResult<Vec<String>> {
        let group = group.into();
        self.shared.with_open(|s| {
            let group = s.locate(group)?;
            s.list_children(&group)
        })
    }

    /// Lazily walk the tree from `from` (inclusive).
    pub fn walk(&self, from: &str, order: WalkOrder) -> TreeResult<Walk> {
        Ok(Walk::new(self.clone(), NodePath::parse(from)?, order))
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    pub fn create_node<'a>(
        &self,
        parent: impl Into<Locator<'a>>,
        name: &str,
        spec: NodeSpec,
        title: Option<&str>,
    ) -> TreeResult<Node> {
        let parent = parent.into();
        self.shared.with_open(|s| s.create(parent, name, spec, title))
    }

    pub fn create_group<'a>(
        &self,
        parent: impl Into<Locator<'a>>,
        name: &str,
        title: Option<&str>,
    ) -> TreeResult<Node> {
        self.create_node(parent, name, NodeSpec::Group, title)
    }

    pub fn create_array<'a>(
        &self,
        parent: impl Into<Locator<'a>>,
        name: &str,
        values: Vec<Scalar>,
        title: Option<&str>,
    ) -> TreeResult<Node> {
        self.create_node(parent, name, NodeSpec::Leaf(Payload::Array(values)), title)
    }

    pub fn create_table<'a>(
        &self,
        parent: impl Into<Locator<'a>>,
        name: &str,
        table: Table,
        title: Option<&str>,
    ) -> TreeResult<Node> {
        self.create_node(parent, name, NodeSpec::Leaf(Payload::Table(table)), title)
    }

    /// Remove a node; a non-empty group needs `recursive`.
    pub fn remove_node<'a>(&self, target: impl Into<Locator<'a>>, recursive: bool) -> TreeResult<()> {
        let target = target.into();
        self.shared.with_open(|s| s.remove(target, recursive))
    }

    /// Rename a node within its parent. The handle keeps its identity.
    pub fn rename_node<'a>(
        &self,
        target: impl Into<Locator<'a>>,
        new_name: &str,
        overwrite: bool,
    ) -> TreeResult<Node> {
        let target = target.into();
        self.shared
            .with_open(|s| s.move_node(target, None, Some(new_name), overwrite))
    }

    /// Move a node under `dst_parent`, optionally renaming it.
    pub fn move_node<'a, 'b>(
        &self,
        src: impl Into<Locator<'a>>,
        dst_parent: impl Into<Locator<'b>>,
        new_name: Option<&str>,
        overwrite: bool,
    ) -> TreeResult<Node> {
        let (src, dst_parent) = (src.into(), dst_parent.into());
        self.shared
            .with_open(|s| s.move_node(src, Some(dst_parent), new_name, overwrite))
    }

    /// Copy a node under `dst_parent`; returns the new node.
    pub fn copy_node<'a, 'b>(
        &self,
        src: impl Into<Locator<'a>>,
        dst_parent: impl Into<Locator<'b>>,
        new_name: Option<&str>,
        options: &CopyOptions,
    ) -> TreeResult<Node> {
        let (src, dst_parent) = (src.into(), dst_parent.into());
        self.shared
            .with_open(|s| s.copy_node(src, Some(dst_parent), new_name, options))
    }

    // -----------------------------------------------------------------------
    // Attribute shortcuts
    // -----------------------------------------------------------------------

    pub fn get_node_attr<'a>(
        &self,
        at: impl Into<Locator<'a>>,
        name: &str,
    ) -> TreeResult<Option<AttrValue>> {
        let at = at.into();
        self.shared.with_open(|s| {
            let node = s.locate(at)?;
            s.attr_get(&node, name)
        })
    }

    pub fn set_node_attr<'a>(
        &self,
        at: impl Into<Locator<'a>>,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> TreeResult<()> {
        let (at, value) = (at.into(), value.into());
        self.shared.with_open(|s| {
            let node = s.locate(at)?;
            s.attr_set(&node, name, value)
        })
    }

    pub fn del_node_attr<'a>(&self, at: impl Into<Locator<'a>>, name: &str) -> TreeResult<()> {
        let at = at.into();
        self.shared.with_open(|s| {
            let node = s.locate(at)?;
            s.attr_delete(&node, name)
        })
    }

    // -----------------------------------------------------------------------
    // Undo
    // -----------------------------------------------------------------------

    pub fn enable_undo(&self) -> TreeResult<()> {
        self.shared.with_open(|s| s.enable_undo())
    }

    /// Disable the undo log and drop everything it kept.
    pub fn disable_undo(&self) -> TreeResult<()> {
        self.shared.with_open(|s| s.disable_undo())
    }

    pub fn is_undo_enabled(&self) -> TreeResult<bool> {
        self.shared.with_open(|s| Ok(s.undo.is_some()))
    }

    /// Set a mark at the current position.
    pub fn mark(&self, name: Option<&str>) -> TreeResult<MarkId> {
        self.shared.with_open(|s| s.mark(name))
    }

    /// Look up a named mark.
    pub fn mark_id(&self, name: &str) -> TreeResult<MarkId> {
        self.shared.with_open(|s| s.mark_id(name))
    }

    pub fn current_mark(&self) -> TreeResult<MarkId> {
        self.shared.with_open(|s| s.current_mark())
    }

    /// Undo back to `mark`, or to the previous mark.
    pub fn undo(&self, mark: Option<MarkId>) -> TreeResult<()> {
        self.shared.with_open(|s| s.undo(mark))
    }

    /// Redo up to `mark`, or to the next mark.
    pub fn redo(&self, mark: Option<MarkId>) -> TreeResult<()> {
        self.shared.with_open(|s| s.redo(mark))
    }

    /// Undo or redo to reach `mark`.
    pub fn goto(&self, mark: MarkId) -> TreeResult<()> {
        self.shared.with_open(|s| s.goto(mark))
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.shared.image_path())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{config, empty_file, ints, populate, populated_file};
    use crate::warning::WarningPolicy;
    use grove_path::NameMap;
    use grove_store::{probe_format, FORMAT_VERSION};

    fn image_with_tree(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("test.grove");
        let file = File::open_with(&path, config(FileMode::TruncateCreate)).unwrap();
        populate(&file);
        file.close().unwrap();
        path
    }

    // -----------------------------------------------------------------------
    // Open modes
    // -----------------------------------------------------------------------

    #[test]
    fn create_then_reopen_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_with_tree(&dir);

        let file = File::open(&path, FileMode::ReadOnly).unwrap();
        assert_eq!(file.title().unwrap(), "Title example");
        assert_eq!(
            file.list_children("/").unwrap(),
            vec!["agroup", "agroup2", "anarray", "atable"]
        );
        assert!(file.take_warnings().unwrap().is_empty());
        assert!(matches!(
            file.create_group("/", "newgroup", None),
            Err(TreeError::FileMode { .. })
        ));
        assert!(matches!(
            file.set_node_attr("/agroup", "testattr", 1),
            Err(TreeError::FileMode { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.grove");
        assert!(matches!(
            File::open(&path, FileMode::ReadOnly),
            Err(TreeError::Io(_))
        ));
        assert!(matches!(
            File::open(&path, FileMode::ReadWrite),
            Err(TreeError::Io(_))
        ));
        assert!(probe_format(&path).is_err());
    }

    #[test]
    fn foreign_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"Hello!").unwrap();
        assert!(matches!(
            File::open(&path, FileMode::ReadOnly),
            Err(TreeError::Format { .. })
        ));
        assert_eq!(probe_format(&path).unwrap(), 0);
    }

    #[test]
    fn append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.grove");
        let file = File::open(&path, FileMode::Append).unwrap();
        file.create_group("/", "agroup", None).unwrap();
        file.close().unwrap();

        assert_eq!(probe_format(&path).unwrap(), FORMAT_VERSION);
        let file = File::open(&path, FileMode::Append).unwrap();
        assert!(file.contains("/agroup").unwrap());
        assert_eq!(file.filename(), Some(path.as_path()));
    }

    #[test]
    fn truncate_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_with_tree(&dir);
        let file = File::open(&path, FileMode::TruncateCreate).unwrap();
        assert!(file.list_children("/").unwrap().is_empty());
        assert_eq!(file.title().unwrap(), "");
    }

    #[test]
    fn truncate_clears_provided_store() {
        let (file, store) = populated_file();
        file.close().unwrap();
        let file = File::from_store(store, config(FileMode::TruncateCreate)).unwrap();
        assert!(file.list_children("/").unwrap().is_empty());
        assert_eq!(file.title().unwrap(), "Title example");
    }

    // -----------------------------------------------------------------------
    // Close / reopen / flush
    // -----------------------------------------------------------------------

    #[test]
    fn closed_file_rejects_everything() {
        let (file, _) = populated_file();
        let group = file.get_node("/agroup").unwrap();
        let leaf = file.get_node("/agroup/anarray1").unwrap();
        file.close().unwrap();

        assert!(!file.is_open());
        assert!(group.is_closed() && leaf.is_closed());
        assert!(group.parent().is_none());
        assert!(matches!(file.get_node("/agroup"), Err(TreeError::ClosedFile)));
        assert!(matches!(file.root(), Err(TreeError::ClosedFile)));
        assert!(matches!(file.list_children("/"), Err(TreeError::ClosedFile)));
        assert!(matches!(file.contains("/agroup"), Err(TreeError::ClosedFile)));
        assert!(matches!(file.flush(), Err(TreeError::ClosedFile)));
        assert!(matches!(file.mode(), Err(TreeError::ClosedFile)));
        assert!(matches!(file.is_undo_enabled(), Err(TreeError::ClosedFile)));
        assert!(matches!(
            file.get_node_attr("/agroup", "TITLE"),
            Err(TreeError::ClosedFile)
        ));
        assert!(matches!(
            file.set_node_attr("/agroup", "testattr", 1),
            Err(TreeError::ClosedFile)
        ));
        assert!(matches!(
            file.remove_node("/agroup", true),
            Err(TreeError::ClosedFile)
        ));
        assert!(matches!(
            file.walk("/", WalkOrder::DepthFirst).unwrap().next(),
            Some(Err(TreeError::ClosedFile))
        ));
        assert!(matches!(group.attrs(), Err(TreeError::ClosedNode { .. })));
        assert!(matches!(leaf.read_all(), Err(TreeError::ClosedNode { .. })));

        // Closing again is a no-op.
        file.close().unwrap();
    }

    #[test]
    fn reopen_read_only_yields_new_instances() {
        let (file, _) = populated_file();
        let before = file.get_node("/agroup").unwrap();
        file.reopen(FileMode::ReadOnly).unwrap();

        assert!(before.is_closed());
        let after = file.get_node("/agroup").unwrap();
        assert!(!after.ptr_eq(&before));
        assert_eq!(after.path(), before.path());
        assert_eq!(file.mode().unwrap(), FileMode::ReadOnly);
        assert!(!file.is_undo_enabled().unwrap());
        assert!(matches!(file.enable_undo(), Err(TreeError::FileMode { .. })));
        // Flushing a read-only session is allowed and does nothing.
        file.flush().unwrap();
    }

    #[test]
    fn flush_persists_while_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flush.grove");
        let file = File::open(&path, FileMode::TruncateCreate).unwrap();
        file.create_group("/", "agroup", None).unwrap();
        file.flush().unwrap();

        let reader = File::open(&path, FileMode::ReadOnly).unwrap();
        assert!(reader.contains("/agroup").unwrap());
        assert!(file.is_open());
    }

    #[test]
    fn dropping_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drop.grove");
        {
            let file = File::open(&path, FileMode::TruncateCreate).unwrap();
            file.create_group("/", "kept", None).unwrap();
        }
        let file = File::open(&path, FileMode::ReadOnly).unwrap();
        assert!(file.contains("/kept").unwrap());
    }

    #[test]
    fn copy_file_writes_visible_tree() {
        let dir = tempfile::tempdir().unwrap();
        let (file, _) = populated_file();
        file.enable_undo().unwrap();
        file.remove_node("/agroup2", false).unwrap();

        let dst = dir.path().join("copy.grove");
        file.copy_file(&dst, false).unwrap();
        assert!(matches!(
            file.copy_file(&dst, false),
            Err(TreeError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists
        ));
        file.copy_file(&dst, true).unwrap();

        let raw = image::load(&dst).unwrap();
        assert!(raw.lookup(raw.root(), "_p_undo").unwrap().is_none());
        let copy = File::open(&dst, FileMode::ReadOnly).unwrap();
        assert_eq!(copy.title().unwrap(), "Title example");
        assert_eq!(
            copy.list_children("/").unwrap(),
            vec!["agroup", "anarray", "atable"]
        );
    }

    #[test]
    fn copy_file_on_closed_session_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (file, _) = populated_file();
        file.close().unwrap();
        let dst = dir.path().join("copy.grove");
        assert!(matches!(
            file.copy_file(&dst, false),
            Err(TreeError::ClosedFile)
        ));
        assert!(!dst.exists());
    }

    // -----------------------------------------------------------------------
    // Alternate root and name translation
    // -----------------------------------------------------------------------

    #[test]
    fn alternate_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_with_tree(&dir);
        let cfg = SessionConfig {
            root_path: Some("/agroup".into()),
            ..SessionConfig::with_mode(FileMode::ReadOnly)
        };
        let file = File::open_with(&path, cfg).unwrap();
        assert_eq!(
            file.list_children("/").unwrap(),
            vec!["agroup3", "anarray1", "anarray2"]
        );
        assert_eq!(file.title().unwrap(), "Group title");
        assert!(matches!(
            file.get_node("/agroup"),
            Err(TreeError::NoSuchNode { .. })
        ));
        assert!(file.take_warnings().unwrap().is_empty());

        let missing = SessionConfig {
            root_path: Some("/nogroup".into()),
            ..SessionConfig::with_mode(FileMode::ReadOnly)
        };
        assert!(matches!(
            File::open_with(&path, missing),
            Err(TreeError::NoSuchNode { .. })
        ));
    }

    #[test]
    fn name_translation() {
        let (file, store) = empty_file();
        file.create_array("/", "array", ints(&[1, 2]), None).unwrap();
        file.close().unwrap();

        let mut names = NameMap::new();
        names.insert("pythonarray", "array").unwrap();
        let cfg = SessionConfig {
            name_map: names,
            ..SessionConfig::with_mode(FileMode::ReadWrite)
        };
        let file = File::from_store(store.clone(), cfg).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["pythonarray"]);
        let node = file.get_node("/pythonarray").unwrap();
        assert!(matches!(
            file.get_node("/array"),
            Err(TreeError::NoSuchNode { .. })
        ));

        file.rename_node(&node, "renamed", false).unwrap();
        assert!(store.lookup(store.root(), "renamed").unwrap().is_some());
        file.rename_node(&node, "pythonarray", false).unwrap();
        assert!(store.lookup(store.root(), "array").unwrap().is_some());
    }

    // -----------------------------------------------------------------------
    // Open-time warnings
    // -----------------------------------------------------------------------

    #[test]
    fn legacy_root_warns() {
        let store = Arc::new(InMemoryStore::new());
        store.create_group(store.root(), "legacy").unwrap();

        let file = File::from_store(store.clone(), SessionConfig::with_mode(FileMode::ReadOnly))
            .unwrap();
        let warnings = file.take_warnings().unwrap();
        assert!(matches!(warnings.as_slice(), [Warning::FormatCompat { .. }]));
        file.close().unwrap();

        let strict = SessionConfig {
            warning_policy: WarningPolicy::Error,
            ..SessionConfig::with_mode(FileMode::ReadOnly)
        };
        assert!(matches!(
            File::from_store(store, strict),
            Err(TreeError::Warning(Warning::FormatCompat { .. }))
        ));
    }

    #[test]
    fn unsupported_leaf_warns_on_load() {
        let (file, _) = empty_file();
        let opaque = Payload::Opaque {
            type_name: "H5T_ARRAY".into(),
            bytes: vec![0; 4],
        };
        file.create_node("/", "weird", NodeSpec::Leaf(opaque), None)
            .unwrap();
        file.reopen(FileMode::ReadWrite).unwrap();

        let node = file.get_node("/weird").unwrap();
        assert_eq!(node.class(), NodeClass::Unsupported);
        let warnings = file.take_warnings().unwrap();
        assert!(matches!(warnings.as_slice(), [Warning::Unsupported { .. }]));
        assert!(matches!(
            node.read_all(),
            Err(TreeError::UnsupportedPayload { .. })
        ));
        file.remove_node(&node, false).unwrap();
        assert!(!file.contains("/weird").unwrap());
    }

    #[test]
    fn undo_config_flag() {
        let store: Arc<dyn HierStore> = Arc::new(InMemoryStore::new());
        let cfg = SessionConfig {
            enable_undo: true,
            ..config(FileMode::Append)
        };
        let file = File::from_store(store, cfg).unwrap();
        assert!(file.is_undo_enabled().unwrap());
    }
}
