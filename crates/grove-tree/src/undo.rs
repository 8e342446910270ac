//! Undo/redo log with named marks.
//!
//! Every structural mutation and attribute change of a writable session is
//! recorded while the log is enabled. Subtrees that an undo or redo may
//! need to bring back (removed nodes, undone creations) are parked in a
//! hidden group under the session root and purged once no action can
//! reach them any more.

use std::fmt;

use grove_path::NodePath;
use grove_store::{AttrValue, EntryId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NodeError, TreeError, TreeResult};
use crate::ops::delete_subtree;
use crate::session::{OpenSession, UNDO_GROUP};

/// Identifier of a mark in the undo log. Mark 0 is the position the log
/// started at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkId(usize);

impl MarkId {
    /// The initial mark.
    pub const INITIAL: MarkId = MarkId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mark #{}", self.0)
    }
}

/// A recorded mutation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Action {
    /// `parked` is where the node goes while the creation is undone.
    Create { path: NodePath, parked: String },
    /// `parked` is where the removed node waits for an undo.
    Remove { path: NodePath, parked: String },
    Move { from: NodePath, to: NodePath },
    SetAttr {
        path: NodePath,
        name: String,
        previous: Option<AttrValue>,
        value: AttrValue,
    },
    DelAttr {
        path: NodePath,
        name: String,
        previous: AttrValue,
    },
}

#[derive(Clone, Debug)]
struct Mark {
    name: Option<String>,
    position: usize,
}

/// Action list, cursor and marks.
#[derive(Debug)]
pub(crate) struct UndoLog {
    actions: Vec<Action>,
    cursor: usize,
    marks: Vec<Mark>,
    next_park: u64,
}

impl UndoLog {
    pub(crate) fn new() -> Self {
        Self {
            actions: Vec::new(),
            cursor: 0,
            marks: vec![Mark {
                name: None,
                position: 0,
            }],
            next_park: 0,
        }
    }

    pub(crate) fn park_name(&mut self) -> String {
        self.next_park += 1;
        format!("a{}", self.next_park)
    }

    /// Drop the redo tail and the marks that pointed into it.
    fn truncate(&mut self) -> Vec<Action> {
        let tail = self.actions.split_off(self.cursor);
        let cursor = self.cursor;
        self.marks.retain(|m| m.position <= cursor);
        tail
    }

    /// Append an action; returns the discarded redo tail.
    pub(crate) fn record(&mut self, action: Action) -> Vec<Action> {
        let tail = self.truncate();
        self.actions.push(action);
        self.cursor += 1;
        tail
    }

    /// Add a mark at the cursor; returns the mark and the discarded tail.
    pub(crate) fn add_mark(&mut self, name: Option<&str>) -> TreeResult<(MarkId, Vec<Action>)> {
        if let Some(name) = name {
            if self.find_mark(name).is_some() {
                return Err(TreeError::Undo(format!("mark {name:?} already exists")));
            }
        }
        let tail = self.truncate();
        self.marks.push(Mark {
            name: name.map(str::to_string),
            position: self.cursor,
        });
        Ok((MarkId(self.marks.len() - 1), tail))
    }

    pub(crate) fn find_mark(&self, name: &str) -> Option<MarkId> {
        self.marks
            .iter()
            .position(|m| m.name.as_deref() == Some(name))
            .map(MarkId)
    }

    /// The last mark at or before the cursor.
    pub(crate) fn current_mark(&self) -> MarkId {
        let index = self
            .marks
            .iter()
            .rposition(|m| m.position <= self.cursor)
            .unwrap_or(0);
        MarkId(index)
    }

    pub(crate) fn position(&self, mark: MarkId) -> TreeResult<usize> {
        self.marks
            .get(mark.0)
            .map(|m| m.position)
            .ok_or_else(|| TreeError::Undo(format!("unknown {mark}")))
    }

    /// Where a plain `undo` goes: the closest mark before the cursor.
    pub(crate) fn previous_position(&self) -> usize {
        self.marks
            .iter()
            .rev()
            .map(|m| m.position)
            .find(|&p| p < self.cursor)
            .unwrap_or(0)
    }

    /// Where a plain `redo` goes: the closest mark after the cursor, or
    /// the end of the log.
    pub(crate) fn next_position(&self) -> usize {
        self.marks
            .iter()
            .map(|m| m.position)
            .find(|&p| p > self.cursor)
            .unwrap_or(self.actions.len())
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    fn step_back(&mut self) -> Option<Action> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.actions[self.cursor].clone())
    }

    fn step_forward(&mut self) -> Option<Action> {
        let action = self.actions.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(action)
    }
}

impl OpenSession {
    fn undo_log(&mut self) -> TreeResult<&mut UndoLog> {
        self.undo
            .as_mut()
            .ok_or_else(|| TreeError::Undo("undo is not enabled".into()))
    }

    pub(crate) fn park_name(&mut self) -> String {
        self.undo
            .as_mut()
            .map(UndoLog::park_name)
            .unwrap_or_default()
    }

    /// Record `action` if the log is enabled, purging what the discarded
    /// redo tail left parked.
    pub(crate) fn record(&mut self, action: Action) -> TreeResult<()> {
        let Some(log) = self.undo.as_mut() else {
            return Ok(());
        };
        let tail = log.record(action);
        self.purge_actions(&tail)
    }

    fn purge_actions(&mut self, actions: &[Action]) -> TreeResult<()> {
        for action in actions {
            // Undone creations are the only parked subtrees in a redo tail.
            if let Action::Create { parked, .. } = action {
                if let Some(area) = self.find_undo_area()? {
                    if let Some(entry) = self.store.lookup(area, parked)? {
                        delete_subtree(self.store.as_ref(), entry)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn find_undo_area(&self) -> TreeResult<Option<EntryId>> {
        Ok(self.store.lookup(self.root_entry, UNDO_GROUP)?)
    }

    fn undo_area(&mut self) -> TreeResult<EntryId> {
        match self.find_undo_area()? {
            Some(area) => Ok(area),
            None => Ok(self.store.create_group(self.root_entry, UNDO_GROUP)?),
        }
    }

    /// Delete the undo area and everything parked in it.
    pub(crate) fn purge_undo_area(&mut self) -> TreeResult<()> {
        if let Some(area) = self.find_undo_area()? {
            delete_subtree(self.store.as_ref(), area)?;
            debug!("purged undo area");
        }
        Ok(())
    }

    /// Move the node at `path` into the undo area as `parked`.
    pub(crate) fn park(&mut self, path: &NodePath, parked: &str) -> TreeResult<()> {
        let node = self.resolve(path)?;
        let area = self.undo_area()?;
        self.cache.evict(path);
        self.store.rename(node.entry(), area, parked)?;
        debug!(path = %path, parked, "parked node");
        Ok(())
    }

    /// Bring `parked` back to `path`.
    fn unpark(&mut self, parked: &str, path: &NodePath) -> TreeResult<()> {
        let area = self.undo_area()?;
        let entry = self
            .store
            .lookup(area, parked)?
            .ok_or_else(|| TreeError::Undo(format!("parked node for {path} is missing")))?;
        let parent_path = path.parent().ok_or(NodeError::Root("restored"))?;
        let parent = self.resolve(&parent_path)?;
        let stored = self.names.to_store(path.name()).to_string();
        self.store.rename(entry, parent.entry(), &stored)?;
        debug!(path = %path, parked, "restored node");
        Ok(())
    }

    fn move_back(&mut self, from: &NodePath, to: &NodePath) -> TreeResult<()> {
        let node = self.resolve(from)?;
        let parent_path = to.parent().ok_or(NodeError::Root("moved"))?;
        let parent = self.resolve(&parent_path)?;
        self.relocate(&node, &parent, to.name())
    }

    fn write_attr_at(&mut self, path: &NodePath, name: &str, value: Option<&AttrValue>) -> TreeResult<()> {
        let entry = self.resolve(path)?.entry();
        match value {
            Some(value) => self.store.write_attr(entry, name, value.clone())?,
            None => {
                self.store.delete_attr(entry, name)?;
            }
        }
        Ok(())
    }

    fn revert(&mut self, action: &Action) -> TreeResult<()> {
        match action {
            Action::Create { path, parked } => self.park(path, parked),
            Action::Remove { path, parked } => self.unpark(parked, path),
            Action::Move { from, to } => self.move_back(to, from),
            Action::SetAttr {
                path,
                name,
                previous,
                ..
            } => self.write_attr_at(path, name, previous.as_ref()),
            Action::DelAttr {
                path,
                name,
                previous,
            } => self.write_attr_at(path, name, Some(previous)),
        }
    }

    fn reapply(&mut self, action: &Action) -> TreeResult<()> {
        match action {
            Action::Create { path, parked } => self.unpark(parked, path),
            Action::Remove { path, parked } => self.park(path, parked),
            Action::Move { from, to } => self.move_back(from, to),
            Action::SetAttr {
                path, name, value, ..
            } => self.write_attr_at(path, name, Some(value)),
            Action::DelAttr { path, name, .. } => self.write_attr_at(path, name, None),
        }
    }

    // -----------------------------------------------------------------------
    // Public operations (called by File)
    // -----------------------------------------------------------------------

    pub(crate) fn enable_undo(&mut self) -> TreeResult<()> {
        self.ensure_writable("enabling undo")?;
        if self.undo.is_some() {
            return Err(TreeError::Undo("undo is already enabled".into()));
        }
        self.purge_undo_area()?;
        self.undo = Some(UndoLog::new());
        debug!("undo enabled");
        Ok(())
    }

    pub(crate) fn disable_undo(&mut self) -> TreeResult<()> {
        self.ensure_writable("disabling undo")?;
        if self.undo.take().is_none() {
            return Err(TreeError::Undo("undo is not enabled".into()));
        }
        self.purge_undo_area()?;
        debug!("undo disabled");
        Ok(())
    }

    pub(crate) fn mark(&mut self, name: Option<&str>) -> TreeResult<MarkId> {
        self.ensure_writable("setting an undo mark")?;
        let (mark, tail) = self.undo_log()?.add_mark(name)?;
        self.purge_actions(&tail)?;
        debug!(%mark, name, "undo mark");
        Ok(mark)
    }

    pub(crate) fn mark_id(&mut self, name: &str) -> TreeResult<MarkId> {
        self.undo_log()?
            .find_mark(name)
            .ok_or_else(|| TreeError::Undo(format!("unknown mark {name:?}")))
    }

    pub(crate) fn current_mark(&mut self) -> TreeResult<MarkId> {
        Ok(self.undo_log()?.current_mark())
    }

    /// Revert actions back to `mark` (default: the previous mark).
    pub(crate) fn undo(&mut self, mark: Option<MarkId>) -> TreeResult<()> {
        self.ensure_writable("undoing")?;
        let log = self.undo_log()?;
        let target = match mark {
            Some(mark) => log.position(mark)?,
            None => log.previous_position(),
        };
        if target > log.cursor() {
            return Err(TreeError::Undo("cannot undo forward; use redo".into()));
        }
        self.step_to(target)
    }

    /// Re-apply actions up to `mark` (default: the next mark or the end).
    pub(crate) fn redo(&mut self, mark: Option<MarkId>) -> TreeResult<()> {
        self.ensure_writable("redoing")?;
        let log = self.undo_log()?;
        let target = match mark {
            Some(mark) => log.position(mark)?,
            None => log.next_position(),
        };
        if target < log.cursor() {
            return Err(TreeError::Undo("cannot redo backward; use undo".into()));
        }
        self.step_to(target)
    }

    pub(crate) fn goto(&mut self, mark: MarkId) -> TreeResult<()> {
        self.ensure_writable("going to an undo mark")?;
        let target = self.undo_log()?.position(mark)?;
        self.step_to(target)
    }

    fn step_to(&mut self, target: usize) -> TreeResult<()> {
        loop {
            let log = self.undo_log()?;
            let cursor = log.cursor();
            if cursor > target {
                if let Some(action) = log.step_back() {
                    self.revert(&action)?;
                }
            } else if cursor < target {
                if let Some(action) = log.step_forward() {
                    self.reapply(&action)?;
                } else {
                    return Ok(());
                }
            } else {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileMode;
    use crate::error::NodeError;
    use crate::testutil::{empty_file, ints, populated_file};
    use grove_store::{HierStore, InMemoryStore, Payload};

    fn create(p: &str) -> Action {
        Action::Create {
            path: NodePath::parse(p).unwrap(),
            parked: format!("{p}-parked"),
        }
    }

    #[test]
    fn fresh_log_sits_on_initial_mark() {
        let log = UndoLog::new();
        assert_eq!(log.current_mark(), MarkId::INITIAL);
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.previous_position(), 0);
        assert_eq!(log.next_position(), 0);
    }

    #[test]
    fn marks_and_positions() {
        let mut log = UndoLog::new();
        log.record(create("/a"));
        let (m1, _) = log.add_mark(Some("one")).unwrap();
        log.record(create("/b"));
        log.record(create("/c"));

        assert_eq!(m1.index(), 1);
        assert_eq!(log.find_mark("one"), Some(m1));
        assert_eq!(log.position(m1).unwrap(), 1);
        assert_eq!(log.current_mark(), m1);
        assert_eq!(log.previous_position(), 1);
        assert!(log.add_mark(Some("one")).is_err());
        assert!(log.position(MarkId(9)).is_err());
    }

    #[test]
    fn record_after_undo_drops_tail() {
        let mut log = UndoLog::new();
        log.record(create("/a"));
        let (m1, _) = log.add_mark(None).unwrap();
        log.record(create("/b"));
        log.add_mark(None).unwrap();

        assert_eq!(log.step_back(), Some(create("/b")));
        let tail = log.record(create("/c"));
        assert_eq!(tail, vec![create("/b")]);
        assert_eq!(log.cursor(), 2);
        // The mark after the truncation point is gone.
        assert_eq!(log.current_mark(), m1);
        assert_eq!(log.next_position(), 2);
    }

    #[test]
    fn step_bounds() {
        let mut log = UndoLog::new();
        assert_eq!(log.step_back(), None);
        log.record(create("/a"));
        assert_eq!(log.step_forward(), None);
        assert!(log.step_back().is_some());
        assert_eq!(log.step_forward(), Some(create("/a")));
    }

    #[test]
    fn park_names_are_unique() {
        let mut log = UndoLog::new();
        assert_ne!(log.park_name(), log.park_name());
    }

    // -----------------------------------------------------------------------
    // Session-level undo/redo
    // -----------------------------------------------------------------------

    fn parked_count(store: &InMemoryStore) -> usize {
        match store.lookup(store.root(), UNDO_GROUP).unwrap() {
            Some(area) => store.children(area).unwrap().len(),
            None => 0,
        }
    }

    #[test]
    fn undo_and_redo_create() {
        let (file, _) = empty_file();
        file.enable_undo().unwrap();
        file.create_array("/", "anarray", ints(&[1, 2]), None).unwrap();

        file.undo(None).unwrap();
        assert!(!file.contains("/anarray").unwrap());
        assert!(file.list_children("/").unwrap().is_empty());

        file.redo(None).unwrap();
        let node = file.get_node("/anarray").unwrap();
        assert_eq!(
            node.read_all().unwrap(),
            crate::flavor::LeafData::Internal(Payload::Array(ints(&[1, 2])))
        );
    }

    #[test]
    fn undo_recursive_remove() {
        let (file, _) = populated_file();
        file.set_node_attr("/agroup/anarray1", "testattr", 41).unwrap();
        file.enable_undo().unwrap();
        let group = file.get_node("/agroup").unwrap();
        file.remove_node(&group, true).unwrap();
        assert!(group.is_closed());
        assert!(!file.contains("/agroup").unwrap());

        file.undo(None).unwrap();
        let restored = file.get_node("/agroup").unwrap();
        assert!(!restored.ptr_eq(&group));
        assert_eq!(
            file.list_children(&restored).unwrap(),
            vec!["agroup3", "anarray1", "anarray2"]
        );
        assert_eq!(
            file.get_node_attr("/agroup/anarray1", "testattr").unwrap(),
            Some(AttrValue::Int(41))
        );

        file.redo(None).unwrap();
        assert!(!file.contains("/agroup").unwrap());
    }

    #[test]
    fn undo_move_keeps_identity() {
        let (file, _) = populated_file();
        file.enable_undo().unwrap();
        let group = file.get_node("/agroup").unwrap();
        file.move_node(&group, "/agroup2", Some("moved"), false)
            .unwrap();
        assert_eq!(group.path().as_str(), "/agroup2/moved");

        file.undo(None).unwrap();
        assert_eq!(group.path().as_str(), "/agroup");
        assert!(file.get_node("/agroup").unwrap().ptr_eq(&group));
        assert!(file.list_children("/agroup2").unwrap().is_empty());
    }

    #[test]
    fn undo_overwriting_rename() {
        let (file, _) = populated_file();
        file.enable_undo().unwrap();
        file.rename_node("/agroup2", "anarray", true).unwrap();
        assert!(file.get_node("/anarray").unwrap().is_group());

        file.undo(None).unwrap();
        assert!(file.get_node("/anarray").unwrap().is_leaf());
        assert!(file.contains("/agroup2").unwrap());
        assert_eq!(
            file.get_node("/anarray").unwrap().title().unwrap(),
            "Array title"
        );
    }

    #[test]
    fn undo_attribute_changes() {
        let (file, _) = populated_file();
        file.set_node_attr("/agroup", "kept", 1).unwrap();
        file.enable_undo().unwrap();
        file.set_node_attr("/agroup", "added", 2).unwrap();
        file.set_node_attr("/agroup", "kept", 3).unwrap();
        file.del_node_attr("/agroup", "TITLE").unwrap();

        file.undo(None).unwrap();
        assert_eq!(file.get_node_attr("/agroup", "added").unwrap(), None);
        assert_eq!(
            file.get_node_attr("/agroup", "kept").unwrap(),
            Some(AttrValue::Int(1))
        );
        assert_eq!(
            file.get_node_attr("/agroup", "TITLE").unwrap(),
            Some(AttrValue::from("Group title"))
        );

        file.redo(None).unwrap();
        assert_eq!(
            file.get_node_attr("/agroup", "kept").unwrap(),
            Some(AttrValue::Int(3))
        );
        assert_eq!(file.get_node_attr("/agroup", "TITLE").unwrap(), None);
    }

    #[test]
    fn marks_and_goto() {
        let (file, _) = empty_file();
        file.enable_undo().unwrap();
        file.create_group("/", "g1", None).unwrap();
        let one = file.mark(Some("one")).unwrap();
        file.create_group("/", "g2", None).unwrap();
        file.create_group("/", "g3", None).unwrap();
        assert_eq!(file.current_mark().unwrap(), one);
        assert_eq!(file.mark_id("one").unwrap(), one);

        file.undo(None).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["g1"]);

        file.goto(MarkId::INITIAL).unwrap();
        assert!(file.list_children("/").unwrap().is_empty());
        assert_eq!(file.current_mark().unwrap(), MarkId::INITIAL);

        file.redo(None).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["g1"]);
        file.redo(None).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["g1", "g2", "g3"]);

        file.undo(Some(one)).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["g1"]);
        assert!(matches!(
            file.redo(Some(MarkId::INITIAL)),
            Err(TreeError::Undo(_))
        ));
        assert!(matches!(file.mark_id("two"), Err(TreeError::Undo(_))));
    }

    #[test]
    fn new_action_discards_redo_and_purges() {
        let (file, store) = empty_file();
        file.enable_undo().unwrap();
        file.create_group("/", "g1", None).unwrap();
        file.mark(None).unwrap();
        file.create_group("/", "g2", None).unwrap();
        file.undo(None).unwrap();
        assert_eq!(parked_count(&store), 1);

        file.create_group("/", "g3", None).unwrap();
        assert_eq!(parked_count(&store), 0);
        file.redo(None).unwrap();
        assert_eq!(file.list_children("/").unwrap(), vec!["g1", "g3"]);
    }

    #[test]
    fn undo_area_is_hidden_and_purged() {
        let (file, store) = populated_file();
        file.enable_undo().unwrap();
        file.remove_node("/agroup2", false).unwrap();
        assert_eq!(parked_count(&store), 1);
        assert!(matches!(
            file.get_node(&format!("/{UNDO_GROUP}")),
            Err(TreeError::NoSuchNode { .. })
        ));
        assert!(!file.contains(&format!("/{UNDO_GROUP}")).unwrap());
        assert!(matches!(
            file.rename_node("/agroup", UNDO_GROUP, false),
            Err(TreeError::Node(NodeError::Reserved { .. }))
        ));

        file.disable_undo().unwrap();
        assert!(store.lookup(store.root(), UNDO_GROUP).unwrap().is_none());
        assert!(matches!(file.undo(None), Err(TreeError::Undo(_))));
    }

    #[test]
    fn close_purges_undo_area() {
        let (file, store) = populated_file();
        file.enable_undo().unwrap();
        file.remove_node("/agroup", true).unwrap();
        file.close().unwrap();
        assert!(store.lookup(store.root(), UNDO_GROUP).unwrap().is_none());
        assert!(store.lookup(store.root(), "agroup").unwrap().is_none());
    }

    #[test]
    fn undo_gating() {
        let (file, _) = populated_file();
        assert!(!file.is_undo_enabled().unwrap());
        assert!(matches!(file.mark(None), Err(TreeError::Undo(_))));
        assert!(matches!(file.disable_undo(), Err(TreeError::Undo(_))));
        file.enable_undo().unwrap();
        assert!(matches!(file.enable_undo(), Err(TreeError::Undo(_))));

        file.reopen(FileMode::ReadOnly).unwrap();
        assert!(!file.is_undo_enabled().unwrap());
        assert!(matches!(file.undo(None), Err(TreeError::FileMode { .. })));
        assert!(matches!(file.mark(None), Err(TreeError::FileMode { .. })));

        file.close().unwrap();
        assert!(matches!(file.undo(None), Err(TreeError::ClosedFile)));
        assert!(matches!(file.current_mark(), Err(TreeError::ClosedFile)));
    }
}
