//! Normalised absolute node paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, PathResult};
use crate::names::{validate_name, SEPARATOR};

/// An absolute, normalised path such as `/group/array`.
///
/// Invariants: starts with `/`, has no trailing separator (except the root
/// itself) and every segment passes [`validate_name`]. Ordering is plain
/// string ordering, which keeps a subtree contiguous once the separator is
/// appended to the prefix (see [`NodePath::descendant_prefix`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

impl NodePath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse and normalise a path string.
    ///
    /// # Examples
    ///
    /// ```
    /// use grove_path::NodePath;
    ///
    /// let p = NodePath::parse("/agroup/anarray1").unwrap();
    /// assert_eq!(p.name(), "anarray1");
    /// assert_eq!(p.depth(), 2);
    /// assert!(NodePath::parse("/a//b").is_err());
    /// ```
    pub fn parse(path: &str) -> PathResult<Self> {
        if !path.starts_with(SEPARATOR) {
            return Err(PathError::InvalidPath {
                path: path.to_string(),
                reason: "path must be absolute".into(),
            });
        }
        if path.len() == 1 {
            return Ok(Self::root());
        }
        for segment in path[1..].split(SEPARATOR) {
            validate_name(segment).map_err(|e| PathError::InvalidPath {
                path: path.to_string(),
                reason: match e {
                    PathError::InvalidName { reason, .. } => {
                        format!("segment {segment:?}: {reason}")
                    }
                    other => other.to_string(),
                },
            })?;
        }
        Ok(Self(path.to_string()))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `/`.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The path segments, root-first. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments (the root has depth 0).
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches(SEPARATOR).count()
        }
    }

    /// The last segment, or `/` for the root.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return &self.0;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        let idx = self.0.rfind(SEPARATOR)?;
        if idx == 0 {
            Some(Self::root())
        } else {
            Some(Self(self.0[..idx].to_string()))
        }
    }

    /// Append a single child name.
    pub fn join(&self, name: &str) -> PathResult<NodePath> {
        validate_name(name)?;
        if self.is_root() {
            Ok(Self(format!("{SEPARATOR}{name}")))
        } else {
            Ok(Self(format!("{}{SEPARATOR}{name}", self.0)))
        }
    }

    /// The string every strict descendant path starts with.
    pub fn descendant_prefix(&self) -> String {
        if self.is_root() {
            self.0.clone()
        } else {
            format!("{}{SEPARATOR}", self.0)
        }
    }

    /// Returns `true` if `other` lies strictly below `self`.
    ///
    /// Comparison is segment-wise: `/a` is an ancestor of `/a/b` but not of
    /// `/ab`.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self != other && other.0.starts_with(&self.descendant_prefix())
    }

    /// Returns `true` if `other` is `self` or lies below it.
    pub fn contains(&self, other: &NodePath) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Rewrite the `old` prefix of this path into `new`.
    ///
    /// Returns `None` if `self` is not `old` or one of its descendants.
    pub fn rebase(&self, old: &NodePath, new: &NodePath) -> Option<NodePath> {
        if self == old {
            return Some(new.clone());
        }
        let rest = self.0.strip_prefix(&old.descendant_prefix())?;
        Some(Self(format!("{}{rest}", new.descendant_prefix())))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({})", self.0)
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> PathResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodePath {
    type Error = PathError;

    fn try_from(value: String) -> PathResult<Self> {
        Self::parse(&value)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
