use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Attribute values
// ---------------------------------------------------------------------------

/// A persisted attribute value.
///
/// The store never interprets attribute values; the tree layer only relies
/// on the reserved names holding text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// The text content, if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an `Int` value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ---------------------------------------------------------------------------
// Leaf payloads
// ---------------------------------------------------------------------------

/// A single array element or table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Row-oriented table data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows; each row has one cell per column.
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. The row length must match the column count.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> StoreResult<()> {
        if row.len() != self.columns.len() {
            return Err(StoreError::Serialization(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }
}

/// What kind of leaf a payload makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafClass {
    Array,
    Table,
    /// The payload type is not decodable by this reader.
    Unsupported,
}

impl fmt::Display for LeafClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Table => write!(f, "table"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// The data carried by a leaf entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// One-dimensional array of scalars.
    Array(Vec<Scalar>),
    /// Row-oriented table.
    Table(Table),
    /// Raw bytes of a type this reader does not understand.
    Opaque { type_name: String, bytes: Vec<u8> },
}

impl Payload {
    /// The leaf class this payload produces.
    pub fn class(&self) -> LeafClass {
        match self {
            Self::Array(_) => LeafClass::Array,
            Self::Table(_) => LeafClass::Table,
            Self::Opaque { .. } => LeafClass::Unsupported,
        }
    }

    /// Number of elements (arrays) or rows (tables).
    pub fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Table(table) => table.rows.len(),
            Self::Opaque { bytes, .. } => bytes.len(),
        }
    }

    /// Returns `true` if there are no elements or rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy restricted to `range`: elements for arrays, rows for tables.
    ///
    /// Opaque payloads cannot be sliced.
    pub fn slice(&self, range: &SliceRange) -> StoreResult<Payload> {
        match self {
            Self::Array(items) => Ok(Self::Array(
                range.indices(items.len()).map(|i| items[i].clone()).collect(),
            )),
            Self::Table(table) => Ok(Self::Table(Table {
                columns: table.columns.clone(),
                rows: range
                    .indices(table.rows.len())
                    .map(|i| table.rows[i].clone())
                    .collect(),
            })),
            Self::Opaque { type_name, .. } => Err(StoreError::Undecodable {
                type_name: type_name.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// A `[start:stop:step]` selection over a payload.
///
/// Bounds are clamped to the payload length; `stop = None` means "to the
/// end". `step` is always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSliceRange")]
pub struct SliceRange {
    pub start: usize,
    pub stop: Option<usize>,
    step: usize,
}

impl SliceRange {
    /// Select everything.
    pub const fn full() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }

    /// Create a slice; fails if `step` is zero.
    pub fn new(start: usize, stop: Option<usize>, step: usize) -> StoreResult<Self> {
        if step == 0 {
            return Err(StoreError::InvalidSlice("step must be at least 1".into()));
        }
        Ok(Self { start, stop, step })
    }

    /// The step between selected indices.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns `true` if this selects every element.
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.stop.is_none() && self.step == 1
    }

    /// Indices selected from a sequence of length `len`.
    pub fn indices(&self, len: usize) -> impl Iterator<Item = usize> {
        let stop = self.stop.unwrap_or(len).min(len);
        let start = self.start.min(stop);
        (start..stop).step_by(self.step)
    }
}

impl Default for SliceRange {
    fn default() -> Self {
        Self::full()
    }
}

/// Unchecked wire form; deserialised slices go through [`SliceRange::new`].
#[derive(Deserialize)]
struct RawSliceRange {
    start: usize,
    stop: Option<usize>,
    step: usize,
}

impl TryFrom<RawSliceRange> for SliceRange {
    type Error = StoreError;

    fn try_from(raw: RawSliceRange) -> StoreResult<Self> {
        Self::new(raw.start, raw.stop, raw.step)
    }
}
