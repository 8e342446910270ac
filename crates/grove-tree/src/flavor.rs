//! Leaf data flavors.
//!
//! A leaf's `FLAVOR` attribute selects how [`Node::read`](crate::Node::read)
//! hands its data back: as the typed [`Payload`] or as a JSON document.

use std::fmt;
use std::str::FromStr;

use grove_store::{Payload, Scalar, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::TreeError;

/// Representation of leaf data returned by reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// The typed payload as stored.
    #[default]
    Internal,
    /// A `serde_json::Value`: arrays as JSON arrays, tables as arrays of
    /// row objects.
    Json,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "json" => Ok(Self::Json),
            other => Err(TreeError::Flavor {
                name: other.to_string(),
            }),
        }
    }
}

/// Leaf data in a particular flavor.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafData {
    Internal(Payload),
    Json(Value),
}

impl LeafData {
    pub fn flavor(&self) -> Flavor {
        match self {
            Self::Internal(_) => Flavor::Internal,
            Self::Json(_) => Flavor::Json,
        }
    }
}

pub(crate) fn render(payload: Payload, flavor: Flavor) -> LeafData {
    match flavor {
        Flavor::Internal => LeafData::Internal(payload),
        Flavor::Json => LeafData::Json(payload_to_json(&payload)),
    }
}

fn payload_to_json(payload: &Payload) -> Value {
    match payload {
        Payload::Array(items) => Value::Array(items.iter().map(scalar_to_json).collect()),
        Payload::Table(table) => table_to_json(table),
        Payload::Opaque { .. } => Value::Null,
    }
}

fn table_to_json(table: &Table) -> Value {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns
                .iter()
                .cloned()
                .zip(row.iter().map(scalar_to_json))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

fn scalar_to_json(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Bool(v) => Value::Bool(*v),
        Scalar::Int(v) => Value::Number((*v).into()),
        Scalar::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Scalar::Text(v) => Value::String(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_known_flavors() {
        assert_eq!("internal".parse::<Flavor>().unwrap(), Flavor::Internal);
        assert_eq!("json".parse::<Flavor>().unwrap(), Flavor::Json);
        assert!(matches!(
            "foobar".parse::<Flavor>(),
            Err(TreeError::Flavor { name }) if name == "foobar"
        ));
    }

    #[test]
    fn array_as_json() {
        let payload = Payload::Array(vec![Scalar::Int(1), Scalar::Float(2.5), "x".into()]);
        assert_eq!(
            render(payload, Flavor::Json),
            LeafData::Json(json!([1, 2.5, "x"]))
        );
    }

    #[test]
    fn table_as_json_rows() {
        let mut table = Table::new(["var1", "var2"]);
        table.push_row(vec![Scalar::Int(1), "a".into()]).unwrap();
        table.push_row(vec![Scalar::Int(2), "b".into()]).unwrap();
        assert_eq!(
            render(Payload::Table(table), Flavor::Json),
            LeafData::Json(json!([{"var1": 1, "var2": "a"}, {"var1": 2, "var2": "b"}]))
        );
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(scalar_to_json(&Scalar::Float(f64::NAN)), Value::Null);
    }

    #[test]
    fn internal_keeps_payload() {
        let payload = Payload::Array(vec![Scalar::Bool(true)]);
        let data = render(payload.clone(), Flavor::Internal);
        assert_eq!(data.flavor(), Flavor::Internal);
        assert_eq!(data, LeafData::Internal(payload));
    }
}
