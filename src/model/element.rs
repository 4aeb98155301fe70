use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::ElementCategory;
use crate::geometry::Geometry;

/// Property bag attached to an element. Ordered so output is stable.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A scalar property value or a nested group of them (property and
/// quantity sets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Map(PropertyMap),
}

impl PropertyValue {
    /// Blank values (empty text, zero, false, empty groups) carry no
    /// classification signal.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Integer(i) => *i == 0,
            Self::Real(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Map(m) => m.is_empty(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        Self::Map(value)
    }
}

/// Canonical building element produced by every extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub model_id: String,
    /// Identifier assigned by the authoring software (IFC GlobalId, Revit
    /// element id).
    pub external_id: String,
    pub category: ElementCategory,
    pub family_name: Option<String>,
    pub type_name: Option<String>,
    pub level: Option<String>,
    pub geometry: Geometry,
    pub properties: PropertyMap,
    pub material_ids: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_values_render_keys_and_values() {
        let mut pset = PropertyMap::new();
        pset.insert("IsExternal".into(), true.into());
        pset.insert("Reference".into(), "Beam 200".into());
        let value = PropertyValue::Map(pset);

        assert_eq!(value.to_string(), "{IsExternal: true, Reference: Beam 200}");
    }

    #[test]
    fn blank_values() {
        assert!(PropertyValue::Text(String::new()).is_blank());
        assert!(PropertyValue::Real(0.0).is_blank());
        assert!(PropertyValue::Bool(false).is_blank());
        assert!(PropertyValue::Map(PropertyMap::new()).is_blank());
        assert!(!PropertyValue::Integer(3).is_blank());
    }
}
