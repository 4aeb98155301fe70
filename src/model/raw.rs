use std::fmt;

use super::{FileFormat, PropertyMap};
use crate::geometry::GeometryKind;

/// How the source format identifies an element's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    /// IFC entity class name, e.g. `IfcWall`.
    Entity(String),
    /// Revit built-in category id, e.g. `-2000011`.
    CategoryCode(i64),
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(name) => f.write_str(name),
            Self::CategoryCode(code) => write!(f, "{code}"),
        }
    }
}

/// Where an element's geometry comes from.
#[derive(Debug, Clone)]
pub enum GeometryHandle {
    /// Entity id of an IFC product; shape resolved from its representation.
    Entity(u64),
    /// Mesh already materialized by the source.
    Mesh {
        kind: GeometryKind,
        vertices: Vec<[f64; 3]>,
        faces: Vec<Vec<usize>>,
    },
}

/// Element as enumerated from a source file, before classification.
#[derive(Debug, Clone)]
pub struct RawElement {
    pub format: FileFormat,
    pub native_type: NativeType,
    pub external_id: String,
    /// Human readable category label from the source (Revit only).
    pub category_name: Option<String>,
    pub family_name: Option<String>,
    pub type_name: Option<String>,
    pub level: Option<String>,
    pub properties: PropertyMap,
    pub material_ids: Vec<String>,
    pub geometry: GeometryHandle,
}
