//! Per-format element extraction.
//!
//! Each [`FormatExtractor`] validates its input, enumerates native elements
//! and turns them into canonical [`Element`] records. A failure on one
//! element drops that element and records a warning; only file-level
//! failures abort an extraction.

pub mod compound;
pub mod ifc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::{ClassificationResult, ElementClassifier};
use crate::error::{ElementError, ExtractError, ValidationError};
use crate::geometry::Geometry;
use crate::model::{Element, FileFormat, NativeType, RawElement};

pub use compound::CompoundDocExtractor;
pub use ifc::IfcExtractor;

/// 1 GiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Library-side knobs. Built from the CLI settings, or by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Largest accepted input, in bytes.
    pub max_file_size: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// File-level project information. Every field is best effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_long_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ProjectInfo {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Elements pulled from one file plus the warnings for elements that
/// were dropped on the way. `project_info` is read from the same open of
/// the file.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub elements: Vec<Element>,
    pub warnings: Vec<String>,
    pub project_info: ProjectInfo,
}

/// A source format the processor can read.
pub trait FormatExtractor: Send + Sync {
    fn format(&self) -> FileFormat;

    /// Check that `path` is a readable file of this format.
    fn validate(&self, path: &Path) -> Result<(), ExtractError>;

    /// Enumerate and convert every element of interest. Runs the file
    /// checks of [`validate_file`] first, so a file that was never
    /// validated is still rejected as bad input.
    fn extract_elements(&self, path: &Path, model_id: &str) -> Result<Extraction, ExtractError>;

    /// Empty on any failure.
    fn project_info(&self, path: &Path) -> ProjectInfo;

    /// Authoring software, derived from already collected project info.
    fn software_version(&self, info: &ProjectInfo) -> String;
}

/// Checks shared by every format: existence, regular file, non-empty,
/// size limit and extension, in that order. Returns the file size.
pub fn validate_file(
    path: &Path,
    format: FileFormat,
    max_size: u64,
) -> Result<u64, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(ValidationError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let size = std::fs::metadata(path)
        .map_err(|source| ValidationError::Metadata {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size == 0 {
        return Err(ValidationError::Empty {
            path: path.to_path_buf(),
        });
    }
    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            limit: max_size,
        });
    }

    if FileFormat::from_path(path) != Some(format) {
        return Err(ValidationError::WrongExtension {
            format,
            extension: format.extension(),
        });
    }

    Ok(size)
}

/// Classify a raw element with the cascade of its source format.
pub fn classify_raw(classifier: &ElementClassifier, raw: &RawElement) -> ClassificationResult {
    match &raw.native_type {
        NativeType::Entity(name) => {
            classifier.classify_ifc(name, Some(&raw.properties), raw.type_name.as_deref())
        }
        NativeType::CategoryCode(code) => classifier.classify_revit(
            Some(*code),
            raw.category_name.as_deref(),
            Some(&raw.properties),
            raw.family_name.as_deref(),
        ),
    }
}

/// Build the canonical element with a fresh id.
#[must_use]
pub fn assemble(
    raw: RawElement,
    geometry: Geometry,
    classification: ClassificationResult,
    model_id: &str,
) -> Element {
    Element {
        id: Uuid::new_v4().to_string(),
        model_id: model_id.to_string(),
        external_id: raw.external_id,
        category: classification.category,
        family_name: raw.family_name,
        type_name: raw.type_name,
        level: raw.level,
        geometry,
        properties: raw.properties,
        material_ids: raw.material_ids.into_iter().collect(),
        created_at: Utc::now(),
    }
}

/// Drive the per-element pipeline over `raws`.
///
/// `resolve_geometry` returns `Ok(None)` for elements without a shape;
/// those are skipped silently. Errors from either side drop the element
/// and become warnings.
pub(crate) fn collect_elements<I, G>(
    raws: I,
    mut resolve_geometry: G,
    classifier: &ElementClassifier,
    model_id: &str,
) -> Extraction
where
    I: IntoIterator<Item = Result<RawElement, ElementError>>,
    G: FnMut(&RawElement) -> Result<Option<Geometry>, ElementError>,
{
    let mut extraction = Extraction::default();

    for raw in raws {
        let result = raw.and_then(|raw| {
            let geometry = resolve_geometry(&raw)?;
            Ok((raw, geometry))
        });

        match result {
            Ok((raw, Some(geometry))) => {
                let classification = classify_raw(classifier, &raw);
                debug!(
                    external_id = %raw.external_id,
                    native_type = %raw.native_type,
                    category = %classification.category,
                    confidence = classification.confidence,
                    method = ?classification.method,
                    "classified element"
                );
                extraction
                    .elements
                    .push(assemble(raw, geometry, classification, model_id));
            }
            Ok((raw, None)) => {
                debug!(external_id = %raw.external_id, "no geometry, skipping element");
            }
            Err(e) => {
                warn!("Failed to process element: {e}");
                extraction.warnings.push(e.to_string());
            }
        }
    }

    extraction
}
