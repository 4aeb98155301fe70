//! IFC (ISO-10303-21) extraction.

pub mod properties;
pub mod relations;
pub mod shape;

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    collect_elements, validate_file, Extraction, FormatExtractor, ProcessorConfig, ProjectInfo,
};
use crate::classify::rules::IFC_TYPES;
use crate::classify::ElementClassifier;
use crate::error::{ElementError, ExtractError, FileFormatError, ParseError, ValidationError};
use crate::model::{FileFormat, GeometryHandle, NativeType, RawElement};
use crate::parser::{open_ifc, IfcModel, StepEntity};

/// Type objects share the classification table but are not placed
/// elements.
const NON_OCCURRENCE_TYPES: &[&str] = &["IfcRailingType"];

pub struct IfcExtractor {
    classifier: Arc<ElementClassifier>,
    config: ProcessorConfig,
}

impl IfcExtractor {
    #[must_use]
    pub fn new(classifier: Arc<ElementClassifier>, config: ProcessorConfig) -> Self {
        Self { classifier, config }
    }

    fn open(path: &Path) -> Result<IfcModel, FileFormatError> {
        open_ifc(path).map_err(|source| FileFormatError::Parse {
            format: FileFormat::Ifc,
            source,
        })
    }
}

impl FormatExtractor for IfcExtractor {
    fn format(&self) -> FileFormat {
        FileFormat::Ifc
    }

    fn validate(&self, path: &Path) -> Result<(), ExtractError> {
        validate_file(path, FileFormat::Ifc, self.config.max_file_size)?;

        let invalid = |reason: String| ValidationError::InvalidContent {
            format: FileFormat::Ifc,
            reason,
        };
        let model = open_ifc(path).map_err(|e| match e {
            ParseError::FileRead { path, source } => ValidationError::Metadata { path, source },
            other => invalid(other.to_string()),
        })?;
        if model.schema().is_empty() {
            return Err(invalid("file declares no schema".to_string()).into());
        }
        Ok(())
    }

    fn extract_elements(&self, path: &Path, model_id: &str) -> Result<Extraction, ExtractError> {
        info!("Processing IFC file: {}", path.display());
        validate_file(path, FileFormat::Ifc, self.config.max_file_size)?;
        let model = Self::open(path)?;
        info!("Opened IFC file with schema: {}", model.schema());
        if model.step().skipped > 0 {
            warn!(skipped = model.step().skipped, "some data statements could not be decoded");
        }

        let entities: Vec<&StepEntity> = IFC_TYPES
            .iter()
            .filter(|(name, _)| !NON_OCCURRENCE_TYPES.contains(name))
            .flat_map(|(name, _)| model.by_type(name))
            .collect();
        info!("Found {} building elements", entities.len());

        let raws = entities
            .iter()
            .map(|entity| raw_element(&model, entity));
        let mut extraction = collect_elements(
            raws,
            |raw| match raw.geometry {
                GeometryHandle::Entity(id) => model
                    .entity(id)
                    .map_or(Ok(None), |entity| shape::element_geometry(&model, entity)),
                GeometryHandle::Mesh { .. } => Ok(None),
            },
            &self.classifier,
            model_id,
        );
        extraction.project_info = project_info(&model, path);

        info!(
            "Successfully extracted {} elements from IFC file",
            extraction.elements.len()
        );
        Ok(extraction)
    }

    fn project_info(&self, path: &Path) -> ProjectInfo {
        match Self::open(path) {
            Ok(model) => project_info(&model, path),
            Err(e) => {
                warn!("Error extracting project info: {e}");
                ProjectInfo::default()
            }
        }
    }

    fn software_version(&self, info: &ProjectInfo) -> String {
        software_version(info)
    }
}

/// Enumerated element with its relations resolved. Geometry is resolved
/// later from the entity handle.
fn raw_element(model: &IfcModel, entity: &StepEntity) -> Result<RawElement, ElementError> {
    let external_id = entity
        .string(0)
        .ok_or(ElementError::MissingAttribute {
            entity: entity.id,
            attribute: "GlobalId",
        })?
        .to_string();

    // Canonical spelling from the table; STEP only carries upper case.
    let class_name = IFC_TYPES
        .iter()
        .find(|(name, _)| entity.is_type(name))
        .map_or_else(|| entity.entity_type.clone(), |(name, _)| (*name).to_string());

    Ok(RawElement {
        format: FileFormat::Ifc,
        native_type: NativeType::Entity(class_name.clone()),
        external_id,
        category_name: None,
        family_name: Some(class_name),
        type_name: relations::type_name(model, entity),
        level: relations::level(model, entity),
        properties: properties::element_properties(model, entity),
        material_ids: relations::material_ids(model, entity),
        geometry: GeometryHandle::Entity(entity.id),
    })
}

/// Project, application and owner details from the header and the first
/// instance of each relevant entity.
pub fn project_info(model: &IfcModel, path: &Path) -> ProjectInfo {
    let first = |entity_type: &str| model.by_type(entity_type).into_iter().next();
    let text = |entity: Option<&StepEntity>, index: usize| {
        entity.and_then(|e| e.string(index)).map(str::to_string)
    };

    let project = first("IFCPROJECT");
    let application = first("IFCAPPLICATION");
    let person = first("IFCPERSON");

    let author = person
        .map(|p| {
            [p.string(2), p.string(1)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|name| !name.is_empty());

    ProjectInfo {
        schema: Some(model.schema().to_string()).filter(|s| !s.is_empty()),
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        file_size: std::fs::metadata(path).ok().map(|m| m.len()),
        project_name: text(project, 2),
        project_description: text(project, 3),
        project_long_name: text(project, 5),
        application: text(application, 2)
            .or_else(|| model.step().header.originating_system.clone()),
        version: text(application, 1),
        author,
        organization: text(first("IFCORGANIZATION"), 1),
        created: model
            .step()
            .header
            .time_stamp
            .as_deref()
            .and_then(parse_time_stamp),
        ..ProjectInfo::default()
    }
}

/// `{application} {version} (IFC {schema})`, falling back to the schema
/// alone.
#[must_use]
pub fn software_version(info: &ProjectInfo) -> String {
    match (&info.application, &info.version, &info.schema) {
        (Some(application), Some(version), schema) => format!(
            "{application} {version} (IFC {})",
            schema.as_deref().unwrap_or_default()
        ),
        (_, _, Some(schema)) => format!("IFC {schema}"),
        _ => "IFC (version unknown)".to_string(),
    }
}

/// Header time stamps are ISO 8601 without a zone, sometimes with one.
fn parse_time_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(stamp)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|t| t.and_utc())
        })
}
