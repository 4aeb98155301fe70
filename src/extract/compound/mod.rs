//! Revit (`.rvt`) extraction over the compound document container.
//!
//! Only container metadata is read from the file. Elements come from an
//! [`ElementSource`], which defaults to [`PlaceholderElementSource`] until
//! a native bridge exists.

pub mod placeholder;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub use placeholder::{ElementSource, PlaceholderElementSource};

use super::{
    collect_elements, validate_file, Extraction, FormatExtractor, ProcessorConfig, ProjectInfo,
};
use crate::classify::ElementClassifier;
use crate::error::{ElementError, ExtractError, FileFormatError, ValidationError};
use crate::geometry::Geometry;
use crate::model::{FileFormat, GeometryHandle};
use crate::parser::{default_backend, ContainerBackend, ContainerMetadata};

const UNKNOWN_VERSION: &str = "Revit (version unknown)";

pub struct CompoundDocExtractor {
    backend: Option<Arc<dyn ContainerBackend>>,
    source: Arc<dyn ElementSource>,
    classifier: Arc<ElementClassifier>,
    config: ProcessorConfig,
}

impl CompoundDocExtractor {
    /// Uses the container backend compiled into this build, if any.
    #[must_use]
    pub fn new(classifier: Arc<ElementClassifier>, config: ProcessorConfig) -> Self {
        let backend = default_backend();
        if backend.is_none() {
            warn!("compound document support not compiled in; Revit files will be rejected");
        }
        Self {
            backend,
            source: Arc::new(PlaceholderElementSource),
            classifier,
            config,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Option<Arc<dyn ContainerBackend>>) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ElementSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<&dyn ContainerBackend, FileFormatError> {
        self.backend
            .as_deref()
            .ok_or(FileFormatError::CapabilityUnavailable {
                format: FileFormat::Revit,
            })
    }

    fn metadata(&self, path: &Path) -> Result<ContainerMetadata, FileFormatError> {
        self.backend()?
            .metadata(path)
            .map_err(|source| FileFormatError::Parse {
                format: FileFormat::Revit,
                source,
            })
    }

    /// Title falls back to the file stem.
    fn project_info_from(path: &Path, metadata: ContainerMetadata) -> ProjectInfo {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());

        ProjectInfo {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            file_size: std::fs::metadata(path).ok().map(|m| m.len()),
            project_name: metadata.title.or(stem),
            project_number: metadata.subject,
            author: metadata.author,
            application: metadata.application,
            created: metadata.created,
            modified: metadata.modified,
            ..ProjectInfo::default()
        }
    }
}

impl FormatExtractor for CompoundDocExtractor {
    fn format(&self) -> FileFormat {
        FileFormat::Revit
    }

    fn validate(&self, path: &Path) -> Result<(), ExtractError> {
        let backend = self.backend()?;
        validate_file(path, FileFormat::Revit, self.config.max_file_size)?;

        if !backend.is_valid_container(path) {
            return Err(ValidationError::InvalidContent {
                format: FileFormat::Revit,
                reason: "missing compound document signature".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn extract_elements(&self, path: &Path, model_id: &str) -> Result<Extraction, ExtractError> {
        info!("Processing Revit file: {}", path.display());
        self.validate(path)?;
        let metadata = self.metadata(path)?;
        info!(
            streams = metadata.stream_count,
            "Opened compound document"
        );

        let raws = self.source.elements(path, &metadata);
        let project_info = Self::project_info_from(path, metadata);
        let generated = raws.len();

        let mut extraction = collect_elements(
            raws.into_iter().map(Ok),
            |raw| match &raw.geometry {
                GeometryHandle::Mesh {
                    kind,
                    vertices,
                    faces,
                } => Geometry::new(*kind, vertices.clone(), faces.clone())
                    .map(Some)
                    .map_err(|source| ElementError::Geometry {
                        element: raw.external_id.clone(),
                        source,
                    }),
                GeometryHandle::Entity(_) => Ok(None),
            },
            &self.classifier,
            model_id,
        );
        extraction.project_info = project_info;

        if self.source.is_placeholder() {
            let message = format!(
                "Native Revit element parsing is unavailable; generated {generated} placeholder elements"
            );
            warn!("{message}");
            extraction.warnings.push(message);
        }

        info!(
            "Successfully extracted {} elements from Revit file",
            extraction.elements.len()
        );
        Ok(extraction)
    }

    fn project_info(&self, path: &Path) -> ProjectInfo {
        let metadata = self.metadata(path).unwrap_or_else(|e| {
            warn!("Could not extract compound document metadata: {e}");
            ContainerMetadata::default()
        });
        Self::project_info_from(path, metadata)
    }

    fn software_version(&self, info: &ProjectInfo) -> String {
        info.application
            .clone()
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::model::ElementCategory;
    use crate::parser::compound::SIGNATURE;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    /// Backend that trusts every file and reports fixed metadata.
    struct FixedBackend(ContainerMetadata);

    impl ContainerBackend for FixedBackend {
        fn is_valid_container(&self, _path: &Path) -> bool {
            true
        }

        fn metadata(&self, _path: &Path) -> Result<ContainerMetadata, ParseError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenBackend;

    impl ContainerBackend for BrokenBackend {
        fn metadata(&self, path: &Path) -> Result<ContainerMetadata, ParseError> {
            Err(ParseError::InvalidContainer {
                path: path.to_path_buf(),
                message: "bad sector chain".into(),
            })
        }
    }

    fn extractor(backend: Option<Arc<dyn ContainerBackend>>) -> CompoundDocExtractor {
        CompoundDocExtractor::new(Arc::default(), ProcessorConfig::default()).with_backend(backend)
    }

    fn rvt_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("house.rvt");
        std::fs::write(&path, b"container bytes").unwrap();
        path
    }

    #[test]
    fn placeholder_elements_are_classified_by_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = rvt_file(&dir);
        let extractor = extractor(Some(Arc::new(FixedBackend(ContainerMetadata::default()))));

        extractor.validate(&path).unwrap();
        let extraction = extractor.extract_elements(&path, "m1").unwrap();

        let categories: Vec<ElementCategory> =
            extraction.elements.iter().map(|e| e.category).collect();
        let expected: Vec<ElementCategory> = PlaceholderElementSource::categories().collect();
        assert_eq!(categories, expected);
        assert_eq!(extraction.warnings.len(), 1);
        assert!(extraction.warnings[0].contains("placeholder"));
    }

    #[test]
    fn metadata_feeds_project_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = rvt_file(&dir);
        let extractor = extractor(Some(Arc::new(FixedBackend(ContainerMetadata {
            subject: Some("P-42".into()),
            application: Some("Autodesk Revit 2024".into()),
            ..ContainerMetadata::default()
        }))));

        let info = extractor.project_info(&path);
        assert_eq!(info.project_name.as_deref(), Some("house"));
        assert_eq!(info.project_number.as_deref(), Some("P-42"));
        assert_eq!(info.file_size, Some(15));
        assert_eq!(extractor.software_version(&info), "Autodesk Revit 2024");

        let extraction = extractor.extract_elements(&path, "m1").unwrap();
        assert_eq!(extraction.project_info, info);
    }

    #[test]
    fn missing_capability_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = rvt_file(&dir);
        let extractor = extractor(None);

        assert!(!extractor.is_available());
        assert!(matches!(
            extractor.validate(&path),
            Err(ExtractError::FileFormat(
                FileFormatError::CapabilityUnavailable { .. }
            ))
        ));
        assert!(matches!(
            extractor.extract_elements(&path, "m1"),
            Err(ExtractError::FileFormat(
                FileFormatError::CapabilityUnavailable { .. }
            ))
        ));
        let info = extractor.project_info(&path);
        assert_eq!(info.project_name.as_deref(), Some("house"));
        assert_eq!(extractor.software_version(&info), UNKNOWN_VERSION);
    }

    #[test]
    fn extraction_rejects_plain_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = rvt_file(&dir);
        let extractor = extractor(Some(Arc::new(BrokenBackend)));

        assert!(matches!(
            extractor.validate(&path),
            Err(ExtractError::Validation(ValidationError::InvalidContent { .. }))
        ));
        assert!(matches!(
            extractor.extract_elements(&path, "m1"),
            Err(ExtractError::Validation(ValidationError::InvalidContent { .. }))
        ));
    }

    #[test]
    fn unreadable_container_aborts_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.rvt");
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 24]);
        std::fs::write(&path, bytes).unwrap();
        let extractor = extractor(Some(Arc::new(BrokenBackend)));

        extractor.validate(&path).unwrap();
        assert!(matches!(
            extractor.extract_elements(&path, "m1"),
            Err(ExtractError::FileFormat(FileFormatError::Parse { .. }))
        ));
    }

    #[test]
    fn extraction_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.rvt");
        std::fs::write(&path, b"").unwrap();
        let extractor = extractor(Some(Arc::new(FixedBackend(ContainerMetadata::default()))));

        let err = extractor.extract_elements(&path, "m1").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Validation(ValidationError::Empty { .. })
        ));
        assert!(err.to_string().contains("empty"));
    }
}
