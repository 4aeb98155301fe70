//! Format dispatch and the validate, extract, collect-metadata sequence.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};

use crate::classify::ElementClassifier;
use crate::error::ProcessError;
use crate::extract::{
    CompoundDocExtractor, Extraction, FormatExtractor, IfcExtractor, ProcessorConfig,
    ProjectInfo,
};
use crate::model::{Element, FileFormat};

/// Progress points reported while a file is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Validated,
    ExtractionStarted,
    Extracted { elements: usize },
    MetadataCollected,
}

impl Checkpoint {
    #[must_use]
    pub fn progress(self) -> u8 {
        match self {
            Self::Validated => 20,
            Self::ExtractionStarted => 30,
            Self::Extracted { .. } => 80,
            Self::MetadataCollected => 90,
        }
    }
}

/// Everything produced from one file.
#[derive(Debug, Clone)]
pub struct ProcessingOutput {
    pub elements: Vec<Element>,
    pub warnings: Vec<String>,
    pub project_info: ProjectInfo,
    pub software_version: String,
    pub processing_time_seconds: f64,
}

pub struct FileProcessor {
    classifier: Arc<ElementClassifier>,
    extractors: Vec<Arc<dyn FormatExtractor>>,
}

impl FileProcessor {
    /// Processor for every supported format sharing one classifier.
    #[must_use]
    pub fn new(classifier: Arc<ElementClassifier>, config: ProcessorConfig) -> Self {
        let extractors: Vec<Arc<dyn FormatExtractor>> = vec![
            Arc::new(IfcExtractor::new(Arc::clone(&classifier), config)),
            Arc::new(CompoundDocExtractor::new(Arc::clone(&classifier), config)),
        ];
        Self::with_extractors(classifier, extractors)
    }

    #[must_use]
    pub fn with_extractors(
        classifier: Arc<ElementClassifier>,
        extractors: Vec<Arc<dyn FormatExtractor>>,
    ) -> Self {
        Self {
            classifier,
            extractors,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<ElementClassifier> {
        &self.classifier
    }

    /// Format implied by the file extension.
    pub fn detect_format(path: &Path) -> Result<FileFormat, ProcessError> {
        FileFormat::from_path(path).ok_or_else(|| ProcessError::UnsupportedFormat {
            path: path.to_path_buf(),
        })
    }

    fn extractor(&self, format: FileFormat, path: &Path) -> Result<&dyn FormatExtractor, ProcessError> {
        self.extractors
            .iter()
            .find(|extractor| extractor.format() == format)
            .map(Arc::as_ref)
            .ok_or_else(|| ProcessError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    pub fn validate(&self, path: &Path, format: FileFormat) -> Result<(), ProcessError> {
        self.extractor(format, path)?.validate(path)?;
        Ok(())
    }

    pub fn process(
        &self,
        path: &Path,
        model_id: &str,
        format: FileFormat,
    ) -> Result<ProcessingOutput, ProcessError> {
        self.process_with(path, model_id, format, |_| {})
    }

    /// Run the full pipeline, reporting each checkpoint as it is reached.
    pub fn process_with<F>(
        &self,
        path: &Path,
        model_id: &str,
        format: FileFormat,
        mut on_checkpoint: F,
    ) -> Result<ProcessingOutput, ProcessError>
    where
        F: FnMut(Checkpoint),
    {
        let _span = info_span!("process", model_id, %format).entered();
        let started = Instant::now();
        let extractor = self.extractor(format, path)?;

        extractor.validate(path)?;
        on_checkpoint(Checkpoint::Validated);

        on_checkpoint(Checkpoint::ExtractionStarted);
        let extraction = extractor.extract_elements(path, model_id)?;
        on_checkpoint(Checkpoint::Extracted {
            elements: extraction.elements.len(),
        });

        let Extraction {
            elements,
            warnings,
            project_info,
        } = extraction;
        let software_version = extractor.software_version(&project_info);
        on_checkpoint(Checkpoint::MetadataCollected);

        let processing_time_seconds = started.elapsed().as_secs_f64();
        info!(
            elements = elements.len(),
            warnings = warnings.len(),
            "processed {} in {processing_time_seconds:.2}s",
            path.display()
        );

        Ok(ProcessingOutput {
            elements,
            warnings,
            project_info,
            software_version,
            processing_time_seconds,
        })
    }

    pub fn project_info(&self, path: &Path, format: FileFormat) -> ProjectInfo {
        self.extractor(format, path)
            .map(|extractor| extractor.project_info(path))
            .unwrap_or_default()
    }

    pub fn software_version(&self, path: &Path, format: FileFormat) -> Option<String> {
        self.extractor(format, path)
            .ok()
            .map(|extractor| extractor.software_version(&extractor.project_info(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ValidationError};
    use pretty_assertions::assert_eq;

    #[test]
    fn checkpoints_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty-model.ifc");
        std::fs::write(
            &path,
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;\n",
        )
        .unwrap();

        let processor = FileProcessor::new(Arc::default(), ProcessorConfig::default());
        let mut seen = Vec::new();
        let output = processor
            .process_with(&path, "m1", FileFormat::Ifc, |cp| seen.push(cp.progress()))
            .unwrap();

        assert_eq!(seen, vec![20, 30, 80, 90]);
        assert!(output.elements.is_empty());
        assert_eq!(output.software_version, "IFC IFC2X3");
        assert_eq!(output.project_info.schema.as_deref(), Some("IFC2X3"));
    }

    #[test]
    fn validation_failure_reports_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ifc");
        std::fs::write(&path, b"").unwrap();

        let processor = FileProcessor::new(Arc::default(), ProcessorConfig::default());
        let mut seen = Vec::new();
        let err = processor
            .process_with(&path, "m1", FileFormat::Ifc, |cp| seen.push(cp))
            .unwrap_err();

        assert!(seen.is_empty());
        assert!(matches!(err, ProcessError::Validation(ValidationError::Empty { .. })));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = FileProcessor::detect_format(Path::new("plan.dwg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            FileProcessor::detect_format(Path::new("a.rvt")).unwrap(),
            FileFormat::Revit
        );
    }
}
