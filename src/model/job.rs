use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::extract::ProjectInfo;

/// Supported BIM file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Ifc,
    Revit,
}

impl FileFormat {
    /// Conventional file extension, lowercase and without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ifc => "ifc",
            Self::Revit => "rvt",
        }
    }

    /// Guess the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [Self::Ifc, Self::Revit]
            .into_iter()
            .find(|format| ext.eq_ignore_ascii_case(format.extension()))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ifc => f.write_str("IFC"),
            Self::Revit => f.write_str("Revit"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ifc" => Ok(Self::Ifc),
            "revit" | "rvt" => Ok(Self::Revit),
            other => Err(format!(
                "Unsupported file type: {other}. Must be 'ifc' or 'revit'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Ready,
    Error,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Metadata gathered once a model is fully processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub software_version: Option<String>,
    pub project_info: ProjectInfo,
    pub element_count: usize,
}

/// The uploaded file a job works on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub format: FileFormat,
}

/// Tracked unit of file-to-elements processing.
///
/// Progress only moves forward while the job is processing; a terminal
/// job keeps its last progress until it is restarted with [`begin`].
///
/// [`begin`]: ProcessingJob::begin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub model_id: String,
    pub project_id: String,
    pub file: SourceFile,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub elements_processed: usize,
    pub warnings: Vec<String>,
    pub metadata: Option<ModelMetadata>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// New jobs start out processing; there is no separate queue.
    #[must_use]
    pub fn new(model_id: String, project_id: String, file: SourceFile) -> Self {
        Self {
            model_id,
            project_id,
            file,
            status: JobStatus::Processing,
            progress: 0,
            error_message: None,
            elements_processed: 0,
            warnings: Vec::new(),
            metadata: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Restart from scratch. Used for the first run and for retries.
    pub fn begin(&mut self) {
        self.status = JobStatus::Processing;
        self.progress = 0;
        self.error_message = None;
        self.elements_processed = 0;
        self.warnings.clear();
        self.metadata = None;
        self.completed_at = None;
    }

    /// Move progress forward. Returns false when the update was ignored
    /// (job not processing, or the value would go backwards).
    pub fn advance(&mut self, progress: u8) -> bool {
        if self.status != JobStatus::Processing || progress <= self.progress {
            return false;
        }
        self.progress = progress.min(100);
        true
    }

    pub fn complete(&mut self, metadata: ModelMetadata, warnings: Vec<String>) {
        self.advance(100);
        self.status = JobStatus::Ready;
        self.elements_processed = metadata.element_count;
        self.metadata = Some(metadata);
        self.warnings = warnings;
        self.completed_at = Some(Utc::now());
    }

    /// Progress stays at its last checkpoint.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ProcessingJob {
        ProcessingJob::new(
            "m1".into(),
            "p1".into(),
            SourceFile {
                path: PathBuf::from("model.ifc"),
                name: "model.ifc".into(),
                size: 10,
                format: FileFormat::Ifc,
            },
        )
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut job = job();
        assert!(job.advance(30));
        assert!(!job.advance(20));
        assert!(!job.advance(30));
        assert_eq!(job.progress, 30);
    }

    #[test]
    fn failure_freezes_progress() {
        let mut job = job();
        job.advance(30);
        job.fail("boom");
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 30);
        assert!(!job.advance(80));
        assert_eq!(job.progress, 30);
    }

    #[test]
    fn begin_resets_terminal_job() {
        let mut job = job();
        job.advance(90);
        job.fail("boom");
        job.begin();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 0);
        assert_eq!(job.error_message, None);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/B.IFC")),
            Some(FileFormat::Ifc)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("house.rvt")),
            Some(FileFormat::Revit)
        );
        assert_eq!(FileFormat::from_path(Path::new("plan.dwg")), None);
        assert!("dwg".parse::<FileFormat>().is_err());
        assert_eq!("Revit".parse::<FileFormat>(), Ok(FileFormat::Revit));
    }
}
