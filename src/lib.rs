//! # BIM Processor
//!
//! Turns building information model files into a normalized list of
//! classified building elements, tracking each file as a processing job.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas) including property sets,
//!   quantities, materials, storeys and explicit body geometry
//! - Read Revit (`.rvt`) compound document metadata
//! - Classify elements into a shared category taxonomy with confidence
//!   scores
//! - Track processing jobs with monotonic progress
//! - Export elements to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use bim_processor::extract::ProcessorConfig;
//! use bim_processor::jobs::{InMemoryJobStore, JobTracker};
//! use bim_processor::processor::FileProcessor;
//!
//! let processor = FileProcessor::new(Arc::default(), ProcessorConfig::default());
//! let tracker = JobTracker::new(Arc::new(InMemoryJobStore::new()), Arc::new(processor));
//!
//! let job = tracker.create_job("project-1", Path::new("model.ifc"), None)?;
//! let outcome = tracker.process(&job.model_id)?;
//! println!("{} elements", outcome.job.elements_processed);
//! # Ok::<(), bim_processor::error::ProcessError>(())
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod geometry;
pub mod jobs;
pub mod model;
pub mod parser;
pub mod processor;
