use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use bim_processor::classify::{ClassificationRequest, ElementClassifier};
use bim_processor::config::Settings;
use bim_processor::export::{export_csv, export_json};
use bim_processor::jobs::{InMemoryJobStore, JobTracker};
use bim_processor::model::{Element, FileFormat, PropertyMap};
use bim_processor::processor::FileProcessor;

#[derive(Parser, Debug)]
#[command(name = "bim-processor")]
#[command(about = "BIM Processor - extract and classify building elements from IFC and Revit files")]
#[command(version)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process files into classified elements
    Process {
        /// Paths to IFC or Revit files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Project the created jobs belong to
        #[arg(long, default_value = "default")]
        project: String,

        /// Force the file format instead of using the extension
        #[arg(long)]
        format: Option<FileFormat>,

        /// Export elements to JSON (optional output path)
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Export elements to CSV (optional output path)
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },

    /// Classify a single element description and print the result
    Classify {
        #[arg(long, default_value = "ifc")]
        format: FileFormat,

        /// IFC entity name, e.g. IfcWall
        #[arg(long = "type", default_value = "")]
        element_type: String,

        /// Revit built-in category id, e.g. -2000011
        #[arg(long, allow_negative_numbers = true)]
        category_id: Option<i64>,

        #[arg(long)]
        category_name: Option<String>,

        #[arg(long)]
        family: Option<String>,

        /// Element property, repeatable
        #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
        properties: Vec<(String, String)>,
    },

    /// Show project information and authoring software of a file
    Info {
        file: PathBuf,

        #[arg(long)]
        format: Option<FileFormat>,
    },

    /// List element categories
    Categories,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.settings.log_level.as_deref())?;

    let classifier = Arc::new(ElementClassifier::new());
    let processor = Arc::new(FileProcessor::new(
        Arc::clone(&classifier),
        args.settings.processor_config(),
    ));

    match args.command {
        Command::Process {
            files,
            project,
            format,
            json,
            csv,
        } => {
            let tracker = Arc::new(JobTracker::new(Arc::new(InMemoryJobStore::new()), processor));
            let elements = process_files(&tracker, &args.settings, &files, &project, format)?;

            if let Some(csv_path) = &csv {
                export_csv(&elements, csv_path)?;
                println!("Exported to CSV: {}", csv_path.display());
            }
            if let Some(json_path) = &json {
                export_json(&elements, json_path)?;
                println!("Exported to JSON: {}", json_path.display());
            }
        }
        Command::Classify {
            format,
            element_type,
            category_id,
            category_name,
            family,
            properties,
        } => {
            let properties: PropertyMap = properties
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect();
            let request = ClassificationRequest {
                file_type: Some(format),
                element_type,
                category_id,
                category_name,
                properties: (!properties.is_empty()).then_some(properties),
                family_name: family,
            };
            let result = classifier.classify(&request);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Info { file, format } => {
            let format = match format {
                Some(format) => format,
                None => FileProcessor::detect_format(&file)?,
            };
            processor.validate(&file, format)?;
            let report = serde_json::json!({
                "software_version": processor.software_version(&file, format),
                "project_info": processor.project_info(&file, format),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Categories => {
            for category in ElementClassifier::supported_categories() {
                println!("{:<12} {}", category.as_str(), category.description());
            }
        }
    }

    Ok(())
}

/// `--log-level` wins over `RUST_LOG`; without either only warnings show.
fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Run one job per file, each bounded by the job timeout. Returns the
/// elements of every job that finished.
fn process_files(
    tracker: &Arc<JobTracker>,
    settings: &Settings,
    files: &[PathBuf],
    project: &str,
    format: Option<FileFormat>,
) -> Result<Vec<Element>> {
    let mut elements = Vec::new();
    let mut failed = 0usize;

    for path in files {
        let job = match tracker.create_job(project, path, format) {
            Ok(job) => job,
            Err(e) => {
                println!("{}: rejected - {e}", path.display());
                failed += 1;
                continue;
            }
        };

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(tracker);
        let model_id = job.model_id.clone();
        thread::spawn(move || {
            // The receiver is gone once the job timed out.
            let _ = tx.send(worker.process(&model_id));
        });

        match rx.recv_timeout(settings.job_timeout()) {
            Ok(Ok(outcome)) => {
                let job = &outcome.job;
                println!(
                    "{}: {} ({} elements, {} warnings) - {}",
                    job.file.name,
                    job.status,
                    job.elements_processed,
                    job.warnings.len(),
                    outcome.output.software_version,
                );
                for warning in &job.warnings {
                    println!("  warning: {warning}");
                }
                elements.extend(outcome.output.elements);
            }
            Ok(Err(e)) => {
                let progress = tracker.status(&job.model_id).map_or(0, |job| job.progress);
                println!("{}: error at {progress}% - {e}", job.file.name);
                failed += 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(model_id = %job.model_id, "job timed out");
                println!(
                    "{}: timed out after {}s",
                    job.file.name,
                    settings.job_timeout().as_secs()
                );
                failed += 1;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(eyre!("worker for {} exited without a result", job.file.name));
            }
        }
    }

    if failed > 0 && elements.is_empty() {
        bail!("{failed} of {} files failed", files.len());
    }
    if failed > 0 {
        warn!("{failed} of {} files failed", files.len());
    }
    Ok(elements)
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
