//! Runtime settings, read from flags or the environment.

use clap::Args;
use std::time::Duration;

use crate::extract::ProcessorConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Largest accepted input file, in megabytes
    #[arg(
        long,
        env = "BIM_MAX_FILE_SIZE_MB",
        default_value_t = 1024,
        value_name = "MB",
        global = true
    )]
    pub max_file_size_mb: u64,

    /// Give up waiting on a processing job after this many seconds
    #[arg(
        long,
        env = "BIM_JOB_TIMEOUT_SECS",
        default_value_t = 3600,
        value_name = "SECS",
        global = true
    )]
    pub job_timeout_secs: u64,

    /// Log filter, e.g. `info` or `bim_processor=debug` (overrides RUST_LOG)
    #[arg(long, env = "BIM_LOG_LEVEL", value_name = "FILTER", global = true)]
    pub log_level: Option<String>,
}

impl Settings {
    #[must_use]
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_file_size: self.max_file_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    #[must_use]
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn flags_convert_to_library_config() {
        let cli = Cli::try_parse_from([
            "bim-processor",
            "--max-file-size-mb",
            "5",
            "--job-timeout-secs",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.settings.processor_config().max_file_size, 5 * 1024 * 1024);
        assert_eq!(cli.settings.job_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_non_numeric_size() {
        assert!(Cli::try_parse_from(["bim-processor", "--max-file-size-mb", "lots"]).is_err());
    }
}
