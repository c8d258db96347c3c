pub mod cli;
pub mod workflow_config;

#[cfg(feature = "cli")]
use crate::core::report::ensure_supported_output;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "sigajus")]
#[command(about = "Desktop automation and PDF field extraction for SIGAJUS")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract case fields from every PDF in a folder into a CSV/XLSX report
    Extract(ExtractArgs),
    /// Run a workflow file against the SIGAJUS window
    Run(RunArgs),
    /// Find a template image on the current screen
    Locate(LocateArgs),
    /// Print the cursor position and the colour under it
    Position,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    #[arg(short, long, help = "Folder with the PDF files")]
    pub input: String,

    #[arg(short, long, help = "Report file (.csv or .xlsx)")]
    pub output: String,

    #[arg(long, help = "Add the source file name as the first column")]
    pub with_source_file: bool,

    #[arg(long, help = "Write filing dates as dd/mm/yyyy")]
    pub normalize_dates: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(short, long, help = "Workflow TOML file")]
    pub config: String,

    #[arg(long, help = "Input CSV, overrides [input] path")]
    pub input: Option<String>,

    #[arg(long, help = "Report file, overrides [report] output")]
    pub output: Option<String>,

    #[arg(long, help = "Validate the workflow and print a summary without touching the desktop")]
    pub dry_run: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct LocateArgs {
    #[arg(short, long, help = "Template image (PNG)")]
    pub template: String,

    #[arg(long, default_value = "0.9")]
    pub confidence: f32,
}

#[cfg(feature = "cli")]
impl Validate for ExtractArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_directory("input", &self.input)?;
        validation::validate_path("output", &self.output)?;
        ensure_supported_output(&self.output)
    }
}

#[cfg(feature = "cli")]
impl Validate for RunArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_path("config", &self.config)?;
        validation::validate_file_extension("config", &self.config, &["toml"])?;
        if let Some(input) = &self.input {
            validation::validate_file_extension("input", input, &["csv"])?;
        }
        if let Some(output) = &self.output {
            ensure_supported_output(output)?;
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl Validate for LocateArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_path("template", &self.template)?;
        validation::validate_range("confidence", self.confidence, 0.01, 1.0)
    }
}
