pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::workflow_config::WorkflowConfig;
#[cfg(feature = "cli")]
pub use config::Cli;

pub use core::{
    etl::EtlEngine,
    pdf_pipeline::{PdfReportOptions, PdfReportPipeline},
    workflow::{RunOutcome, RunSummary, WorkflowRunner},
};
pub use domain::ports::Desktop;
pub use utils::error::{AutomationError, Result};
