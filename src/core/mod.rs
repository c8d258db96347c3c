pub mod etl;
pub mod fields;
pub mod interpolate;
pub mod locator;
pub mod pdf_pipeline;
pub mod report;
pub mod session;
pub mod workflow;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
