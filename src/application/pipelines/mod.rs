//! Bulk workloads built on [`BatchRunner`](crate::application::BatchRunner).

mod evaluate;
mod seed;
mod upload;

pub use evaluate::EvaluatePipeline;
pub use seed::SeedPipeline;
pub use upload::{scan_directory, UploadItem, UploadPipeline};
