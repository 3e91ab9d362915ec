//! Application layer - Use cases and orchestration.
//!
//! Services and pipelines depend on domain ports (traits) rather than
//! concrete implementations, so the same bound provider and stores flow
//! through the query path and every batch pipeline.

pub mod pipelines;
pub mod services;

pub use pipelines::{EvaluatePipeline, SeedPipeline, UploadItem, UploadPipeline};
pub use services::{
    BatchOptions, BatchReport, BatchRunner, PersistMode, SimilarityService, SimilaritySettings,
};
