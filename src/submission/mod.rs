pub mod pipeline;

pub use pipeline::{SubmissionPipeline, SubmissionReport, SubmitPolicy};
