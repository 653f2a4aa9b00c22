pub mod policy;

pub use policy::{
    evaluate, log_result, CheckOutcome, CheckTier, CoreMetric, QualificationPolicy,
    QualificationResult, QualificationTier, Threshold,
};
