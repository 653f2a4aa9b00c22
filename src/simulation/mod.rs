pub mod cancel;
pub mod metrics;
pub mod model;
pub mod orchestrator;
#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancelSignal;
pub use metrics::{MetricsSnapshot, NamedCheck};
pub use model::{JobState, SimulationJob, SimulationSettings};
pub use orchestrator::{OrchestratorConfig, SimulationOrchestrator};
