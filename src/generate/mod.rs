pub mod field_catalog;
pub mod generator;
pub mod mode;
pub mod mutation;
pub mod performance;
pub mod templates;

pub use field_catalog::{ApiFieldCatalog, FieldCatalog, StaticFieldCatalog};
pub use generator::generate;
pub use mode::Mode;
pub use mutation::{MutationConfig, MutationEngine};
pub use performance::StrategyPerformance;
