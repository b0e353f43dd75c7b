pub mod adapter;
pub mod config;
pub mod data;
pub mod formulate;
pub mod report;
pub mod run;
pub mod schema;
pub mod sensitivity;

pub use adapter::{SimplexAdapter, SolveResult, SolverAdapter};
pub use config::{ConfigError, RunConfig, SolverConfig};
pub use data::{DataError, DataSource, JsonDataSource};
pub use formulate::{ArcId, ConstraintId, ModelInstance, formulate};
pub use report::{Report, ReportBody};
pub use run::{RunError, RunOutcome, ScenarioRun, Shipment, run_scenario};
pub use schema::{Arc, Customer, SchemaViolation, Source, TransportData};
pub use sensitivity::{
    ArcSensitivity, Conclusion, CostEffect, CustomerSensitivity, InterpretError, SensitivityReport,
    SourceSensitivity, interpret,
};
