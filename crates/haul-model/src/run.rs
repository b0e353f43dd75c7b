use haul_solver::{ConstraintViolation, SolutionStatus, SolverStatus, TerminationCondition};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapter::{SolveResult, SolverAdapter};
use crate::data::{DataError, DataSource};
use crate::formulate::{ArcId, ModelInstance, formulate};
use crate::schema::SchemaViolation;
use crate::sensitivity::{InterpretError, SensitivityReport, interpret};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

/// A positive flow on a declared arc
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shipment {
    pub source: String,
    pub customer: String,
    pub quantity: f64,
}

/// Terminal outcome of one scenario
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Optimal {
        total_cost: f64,
        shipments: Vec<Shipment>,
        sensitivity: SensitivityReport,
    },
    /// No feasible point; no sensitivity analysis is attempted
    Infeasible { diagnostics: Vec<ConstraintViolation> },
    /// Unbounded, aborted or errored solve
    Failed { status: SolutionStatus },
}

/// Everything produced by one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub scenario: String,
    pub instance: ModelInstance,
    pub result: SolveResult,
    pub outcome: RunOutcome,
}

impl ScenarioRun {
    pub fn solver_status(&self) -> SolverStatus {
        self.result.solver_status
    }

    pub fn termination(&self) -> TerminationCondition {
        self.result.termination
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self.outcome, RunOutcome::Optimal { .. })
    }
}

/// Load, formulate, solve and interpret one scenario
pub fn run_scenario<D, S>(data_source: &D, scenario: &str, solver: &S) -> Result<ScenarioRun, RunError>
where
    D: DataSource + ?Sized,
    S: SolverAdapter + ?Sized,
{
    info!(scenario, "running scenario");

    let data = data_source.load(scenario)?;
    let instance = formulate(data)?;
    let result = solver.solve(&instance);

    let outcome = match result.status {
        SolutionStatus::Optimal => {
            let sensitivity = interpret(&instance, &result)?;
            RunOutcome::Optimal {
                total_cost: result.objective_value,
                shipments: shipments(&instance, &result),
                sensitivity,
            }
        }
        SolutionStatus::Infeasible => {
            warn!(scenario, violated = result.diagnostics.len(), "scenario is infeasible");
            RunOutcome::Infeasible {
                diagnostics: result.diagnostics.clone(),
            }
        }
        status => {
            warn!(scenario, %status, termination = %result.termination, "solve did not finish optimally");
            RunOutcome::Failed { status }
        }
    };

    info!(scenario, status = %result.status, objective = result.objective_value, "scenario finished");

    Ok(ScenarioRun {
        scenario: scenario.to_string(),
        instance,
        result,
        outcome,
    })
}

fn shipments(instance: &ModelInstance, result: &SolveResult) -> Vec<Shipment> {
    instance
        .arcs()
        .iter()
        .enumerate()
        .filter_map(|(j, arc)| {
            let quantity = result.flow(ArcId(j))?;
            (quantity > 0.0).then(|| Shipment {
                source: arc.source.clone(),
                customer: arc.customer.clone(),
                quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use haul_solver::Solver;

    use super::*;
    use crate::adapter::SimplexAdapter;
    use crate::schema::{Arc, Customer, Source, TransportData};

    fn scenarios() -> BTreeMap<String, TransportData> {
        let data = TransportData {
            sources: vec![Source { id: "Arn".to_string(), production: 10.0 }],
            customers: vec![
                Customer { id: "Ams".to_string(), demand: 4.0 },
                Customer { id: "Ber".to_string(), demand: 0.0 },
            ],
            arcs: vec![
                Arc {
                    source: "Arn".to_string(),
                    customer: "Ams".to_string(),
                    cost: 2.0,
                    fixed_flow: None,
                },
                Arc {
                    source: "Arn".to_string(),
                    customer: "Ber".to_string(),
                    cost: 1.0,
                    fixed_flow: None,
                },
            ],
        };
        let mut bad = data.clone();
        bad.customers[0].demand = -4.0;
        let mut short = data.clone();
        short.customers[0].demand = 40.0;

        BTreeMap::from([
            ("ok".to_string(), data),
            ("bad".to_string(), bad),
            ("short".to_string(), short),
        ])
    }

    #[test]
    fn test_optimal_run_lists_positive_shipments() {
        let run = run_scenario(&scenarios(), "ok", &SimplexAdapter::default()).unwrap();
        assert!(run.is_optimal());
        assert_eq!(run.solver_status(), SolverStatus::Ok);

        let RunOutcome::Optimal { total_cost, shipments, sensitivity } = &run.outcome else {
            panic!("expected optimal outcome, got {:?}", run.outcome);
        };
        assert_eq!(*total_cost, 8.0);
        assert_eq!(
            shipments,
            &vec![Shipment {
                source: "Arn".to_string(),
                customer: "Ams".to_string(),
                quantity: 4.0
            }]
        );
        assert_eq!(sensitivity.arcs.len(), 2);
    }

    #[test]
    fn test_schema_violation_never_reaches_solver() {
        struct Unreachable;
        impl SolverAdapter for Unreachable {
            fn solve(&self, _: &ModelInstance) -> SolveResult {
                panic!("solver must not be called for malformed data");
            }
        }

        let err = run_scenario(&scenarios(), "bad", &Unreachable).unwrap_err();
        assert!(matches!(err, RunError::Schema(SchemaViolation::NegativeDemand { .. })));
    }

    #[test]
    fn test_infeasible_run_has_diagnostics() {
        let run = run_scenario(&scenarios(), "short", &SimplexAdapter::default()).unwrap();
        assert_eq!(run.termination(), TerminationCondition::Infeasible);
        let RunOutcome::Infeasible { diagnostics } = &run.outcome else {
            panic!("expected infeasible outcome");
        };
        assert_eq!(diagnostics[0].constraint, "demand[Ams]");
    }

    #[test]
    fn test_aborted_solve_is_failed_outcome() {
        let solver = SimplexAdapter::new(Solver::new().with_max_iterations(1));
        let run = run_scenario(&scenarios(), "ok", &solver).unwrap();

        assert!(!run.is_optimal());
        assert!(matches!(
            run.outcome,
            RunOutcome::Failed {
                status: SolutionStatus::Error
            }
        ));
        assert_eq!(run.solver_status(), SolverStatus::Aborted);
        assert_eq!(run.termination(), TerminationCondition::IterationLimit);
        assert!(run.result.duals.is_empty());
        assert!(run.result.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_scenario() {
        let err = run_scenario(&scenarios(), "missing", &SimplexAdapter::default()).unwrap_err();
        assert!(matches!(err, RunError::Data(DataError::UnknownScenario(_))));
    }
}
