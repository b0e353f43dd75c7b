use std::fmt;

use haul_solver::{ConstraintViolation, SolutionStatus, SolverStatus, TerminationCondition};
use serde::Serialize;

use crate::run::{RunOutcome, ScenarioRun, Shipment};
use crate::sensitivity::SensitivityReport;

/// Printable summary of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: String,
    pub status: SolutionStatus,
    pub solver_status: SolverStatus,
    pub termination: TerminationCondition,
    #[serde(flatten)]
    pub body: ReportBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportBody {
    Optimal {
        total_cost: f64,
        shipments: Vec<Shipment>,
        sensitivity: SensitivityReport,
    },
    Infeasible {
        diagnostics: Vec<ConstraintViolation>,
    },
    Failed,
}

impl Report {
    pub fn from_run(run: &ScenarioRun) -> Self {
        let body = match &run.outcome {
            RunOutcome::Optimal {
                total_cost,
                shipments,
                sensitivity,
            } => ReportBody::Optimal {
                total_cost: *total_cost,
                shipments: shipments.clone(),
                sensitivity: sensitivity.clone(),
            },
            RunOutcome::Infeasible { diagnostics } => ReportBody::Infeasible {
                diagnostics: diagnostics.clone(),
            },
            RunOutcome::Failed { .. } => ReportBody::Failed,
        };

        Report {
            scenario: run.scenario.clone(),
            status: run.result.status,
            solver_status: run.solver_status(),
            termination: run.termination(),
            body,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario)?;
        writeln!(f, "Solver status: {}", self.solver_status)?;
        writeln!(f, "Termination condition: {}", self.termination)?;
        writeln!(f)?;

        match &self.body {
            ReportBody::Optimal {
                total_cost,
                shipments,
                sensitivity,
            } => {
                writeln!(f, "Total transportation cost: {}", total_cost)?;
                writeln!(f)?;
                write_shipments(f, shipments)?;
                writeln!(f)?;
                write_sensitivity(f, sensitivity)
            }
            ReportBody::Infeasible { diagnostics } => {
                writeln!(f, "No solution satisfies all constraints.")?;
                if diagnostics.is_empty() {
                    return writeln!(f, "No violated constraint could be identified.");
                }
                writeln!(f, "Violated constraints:")?;
                for v in diagnostics {
                    writeln!(
                        f,
                        "  {:24} required {:>12.4} actual {:>12.4} violation {:>12.4}",
                        v.constraint, v.required, v.actual, v.violation_amount
                    )?;
                    writeln!(f, "    {}", v.description)?;
                }
                Ok(())
            }
            ReportBody::Failed => writeln!(f, "The solver did not find an optimal solution ({}).", self.status),
        }
    }
}

fn write_shipments(f: &mut fmt::Formatter<'_>, shipments: &[Shipment]) -> fmt::Result {
    writeln!(f, "Quantity exchanged between sources and customers:")?;
    writeln!(f, "  {:12} {:12} {:>12}", "Source", "Customer", "Quantity")?;
    for s in shipments {
        writeln!(f, "  {:12} {:12} {:>12}", s.source, s.customer, s.quantity)?;
    }
    Ok(())
}

fn write_sensitivity(f: &mut fmt::Formatter<'_>, report: &SensitivityReport) -> fmt::Result {
    writeln!(f, "Sources sensitivity analysis:")?;
    writeln!(f, "  {:12} {:>12} {:>12} {:>14}", "Source", "Capacity", "Shipped", "Shadow price")?;
    for s in &report.sources {
        writeln!(f, "  {:12} {:>12} {:>12} {:>14}", s.source, s.capacity, s.shipped, s.shadow_price)?;
    }
    for conclusion in report.sources.iter().filter_map(|s| s.conclusion.as_ref()) {
        writeln!(f, "{}", conclusion)?;
    }
    writeln!(f)?;

    writeln!(f, "Customers sensitivity analysis:")?;
    writeln!(f, "  {:12} {:>12} {:>12} {:>14}", "Customer", "Demand", "Shipped", "Shadow price")?;
    for c in &report.customers {
        writeln!(f, "  {:12} {:>12} {:>12} {:>14}", c.customer, c.demand, c.shipped, c.shadow_price)?;
    }
    for conclusion in report.customers.iter().filter_map(|c| c.conclusion.as_ref()) {
        writeln!(f, "{}", conclusion)?;
    }
    writeln!(f)?;

    writeln!(f, "Routes sensitivity analysis:")?;
    writeln!(f, "  {:12} {:12} {:>12} {:>14}", "Source", "Customer", "Quantity", "Reduced cost")?;
    for a in &report.arcs {
        writeln!(f, "  {:12} {:12} {:>12} {:>14}", a.source, a.customer, a.quantity, a.reduced_cost)?;
    }
    for conclusion in report.arcs.iter().filter_map(|a| a.conclusion.as_ref()) {
        writeln!(f, "{}", conclusion)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use haul_solver::Solver;

    use super::*;
    use crate::adapter::SimplexAdapter;
    use crate::run::run_scenario;
    use crate::schema::{Arc, Customer, Source, TransportData};

    fn scenarios() -> BTreeMap<String, TransportData> {
        let arc = |s: &str, c: &str, cost: f64| Arc {
            source: s.to_string(),
            customer: c.to_string(),
            cost,
            fixed_flow: None,
        };
        let data = TransportData {
            sources: vec![
                Source { id: "Arn".to_string(), production: 5.0 },
                Source { id: "Gou".to_string(), production: 10.0 },
            ],
            customers: vec![Customer { id: "Ams".to_string(), demand: 8.0 }],
            arcs: vec![arc("Arn", "Ams", 1.0), arc("Gou", "Ams", 3.0)],
        };
        let mut orphan = data.clone();
        orphan.customers.push(Customer { id: "Rot".to_string(), demand: 2.0 });

        BTreeMap::from([("base".to_string(), data), ("orphan".to_string(), orphan)])
    }

    #[test]
    fn test_optimal_report_text() {
        let run = run_scenario(&scenarios(), "base", &SimplexAdapter::default()).unwrap();
        let text = Report::from_run(&run).to_string();

        assert!(text.contains("Solver status: ok"));
        assert!(text.contains("Termination condition: optimal"));
        assert!(text.contains("Total transportation cost: 14"));
        assert!(text.contains(
            "The total transportation cost would be reduced by 2 for each additional unit of capacity available in Arn"
        ));
        assert!(text.contains(
            "The total transportation cost would be increased by 3 for each additional unit of demand supplied to Ams"
        ));
        // Both arcs carry flow, so no route conclusions
        assert!(!text.contains("for each unit shipped from"));
    }

    #[test]
    fn test_infeasible_report_has_no_sensitivity() {
        let run = run_scenario(&scenarios(), "orphan", &SimplexAdapter::default()).unwrap();
        let text = Report::from_run(&run).to_string();

        assert!(text.contains("Termination condition: infeasible"));
        assert!(text.contains("demand[Rot] is below minimum of 2.00 by 2.00"));
        assert!(!text.contains("sensitivity analysis"));
    }

    #[test]
    fn test_failed_report_has_status_only() {
        let solver = SimplexAdapter::new(Solver::new().with_max_iterations(1));
        let run = run_scenario(&scenarios(), "base", &solver).unwrap();
        let report = Report::from_run(&run);
        let text = report.to_string();

        assert!(matches!(report.body, ReportBody::Failed));
        assert!(text.contains("Solver status: aborted"));
        assert!(text.contains("Termination condition: maxIterations"));
        assert!(text.contains("The solver did not find an optimal solution"));
        assert!(!text.contains("Total transportation cost"));
        assert!(!text.contains("Shadow price"));
        assert!(!text.contains("Reduced cost"));
        assert!(!text.contains("Violated constraints"));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["solver_status"], "Aborted");
    }

    #[test]
    fn test_json_shape() {
        let run = run_scenario(&scenarios(), "base", &SimplexAdapter::default()).unwrap();
        let value = serde_json::to_value(Report::from_run(&run)).unwrap();

        assert_eq!(value["scenario"], "base");
        assert_eq!(value["outcome"], "optimal");
        assert_eq!(value["status"], "Optimal");
        assert_eq!(value["total_cost"], 14.0);
        assert_eq!(value["sensitivity"]["sources"][0]["conclusion"]["kind"], "capacity");
        assert_eq!(
            value["sensitivity"]["sources"][0]["conclusion"]["effect"]["effect"],
            "decrease"
        );
    }
}
