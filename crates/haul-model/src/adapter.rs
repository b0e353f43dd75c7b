use std::collections::BTreeMap;

use haul_solver::{ConstraintViolation, Solution, SolutionStatus, Solver, SolverStatus, TerminationCondition};

use crate::config::{ConfigError, SolverConfig};
use crate::formulate::{ArcId, ConstraintId, ModelInstance};

/// What a solver hands back for one model instance.
///
/// Duals follow a single convention: each value is the change in total cost per unit
/// increase of the constraint's right-hand side. Capacity duals are therefore `<= 0` and
/// demand duals `>= 0` at a regular optimum. Reduced costs are per unit of flow forced onto an arc.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: SolutionStatus,
    pub solver_status: SolverStatus,
    pub termination: TerminationCondition,
    pub objective_value: f64,
    /// Flow per arc, indexed by `ArcId`; empty unless optimal
    pub flows: Vec<f64>,
    /// Reduced cost per arc, indexed by `ArcId`; empty unless optimal
    pub reduced_costs: Vec<f64>,
    pub duals: BTreeMap<ConstraintId, f64>,
    /// Constraint body at the solution (shipped quantity for capacity and demand rows)
    pub activities: BTreeMap<ConstraintId, f64>,
    /// Constraints left violated when the problem is infeasible
    pub diagnostics: Vec<ConstraintViolation>,
}

/// Boundary to whatever solves the LP
pub trait SolverAdapter {
    fn solve(&self, instance: &ModelInstance) -> SolveResult;
}

/// Adapter over the bundled simplex solver
#[derive(Debug, Clone, Default)]
pub struct SimplexAdapter {
    solver: Solver,
}

impl SimplexAdapter {
    pub fn new(solver: Solver) -> Self {
        Self { solver }
    }

    pub fn from_config(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build()?))
    }
}

impl SolverAdapter for SimplexAdapter {
    fn solve(&self, instance: &ModelInstance) -> SolveResult {
        let solution = self.solver.solve(instance.lp());
        SolveResult::from_solution(instance, solution)
    }
}

impl SolveResult {
    /// Key the solver's positional output by arc and constraint identity
    pub fn from_solution(instance: &ModelInstance, solution: Solution) -> Self {
        let mut duals = BTreeMap::new();
        let mut activities = BTreeMap::new();

        if solution.is_optimal() {
            for (row, &id) in instance.constraint_ids().iter().enumerate() {
                if let Some(sp) = solution.analysis.shadow_prices.get(row) {
                    duals.insert(id, sp.value);
                }
                if let Some(&activity) = solution.activities.get(row) {
                    activities.insert(id, activity);
                }
            }
        }

        let reduced_costs = solution
            .analysis
            .reduced_costs
            .iter()
            .map(|rc| rc.reduced_cost)
            .collect();

        SolveResult {
            status: solution.status,
            solver_status: solution.solver_status,
            termination: solution.termination,
            objective_value: solution.objective_value,
            flows: solution.values,
            reduced_costs,
            duals,
            activities,
            diagnostics: solution.violations,
        }
    }

    pub fn flow(&self, arc: ArcId) -> Option<f64> {
        self.flows.get(arc.0).copied()
    }

    /// Flow between two named endpoints; `None` when no such arc is declared
    pub fn flow_between(&self, instance: &ModelInstance, source: &str, customer: &str) -> Option<f64> {
        instance.arc_id(source, customer).and_then(|arc| self.flow(arc))
    }

    pub fn reduced_cost(&self, arc: ArcId) -> Option<f64> {
        self.reduced_costs.get(arc.0).copied()
    }

    pub fn dual(&self, id: ConstraintId) -> Option<f64> {
        self.duals.get(&id).copied()
    }

    pub fn activity(&self, id: ConstraintId) -> Option<f64> {
        self.activities.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulate::formulate;
    use crate::schema::{Arc, Customer, Source, TransportData};

    fn instance() -> ModelInstance {
        formulate(TransportData {
            sources: vec![Source { id: "Arn".to_string(), production: 10.0 }],
            customers: vec![Customer { id: "Ams".to_string(), demand: 4.0 }],
            arcs: vec![Arc {
                source: "Arn".to_string(),
                customer: "Ams".to_string(),
                cost: 2.0,
                fixed_flow: None,
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_results_are_keyed_by_identity() {
        let instance = instance();
        let result = SimplexAdapter::default().solve(&instance);

        assert_eq!(result.status, SolutionStatus::Optimal);
        assert_eq!(result.objective_value, 8.0);
        assert_eq!(result.flow(ArcId(0)), Some(4.0));
        assert_eq!(result.flow_between(&instance, "Arn", "Ams"), Some(4.0));
        assert_eq!(result.flow_between(&instance, "Arn", "Ber"), None);
        assert_eq!(result.dual(ConstraintId::Capacity(0)), Some(0.0));
        assert_eq!(result.dual(ConstraintId::Demand(0)), Some(2.0));
        assert_eq!(result.activity(ConstraintId::Capacity(0)), Some(4.0));
        assert_eq!(result.reduced_cost(ArcId(0)), Some(0.0));
    }

    #[test]
    fn test_non_optimal_result_carries_no_duals() {
        let mut data = instance().data().clone();
        data.customers[0].demand = 20.0;
        let instance = formulate(data).unwrap();

        let result = SimplexAdapter::default().solve(&instance);

        assert_eq!(result.status, SolutionStatus::Infeasible);
        assert!(result.duals.is_empty());
        assert!(result.flows.is_empty());
        assert_eq!(result.diagnostics[0].constraint, "demand[Ams]");
    }
}
