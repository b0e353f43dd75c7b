use std::fmt;

/// The result of solving an LP problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// How the solver run itself ended
    pub solver_status: SolverStatus,
    /// Why the solver stopped
    pub termination: TerminationCondition,
    /// Optimal values for each variable
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Constraint body evaluated at `values`, one entry per constraint
    pub activities: Vec<f64>,
    /// Dual values and reduced costs
    pub analysis: Analysis,
    /// Constraint violations (populated when infeasible)
    pub violations: Vec<ConstraintViolation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// Solver encountered an error
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    Ok,
    Warning,
    Aborted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationCondition {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
    /// The problem could not be set up (malformed rows)
    InvalidProblem,
}

/// Dual information at the optimal solution
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Analysis {
    /// Shadow prices (dual values) for each constraint, in constraint order.
    /// Each value is the change in objective per unit increase of the constraint's RHS.
    pub shadow_prices: Vec<ShadowPrice>,

    /// Reduced costs for each variable, in variable order
    pub reduced_costs: Vec<ReducedCost>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowPrice {
    /// Constraint name
    pub constraint: String,
    /// Shadow price value
    pub value: f64,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReducedCost {
    /// Variable name
    pub variable: String,
    /// Current value in solution
    pub value: f64,
    /// Reduced cost
    pub reduced_cost: f64,
    /// Is this variable in the basis?
    pub is_basic: bool,
}

/// Information about a violated constraint
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    fn terminal(status: SolutionStatus, solver_status: SolverStatus, termination: TerminationCondition) -> Self {
        let objective_value = match status {
            SolutionStatus::Unbounded => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        };
        Self {
            status,
            solver_status,
            termination,
            values: Vec::new(),
            objective_value,
            activities: Vec::new(),
            analysis: Analysis::default(),
            violations: Vec::new(),
        }
    }

    pub fn infeasible_with_violations(violations: Vec<ConstraintViolation>) -> Self {
        Self {
            violations,
            ..Self::terminal(SolutionStatus::Infeasible, SolverStatus::Warning, TerminationCondition::Infeasible)
        }
    }

    pub fn unbounded() -> Self {
        Self::terminal(SolutionStatus::Unbounded, SolverStatus::Warning, TerminationCondition::Unbounded)
    }

    pub fn aborted(termination: TerminationCondition) -> Self {
        Self::terminal(SolutionStatus::Error, SolverStatus::Aborted, termination)
    }

    pub fn error(termination: TerminationCondition) -> Self {
        Self::terminal(SolutionStatus::Error, SolverStatus::Error, termination)
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::Infeasible => "infeasible",
            SolutionStatus::Unbounded => "unbounded",
            SolutionStatus::Error => "error",
        })
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverStatus::Ok => "ok",
            SolverStatus::Warning => "warning",
            SolverStatus::Aborted => "aborted",
            SolverStatus::Error => "error",
        })
    }
}

impl fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TerminationCondition::Optimal => "optimal",
            TerminationCondition::Infeasible => "infeasible",
            TerminationCondition::Unbounded => "unbounded",
            TerminationCondition::IterationLimit => "maxIterations",
            TerminationCondition::TimeLimit => "maxTimeLimit",
            TerminationCondition::InvalidProblem => "invalidProblem",
        })
    }
}
