use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{
    Analysis, ConstraintViolation, ReducedCost, ShadowPrice, Solution, SolutionStatus, SolverStatus,
    TerminationCondition,
};

/// Reported quantities are rounded to this many decimal places
const REPORT_DECIMALS: i32 = 9;

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_PIVOTS_BEFORE_BLAND: usize = 50;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum iterations before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Wall-clock budget for a single solve
    time_limit: Option<Duration>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            time_limit: None,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            warn!(error = %e, "rejecting malformed LP problem");
            return Solution::error(TerminationCondition::InvalidProblem);
        }

        let mut tableau = Tableau::build(problem);
        let mut budget = Budget::new(self.max_iterations, self.time_limit);
        debug!(
            rows = problem.num_constraints(),
            columns = tableau.n_cols() - 1,
            artificials = tableau.n_artificial,
            "built simplex tableau"
        );

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut budget) {
                Ok(true) => self.drive_out_artificials(&mut tableau),
                Ok(false) => {
                    let values = tableau.primal_values();
                    let violations = self.find_violations(problem, &values);
                    debug!(violated = violations.len(), "phase 1 ended with positive infeasibility");
                    return Solution::infeasible_with_violations(violations);
                }
                Err(stop) => return Solution::aborted(stop),
            }
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau, problem, &mut budget) {
            Ok(SimplexResult::Optimal) => {}
            Ok(SimplexResult::Unbounded) => return Solution::unbounded(),
            Err(stop) => return Solution::aborted(stop),
        }

        debug!(iterations = budget.used, "simplex reached optimality");
        self.extract_solution(&tableau, problem)
    }

    /// Find which constraints are violated by a given point
    fn find_violations(&self, problem: &LpProblem, values: &[f64]) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &problem.constraints {
            let lhs = snap(c.activity(values));

            let (is_violated, violation_amount, description) = match c.op {
                ConstraintOp::Le => {
                    if lhs > c.rhs + self.tolerance {
                        let amt = lhs - c.rhs;
                        (true, amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Ge => {
                    if lhs < c.rhs - self.tolerance {
                        let amt = c.rhs - lhs;
                        (true, amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Eq => {
                    let diff = (lhs - c.rhs).abs();
                    if diff > self.tolerance {
                        (true, diff, format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
            };

            if is_violated {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Sort by violation amount (worst first)
        violations.sort_by(|a, b| {
            b.violation_amount
                .partial_cmp(&a.violation_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        violations
    }

    fn phase1(&self, tableau: &mut Tableau, budget: &mut Budget) -> Result<bool, TerminationCondition> {
        // Auxiliary objective: minimize the sum of artificial variables
        let art_start = tableau.art_start();
        let costs: Vec<f64> = (0..tableau.n_cols() - 1)
            .map(|j| if j >= art_start { 1.0 } else { 0.0 })
            .collect();
        tableau.set_objective(&costs);

        // Unbounded in phase 1 cannot happen (artificials are bounded below), treat as infeasible
        let all_cols = tableau.n_cols() - 1;
        if let SimplexResult::Unbounded = self.optimize(tableau, all_cols, budget)? {
            return Ok(false);
        }

        // Check if all artificials are zero
        let rhs_col = tableau.n_cols() - 1;
        for i in 0..tableau.n_rows() {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col] > self.tolerance {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Pivot zero-valued artificials out of the basis where a structural or slack column allows it.
    /// Rows where none does are redundant and keep their artificial at zero.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let art_start = tableau.art_start();
        for i in 0..tableau.n_rows() {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let replacement = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance);
            match replacement {
                Some(col) => tableau.pivot(i, col),
                None => trace!(row = i, "redundant row keeps its artificial"),
            }
        }
    }

    fn phase2(
        &self,
        tableau: &mut Tableau,
        problem: &LpProblem,
        budget: &mut Budget,
    ) -> Result<SimplexResult, TerminationCondition> {
        // Simplex minimizes here, so for maximization we negate the coefficients
        let mut costs = vec![0.0; tableau.n_cols() - 1];
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            costs[j] = if problem.objective.minimize { coef } else { -coef };
        }
        tableau.set_objective(&costs);

        // Artificial columns never re-enter
        let allowed_cols = tableau.art_start();
        self.optimize(tableau, allowed_cols, budget)
    }

    fn optimize(
        &self,
        tableau: &mut Tableau,
        allowed_cols: usize,
        budget: &mut Budget,
    ) -> Result<SimplexResult, TerminationCondition> {
        let rhs_col = tableau.n_cols() - 1;
        let mut degenerate_run = 0;

        loop {
            let bland = degenerate_run >= DEGENERATE_PIVOTS_BEFORE_BLAND;
            let Some(pivot_col) = self.find_pivot_column(tableau, allowed_cols, bland) else {
                return Ok(SimplexResult::Optimal);
            };
            // Only pivots count against the budget
            budget.tick()?;
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return Ok(SimplexResult::Unbounded);
            };

            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }
            trace!(row = pivot_row, col = pivot_col, bland, "pivot");
            tableau.pivot(pivot_row, pivot_col);
        }
    }

    /// Entering column: most negative reduced cost, or the lowest-index negative one under Bland's rule
    fn find_pivot_column(&self, tableau: &Tableau, allowed_cols: usize, bland: bool) -> Option<usize> {
        let obj_row = tableau.obj_row();
        let mut min_val = -self.tolerance;
        let mut min_col = None;

        for j in 0..allowed_cols {
            let d = tableau.data[obj_row][j];
            if d < min_val {
                if bland {
                    return Some(j);
                }
                min_val = d;
                min_col = Some(j);
            }
        }

        min_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.n_cols() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..tableau.n_rows() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(r) => {
                    ratio < min_ratio - self.tolerance
                        || (ratio <= min_ratio + self.tolerance && tableau.basic_vars[i] < tableau.basic_vars[r])
                }
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let values: Vec<f64> = tableau.primal_values().into_iter().map(snap).collect();
        let objective_value = problem.evaluate(&values);
        let activities = problem.constraints.iter().map(|c| snap(c.activity(&values))).collect();
        let analysis = self.analyze(tableau, problem, &values);

        Solution {
            status: SolutionStatus::Optimal,
            solver_status: SolverStatus::Ok,
            termination: TerminationCondition::Optimal,
            values,
            objective_value,
            activities,
            analysis,
            violations: Vec::new(),
        }
    }

    fn analyze(&self, tableau: &Tableau, problem: &LpProblem, values: &[f64]) -> Analysis {
        let obj_row = tableau.obj_row();
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };

        // The column that started as row i's unit vector now holds -y_i in the objective row
        let shadow_prices = problem
            .constraints
            .iter()
            .enumerate()
            .map(|(i, constraint)| {
                let flip = if tableau.flipped[i] { -1.0 } else { 1.0 };
                let value = -tableau.data[obj_row][tableau.unit_cols[i]] * flip * sense;
                ShadowPrice {
                    constraint: constraint.name.clone(),
                    value: snap(value),
                }
            })
            .collect();

        let reduced_costs = problem
            .variables
            .iter()
            .enumerate()
            .map(|(j, var_name)| {
                let is_basic = tableau.basic_vars.contains(&j);
                let rc = if is_basic { 0.0 } else { snap(tableau.data[obj_row][j] * sense) };
                ReducedCost {
                    variable: var_name.clone(),
                    value: values[j],
                    reduced_cost: rc,
                    is_basic,
                }
            })
            .collect();

        Analysis {
            shadow_prices,
            reduced_costs,
        }
    }
}

/// Round to the reporting grid so exactly representable results compare equal
fn snap(value: f64) -> f64 {
    let scale = 10f64.powi(REPORT_DECIMALS);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= 2f64.powi(52) {
        return value;
    }
    // `+ 0.0` folds negative zero into zero
    scaled.round() / scale + 0.0
}

/// Iteration and wall-clock allowance shared by both phases
struct Budget {
    max_iterations: usize,
    used: usize,
    deadline: Option<Instant>,
}

impl Budget {
    fn new(max_iterations: usize, time_limit: Option<Duration>) -> Self {
        Self {
            max_iterations,
            used: 0,
            deadline: time_limit.map(|limit| Instant::now() + limit),
        }
    }

    fn tick(&mut self) -> Result<(), TerminationCondition> {
        if self.used >= self.max_iterations {
            warn!(iterations = self.used, "simplex iteration limit reached");
            return Err(TerminationCondition::IterationLimit);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!(iterations = self.used, "simplex time limit reached");
            return Err(TerminationCondition::TimeLimit);
        }
        self.used += 1;
        Ok(())
    }
}

/// Dense simplex tableau in minimization form.
/// The last row holds reduced costs, and its RHS cell holds the negated objective.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    /// Column that started as the unit vector of each row
    unit_cols: Vec<usize>,
    /// Rows multiplied by -1 to make the RHS non-negative
    flipped: Vec<bool>,
}

impl Tableau {
    fn build(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        let ops: Vec<(ConstraintOp, bool)> = problem
            .constraints
            .iter()
            .map(|c| if c.rhs < 0.0 { (c.op.flipped(), true) } else { (c.op, false) })
            .collect();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (op, _) in &ops {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; n_constraints + 1],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            unit_cols: vec![0; n_constraints],
            flipped: ops.iter().map(|(_, flip)| *flip).collect(),
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (c, (op, flip))) in problem.constraints.iter().zip(&ops).enumerate() {
            let sign = if *flip { -1.0 } else { 1.0 };
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
            }
            tableau.data[i][total_cols - 1] = sign * c.rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    tableau.unit_cols[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.unit_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.unit_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    fn n_rows(&self) -> usize {
        self.basic_vars.len()
    }

    fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    fn obj_row(&self) -> usize {
        self.n_rows()
    }

    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    /// Load `costs` into the objective row and price out the current basis
    fn set_objective(&mut self, costs: &[f64]) {
        let obj_row = self.obj_row();
        let n_cols = self.n_cols();
        self.data[obj_row] = vec![0.0; n_cols];
        self.data[obj_row][..costs.len()].copy_from_slice(costs);

        for i in 0..self.n_rows() {
            let cb = costs[self.basic_vars[i]];
            if cb != 0.0 {
                for j in 0..n_cols {
                    self.data[obj_row][j] -= cb * self.data[i][j];
                }
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_cols = self.n_cols();

        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for (i, data_row) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = data_row[col];
            if factor != 0.0 {
                for (cell, &p) in data_row.iter_mut().zip(&pivot_row) {
                    *cell -= factor * p;
                }
            }
        }
    }

    /// Values of the structural variables at the current basis
    fn primal_values(&self) -> Vec<f64> {
        let rhs_col = self.n_cols() - 1;
        let mut values = vec![0.0; self.n_vars];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            if basic < self.n_vars {
                values[basic] = self.data[i][rhs_col].max(0.0);
            }
        }
        values
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
}
