//! Post-optimal sensitivity analysis.
//!
//! Turns the duals and reduced costs of an optimal [`SolveResult`] into per-entity tables and
//! plain-language conclusions. Classification uses exact float equality on the reported
//! quantities: a source is binding when `capacity == shipped`, a customer when
//! `demand == shipped`, an arc is unused when `flow == 0`. Only those entities get a conclusion.
//!
//! All marginal values are read as "change in total cost per additional unit" of the
//! constraint's right-hand side (capacity, demand) or of the arc's flow. Their sign is reported
//! as-is, including signs that are unusual at an optimum.

use std::fmt;

use haul_solver::SolutionStatus;
use serde::Serialize;
use thiserror::Error;

use crate::adapter::SolveResult;
use crate::formulate::{ArcId, ConstraintId, ModelInstance};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretError {
    #[error("Sensitivity analysis needs an optimal solution, got {0}")]
    NotOptimal(SolutionStatus),
    #[error("Solver result has no dual value for {0}")]
    MissingDual(String),
    #[error("Solver result has no value for {0}")]
    MissingValue(String),
}

/// Direction and size of a change in total cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "effect", content = "amount", rename_all = "snake_case")]
pub enum CostEffect {
    Decrease(f64),
    Increase(f64),
    Unchanged,
}

impl CostEffect {
    /// Classify a marginal cost by its sign
    pub fn from_marginal(value: f64) -> Self {
        if value < 0.0 {
            CostEffect::Decrease(value.abs())
        } else if value > 0.0 {
            CostEffect::Increase(value)
        } else {
            CostEffect::Unchanged
        }
    }
}

/// A narrative statement about one binding source, binding customer or unused arc
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conclusion {
    /// One more unit of production capacity at `source`
    Capacity { source: String, effect: CostEffect },
    /// One more unit of demand at `customer`
    Demand { customer: String, effect: CostEffect },
    /// One unit forced onto the arc from `source` to `customer`
    Route {
        source: String,
        customer: String,
        effect: CostEffect,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSensitivity {
    pub source: String,
    pub capacity: f64,
    pub shipped: f64,
    pub shadow_price: f64,
    pub binding: bool,
    pub conclusion: Option<Conclusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSensitivity {
    pub customer: String,
    pub demand: f64,
    pub shipped: f64,
    pub shadow_price: f64,
    pub binding: bool,
    pub conclusion: Option<Conclusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcSensitivity {
    pub source: String,
    pub customer: String,
    pub quantity: f64,
    pub reduced_cost: f64,
    pub zero_flow: bool,
    pub conclusion: Option<Conclusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub sources: Vec<SourceSensitivity>,
    pub customers: Vec<CustomerSensitivity>,
    pub arcs: Vec<ArcSensitivity>,
}

impl SensitivityReport {
    /// Every conclusion in report order: sources, then customers, then arcs
    pub fn conclusions(&self) -> impl Iterator<Item = &Conclusion> {
        let sources = self.sources.iter().filter_map(|s| s.conclusion.as_ref());
        let customers = self.customers.iter().filter_map(|c| c.conclusion.as_ref());
        let arcs = self.arcs.iter().filter_map(|a| a.conclusion.as_ref());
        sources.chain(customers).chain(arcs)
    }
}

/// Classify every source, customer and arc of an optimal solve
pub fn interpret(instance: &ModelInstance, result: &SolveResult) -> Result<SensitivityReport, InterpretError> {
    if result.status != SolutionStatus::Optimal {
        return Err(InterpretError::NotOptimal(result.status));
    }

    let dual = |id: ConstraintId| {
        result
            .dual(id)
            .ok_or_else(|| InterpretError::MissingDual(instance.constraint_name(id)))
    };
    let activity = |id: ConstraintId| {
        result
            .activity(id)
            .ok_or_else(|| InterpretError::MissingValue(instance.constraint_name(id)))
    };

    let sources = instance
        .sources()
        .iter()
        .enumerate()
        .map(|(s, source)| {
            let id = ConstraintId::Capacity(s);
            let shipped = activity(id)?;
            let shadow_price = dual(id)?;
            let binding = source.production == shipped;
            let conclusion = binding.then(|| Conclusion::Capacity {
                source: source.id.clone(),
                effect: CostEffect::from_marginal(shadow_price),
            });
            Ok(SourceSensitivity {
                source: source.id.clone(),
                capacity: source.production,
                shipped,
                shadow_price,
                binding,
                conclusion,
            })
        })
        .collect::<Result<Vec<_>, InterpretError>>()?;

    let customers = instance
        .customers()
        .iter()
        .enumerate()
        .map(|(c, customer)| {
            let id = ConstraintId::Demand(c);
            let shipped = activity(id)?;
            let shadow_price = dual(id)?;
            let binding = customer.demand == shipped;
            let conclusion = binding.then(|| Conclusion::Demand {
                customer: customer.id.clone(),
                effect: CostEffect::from_marginal(shadow_price),
            });
            Ok(CustomerSensitivity {
                customer: customer.id.clone(),
                demand: customer.demand,
                shipped,
                shadow_price,
                binding,
                conclusion,
            })
        })
        .collect::<Result<Vec<_>, InterpretError>>()?;

    let arcs = instance
        .arcs()
        .iter()
        .enumerate()
        .map(|(j, arc)| {
            let missing = || InterpretError::MissingValue(format!("flow[{}]", arc.label()));
            let quantity = result.flow(ArcId(j)).ok_or_else(missing)?;
            let reduced_cost = result.reduced_cost(ArcId(j)).ok_or_else(missing)?;
            let zero_flow = quantity == 0.0;
            let conclusion = zero_flow.then(|| Conclusion::Route {
                source: arc.source.clone(),
                customer: arc.customer.clone(),
                effect: CostEffect::from_marginal(reduced_cost),
            });
            Ok(ArcSensitivity {
                source: arc.source.clone(),
                customer: arc.customer.clone(),
                quantity,
                reduced_cost,
                zero_flow,
                conclusion,
            })
        })
        .collect::<Result<Vec<_>, InterpretError>>()?;

    Ok(SensitivityReport {
        sources,
        customers,
        arcs,
    })
}

impl fmt::Display for CostEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostEffect::Decrease(amount) => write!(f, "would be reduced by {}", amount),
            CostEffect::Increase(amount) => write!(f, "would be increased by {}", amount),
            CostEffect::Unchanged => f.write_str("would remain equal"),
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conclusion::Capacity { source, effect } => write!(
                f,
                "The total transportation cost {} for each additional unit of capacity available in {}",
                effect, source
            ),
            Conclusion::Demand { customer, effect } => write!(
                f,
                "The total transportation cost {} for each additional unit of demand supplied to {}",
                effect, customer
            ),
            Conclusion::Route {
                source,
                customer,
                effect,
            } => write!(
                f,
                "The total transportation cost {} for each unit shipped from {} to {}",
                effect, source, customer
            ),
        }
    }
}
