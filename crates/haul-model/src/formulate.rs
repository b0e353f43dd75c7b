use std::collections::HashMap;
use std::fmt;

use haul_solver::{ConstraintOp, LpProblem};
use serde::Serialize;
use tracing::debug;

use crate::schema::{Arc, Customer, SchemaViolation, Source, TransportData};

/// Position of an arc in the instance's arc list; also its variable index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArcId(pub usize);

/// Identity of an LP row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintId {
    /// Outgoing flow of the source at this index is limited by its production
    Capacity(usize),
    /// Incoming flow of the customer at this index covers its demand
    Demand(usize),
    /// Flow on this arc equals its fixed flow
    FixedFlow(ArcId),
}

/// A validated transportation problem bound to its LP formulation
#[derive(Debug, Clone)]
pub struct ModelInstance {
    data: TransportData,
    source_index: HashMap<String, usize>,
    customer_index: HashMap<String, usize>,
    arc_index: HashMap<(String, String), ArcId>,
    /// Arcs leaving each source
    outgoing: Vec<Vec<ArcId>>,
    /// Arcs entering each customer
    incoming: Vec<Vec<ArcId>>,
    /// Identity of each LP row, in row order
    constraint_ids: Vec<ConstraintId>,
    lp: LpProblem,
}

/// Build the LP for `data`: one flow variable per declared arc, a capacity row per source,
/// a demand row per customer, and an equality row per arc with a nonzero fixed flow.
pub fn formulate(data: TransportData) -> Result<ModelInstance, SchemaViolation> {
    let indices = data.validate()?;

    let mut outgoing = vec![Vec::new(); data.sources.len()];
    let mut incoming = vec![Vec::new(); data.customers.len()];
    let mut arc_index = HashMap::with_capacity(data.arcs.len());
    for (j, arc) in data.arcs.iter().enumerate() {
        // Both lookups succeed after validation
        if let (Some(&s), Some(&c)) = (indices.sources.get(&arc.source), indices.customers.get(&arc.customer)) {
            outgoing[s].push(ArcId(j));
            incoming[c].push(ArcId(j));
        }
        arc_index.insert((arc.source.clone(), arc.customer.clone()), ArcId(j));
    }

    let variables = data.arcs.iter().map(|a| format!("flow[{}]", a.label())).collect();
    let mut lp = LpProblem::new(variables);
    lp.set_objective(data.arcs.iter().map(|a| a.cost).collect(), true);

    let n_arcs = data.arcs.len();
    let row = |arcs: &[ArcId]| {
        let mut coeffs = vec![0.0; n_arcs];
        for &ArcId(j) in arcs {
            coeffs[j] = 1.0;
        }
        coeffs
    };

    let mut constraint_ids = Vec::new();

    for (s, source) in data.sources.iter().enumerate() {
        lp.add_constraint(format!("capacity[{}]", source.id), row(&outgoing[s]), ConstraintOp::Le, source.production);
        constraint_ids.push(ConstraintId::Capacity(s));
    }

    for (c, customer) in data.customers.iter().enumerate() {
        lp.add_constraint(format!("demand[{}]", customer.id), row(&incoming[c]), ConstraintOp::Ge, customer.demand);
        constraint_ids.push(ConstraintId::Demand(c));
    }

    for (j, arc) in data.arcs.iter().enumerate() {
        match arc.fixed_requirement() {
            Some(quantity) => {
                lp.add_constraint(
                    format!("fixed_flow[{}]", arc.label()),
                    row(&[ArcId(j)]),
                    ConstraintOp::Eq,
                    quantity,
                );
                constraint_ids.push(ConstraintId::FixedFlow(ArcId(j)));
            }
            None if arc.fixed_flow.is_some() => {
                debug!(arc = %arc.label(), "fixed flow of zero treated as unspecified");
            }
            None => {}
        }
    }

    debug!(
        sources = data.sources.len(),
        customers = data.customers.len(),
        arcs = n_arcs,
        constraints = lp.num_constraints(),
        "formulated transportation model"
    );

    Ok(ModelInstance {
        data,
        source_index: indices.sources,
        customer_index: indices.customers,
        arc_index,
        outgoing,
        incoming,
        constraint_ids,
        lp,
    })
}

impl ModelInstance {
    pub fn data(&self) -> &TransportData {
        &self.data
    }

    pub fn sources(&self) -> &[Source] {
        &self.data.sources
    }

    pub fn customers(&self) -> &[Customer] {
        &self.data.customers
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.data.arcs
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.data.arcs[id.0]
    }

    pub fn lp(&self) -> &LpProblem {
        &self.lp
    }

    /// Identity of each LP row, in row order
    pub fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraint_ids
    }

    pub fn source_index(&self, id: &str) -> Option<usize> {
        self.source_index.get(id).copied()
    }

    pub fn customer_index(&self, id: &str) -> Option<usize> {
        self.customer_index.get(id).copied()
    }

    /// The declared arc between `source` and `customer`, if any
    pub fn arc_id(&self, source: &str, customer: &str) -> Option<ArcId> {
        self.arc_index.get(&(source.to_string(), customer.to_string())).copied()
    }

    pub fn outgoing(&self, source: usize) -> &[ArcId] {
        &self.outgoing[source]
    }

    pub fn incoming(&self, customer: usize) -> &[ArcId] {
        &self.incoming[customer]
    }

    pub fn constraint_name(&self, id: ConstraintId) -> String {
        match id {
            ConstraintId::Capacity(s) => format!("capacity[{}]", self.data.sources[s].id),
            ConstraintId::Demand(c) => format!("demand[{}]", self.data.customers[c].id),
            ConstraintId::FixedFlow(arc) => format!("fixed_flow[{}]", self.arc(arc).label()),
        }
    }
}

impl fmt::Display for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = |j: usize, coef: f64| format!("{} {}", coef, self.lp.variables[j]);

        writeln!(f, "Variables ({}):", self.lp.num_variables())?;
        for name in &self.lp.variables {
            writeln!(f, "  {} >= 0", name)?;
        }

        let objective: Vec<String> = self
            .lp
            .objective
            .coefficients
            .iter()
            .enumerate()
            .map(|(j, &coef)| term(j, coef))
            .collect();
        writeln!(f, "Objective: minimize {}", if objective.is_empty() { "0".to_string() } else { objective.join(" + ") })?;

        writeln!(f, "Constraints ({}):", self.lp.num_constraints())?;
        for c in &self.lp.constraints {
            let body: Vec<String> = c
                .coefficients
                .iter()
                .enumerate()
                .filter(|(_, coef)| **coef != 0.0)
                .map(|(j, &coef)| term(j, coef))
                .collect();
            let body = if body.is_empty() { "0".to_string() } else { body.join(" + ") };
            writeln!(f, "  {}: {} {} {}", c.name, body, c.op.symbol(), c.rhs)?;
        }
        Ok(())
    }
}
