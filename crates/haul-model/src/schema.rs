use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A supply point with a production capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub production: f64,
}

/// A demand point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub demand: f64,
}

/// A declared route from a source to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub source: String,
    pub customer: String,
    /// Cost per unit shipped
    pub cost: f64,
    /// Quantity that must be shipped on this arc, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_flow: Option<f64>,
}

/// One problem instance as supplied by a data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportData {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("Duplicate source: {0}")]
    DuplicateSource(String),
    #[error("Duplicate customer: {0}")]
    DuplicateCustomer(String),
    #[error("Duplicate arc: ({source_id}, {customer})")]
    DuplicateArc { source_id: String, customer: String },
    #[error("Arc ({source_id}, {customer}) references unknown source {source_id}")]
    UnknownSource { source_id: String, customer: String },
    #[error("Arc ({source_id}, {customer}) references unknown customer {customer}")]
    UnknownCustomer { source_id: String, customer: String },
    #[error("Negative production {value} at source {source_id}")]
    NegativeProduction { source_id: String, value: f64 },
    #[error("Negative demand {value} at customer {customer}")]
    NegativeDemand { customer: String, value: f64 },
    #[error("Negative fixed flow {value} on arc ({source_id}, {customer})")]
    NegativeFixedFlow {
        source_id: String,
        customer: String,
        value: f64,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl Arc {
    /// The fixed flow this arc must carry. A fixed flow of exactly zero counts as unspecified.
    pub fn fixed_requirement(&self) -> Option<f64> {
        self.fixed_flow.filter(|&value| value != 0.0)
    }

    pub fn label(&self) -> String {
        format!("{},{}", self.source, self.customer)
    }
}

/// Positions of sources and customers by id, produced by a successful validation
#[derive(Debug, Clone, Default)]
pub(crate) struct Indices {
    pub sources: HashMap<String, usize>,
    pub customers: HashMap<String, usize>,
}

impl TransportData {
    /// Check referential integrity, uniqueness and parameter domains
    pub(crate) fn validate(&self) -> Result<Indices, SchemaViolation> {
        let mut indices = Indices::default();

        for (i, source) in self.sources.iter().enumerate() {
            if !source.production.is_finite() {
                return Err(SchemaViolation::NonFinite(format!("production of {}", source.id)));
            }
            if source.production < 0.0 {
                return Err(SchemaViolation::NegativeProduction {
                    source_id: source.id.clone(),
                    value: source.production,
                });
            }
            if indices.sources.insert(source.id.clone(), i).is_some() {
                return Err(SchemaViolation::DuplicateSource(source.id.clone()));
            }
        }

        for (i, customer) in self.customers.iter().enumerate() {
            if !customer.demand.is_finite() {
                return Err(SchemaViolation::NonFinite(format!("demand of {}", customer.id)));
            }
            if customer.demand < 0.0 {
                return Err(SchemaViolation::NegativeDemand {
                    customer: customer.id.clone(),
                    value: customer.demand,
                });
            }
            if indices.customers.insert(customer.id.clone(), i).is_some() {
                return Err(SchemaViolation::DuplicateCustomer(customer.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for arc in &self.arcs {
            if !indices.sources.contains_key(&arc.source) {
                return Err(SchemaViolation::UnknownSource {
                    source_id: arc.source.clone(),
                    customer: arc.customer.clone(),
                });
            }
            if !indices.customers.contains_key(&arc.customer) {
                return Err(SchemaViolation::UnknownCustomer {
                    source_id: arc.source.clone(),
                    customer: arc.customer.clone(),
                });
            }
            if !seen.insert((arc.source.as_str(), arc.customer.as_str())) {
                return Err(SchemaViolation::DuplicateArc {
                    source_id: arc.source.clone(),
                    customer: arc.customer.clone(),
                });
            }
            if !arc.cost.is_finite() {
                return Err(SchemaViolation::NonFinite(format!("cost of arc ({})", arc.label())));
            }
            if let Some(value) = arc.fixed_flow {
                if !value.is_finite() {
                    return Err(SchemaViolation::NonFinite(format!("fixed flow of arc ({})", arc.label())));
                }
                if value < 0.0 {
                    return Err(SchemaViolation::NegativeFixedFlow {
                        source_id: arc.source.clone(),
                        customer: arc.customer.clone(),
                        value,
                    });
                }
            }
        }

        Ok(indices)
    }
}
