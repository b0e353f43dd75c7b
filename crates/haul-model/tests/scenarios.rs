use std::path::PathBuf;

use haul_model::{
    ArcId, Conclusion, ConstraintId, CostEffect, JsonDataSource, Report, RunConfig, RunOutcome, ScenarioRun,
    SimplexAdapter, SolverAdapter, run_scenario,
};
use haul_solver::{SolutionStatus, SolverStatus, TerminationCondition};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn run(file: &str) -> ScenarioRun {
    let source = JsonDataSource::with_base_dir(data_dir());
    run_scenario(&source, file, &SimplexAdapter::default()).unwrap()
}

fn flow(run: &ScenarioRun, source: &str, customer: &str) -> f64 {
    run.result
        .flow_between(&run.instance, source, customer)
        .unwrap_or_else(|| panic!("no arc {} -> {}", source, customer))
}

fn dual(run: &ScenarioRun, id: ConstraintId) -> f64 {
    run.result.dual(id).unwrap()
}

fn assert_feasible(run: &ScenarioRun) {
    let tol = 1e-9;
    let instance = &run.instance;

    for (j, arc) in instance.arcs().iter().enumerate() {
        let f = run.result.flow(ArcId(j)).unwrap();
        assert!(f >= 0.0, "negative flow on {}", arc.label());
        if let Some(fixed) = arc.fixed_requirement() {
            assert_eq!(f, fixed, "fixed flow on {}", arc.label());
        }
    }

    for (s, source) in instance.sources().iter().enumerate() {
        let out: f64 = instance.outgoing(s).iter().map(|&a| run.result.flow(a).unwrap()).sum();
        assert!(out <= source.production + tol, "{} ships {} > {}", source.id, out, source.production);
    }

    for (c, customer) in instance.customers().iter().enumerate() {
        let inflow: f64 = instance.incoming(c).iter().map(|&a| run.result.flow(a).unwrap()).sum();
        assert!(inflow >= customer.demand - tol, "{} receives {} < {}", customer.id, inflow, customer.demand);
    }

    let recomputed: f64 = instance
        .arcs()
        .iter()
        .enumerate()
        .map(|(j, arc)| arc.cost * run.result.flow(ArcId(j)).unwrap())
        .sum();
    assert!((recomputed - run.result.objective_value).abs() < tol);
}

#[test]
fn test_base_case() {
    let base = run("data_0.json");
    assert!(base.is_optimal());
    assert_feasible(&base);

    assert_eq!(base.result.objective_value, 1000.0);
    assert_eq!(flow(&base, "Arn", "Ams"), 200.0);
    assert_eq!(flow(&base, "Arn", "Ber"), 200.0);
    assert_eq!(flow(&base, "Arn", "Lon"), 0.0);
    assert_eq!(flow(&base, "Gou", "Ams"), 100.0);
    assert_eq!(flow(&base, "Gou", "Ber"), 0.0);
    assert_eq!(flow(&base, "Gou", "Lon"), 100.0);

    assert_eq!(dual(&base, ConstraintId::Capacity(0)), -0.5);
    assert_eq!(dual(&base, ConstraintId::Capacity(1)), 0.0);
    assert_eq!(dual(&base, ConstraintId::Demand(0)), 1.5);
    assert_eq!(dual(&base, ConstraintId::Demand(1)), 2.5);
    assert_eq!(dual(&base, ConstraintId::Demand(2)), 2.5);

    let arn_lon = base.instance.arc_id("Arn", "Lon").unwrap();
    let gou_ber = base.instance.arc_id("Gou", "Ber").unwrap();
    assert_eq!(base.result.reduced_cost(arn_lon), Some(1.0));
    assert_eq!(base.result.reduced_cost(gou_ber), Some(0.5));
}

#[test]
fn test_base_case_conclusions() {
    let base = run("data_0.json");
    let RunOutcome::Optimal { sensitivity, shipments, .. } = &base.outcome else {
        panic!("expected optimal outcome");
    };

    assert_eq!(shipments.len(), 4);

    let arn = &sensitivity.sources[0];
    assert!(arn.binding);
    assert_eq!(arn.shipped, 400.0);
    let gou = &sensitivity.sources[1];
    assert!(!gou.binding);
    assert_eq!(gou.shipped, 200.0);
    assert!(gou.conclusion.is_none());

    assert!(sensitivity.customers.iter().all(|c| c.binding));

    let zero: Vec<_> = sensitivity.arcs.iter().filter(|a| a.zero_flow).collect();
    assert_eq!(zero.len(), 2);
    assert_eq!(sensitivity.conclusions().count(), 1 + 3 + 2);

    let text = Report::from_run(&base).to_string();
    assert!(text.contains(
        "The total transportation cost would be reduced by 0.5 for each additional unit of capacity available in Arn"
    ));
    assert!(text.contains(
        "The total transportation cost would be increased by 2.5 for each additional unit of demand supplied to Lon"
    ));
    assert!(text.contains("The total transportation cost would be increased by 1 for each unit shipped from Arn to Lon"));
}

#[test]
fn test_moving_capacity_changes_cost_by_shadow_prices() {
    let base = run("data_0.json");
    let moved = run("data_1.json");
    assert_feasible(&moved);

    // +1 at Arn, -1 at Gou
    let expected = dual(&base, ConstraintId::Capacity(0)) - dual(&base, ConstraintId::Capacity(1));
    assert_eq!(moved.result.objective_value - base.result.objective_value, expected);
    assert_eq!(moved.result.objective_value, 999.5);
}

#[test]
fn test_extra_demand_costs_its_shadow_price() {
    let base = run("data_0.json");

    // One more unit at Lon, with one more unit of capacity at Gou to serve it
    let lon = run("data_2.json");
    assert_feasible(&lon);
    assert_eq!(
        lon.result.objective_value - base.result.objective_value,
        dual(&base, ConstraintId::Demand(2))
    );

    let ber = run("data_3.json");
    assert_feasible(&ber);
    assert_eq!(
        ber.result.objective_value - base.result.objective_value,
        dual(&base, ConstraintId::Demand(1))
    );
}

#[test]
fn test_fixed_flow_on_unused_arc() {
    let base = run("data_0.json");
    let fixed = run("data_4.json");
    assert!(fixed.is_optimal());
    assert_feasible(&fixed);

    assert_eq!(flow(&fixed, "Arn", "Lon"), 1.0);

    let arn_lon = base.instance.arc_id("Arn", "Lon").unwrap();
    let base_rc = base.result.reduced_cost(arn_lon).unwrap();
    let increase = fixed.result.objective_value - base.result.objective_value;
    assert!(increase >= base_rc);
    assert_eq!(fixed.result.objective_value, 1001.0);

    let fixed_row = ConstraintId::FixedFlow(arn_lon);
    assert!(fixed.instance.constraint_ids().contains(&fixed_row));
    assert_eq!(dual(&fixed, fixed_row), 1.0);

    // The forced arc now carries flow, so it draws no route conclusion
    let RunOutcome::Optimal { sensitivity, .. } = &fixed.outcome else {
        panic!("expected optimal outcome");
    };
    let row = &sensitivity.arcs[arn_lon.0];
    assert!(!row.zero_flow);
    assert!(row.conclusion.is_none());
}

#[test]
fn test_customer_without_arcs_is_infeasible() {
    let orphan = run("data_5.json");

    assert_eq!(orphan.result.status, SolutionStatus::Infeasible);
    assert_eq!(orphan.termination(), TerminationCondition::Infeasible);
    let RunOutcome::Infeasible { diagnostics } = &orphan.outcome else {
        panic!("expected infeasible outcome");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].constraint, "demand[Rot]");
    assert_eq!(diagnostics[0].violation_amount, 50.0);

    let text = Report::from_run(&orphan).to_string();
    assert!(!text.contains("Shadow price"));
    assert!(!text.contains("Reduced cost"));
}

#[test]
fn test_elapsed_time_limit_aborts_the_run() {
    let config = RunConfig::from_toml_str("[solver]\ntime_limit_secs = 0.0\n").unwrap();
    let solver = SimplexAdapter::from_config(&config.solver).unwrap();
    let source = JsonDataSource::with_base_dir(data_dir());
    let run = run_scenario(&source, "data_0.json", &solver).unwrap();

    assert_eq!(run.result.status, SolutionStatus::Error);
    assert_eq!(run.solver_status(), SolverStatus::Aborted);
    assert_eq!(run.termination(), TerminationCondition::TimeLimit);
    assert!(matches!(run.outcome, RunOutcome::Failed { .. }));

    let text = Report::from_run(&run).to_string();
    assert!(text.contains("Termination condition: maxTimeLimit"));
    assert!(!text.contains("Shadow price"));
}

#[test]
fn test_resolve_is_idempotent() {
    let source = JsonDataSource::with_base_dir(data_dir());
    let solver = SimplexAdapter::default();
    let first = run_scenario(&source, "data_0.json", &solver).unwrap();

    let again = solver.solve(&first.instance);
    assert_eq!(again.objective_value, first.result.objective_value);
    assert_eq!(again.flows, first.result.flows);
}

#[test]
fn test_undeclared_arcs_have_no_flow() {
    let orphan_free = run("data_0.json");
    assert_eq!(orphan_free.result.flow_between(&orphan_free.instance, "Arn", "Rot"), None);
    assert_eq!(orphan_free.result.flows.len(), orphan_free.instance.arcs().len());

    let RunOutcome::Optimal { shipments, .. } = &orphan_free.outcome else {
        panic!("expected optimal outcome");
    };
    for s in shipments {
        assert!(orphan_free.instance.arc_id(&s.source, &s.customer).is_some());
    }
}

#[test]
fn test_cost_effect_matches_dual_sign() {
    let base = run("data_0.json");
    let RunOutcome::Optimal { sensitivity, .. } = &base.outcome else {
        panic!("expected optimal outcome");
    };
    for customer in &sensitivity.customers {
        match &customer.conclusion {
            Some(Conclusion::Demand { effect, .. }) => {
                assert_eq!(*effect, CostEffect::Increase(customer.shadow_price));
            }
            other => panic!("unexpected conclusion {:?}", other),
        }
    }
}
