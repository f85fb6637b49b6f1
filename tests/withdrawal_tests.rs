use std::sync::Arc;

use bgpsim::route_validator::RouteValidator;
use bgpsim::shared::{EngineError, Relationships, Settings, SettingsSet};
use bgpsim::simulation_engine::announcement::AnnOverrides;
use bgpsim::simulation_engine::policy::{AdoptionMap, BgpFull, Policy, PolicyCtx};
use bgpsim::simulation_engine::{Announcement, PolicySpec, Prefix, SimulationEngine, TrialSetup};
use bgpsim::{ASBuilder, ASGraph, ASN};

fn prefix() -> Prefix {
    "1.2.0.0/16".parse().unwrap()
}

fn ann(path: Vec<ASN>) -> Announcement {
    Announcement::new(prefix(), path.clone(), Some(path[0])).unwrap()
}

fn withdrawal(path: Vec<ASN>) -> Announcement {
    ann(path).copy_with(AnnOverrides {
        withdraw: Some(true),
        ..Default::default()
    })
}

/// AS 10 buys transit from nobody and sells to 2 and 3, which both sell to
/// 777: two disjoint paths to the same origin.
fn fan_graph() -> ASGraph {
    ASGraph::build(vec![
        ASBuilder::new(10).with_customers(vec![2, 3]),
        ASBuilder::new(2).with_providers(vec![10]).with_customers(vec![777]),
        ASBuilder::new(3).with_providers(vec![10]).with_customers(vec![777]),
        ASBuilder::new(777).with_providers(vec![2, 3]),
    ])
}

#[test]
fn test_withdrawal_falls_back_to_surviving_route() {
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let adoption = AdoptionMap::new();
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::EMPTY);
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy.receive_ann(ann(vec![3, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();
    // Lowest neighbor ASN breaks the tie
    assert_eq!(
        policy.local_rib().get(&prefix()).unwrap().as_path,
        vec![10, 2, 777]
    );

    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 1, &ctx)
        .unwrap();

    // The best surviving RIBsIn candidate takes over, and it is never
    // path-equal to the withdrawn route
    let installed = policy.local_rib().get(&prefix()).unwrap();
    assert_eq!(installed.as_path, vec![10, 3, 777]);
    assert_ne!(installed.as_path[1..], [2, 777]);
}

#[test]
fn test_withdrawing_everything_leaves_prefix_absent() {
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let adoption = AdoptionMap::new();
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::EMPTY);
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();
    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 1, &ctx)
        .unwrap();

    // No surviving candidate: the prefix is simply absent, not an error
    assert!(policy.local_rib().get(&prefix()).is_none());
}

#[test]
fn test_duplicate_withdrawal_aborts_trial() {
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let adoption = AdoptionMap::new();
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::EMPTY);
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();

    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    let result = policy.process_incoming_anns(Relationships::Customers, 1, &ctx);
    assert!(matches!(
        result,
        Err(EngineError::DuplicateWithdrawal { asn: 10, neighbor: 2, .. })
    ));
}

#[test]
fn test_implicit_withdrawal_aborts_trial() {
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let adoption = AdoptionMap::new();
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::EMPTY);
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();

    // Same neighbor announces again without withdrawing first
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    let result = policy.process_incoming_anns(Relationships::Customers, 1, &ctx);
    assert!(matches!(
        result,
        Err(EngineError::ImplicitWithdrawal { asn: 10, neighbor: 2, .. })
    ));
}

#[test]
fn test_withdrawal_propagates_through_chain() {
    // 4 announces to its provider 2, which forwards to its provider 1;
    // then 4 withdraws.
    let graph = Arc::new(ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2]),
        ASBuilder::new(2).with_providers(vec![1]).with_customers(vec![4]),
        ASBuilder::new(4).with_providers(vec![2]),
    ]));
    let mut engine = SimulationEngine::new(graph);
    let seed = Announcement::new(prefix(), vec![4], None).unwrap();
    engine
        .setup(TrialSetup::new(PolicySpec::bgp_full()).with_seed(4, seed))
        .unwrap();
    engine.run(1).unwrap();

    let snapshot = engine.local_rib_snapshot();
    assert_eq!(snapshot[&1]["1.2.0.0/16"], vec![1, 2, 4]);
    let diagnostics = engine.diagnostics(2).unwrap();
    assert!(diagnostics.ribs_out.as_ref().unwrap()[&1].contains_key("1.2.0.0/16"));

    engine.withdraw_route(4, &prefix()).unwrap();
    engine.run_round(1).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // Nobody retains a path through 4
    assert!(!snapshot[&1].contains_key("1.2.0.0/16"));
    assert!(!snapshot[&2].contains_key("1.2.0.0/16"));
    assert!(!snapshot[&4].contains_key("1.2.0.0/16"));
    // And 2's RIBsOut entry toward 1 is gone
    let diagnostics = engine.diagnostics(2).unwrap();
    let toward_1 = diagnostics.ribs_out.as_ref().unwrap().get(&1);
    assert!(toward_1.map_or(true, |m| !m.contains_key("1.2.0.0/16")));
}

#[test]
fn test_withdraw_before_propagation_sends_nothing() {
    // The route is seeded and retracted before any round runs; the send
    // queue cancellation means no neighbor ever hears anything.
    let graph = Arc::new(ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2]),
        ASBuilder::new(2).with_providers(vec![1]).with_customers(vec![4]),
        ASBuilder::new(4).with_providers(vec![2]),
    ]));
    let mut engine = SimulationEngine::new(graph);
    let seed = Announcement::new(prefix(), vec![4], None).unwrap();
    engine
        .setup(TrialSetup::new(PolicySpec::bgp_full()).with_seed(4, seed))
        .unwrap();
    engine.withdraw_route(4, &prefix()).unwrap();
    engine.run(1).unwrap();

    for (_asn, rib) in engine.local_rib_snapshot() {
        assert!(!rib.contains_key("1.2.0.0/16"));
    }
}

#[test]
fn test_route_suppression_replays_lost_withdrawal() {
    // Divergence from the unfinished original is intentional and visible
    // here: the withdrawal record is per-AS and trial-owned, and a
    // re-announced withdrawn route survives exactly one processing step
    // before the recorded withdrawal is replayed against it.
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let mut adoption = AdoptionMap::new();
    adoption.set(10, SettingsSet::new(&[Settings::RouteSuppression]));
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::new(&[Settings::RouteSuppression]));
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();
    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 1, &ctx)
        .unwrap();
    assert!(policy.local_rib().get(&prefix()).is_none());

    // An attacker re-announces the withdrawn route
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 2, &ctx)
        .unwrap();
    // It lands for one step...
    assert_eq!(
        policy.local_rib().get(&prefix()).unwrap().as_path,
        vec![10, 2, 777]
    );

    // ...and the next processing step re-suppresses it from the record
    policy
        .process_incoming_anns(Relationships::Customers, 3, &ctx)
        .unwrap();
    assert!(policy.local_rib().get(&prefix()).is_none());
}

#[test]
fn test_suppression_leaves_unrelated_routes_alone() {
    let graph = fan_graph();
    let validator = RouteValidator::new();
    let adoption = AdoptionMap::new();
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    let mut policy = BgpFull::new(10, SettingsSet::new(&[Settings::RouteSuppression]));
    policy.receive_ann(ann(vec![2, 777])).unwrap();
    policy.receive_ann(ann(vec![3, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 0, &ctx)
        .unwrap();
    policy.receive_ann(withdrawal(vec![2, 777])).unwrap();
    policy
        .process_incoming_anns(Relationships::Customers, 1, &ctx)
        .unwrap();

    // The sibling route through 3 is untouched by the replay machinery
    policy
        .process_incoming_anns(Relationships::Customers, 2, &ctx)
        .unwrap();
    assert_eq!(
        policy.local_rib().get(&prefix()).unwrap().as_path,
        vec![10, 3, 777]
    );
}
