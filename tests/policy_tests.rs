use std::sync::Arc;

use bgpsim::route_validator::{RouteValidator, ROA};
use bgpsim::shared::{ConfigError, EngineError, PolicyClass, Relationships, Settings, SettingsSet};
use bgpsim::simulation_engine::policy::extensions::{
    Aspa, AspaOutcome, Bgpsec, BgpisecTransitive, EdgeFilter, EnforceFirstAs, OnlyToCustomers,
    PathEnd, PeerlockLite, ProviderConeId, Rov,
};
use bgpsim::simulation_engine::policy::{AdoptionMap, AnnChoice, PolicyCtx, PolicyExtension};
use bgpsim::simulation_engine::{Announcement, PolicySpec, Prefix, SimulationEngine, TrialSetup};
use bgpsim::{ASBuilder, ASGraph, ASN};

fn prefix() -> Prefix {
    "1.2.0.0/16".parse().unwrap()
}

fn ann(path: Vec<ASN>) -> Announcement {
    Announcement::new(prefix(), path.clone(), Some(path[0])).unwrap()
}

/// 777 buys from 2, 2 buys from 1; 3 is another customer of 1; 9 peers
/// with 2 and sells to 8.
fn test_graph() -> ASGraph {
    ASGraph::build(vec![
        ASBuilder::new(1).as_input_clique().with_customers(vec![2, 3]),
        ASBuilder::new(2)
            .with_providers(vec![1])
            .with_peers(vec![9])
            .with_customers(vec![777]),
        ASBuilder::new(3).with_providers(vec![1]),
        ASBuilder::new(8).with_providers(vec![9]),
        ASBuilder::new(9).with_peers(vec![2]).with_customers(vec![8]),
        ASBuilder::new(777).with_providers(vec![2]),
    ])
}

fn adopt_all(graph: &ASGraph, setting: Settings) -> AdoptionMap {
    let mut adoption = AdoptionMap::new();
    for &asn in &graph.asns {
        adoption.set(asn, SettingsSet::new(&[setting]));
    }
    adoption
}

#[test]
fn test_rov_rejects_invalid_origin() {
    let graph = test_graph();
    let mut validator = RouteValidator::new();
    validator.add_roa(ROA::new(prefix(), 777, None));
    let adoption = adopt_all(&graph, Settings::Rov);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&1).unwrap();

    let good = ann(vec![2, 777]);
    assert!(Rov.validate(&good, Relationships::Customers, as_obj, &ctx));

    let hijacked = ann(vec![3, 666]);
    assert!(!Rov.validate(&hijacked, Relationships::Customers, as_obj, &ctx));

    // A prefix with no covering ROA is unknown, and unknown passes
    let uncovered =
        Announcement::new("8.8.0.0/16".parse().unwrap(), vec![3, 666], Some(3)).unwrap();
    assert!(Rov.validate(&uncovered, Relationships::Customers, as_obj, &ctx));
}

#[test]
fn test_only_to_customers_marker() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::OnlyToCustomers);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&2).unwrap();

    let mut marked = ann(vec![9, 777]);
    marked.only_to_customers = Some(5);

    // Marked and arriving from a customer: leaked
    assert!(!OnlyToCustomers.validate(&marked, Relationships::Customers, as_obj, &ctx));
    // Marked and arriving from a peer that is not the marker: leaked
    assert!(!OnlyToCustomers.validate(&marked, Relationships::Peers, as_obj, &ctx));
    // From the marking peer itself: fine
    let mut from_marker = marked.clone();
    from_marker.only_to_customers = Some(9);
    assert!(OnlyToCustomers.validate(&from_marker, Relationships::Peers, as_obj, &ctx));
    // Down from a provider: fine
    assert!(OnlyToCustomers.validate(&marked, Relationships::Providers, as_obj, &ctx));
}

#[test]
fn test_edge_filter_rejects_transit_from_stubs() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::EdgeFilter);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&2).unwrap();

    // 777 is a stub; a path from it carrying another ASN is forged
    let forged = ann(vec![777, 666]);
    assert!(!EdgeFilter.validate(&forged, Relationships::Customers, as_obj, &ctx));

    let own = ann(vec![777]);
    assert!(EdgeFilter.validate(&own, Relationships::Customers, as_obj, &ctx));

    // 9 is a transit AS; multi-hop paths from it are normal
    let transit = ann(vec![9, 8]);
    assert!(EdgeFilter.validate(&transit, Relationships::Peers, as_obj, &ctx));
}

#[test]
fn test_enforce_first_as() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::EnforceFirstAs);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&2).unwrap();

    let good = ann(vec![777]);
    assert!(EnforceFirstAs.validate(&good, Relationships::Customers, as_obj, &ctx));

    // First path entry differs from the next hop
    let mut stripped = ann(vec![666, 777]);
    stripped.next_hop_asn = 777;
    assert!(!EnforceFirstAs.validate(&stripped, Relationships::Customers, as_obj, &ctx));

    // Next hop is not a neighbor on the claimed interface: 9 is a peer of
    // 2, not a customer
    let wrong_interface = ann(vec![9, 8]);
    assert!(!EnforceFirstAs.validate(&wrong_interface, Relationships::Customers, as_obj, &ctx));
    assert!(EnforceFirstAs.validate(&wrong_interface, Relationships::Peers, as_obj, &ctx));
}

#[test]
fn test_path_end_checks_origin_adjacency() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::PathEnd);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&1).unwrap();

    // 2 really is 777's provider
    let good = ann(vec![2, 777]);
    assert!(PathEnd.validate(&good, Relationships::Customers, as_obj, &ctx));

    // 3 claims to neighbor 777 but does not
    let forged = ann(vec![3, 777]);
    assert!(!PathEnd.validate(&forged, Relationships::Customers, as_obj, &ctx));
}

#[test]
fn test_peerlock_lite_rejects_leaked_clique() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::PeerlockLite);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&2).unwrap();

    // AS 1 is in the provider-free clique; hearing it from a customer
    // means the route went down and came back up
    let leaked = ann(vec![777, 1, 3]);
    assert!(!PeerlockLite.validate(&leaked, Relationships::Customers, as_obj, &ctx));
    // The same path from a provider is normal
    assert!(PeerlockLite.validate(&leaked, Relationships::Providers, as_obj, &ctx));
}

#[test]
fn test_bgpisec_transitive_missing_signature() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::BgpisecTransitive);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };
    let as_obj = graph.get(&1).unwrap();

    // Both path hops adopt and both signed
    let mut signed = ann(vec![2, 777]);
    signed.bgpsec_as_path = vec![2, 777];
    assert!(BgpisecTransitive.validate(&signed, Relationships::Customers, as_obj, &ctx));

    // 2 adopts but its signature is missing: tampered
    let mut tampered = ann(vec![2, 777]);
    tampered.bgpsec_as_path = vec![777];
    assert!(!BgpisecTransitive.validate(&tampered, Relationships::Customers, as_obj, &ctx));
}

#[test]
fn test_bgpsec_prefers_signed_routes() {
    let mut current = ann(vec![2, 777]);
    current.bgpsec_as_path = vec![2, 777];
    current.bgpsec_next_asn = Some(1);

    let mut unsigned = ann(vec![3, 777]);
    unsigned.bgpsec_as_path = Vec::new();

    // At AS 1, the signed route wins over the unsigned one
    assert_eq!(Bgpsec.prefer(&current, &unsigned, 1), Some(AnnChoice::Current));
    assert_eq!(Bgpsec.prefer(&unsigned, &current, 1), Some(AnnChoice::New));
    // Two unsigned routes: no opinion, tiebreak decides
    assert_eq!(Bgpsec.prefer(&unsigned, &unsigned, 1), None);
}

#[test]
fn test_aspa_valley_free_path_accepted() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::Aspa);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    // Fully adopting, genuinely valley-free: up 777→2→1, down 1→3
    let climb = ann(vec![1, 2, 777]);
    assert_eq!(Aspa.outcome(&climb, &ctx), AspaOutcome::Valid);

    // Peer peak 2~9 then down to 8 is also valley-free
    let peak = ann(vec![9, 2, 777]);
    assert_eq!(Aspa.outcome(&peak, &ctx), AspaOutcome::Valid);
}

#[test]
fn test_aspa_detour_rejected() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::Aspa);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    // 9 learned the route from its peer 2 and leaked it up to 8's
    // provider-side: the path climbs again after descending
    let leaked = ann(vec![8, 9, 2, 777]);
    // 8 is 9's customer, so [8, 9, ...] descends: still fine
    assert_eq!(Aspa.outcome(&leaked, &ctx), AspaOutcome::Valid);

    // But 9 re-exporting its peer-learned route to another peer or up
    // makes the ramps fall short: insert a second lateral hop
    let double_peak = ann(vec![3, 1, 9, 2, 777]);
    // 9 does not buy from 1, so [.., 1, 9, ..] is an unattested detour
    assert_eq!(Aspa.outcome(&double_peak, &ctx), AspaOutcome::Invalid);

    let as_obj = graph.get(&3).unwrap();
    assert!(!Aspa.validate(&double_peak, Relationships::Providers, as_obj, &ctx));
}

#[test]
fn test_aspa_non_adopters_give_unknown() {
    let graph = test_graph();
    let validator = RouteValidator::new();
    // Only 9 adopts; everyone else's attestations are unknown
    let mut adoption = AdoptionMap::new();
    adoption.set(9, SettingsSet::new(&[Settings::Aspa]));
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    // 9's hop toward 2 is provably not a provider hop, but the rest of the
    // path is unattested, so the optimistic ramps still cover it
    let path = ann(vec![3, 1, 9, 2, 777]);
    assert_eq!(Aspa.outcome(&path, &ctx), AspaOutcome::Unknown);
    // Unknown is accepted by policy choice
    let as_obj = graph.get(&3).unwrap();
    assert!(Aspa.validate(&path, Relationships::Providers, as_obj, &ctx));
}

#[test]
fn test_aspa_ramp_soundness_property() {
    // For a fully-adopting valley-free path, max ramps always cover the
    // path; pushing one hop beyond both ramps must flip to rejected.
    let graph = test_graph();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::Aspa);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    for path in [vec![2, 777], vec![1, 2, 777], vec![9, 2, 777], vec![8, 9, 2, 777]] {
        let valley_free = ann(path);
        assert_ne!(Aspa.outcome(&valley_free, &ctx), AspaOutcome::Invalid);
    }

    // [1, 9, ...] claims 9 sent its peer-learned route up again: one hop
    // beyond both ramps flips the outcome
    let detour = ann(vec![1, 9, 2, 777]);
    assert_eq!(Aspa.outcome(&detour, &ctx), AspaOutcome::Invalid);
}

#[test]
fn test_provider_cone_id_rejects_out_of_cone() {
    let mut graph = test_graph();
    graph.add_provider_cone_asns();
    let validator = RouteValidator::new();
    let adoption = adopt_all(&graph, Settings::ProviderConeId);
    let ctx = PolicyCtx {
        graph: &graph,
        route_validator: &validator,
        adoption: &adoption,
    };

    // 777's provider cone is {777, 2, 1}; hearing [2, 777] at 1 from a
    // customer stays inside it
    let as_obj = graph.get(&1).unwrap();
    let good = ann(vec![2, 777]);
    assert!(ProviderConeId.validate(&good, Relationships::Customers, as_obj, &ctx));

    // At AS 3, 3 itself is outside the cone
    let as_obj_3 = graph.get(&3).unwrap();
    assert!(!ProviderConeId.validate(&good, Relationships::Customers, as_obj_3, &ctx));
    // Routes from providers are not cone-checked
    assert!(ProviderConeId.validate(&good, Relationships::Providers, as_obj_3, &ctx));
}

#[test]
fn test_cone_dependent_extension_fails_setup_without_cones() {
    // No cones precomputed on this graph
    let graph = Arc::new(test_graph());
    let mut engine = SimulationEngine::new(graph);
    let spec = PolicySpec::new(
        PolicyClass::Bgp,
        SettingsSet::new(&[Settings::ProviderConeId]),
    );
    let result = engine.setup(TrialSetup::new(spec));
    assert!(matches!(
        result,
        Err(EngineError::Config(ConfigError::MissingProviderCones { .. }))
    ));
}

#[test]
fn test_route_suppression_requires_stateful_class() {
    let graph = Arc::new(test_graph());
    let mut engine = SimulationEngine::new(graph);
    let spec = PolicySpec::new(
        PolicyClass::Bgp,
        SettingsSet::new(&[Settings::RouteSuppression]),
    );
    let result = engine.setup(TrialSetup::new(spec));
    assert!(matches!(
        result,
        Err(EngineError::Config(ConfigError::SuppressionRequiresStateful { .. }))
    ));
}
