use std::collections::HashSet;
use std::sync::Arc;

use bgpsim::shared::{PolicyClass, Settings, SettingsSet};
use bgpsim::simulation_engine::{PolicySpec, SimulationEngine};
use bgpsim::simulation_framework::{
    run_scenario, AccidentalRouteLeak, PrefixHijack, Scenario, ScenarioConfig, SubprefixHijack,
    ValidPrefix,
};
use bgpsim::{ASBuilder, ASGraph, CommonASNs};

const PREFIX: &str = "1.2.0.0/16";
const SUBPREFIX: &str = "1.2.3.0/24";

/// The attacker buys transit straight from the tier-1, giving it a shorter
/// forged path than the victim's legitimate one.
fn hijack_graph() -> Arc<ASGraph> {
    Arc::new(ASGraph::build(vec![
        ASBuilder::new(1)
            .as_input_clique()
            .with_customers(vec![2, 3, CommonASNs::ATTACKER]),
        ASBuilder::new(2).with_providers(vec![1]).with_customers(vec![CommonASNs::VICTIM]),
        ASBuilder::new(3).with_providers(vec![1]),
        ASBuilder::new(CommonASNs::ATTACKER).with_providers(vec![1]),
        ASBuilder::new(CommonASNs::VICTIM).with_providers(vec![2]),
    ]))
}

fn rov_spec() -> PolicySpec {
    PolicySpec::new(PolicyClass::Bgp, SettingsSet::new(&[Settings::Rov]))
}

#[test]
fn test_valid_prefix_reaches_everyone() {
    let mut engine = SimulationEngine::new(hijack_graph());
    let scenario = ValidPrefix::new(CommonASNs::VICTIM);
    let config = ScenarioConfig::new("control");
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    for asn in [1, 2, 3, CommonASNs::ATTACKER, CommonASNs::VICTIM] {
        let path = &snapshot[&asn][PREFIX];
        assert_eq!(*path.last().unwrap(), CommonASNs::VICTIM);
    }
}

#[test]
fn test_prefix_hijack_without_security_spreads() {
    let mut engine = SimulationEngine::new(hijack_graph());
    let scenario = PrefixHijack::new(CommonASNs::VICTIM, CommonASNs::ATTACKER);
    let config = ScenarioConfig::new("prefix hijack, no defenses");
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // AS 3 is not adjacent to the attacker, yet its best route for the
    // victim's prefix traces to the attacker
    assert_eq!(snapshot[&3][PREFIX], vec![3, 1, CommonASNs::ATTACKER]);
    // The victim's own provider still routes to the victim
    assert_eq!(
        *snapshot[&2][PREFIX].last().unwrap(),
        CommonASNs::VICTIM
    );
}

#[test]
fn test_prefix_hijack_blocked_by_rov() {
    let mut engine = SimulationEngine::new(hijack_graph());
    let scenario = PrefixHijack::new(CommonASNs::VICTIM, CommonASNs::ATTACKER);
    let config = ScenarioConfig::new("prefix hijack vs ROV")
        .with_adopt_spec(rov_spec())
        .with_adopting_asns(HashSet::from([1, 2, 3]));
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    for asn in [1, 2, 3] {
        assert_eq!(
            *snapshot[&asn][PREFIX].last().unwrap(),
            CommonASNs::VICTIM,
            "AS {} should route to the victim",
            asn
        );
    }
}

#[test]
fn test_subprefix_hijack_with_rov_everywhere() {
    let mut engine = SimulationEngine::new(hijack_graph());
    let scenario = SubprefixHijack::new(CommonASNs::VICTIM, CommonASNs::ATTACKER);
    // Full adoption: every AS except the attacker and victim validates
    let config = ScenarioConfig::new("subprefix hijack vs ROV")
        .with_adopt_spec(rov_spec())
        .with_percent_adoption(1.0);
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    for asn in [1, 2, 3, CommonASNs::VICTIM] {
        // The forged subprefix never lands anywhere
        assert!(
            !snapshot[&asn].contains_key(SUBPREFIX),
            "AS {} accepted the forged subprefix",
            asn
        );
        // The covering announcement still traces to the victim
        assert_eq!(*snapshot[&asn][PREFIX].last().unwrap(), CommonASNs::VICTIM);
    }
}

#[test]
fn test_subprefix_hijack_without_rov_spreads() {
    let mut engine = SimulationEngine::new(hijack_graph());
    let scenario = SubprefixHijack::new(CommonASNs::VICTIM, CommonASNs::ATTACKER);
    let config = ScenarioConfig::new("subprefix hijack, no defenses");
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // With nobody validating, the more-specific forged prefix spreads
    assert_eq!(
        *snapshot[&1][SUBPREFIX].last().unwrap(),
        CommonASNs::ATTACKER
    );
    assert_eq!(
        *snapshot[&3][SUBPREFIX].last().unwrap(),
        CommonASNs::ATTACKER
    );
}

/// Leak topology: the victim's route reaches AS 3 over a peer link; the
/// leak hook re-exports it up to AS 1 in round 2, and AS 4 sits below 1.
fn leak_graph() -> Arc<ASGraph> {
    Arc::new(ASGraph::build(vec![
        ASBuilder::new(1).as_input_clique().with_customers(vec![3, 4]),
        ASBuilder::new(2).with_peers(vec![3]).with_customers(vec![CommonASNs::VICTIM]),
        ASBuilder::new(3).with_providers(vec![1]).with_peers(vec![2]),
        ASBuilder::new(4).with_providers(vec![1]),
        ASBuilder::new(CommonASNs::VICTIM).with_providers(vec![2]),
    ]))
}

#[test]
fn test_route_leak_without_defenses_spreads() {
    let mut engine = SimulationEngine::new(leak_graph());
    let scenario = AccidentalRouteLeak::new(CommonASNs::VICTIM, 3);
    let config = ScenarioConfig::new("route leak, no defenses");
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // The leaked route crosses the peak twice and still gets accepted
    assert_eq!(snapshot[&1][PREFIX], vec![1, 3, 2, CommonASNs::VICTIM]);
    assert_eq!(snapshot[&4][PREFIX], vec![4, 1, 3, 2, CommonASNs::VICTIM]);
}

#[test]
fn test_route_leak_rejected_downstream_by_aspa() {
    let mut engine = SimulationEngine::new(leak_graph());
    let scenario = AccidentalRouteLeak::new(CommonASNs::VICTIM, 3);
    let aspa_spec = PolicySpec::new(PolicyClass::Bgp, SettingsSet::new(&[Settings::Aspa]));
    let config = ScenarioConfig::new("route leak vs ASPA")
        .with_adopt_spec(aspa_spec)
        .with_adopting_asns(HashSet::from([1, 2, 4, CommonASNs::VICTIM]));
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // The provider right above the leak cannot prove the detour yet and
    // accepts, but one hop further down the down-ramp no longer covers the
    // path and AS 4 rejects it.
    assert_eq!(snapshot[&1][PREFIX], vec![1, 3, 2, CommonASNs::VICTIM]);
    assert!(
        !snapshot[&4].contains_key(PREFIX),
        "AS 4 should reject the re-leaked path"
    );
}

#[test]
fn test_route_leak_rejected_at_provider_by_otc() {
    let mut engine = SimulationEngine::new(leak_graph());
    let scenario = AccidentalRouteLeak::new(CommonASNs::VICTIM, 3);
    let otc_spec = PolicySpec::new(
        PolicyClass::Bgp,
        SettingsSet::new(&[Settings::OnlyToCustomers]),
    );
    let config = ScenarioConfig::new("route leak vs OTC")
        .with_adopt_spec(otc_spec)
        .with_adopting_asns(HashSet::from([1, 2, 4, CommonASNs::VICTIM]));
    run_scenario(&mut engine, &scenario, &config).unwrap();

    let snapshot = engine.local_rib_snapshot();
    // AS 2 marked the route down-only when exporting to its peer, so the
    // leak dies the moment it arrives at 1 from a customer interface
    assert!(!snapshot[&1].contains_key(PREFIX));
    assert!(!snapshot[&4].contains_key(PREFIX));
}

#[test]
fn test_adoption_sampling_is_deterministic() {
    let graph = hijack_graph();
    let scenario = PrefixHijack::new(CommonASNs::VICTIM, CommonASNs::ATTACKER);
    let config = ScenarioConfig::new("sampled adoption")
        .with_adopt_spec(rov_spec())
        .with_percent_adoption(0.5)
        .with_rng_seed(42);

    let first = config.adopting_asns(&graph, scenario.attacker_asns(), scenario.victim_asns());
    let second = config.adopting_asns(&graph, scenario.attacker_asns(), scenario.victim_asns());
    assert_eq!(first, second);
    assert!(!first.contains(&CommonASNs::ATTACKER));
    assert!(!first.contains(&CommonASNs::VICTIM));
    // Half of the three eligible ASes, rounded
    assert_eq!(first.len(), 2);
}
