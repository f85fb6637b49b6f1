use std::collections::HashSet;

use tracing::debug;

use crate::as_graph::{ASGraph, ASN};
use crate::route_validator::ROA;
use crate::shared::{EngineError, Relationships, Timestamps};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement, Prefix};
use crate::simulation_engine::{Policy, SimulationEngine, TrialSetup};
use crate::simulation_framework::scenario_config::ScenarioConfig;

/// The well-known prefixes attacks are modeled over; the prefix always
/// belongs to the victim.
pub struct Prefixes;

impl Prefixes {
    pub fn prefix() -> Prefix {
        "1.2.0.0/16".parse().unwrap()
    }

    pub fn subprefix() -> Prefix {
        "1.2.3.0/24".parse().unwrap()
    }
}

/// One attack (or control) setup: who originates what, with which forged
/// attributes, under which ROAs, and any state change between rounds.
pub trait Scenario {
    fn label(&self) -> &str;

    fn attacker_asns(&self) -> &HashSet<ASN>;

    fn victim_asns(&self) -> &HashSet<ASN>;

    fn min_propagation_rounds(&self) -> u32 {
        1
    }

    fn roas(&self) -> Vec<ROA> {
        Vec::new()
    }

    fn seed_anns(&self) -> Result<Vec<(ASN, Announcement)>, EngineError>;

    /// Runs after each round; multi-round scenarios mutate engine state here
    /// (leak a route, withdraw one).
    fn post_round_hook(&self, _engine: &mut SimulationEngine, _round: u32) -> Result<(), EngineError> {
        Ok(())
    }

    /// Assembles the trial: sampled adopters get the adopt spec, attackers
    /// are pinned to the base spec (attackers do not defend), everyone else
    /// gets the base spec by default.
    fn trial_setup(
        &self,
        config: &ScenarioConfig,
        graph: &ASGraph,
    ) -> Result<TrialSetup, EngineError> {
        let mut setup = TrialSetup::new(config.base_spec);
        for asn in config.adopting_asns(graph, self.attacker_asns(), self.victim_asns()) {
            setup.overrides.insert(asn, config.adopt_spec);
        }
        for &asn in self.attacker_asns() {
            setup.overrides.insert(asn, config.base_spec);
        }
        setup.roas = self.roas();
        setup.seed_anns = self.seed_anns()?;
        Ok(setup)
    }
}

/// Sets up and runs a whole trial: seed, then `min_propagation_rounds`
/// rounds with the scenario's hook after each.
pub fn run_scenario(
    engine: &mut SimulationEngine,
    scenario: &dyn Scenario,
    config: &ScenarioConfig,
) -> Result<(), EngineError> {
    let graph = engine.as_graph.clone();
    let setup = scenario.trial_setup(config, &graph)?;
    engine.setup(setup)?;
    debug!(label = scenario.label(), "scenario start");
    for round in 0..scenario.min_propagation_rounds() {
        engine.run_round(round)?;
        scenario.post_round_hook(engine, round)?;
    }
    Ok(())
}

/// Control case: the victim announces its prefix, covered by a matching
/// ROA, and nobody attacks.
pub struct ValidPrefix {
    label: String,
    victim_asns: HashSet<ASN>,
    attacker_asns: HashSet<ASN>,
}

impl ValidPrefix {
    pub fn new(victim: ASN) -> Self {
        ValidPrefix {
            label: "valid prefix".to_string(),
            victim_asns: HashSet::from([victim]),
            attacker_asns: HashSet::new(),
        }
    }

    fn victim(&self) -> ASN {
        *self.victim_asns.iter().next().expect("scenario needs a victim")
    }
}

impl Scenario for ValidPrefix {
    fn label(&self) -> &str {
        &self.label
    }

    fn attacker_asns(&self) -> &HashSet<ASN> {
        &self.attacker_asns
    }

    fn victim_asns(&self) -> &HashSet<ASN> {
        &self.victim_asns
    }

    fn roas(&self) -> Vec<ROA> {
        vec![ROA::new(Prefixes::prefix(), self.victim(), None)]
    }

    fn seed_anns(&self) -> Result<Vec<(ASN, Announcement)>, EngineError> {
        let victim = self.victim();
        let mut ann = Announcement::new(Prefixes::prefix(), vec![victim], None)?;
        ann.roa_origin = Some(victim);
        ann.roa_valid_length = Some(true);
        Ok(vec![(victim, ann)])
    }
}

/// Origin hijack: the attacker originates the victim's exact prefix with a
/// forged length-1 path. Without origin validation, shorter paths to the
/// attacker win across much of the graph.
pub struct PrefixHijack {
    label: String,
    victim_asns: HashSet<ASN>,
    attacker_asns: HashSet<ASN>,
}

impl PrefixHijack {
    pub fn new(victim: ASN, attacker: ASN) -> Self {
        PrefixHijack {
            label: "prefix hijack".to_string(),
            victim_asns: HashSet::from([victim]),
            attacker_asns: HashSet::from([attacker]),
        }
    }

    fn victim(&self) -> ASN {
        *self.victim_asns.iter().next().expect("scenario needs a victim")
    }

    fn attacker(&self) -> ASN {
        *self
            .attacker_asns
            .iter()
            .next()
            .expect("scenario needs an attacker")
    }
}

impl Scenario for PrefixHijack {
    fn label(&self) -> &str {
        &self.label
    }

    fn attacker_asns(&self) -> &HashSet<ASN> {
        &self.attacker_asns
    }

    fn victim_asns(&self) -> &HashSet<ASN> {
        &self.victim_asns
    }

    fn roas(&self) -> Vec<ROA> {
        vec![ROA::new(Prefixes::prefix(), self.victim(), None)]
    }

    fn seed_anns(&self) -> Result<Vec<(ASN, Announcement)>, EngineError> {
        let victim = self.victim();
        let attacker = self.attacker();

        let mut victim_ann = Announcement::new(Prefixes::prefix(), vec![victim], None)?;
        victim_ann.roa_origin = Some(victim);
        victim_ann.roa_valid_length = Some(true);

        let mut attacker_ann = Announcement::new(Prefixes::prefix(), vec![attacker], None)?;
        attacker_ann.timestamp = Timestamps::Attacker;
        // The victim's ROA covers the prefix; the attacker's origin fails it
        attacker_ann.roa_origin = Some(victim);
        attacker_ann.roa_valid_length = Some(true);

        Ok(vec![(victim, victim_ann), (attacker, attacker_ann)])
    }
}

/// Subprefix hijack: the attacker originates a more-specific prefix the
/// victim's ROA does not allow. Longest-prefix matching means origin
/// validation is the difference between total and zero capture.
pub struct SubprefixHijack {
    label: String,
    victim_asns: HashSet<ASN>,
    attacker_asns: HashSet<ASN>,
}

impl SubprefixHijack {
    pub fn new(victim: ASN, attacker: ASN) -> Self {
        SubprefixHijack {
            label: "subprefix hijack".to_string(),
            victim_asns: HashSet::from([victim]),
            attacker_asns: HashSet::from([attacker]),
        }
    }

    fn victim(&self) -> ASN {
        *self.victim_asns.iter().next().expect("scenario needs a victim")
    }

    fn attacker(&self) -> ASN {
        *self
            .attacker_asns
            .iter()
            .next()
            .expect("scenario needs an attacker")
    }
}

impl Scenario for SubprefixHijack {
    fn label(&self) -> &str {
        &self.label
    }

    fn attacker_asns(&self) -> &HashSet<ASN> {
        &self.attacker_asns
    }

    fn victim_asns(&self) -> &HashSet<ASN> {
        &self.victim_asns
    }

    fn roas(&self) -> Vec<ROA> {
        // Covers the subprefix too: max length defaults to /16
        vec![ROA::new(Prefixes::prefix(), self.victim(), None)]
    }

    fn seed_anns(&self) -> Result<Vec<(ASN, Announcement)>, EngineError> {
        let victim = self.victim();
        let attacker = self.attacker();

        let mut victim_ann = Announcement::new(Prefixes::prefix(), vec![victim], None)?;
        victim_ann.roa_origin = Some(victim);
        victim_ann.roa_valid_length = Some(true);

        let mut attacker_ann = Announcement::new(Prefixes::subprefix(), vec![attacker], None)?;
        attacker_ann.timestamp = Timestamps::Attacker;
        attacker_ann.roa_origin = Some(victim);
        attacker_ann.roa_valid_length = Some(false);

        Ok(vec![(victim, victim_ann), (attacker, attacker_ann)])
    }
}

/// Accidental route leak: the leaker learns the victim's route in round 1,
/// then re-exports it to everyone in round 2 as if it were customer-learned.
/// OTC and path attestation both exist to stop exactly this.
pub struct AccidentalRouteLeak {
    label: String,
    victim_asns: HashSet<ASN>,
    attacker_asns: HashSet<ASN>,
}

impl AccidentalRouteLeak {
    pub fn new(victim: ASN, leaker: ASN) -> Self {
        AccidentalRouteLeak {
            label: "accidental route leak".to_string(),
            victim_asns: HashSet::from([victim]),
            attacker_asns: HashSet::from([leaker]),
        }
    }

    fn victim(&self) -> ASN {
        *self.victim_asns.iter().next().expect("scenario needs a victim")
    }
}

impl Scenario for AccidentalRouteLeak {
    fn label(&self) -> &str {
        &self.label
    }

    fn attacker_asns(&self) -> &HashSet<ASN> {
        &self.attacker_asns
    }

    fn victim_asns(&self) -> &HashSet<ASN> {
        &self.victim_asns
    }

    fn min_propagation_rounds(&self) -> u32 {
        2
    }

    fn roas(&self) -> Vec<ROA> {
        vec![ROA::new(Prefixes::prefix(), self.victim(), None)]
    }

    fn seed_anns(&self) -> Result<Vec<(ASN, Announcement)>, EngineError> {
        let victim = self.victim();
        let mut ann = Announcement::new(Prefixes::prefix(), vec![victim], None)?;
        ann.roa_origin = Some(victim);
        ann.roa_valid_length = Some(true);
        Ok(vec![(victim, ann)])
    }

    fn post_round_hook(
        &self,
        engine: &mut SimulationEngine,
        round: u32,
    ) -> Result<(), EngineError> {
        if round != 0 {
            return Ok(());
        }
        // Relabel everything the leaker learned as customer-learned, so the
        // valley-free export rule lets it flow back up next round.
        for &leaker in &self.attacker_asns {
            let policy = engine
                .policy_store
                .get_mut(&leaker)
                .ok_or(EngineError::UnknownAsn { asn: leaker })?;
            let local_rib = policy.local_rib_mut();
            let leaked: Vec<Announcement> = local_rib
                .prefix_anns()
                .map(|(_, ann)| {
                    ann.copy_with(AnnOverrides {
                        recv_relationship: Some(Relationships::Customers),
                        ..Default::default()
                    })
                })
                .collect();
            for ann in leaked {
                local_rib.add_ann(ann);
            }
            debug!(leaker, "route leak staged for next round");
        }
        Ok(())
    }
}
