use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::as_graph::{ASGraph, ASN};
use crate::route_validator::{RouteValidator, ROA};
use crate::shared::{
    ConfigError, EngineError, PolicyClass, Relationships, Settings, SettingsSet,
};
use crate::simulation_engine::announcement::{Announcement, Prefix};
use crate::simulation_engine::policy::{build_policy, AdoptionMap, Policy, PolicyCtx, PolicyStore};

/// Policy assignment for one AS: the decision-engine variant plus the
/// security extensions stacked onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySpec {
    pub class: PolicyClass,
    pub settings: SettingsSet,
}

impl PolicySpec {
    pub fn new(class: PolicyClass, settings: SettingsSet) -> Self {
        PolicySpec { class, settings }
    }

    pub fn bgp() -> Self {
        PolicySpec::new(PolicyClass::Bgp, SettingsSet::EMPTY)
    }

    pub fn bgp_full() -> Self {
        PolicySpec::new(PolicyClass::BgpFull, SettingsSet::EMPTY)
    }
}

/// Everything one trial needs: who runs what, what gets seeded where, and
/// the trial's ROAs.
#[derive(Debug, Clone)]
pub struct TrialSetup {
    pub default_spec: PolicySpec,
    pub overrides: HashMap<ASN, PolicySpec>,
    pub seed_anns: Vec<(ASN, Announcement)>,
    pub roas: Vec<ROA>,
}

impl TrialSetup {
    pub fn new(default_spec: PolicySpec) -> Self {
        TrialSetup {
            default_spec,
            overrides: HashMap::new(),
            seed_anns: Vec::new(),
            roas: Vec::new(),
        }
    }

    pub fn with_override(mut self, asn: ASN, spec: PolicySpec) -> Self {
        self.overrides.insert(asn, spec);
        self
    }

    pub fn with_seed(mut self, asn: ASN, ann: Announcement) -> Self {
        self.seed_anns.push((asn, ann));
        self
    }

    pub fn with_roa(mut self, roa: ROA) -> Self {
        self.roas.push(roa);
        self
    }
}

/// Serializable view of one local RIB route, for analysis collaborators.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RibEntrySnapshot {
    pub as_path: Vec<ASN>,
    pub next_hop_asn: ASN,
    pub recv_relationship: Relationships,
    pub origin: ASN,
}

impl From<&Announcement> for RibEntrySnapshot {
    fn from(ann: &Announcement) -> Self {
        RibEntrySnapshot {
            as_path: ann.as_path.clone(),
            next_hop_asn: ann.next_hop_asn,
            recv_relationship: ann.recv_relationship,
            origin: ann.origin(),
        }
    }
}

/// Per-AS diagnostic dump: the final local RIB, plus RIBsIn/RIBsOut for the
/// stateful variant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AsDiagnostics {
    pub asn: ASN,
    pub local_rib: BTreeMap<String, RibEntrySnapshot>,
    pub ribs_in: Option<BTreeMap<ASN, BTreeMap<String, RibEntrySnapshot>>>,
    pub ribs_out: Option<BTreeMap<ASN, BTreeMap<String, RibEntrySnapshot>>>,
}

impl AsDiagnostics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Drives whole-graph propagation: one round is three ordered phases over
/// the shared read-only topology. Each trial owns its policy store, ROA
/// table and adoption map outright; only the graph is shared.
pub struct SimulationEngine {
    pub as_graph: Arc<ASGraph>,
    pub policy_store: PolicyStore,
    pub route_validator: RouteValidator,
    adoption: AdoptionMap,
    ready_to_run_round: u32,
}

impl SimulationEngine {
    pub fn new(as_graph: Arc<ASGraph>) -> Self {
        SimulationEngine {
            as_graph,
            policy_store: PolicyStore::new(),
            route_validator: RouteValidator::new(),
            adoption: AdoptionMap::new(),
            ready_to_run_round: 0,
        }
    }

    pub fn adoption(&self) -> &AdoptionMap {
        &self.adoption
    }

    /// Resets all per-AS state, validates the configuration, instantiates
    /// one policy object per AS and seeds the initial announcements.
    /// Configuration problems surface here, before any propagation.
    pub fn setup(&mut self, setup: TrialSetup) -> Result<(), EngineError> {
        self.route_validator.clear();
        for roa in setup.roas {
            self.route_validator.add_roa(roa);
        }

        for (asn, _) in &setup.overrides {
            if self.as_graph.get(asn).is_none() {
                return Err(ConfigError::UnknownAsn { asn: *asn }.into());
            }
        }

        self.policy_store.clear();
        self.adoption = AdoptionMap::new();
        let has_provider_cones = self.as_graph.has_provider_cones();
        for &asn in &self.as_graph.asns {
            let spec = setup.overrides.get(&asn).copied().unwrap_or(setup.default_spec);
            if spec.settings.contains(Settings::ProviderConeId) && !has_provider_cones {
                return Err(ConfigError::MissingProviderCones { asn }.into());
            }
            if spec.settings.contains(Settings::RouteSuppression)
                && spec.class != PolicyClass::BgpFull
            {
                return Err(ConfigError::SuppressionRequiresStateful { asn }.into());
            }
            self.adoption.set(asn, spec.settings);
            self.policy_store
                .insert(asn, build_policy(asn, spec.class, spec.settings));
        }

        let ctx = PolicyCtx {
            graph: &self.as_graph,
            route_validator: &self.route_validator,
            adoption: &self.adoption,
        };
        for (asn, ann) in setup.seed_anns {
            let policy = self
                .policy_store
                .get_mut(&asn)
                .ok_or(EngineError::UnknownAsn { asn })?;
            policy.seed_ann(ann, &ctx)?;
        }

        self.ready_to_run_round = 0;
        Ok(())
    }

    pub fn run(&mut self, rounds: u32) -> Result<(), EngineError> {
        for _ in 0..rounds {
            self.run_round(self.ready_to_run_round)?;
        }
        Ok(())
    }

    /// Runs exactly one further propagation round over already-seeded state.
    /// Rounds must be run in order; multi-round scenarios (leaks, mid-trial
    /// withdrawals) mutate state between calls.
    pub fn run_round(&mut self, propagation_round: u32) -> Result<(), EngineError> {
        if propagation_round != self.ready_to_run_round {
            return Err(EngineError::RoundOutOfOrder {
                expected: self.ready_to_run_round,
                got: propagation_round,
            });
        }
        debug!(round = propagation_round, "propagation round start");
        self.propagate_to_providers(propagation_round)?;
        self.propagate_to_peers(propagation_round)?;
        self.propagate_to_customers(propagation_round)?;
        self.ready_to_run_round += 1;
        Ok(())
    }

    /// Retracts a seeded route at `asn`; the withdrawals travel on the next
    /// round.
    pub fn withdraw_route(&mut self, asn: ASN, prefix: &Prefix) -> Result<(), EngineError> {
        let policy = self
            .policy_store
            .get_mut(&asn)
            .ok_or(EngineError::UnknownAsn { asn })?;
        policy.withdraw_seeded_ann(prefix)
    }

    /// Phase 1, bottom-up: edge to core. Each rank first processes what
    /// lower ranks sent it, then exports toward its providers.
    fn propagate_to_providers(&mut self, round: u32) -> Result<(), EngineError> {
        debug!(round, "phase: bottom-up");
        let ranks = self.as_graph.propagation_ranks.clone();
        for (i, rank) in ranks.iter().enumerate() {
            if i > 0 {
                for &asn in rank {
                    self.process_incoming(asn, Relationships::Customers, round)?;
                }
            }
            for &asn in rank {
                self.propagate_from(asn, Relationships::Providers)?;
            }
        }
        Ok(())
    }

    /// Phase 2, peer exchange. Rank-independent: peering cuts across the
    /// hierarchy, so everyone exports first and everyone processes after.
    fn propagate_to_peers(&mut self, round: u32) -> Result<(), EngineError> {
        debug!(round, "phase: peer exchange");
        let asns = self.as_graph.asns.clone();
        for &asn in &asns {
            self.propagate_from(asn, Relationships::Peers)?;
        }
        for &asn in &asns {
            self.process_incoming(asn, Relationships::Peers, round)?;
        }
        Ok(())
    }

    /// Phase 3, top-down: core to edge, processing provider-sent routes
    /// before exporting to customers. Depends on RIB state written in
    /// phase 1; the phase order is a hard invariant.
    fn propagate_to_customers(&mut self, round: u32) -> Result<(), EngineError> {
        debug!(round, "phase: top-down");
        let ranks = self.as_graph.propagation_ranks.clone();
        for (i, rank) in ranks.iter().rev().enumerate() {
            if i > 0 {
                for &asn in rank {
                    self.process_incoming(asn, Relationships::Providers, round)?;
                }
            }
            for &asn in rank {
                self.propagate_from(asn, Relationships::Customers)?;
            }
        }
        Ok(())
    }

    fn process_incoming(
        &mut self,
        asn: ASN,
        from_rel: Relationships,
        round: u32,
    ) -> Result<(), EngineError> {
        let ctx = PolicyCtx {
            graph: &self.as_graph,
            route_validator: &self.route_validator,
            adoption: &self.adoption,
        };
        let policy = self
            .policy_store
            .get_mut(&asn)
            .ok_or(EngineError::UnknownAsn { asn })?;
        policy.process_incoming_anns(from_rel, round, &ctx)
    }

    fn propagate_from(&mut self, asn: ASN, propagate_to: Relationships) -> Result<(), EngineError> {
        let deliveries = {
            let ctx = PolicyCtx {
                graph: &self.as_graph,
                route_validator: &self.route_validator,
                adoption: &self.adoption,
            };
            let policy = self
                .policy_store
                .get_mut(&asn)
                .ok_or(EngineError::UnknownAsn { asn })?;
            policy.propagate(propagate_to, &ctx)?
        };
        for (neighbor_asn, ann) in deliveries {
            let neighbor = self
                .policy_store
                .get_mut(&neighbor_asn)
                .ok_or(EngineError::UnknownAsn { asn: neighbor_asn })?;
            neighbor.receive_ann(ann)?;
        }
        Ok(())
    }

    /// Final routing state per AS, in the compact form analysis code wants:
    /// prefix string to AS path.
    pub fn local_rib_snapshot(&self) -> HashMap<ASN, HashMap<String, Vec<ASN>>> {
        let mut snapshot = HashMap::new();
        for (asn, policy) in self.policy_store.iter() {
            let mut as_ribs = HashMap::new();
            for (prefix, ann) in policy.local_rib().prefix_anns() {
                as_ribs.insert(prefix.to_string(), ann.as_path.clone());
            }
            snapshot.insert(*asn, as_ribs);
        }
        snapshot
    }

    /// Full diagnostic view of one AS, serializable with serde.
    pub fn diagnostics(&self, asn: ASN) -> Option<AsDiagnostics> {
        let policy = self.policy_store.get(&asn)?;
        let local_rib = policy
            .local_rib()
            .prefix_anns()
            .map(|(prefix, ann)| (prefix.to_string(), RibEntrySnapshot::from(ann)))
            .collect();
        let ribs_in = policy.ribs_in().map(|ribs_in| {
            ribs_in
                .iter()
                .map(|(neighbor, prefix_map)| {
                    let entries = prefix_map
                        .iter()
                        .map(|(prefix, info)| {
                            (prefix.to_string(), RibEntrySnapshot::from(&info.unprocessed_ann))
                        })
                        .collect();
                    (*neighbor, entries)
                })
                .collect()
        });
        let ribs_out = policy.ribs_out().map(|ribs_out| {
            ribs_out
                .iter()
                .map(|(neighbor, prefix_map)| {
                    let entries = prefix_map
                        .iter()
                        .map(|(prefix, ann)| (prefix.to_string(), RibEntrySnapshot::from(ann)))
                        .collect();
                    (*neighbor, entries)
                })
                .collect()
        });
        Some(AsDiagnostics {
            asn,
            local_rib,
            ribs_in,
            ribs_out,
        })
    }
}
