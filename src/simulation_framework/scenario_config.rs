use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::as_graph::{ASGraph, ASN};
use crate::simulation_engine::PolicySpec;

/// Trial-level knobs shared by every scenario: what non-adopters run, what
/// adopters run, and how the adopter set is chosen. Sampling is driven by a
/// fixed seed so a trial is reproducible end to end.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub label: String,
    pub base_spec: PolicySpec,
    pub adopt_spec: PolicySpec,
    pub percent_adoption: f64,
    pub rng_seed: u64,
    pub override_adopting_asns: Option<HashSet<ASN>>,
}

impl ScenarioConfig {
    pub fn new(label: impl Into<String>) -> Self {
        ScenarioConfig {
            label: label.into(),
            base_spec: PolicySpec::bgp(),
            adopt_spec: PolicySpec::bgp(),
            percent_adoption: 0.0,
            rng_seed: 0,
            override_adopting_asns: None,
        }
    }

    pub fn with_base_spec(mut self, spec: PolicySpec) -> Self {
        self.base_spec = spec;
        self
    }

    pub fn with_adopt_spec(mut self, spec: PolicySpec) -> Self {
        self.adopt_spec = spec;
        self
    }

    pub fn with_percent_adoption(mut self, percent: f64) -> Self {
        self.percent_adoption = percent;
        self
    }

    pub fn with_adopting_asns(mut self, asns: HashSet<ASN>) -> Self {
        self.override_adopting_asns = Some(asns);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// The adopter set for one trial: the explicit override if given,
    /// otherwise a deterministic sample of the eligible ASes. Attackers and
    /// victims never adopt; their policy assignment is fixed by the
    /// scenario.
    pub fn adopting_asns(
        &self,
        graph: &ASGraph,
        attackers: &HashSet<ASN>,
        victims: &HashSet<ASN>,
    ) -> HashSet<ASN> {
        if let Some(overridden) = &self.override_adopting_asns {
            return overridden.clone();
        }
        let candidates: Vec<ASN> = graph
            .asns
            .iter()
            .copied()
            .filter(|asn| !attackers.contains(asn) && !victims.contains(asn))
            .collect();
        let count = (candidates.len() as f64 * self.percent_adoption).round() as usize;
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        candidates
            .choose_multiple(&mut rng, count)
            .copied()
            .collect()
    }
}
