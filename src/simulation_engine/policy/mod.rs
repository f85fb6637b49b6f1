pub mod bgp;
pub mod bgp_full;
pub mod extensions;

use std::collections::HashMap;

use crate::as_graph::{ASGraph, ASN, AS};
use crate::route_validator::RouteValidator;
use crate::shared::{EngineError, PolicyClass, Relationships, Settings, SettingsSet};
use crate::simulation_engine::ann_containers::{LocalRIB, RIBsIn, RIBsOut};
use crate::simulation_engine::announcement::{Announcement, Prefix};

pub use bgp::Bgp;
pub use bgp_full::BgpFull;
pub use extensions::create_extensions;

/// Trial-scoped read-only collaborators handed into every policy call: the
/// shared topology, the trial's ROA table, and who adopts what. Policies
/// hold no back-reference to their AS; they look everything up through this.
pub struct PolicyCtx<'a> {
    pub graph: &'a ASGraph,
    pub route_validator: &'a RouteValidator,
    pub adoption: &'a AdoptionMap,
}

impl<'a> PolicyCtx<'a> {
    pub fn as_obj(&self, asn: ASN) -> Result<&'a AS, EngineError> {
        self.graph.get(&asn).ok_or(EngineError::UnknownAsn { asn })
    }
}

/// Which extensions every AS in the trial adopts. Validators consult this
/// for *other* ASes on the path (e.g. the ASPA provider check), so it lives
/// outside any single policy object.
#[derive(Debug, Clone, Default)]
pub struct AdoptionMap {
    settings: HashMap<ASN, SettingsSet>,
}

impl AdoptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, asn: ASN, settings: SettingsSet) {
        self.settings.insert(asn, settings);
    }

    pub fn adopts(&self, asn: ASN, setting: Settings) -> bool {
        self.settings
            .get(&asn)
            .map(|s| s.contains(setting))
            .unwrap_or(false)
    }

    pub fn settings(&self, asn: ASN) -> SettingsSet {
        self.settings.get(&asn).copied().unwrap_or_default()
    }
}

/// What an export hook decided for one (announcement, neighbor) pair.
#[derive(Debug, Clone)]
pub enum ExportAction {
    /// Extension has no opinion; the next hook (or the default send) runs.
    Default,
    /// Extension rewrote the announcement; send this instead.
    Handled(Announcement),
    /// Suppress the send to this neighbor entirely.
    Rejected,
}

/// Which of two candidate routes a preference hook picks, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnChoice {
    Current,
    New,
}

/// A security extension layered onto a decision engine. Validators compose
/// by short-circuit AND; export hooks by first non-`Default` match; the
/// preference hook slots between path length and the final tiebreak.
pub trait PolicyExtension: Send + Sync {
    fn setting(&self) -> Settings;

    /// Accept or reject an incoming announcement. Rejection drops the
    /// announcement; it is not an error.
    fn validate(
        &self,
        _ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        _ctx: &PolicyCtx<'_>,
    ) -> bool {
        true
    }

    /// Adjust a just-seeded announcement (e.g. attach the first signature).
    fn on_seed(&self, _ann: &mut Announcement, _as_obj: &AS) {}

    /// Adjust the processed copy of an accepted announcement. `original` is
    /// the announcement as received, before the local ASN was prepended.
    fn on_copy_and_process(
        &self,
        _original: &Announcement,
        _processed: &mut Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        _ctx: &PolicyCtx<'_>,
    ) {
    }

    /// Intercept an export to one neighbor.
    fn on_export(
        &self,
        _ann: &Announcement,
        _neighbor: &AS,
        _propagate_to: Relationships,
        _ctx: &PolicyCtx<'_>,
    ) -> ExportAction {
        ExportAction::Default
    }

    /// Extra best-path criterion between path length and the neighbor-ASN
    /// tiebreak. `None` means no opinion.
    fn prefer(&self, _current: &Announcement, _new: &Announcement, _asn: ASN) -> Option<AnnChoice> {
        None
    }
}

/// The per-AS decision engine. One object per AS per trial; all mutable
/// routing state lives behind it.
pub trait Policy: Send {
    fn asn(&self) -> ASN;
    fn class(&self) -> PolicyClass;
    fn settings(&self) -> SettingsSet;

    /// Installs an origin announcement. Seeding an occupied prefix is an
    /// invariant failure.
    fn seed_ann(&mut self, ann: Announcement, ctx: &PolicyCtx<'_>) -> Result<(), EngineError>;

    /// Enqueues an inbound announcement for the next processing step.
    fn receive_ann(&mut self, ann: Announcement) -> Result<(), EngineError>;

    /// Processes everything queued, knowing it arrived over `from_rel`.
    fn process_incoming_anns(
        &mut self,
        from_rel: Relationships,
        propagation_round: u32,
        ctx: &PolicyCtx<'_>,
    ) -> Result<(), EngineError>;

    /// Exports local RIB routes toward `propagate_to` neighbors and flushes
    /// anything pending for them. Returns (neighbor, announcement)
    /// deliveries for the scheduler to place into receive queues.
    fn propagate(
        &mut self,
        propagate_to: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Vec<(ASN, Announcement)>, EngineError>;

    /// Retracts a seeded route: removes it from the local RIB and schedules
    /// withdrawals toward every neighbor it was sent to. Only the stateful
    /// variant supports this.
    fn withdraw_seeded_ann(&mut self, prefix: &Prefix) -> Result<(), EngineError> {
        let _ = prefix;
        Err(EngineError::WithdrawalsUnsupported { asn: self.asn() })
    }

    fn local_rib(&self) -> &LocalRIB;
    fn local_rib_mut(&mut self) -> &mut LocalRIB;

    /// Diagnostics for the stateful variant; `None` for the stateless base.
    fn ribs_in(&self) -> Option<&RIBsIn> {
        None
    }
    fn ribs_out(&self) -> Option<&RIBsOut> {
        None
    }
}

/// Instantiates the policy object for one AS from its assigned class and
/// adopted settings.
pub fn build_policy(asn: ASN, class: PolicyClass, settings: SettingsSet) -> Box<dyn Policy> {
    match class {
        PolicyClass::Bgp => Box::new(Bgp::new(asn, settings)),
        PolicyClass::BgpFull => Box::new(BgpFull::new(asn, settings)),
    }
}

/// All policy objects for a trial, keyed by ASN.
#[derive(Default)]
pub struct PolicyStore {
    policies: HashMap<ASN, Box<dyn Policy>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asn: ASN, policy: Box<dyn Policy>) {
        self.policies.insert(asn, policy);
    }

    pub fn get(&self, asn: &ASN) -> Option<&dyn Policy> {
        self.policies.get(asn).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut Box<dyn Policy>> {
        self.policies.get_mut(asn)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ASN, &Box<dyn Policy>)> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn clear(&mut self) {
        self.policies.clear();
    }
}
