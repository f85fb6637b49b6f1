use tracing::trace;

use crate::as_graph::ASN;
use crate::shared::{EngineError, PolicyClass, Relationships, SettingsSet};
use crate::simulation_engine::ann_containers::{LocalRIB, RecvQueue};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement};
use crate::simulation_engine::policy::{
    create_extensions, AnnChoice, ExportAction, Policy, PolicyCtx, PolicyExtension,
};

/// Relationships whose routes may be exported toward `propagate_to` under
/// the valley-free rule: routes learned from customers (or originated here)
/// go anywhere; peer- and provider-learned routes go only to customers.
pub(crate) fn send_rels(propagate_to: Relationships) -> &'static [Relationships] {
    match propagate_to {
        Relationships::Providers | Relationships::Peers => {
            &[Relationships::Origin, Relationships::Customers]
        }
        Relationships::Customers => &[
            Relationships::Origin,
            Relationships::Customers,
            Relationships::Peers,
            Relationships::Providers,
        ],
        Relationships::Origin => &[],
    }
}

/// The stateless base decision engine: a local RIB, a receive queue, and the
/// composed validity/ranking/propagation rules. It keeps no memory of what
/// it sent or received, so it cannot handle withdrawals.
pub struct Bgp {
    pub asn: ASN,
    pub settings: SettingsSet,
    pub local_rib: LocalRIB,
    pub recv_q: RecvQueue,
    pub(crate) extensions: Vec<Box<dyn PolicyExtension>>,
}

impl Bgp {
    pub fn new(asn: ASN, settings: SettingsSet) -> Self {
        Bgp {
            asn,
            settings,
            local_rib: LocalRIB::new(),
            recv_q: RecvQueue::new(),
            extensions: create_extensions(settings),
        }
    }

    /// The composed validity predicate: loop prevention, then every attached
    /// extension, short-circuiting on the first rejection.
    pub(crate) fn valid_ann(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<bool, EngineError> {
        if ann.as_path.contains(&self.asn) {
            return Ok(false);
        }
        let as_obj = ctx.as_obj(self.asn)?;
        for extension in &self.extensions {
            if !extension.validate(ann, from_rel, as_obj, ctx) {
                trace!(
                    asn = self.asn,
                    prefix = %ann.prefix,
                    setting = %extension.setting(),
                    "announcement rejected"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Copies an accepted announcement into its processed form: local ASN
    /// prepended, receive relationship set, seed ASN stripped. Extension
    /// copy hooks run last (e.g. signature maintenance).
    pub(crate) fn copy_and_process(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Announcement, EngineError> {
        let mut as_path = Vec::with_capacity(ann.as_path.len() + 1);
        as_path.push(self.asn);
        as_path.extend_from_slice(&ann.as_path);
        let mut processed = ann.copy_with(AnnOverrides {
            as_path: Some(as_path),
            recv_relationship: Some(from_rel),
            ..Default::default()
        });
        let as_obj = ctx.as_obj(self.asn)?;
        for extension in &self.extensions {
            extension.on_copy_and_process(ann, &mut processed, from_rel, as_obj, ctx);
        }
        Ok(processed)
    }

    /// Gao-Rexford best-path selection: local preference by receive
    /// relationship, then shortest AS path, then any extension preference,
    /// then lowest neighbor ASN. The order is total over distinct routes;
    /// two different routes from the same neighbor tying every criterion is
    /// an invariant failure, never a silent pick.
    pub(crate) fn best_ann(
        &self,
        current: Option<Announcement>,
        new: Announcement,
    ) -> Result<Announcement, EngineError> {
        let Some(current) = current else {
            return Ok(new);
        };

        let current_pref = current.recv_relationship.local_pref();
        let new_pref = new.recv_relationship.local_pref();
        if current_pref != new_pref {
            return Ok(if current_pref > new_pref { current } else { new });
        }

        if current.as_path.len() != new.as_path.len() {
            return Ok(if current.as_path.len() < new.as_path.len() {
                current
            } else {
                new
            });
        }

        for extension in &self.extensions {
            match extension.prefer(&current, &new, self.asn) {
                Some(AnnChoice::Current) => return Ok(current),
                Some(AnnChoice::New) => return Ok(new),
                None => {}
            }
        }

        let current_neighbor = current.neighbor_asn();
        let new_neighbor = new.neighbor_asn();
        if current_neighbor < new_neighbor {
            Ok(current)
        } else if current_neighbor > new_neighbor {
            Ok(new)
        } else if current.prefix_path_eq(&new) {
            Ok(current)
        } else {
            Err(EngineError::GaoRexfordTie {
                asn: self.asn,
                prefix: new.prefix,
                neighbor: new_neighbor,
            })
        }
    }

    /// Runs the export hooks for one (announcement, neighbor) pair. Returns
    /// the announcement to send, or `None` when an extension rejected it.
    pub(crate) fn run_export_hooks(
        &self,
        ann: &Announcement,
        neighbor_asn: ASN,
        propagate_to: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Option<Announcement>, EngineError> {
        let neighbor = ctx.as_obj(neighbor_asn)?;
        for extension in &self.extensions {
            match extension.on_export(ann, neighbor, propagate_to, ctx) {
                ExportAction::Default => {}
                ExportAction::Handled(rewritten) => return Ok(Some(rewritten)),
                ExportAction::Rejected => return Ok(None),
            }
        }
        Ok(Some(ann.clone()))
    }

    pub(crate) fn seed_ann_impl(&mut self, mut ann: Announcement, ctx: &PolicyCtx<'_>) -> Result<(), EngineError> {
        if self.local_rib.get(&ann.prefix).is_some() {
            return Err(EngineError::SeedingConflict {
                asn: self.asn,
                prefix: ann.prefix,
            });
        }
        let as_obj = ctx.as_obj(self.asn)?;
        for extension in &self.extensions {
            extension.on_seed(&mut ann, as_obj);
        }
        self.local_rib.add_ann(ann);
        Ok(())
    }
}

impl Policy for Bgp {
    fn asn(&self) -> ASN {
        self.asn
    }

    fn class(&self) -> PolicyClass {
        PolicyClass::Bgp
    }

    fn settings(&self) -> SettingsSet {
        self.settings
    }

    fn seed_ann(&mut self, ann: Announcement, ctx: &PolicyCtx<'_>) -> Result<(), EngineError> {
        self.seed_ann_impl(ann, ctx)
    }

    fn receive_ann(&mut self, ann: Announcement) -> Result<(), EngineError> {
        if ann.withdraw {
            return Err(EngineError::WithdrawalsUnsupported { asn: self.asn });
        }
        self.recv_q.add_ann(ann);
        Ok(())
    }

    fn process_incoming_anns(
        &mut self,
        from_rel: Relationships,
        _propagation_round: u32,
        ctx: &PolicyCtx<'_>,
    ) -> Result<(), EngineError> {
        let queued = self.recv_q.take();
        for (prefix, ann_list) in queued {
            let og_ann = self.local_rib.get(&prefix).cloned();
            // A seeded origin route is never displaced
            if og_ann
                .as_ref()
                .map(|ann| ann.seed_asn.is_some())
                .unwrap_or(false)
            {
                continue;
            }

            let mut current = og_ann.clone();
            for new_ann in ann_list {
                if self.valid_ann(&new_ann, from_rel, ctx)? {
                    let processed = self.copy_and_process(&new_ann, from_rel, ctx)?;
                    current = Some(self.best_ann(current, processed)?);
                }
            }

            if og_ann != current {
                if let Some(best) = current {
                    self.local_rib.add_ann(best);
                }
            }
        }
        Ok(())
    }

    fn propagate(
        &mut self,
        propagate_to: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Vec<(ASN, Announcement)>, EngineError> {
        let as_obj = ctx.as_obj(self.asn)?;
        let neighbors = as_obj.neighbors(propagate_to);
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }
        let allowed = send_rels(propagate_to);

        let mut deliveries = Vec::new();
        for (_prefix, unprocessed) in self.local_rib.prefix_anns() {
            if !allowed.contains(&unprocessed.recv_relationship) {
                continue;
            }
            let out = unprocessed.copy_with(AnnOverrides {
                next_hop_asn: Some(self.asn),
                ..Default::default()
            });
            for &neighbor_asn in neighbors {
                if let Some(send_ann) = self.run_export_hooks(&out, neighbor_asn, propagate_to, ctx)? {
                    deliveries.push((neighbor_asn, send_ann));
                }
            }
        }
        Ok(deliveries)
    }

    fn local_rib(&self) -> &LocalRIB {
        &self.local_rib
    }

    fn local_rib_mut(&mut self) -> &mut LocalRIB {
        &mut self.local_rib
    }
}
