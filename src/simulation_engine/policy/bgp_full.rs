use std::collections::HashMap;

use tracing::trace;

use crate::as_graph::ASN;
use crate::shared::{EngineError, PolicyClass, Relationships, Settings, SettingsSet};
use crate::simulation_engine::ann_containers::{
    LocalRIB, RIBsIn, RIBsOut, SendQueue, WithdrawalTrie,
};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement, Prefix};
use crate::simulation_engine::policy::bgp::{send_rels, Bgp};
use crate::simulation_engine::policy::{Policy, PolicyCtx};

/// The stateful decision engine: the base rules plus RIBsIn/RIBsOut and a
/// send queue. That memory is what makes withdrawals work: it knows what
/// each neighbor sent it and what it sent each neighbor.
pub struct BgpFull {
    pub base: Bgp,
    pub ribs_in: RIBsIn,
    pub ribs_out: RIBsOut,
    pub send_q: SendQueue,
    /// The togglable validation discipline. On by default: duplicate or
    /// bogus withdrawals abort the trial. Turned off to model attackers
    /// that forge or suppress withdrawals intentionally.
    pub error_on_invalid_routes: bool,
    /// Trusted-withdrawal record, present only when the AS adopts route
    /// suppression. Withdrawals seen here are replayed against RIBsIn
    /// routes whose retraction was lost upstream.
    trusted_withdrawals: Option<WithdrawalTrie>,
}

impl BgpFull {
    pub fn new(asn: ASN, settings: SettingsSet) -> Self {
        let trusted_withdrawals = settings
            .contains(Settings::RouteSuppression)
            .then(WithdrawalTrie::new);
        BgpFull {
            base: Bgp::new(asn, settings),
            ribs_in: RIBsIn::new(),
            ribs_out: RIBsOut::new(),
            send_q: SendQueue::new(),
            error_on_invalid_routes: true,
            trusted_withdrawals,
        }
    }

    fn asn(&self) -> ASN {
        self.base.asn
    }

    /// Per-round receive-queue invariants: at most one withdrawal and one
    /// announcement per neighbor for each prefix.
    fn check_recv_invariants(
        &self,
        prefix: &Prefix,
        ann_list: &[Announcement],
    ) -> Result<(), EngineError> {
        if !self.error_on_invalid_routes {
            return Ok(());
        }
        let mut withdrawals_by_neighbor: HashMap<ASN, u32> = HashMap::new();
        let mut anns_by_neighbor: HashMap<ASN, u32> = HashMap::new();
        for ann in ann_list {
            let neighbor = ann.as_path[0];
            let counter = if ann.withdraw {
                withdrawals_by_neighbor.entry(neighbor).or_insert(0)
            } else {
                anns_by_neighbor.entry(neighbor).or_insert(0)
            };
            *counter += 1;
            if *counter > 1 {
                return Err(if ann.withdraw {
                    EngineError::DuplicateWithdrawal {
                        asn: self.asn(),
                        prefix: *prefix,
                        neighbor,
                    }
                } else {
                    EngineError::DuplicateAnnouncement {
                        asn: self.asn(),
                        prefix: *prefix,
                        neighbor,
                    }
                });
            }
        }
        Ok(())
    }

    /// Validity check plus processing plus ranking for one incoming
    /// announcement; an invalid announcement leaves the current best alone.
    fn get_new_best_ann(
        &self,
        current: Option<Announcement>,
        new_ann: &Announcement,
        from_rel: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Option<Announcement>, EngineError> {
        if self.base.valid_ann(new_ann, from_rel, ctx)? {
            let processed = self.base.copy_and_process(new_ann, from_rel, ctx)?;
            Ok(Some(self.base.best_ann(current, processed)?))
        } else {
            Ok(current)
        }
    }

    /// Handles one incoming withdrawal against the local RIB. If the
    /// withdrawn path is the installed route, it is removed and the best
    /// surviving RIBsIn candidate (if any) takes its place.
    fn withdraw_from_local_rib(
        &mut self,
        new_ann: &Announcement,
        current: Option<Announcement>,
        ctx: &PolicyCtx<'_>,
    ) -> Result<Option<Announcement>, EngineError> {
        let matches_installed = current
            .as_ref()
            .map(|installed| {
                installed.recv_relationship != Relationships::Origin
                    && installed.as_path.len() > 1
                    && new_ann.as_path == installed.as_path[1..]
            })
            .unwrap_or(false);
        if !matches_installed {
            return Ok(current);
        }

        self.base.local_rib.pop(&new_ann.prefix);
        let mut best: Option<Announcement> = None;
        // RIBsIn holds unprocessed routes; rank them the same way fresh
        // arrivals are ranked.
        let survivors: Vec<_> = self
            .ribs_in
            .ann_infos(&new_ann.prefix)
            .map(|info| (info.unprocessed_ann.clone(), info.recv_relationship))
            .collect();
        for (unprocessed, recv_relationship) in survivors {
            best = self.get_new_best_ann(best, &unprocessed, recv_relationship, ctx)?;
        }
        Ok(best)
    }

    /// Schedules a withdrawal toward every neighbor the route was actually
    /// sent to, clearing RIBsOut as it goes. Pending un-flushed sends of the
    /// same route are cancelled inside the send queue.
    pub fn withdraw_ann_from_neighbors(
        &mut self,
        withdraw_ann: Announcement,
    ) -> Result<(), EngineError> {
        debug_assert!(withdraw_ann.withdraw);
        if let Some(trie) = self.trusted_withdrawals.as_mut() {
            trie.add_ann(&withdraw_ann);
        }
        for neighbor in self.ribs_out.neighbors() {
            if self.ribs_out.remove_entry(neighbor, &withdraw_ann.prefix) {
                self.send_q
                    .add_ann(self.base.asn, neighbor, withdraw_ann.clone())?;
            }
        }
        Ok(())
    }

    /// Route-suppression replay: remember every withdrawal seen, and for any
    /// RIBsIn route whose withdrawal was recorded but is not in this round's
    /// queue, synthesize the missing withdrawal.
    fn replay_suppressed_withdrawals(&mut self) {
        let Some(trie) = self.trusted_withdrawals.as_mut() else {
            return;
        };
        for (_prefix, anns) in self.base.recv_q.iter() {
            for ann in anns {
                trie.add_ann(ann);
            }
        }

        let mut synthesized = Vec::new();
        for (_neighbor, prefix_map) in self.ribs_in.iter() {
            for (prefix, ann_info) in prefix_map {
                let ribs_in_ann = &ann_info.unprocessed_ann;
                let withdrawal_queued = self
                    .base
                    .recv_q
                    .get(prefix)
                    .map(|anns| {
                        anns.iter()
                            .any(|a| a.withdraw && a.as_path == ribs_in_ann.as_path)
                    })
                    .unwrap_or(false);
                if !withdrawal_queued && trie.seen_withdrawal(ribs_in_ann) {
                    trace!(
                        asn = self.base.asn,
                        prefix = %prefix,
                        "replaying suppressed withdrawal"
                    );
                    synthesized.push(ribs_in_ann.copy_with(AnnOverrides {
                        withdraw: Some(true),
                        ..Default::default()
                    }));
                }
            }
        }
        for withdrawal in synthesized {
            self.base.recv_q.add_ann(withdrawal);
        }
    }

    fn prev_sent(&self, neighbor: ASN, ann: &Announcement) -> bool {
        self.ribs_out
            .get_ann(neighbor, &ann.prefix)
            .map(|sent| sent.prefix_path_eq(ann))
            .unwrap_or(false)
    }
}

impl Policy for BgpFull {
    fn asn(&self) -> ASN {
        self.base.asn
    }

    fn class(&self) -> PolicyClass {
        PolicyClass::BgpFull
    }

    fn settings(&self) -> SettingsSet {
        self.base.settings
    }

    fn seed_ann(&mut self, ann: Announcement, ctx: &PolicyCtx<'_>) -> Result<(), EngineError> {
        self.base.seed_ann_impl(ann, ctx)
    }

    fn receive_ann(&mut self, ann: Announcement) -> Result<(), EngineError> {
        self.base.recv_q.add_ann(ann);
        Ok(())
    }

    fn process_incoming_anns(
        &mut self,
        from_rel: Relationships,
        _propagation_round: u32,
        ctx: &PolicyCtx<'_>,
    ) -> Result<(), EngineError> {
        self.replay_suppressed_withdrawals();

        let queued = self.base.recv_q.take();
        for (prefix, ann_list) in queued {
            self.check_recv_invariants(&prefix, &ann_list)?;

            let og_ann = self.base.local_rib.get(&prefix).cloned();
            let mut current = og_ann.clone();

            for new_ann in ann_list {
                if new_ann.withdraw {
                    self.ribs_in.remove_entry(
                        self.base.asn,
                        new_ann.as_path[0],
                        &prefix,
                        self.error_on_invalid_routes,
                    )?;
                    current = self.withdraw_from_local_rib(&new_ann, current, ctx)?;
                } else {
                    self.ribs_in.add_unprocessed_ann(
                        self.base.asn,
                        new_ann.clone(),
                        from_rel,
                        self.error_on_invalid_routes,
                    )?;
                    current = self.get_new_best_ann(current, &new_ann, from_rel, ctx)?;
                }
            }

            if og_ann != current {
                if let Some(best) = current {
                    self.base.local_rib.add_ann(best);
                }
                // Whoever heard about the old route must now hear that it
                // is gone; the replacement (if any) follows next propagation.
                if let Some(old) = og_ann {
                    let withdraw_ann = old.copy_with(AnnOverrides {
                        next_hop_asn: Some(self.base.asn),
                        withdraw: Some(true),
                        ..Default::default()
                    });
                    self.withdraw_ann_from_neighbors(withdraw_ann)?;
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
        let as_obj = ctx.as_obj(self.base.asn)?;
        let neighbors: Vec<ASN> = as_obj.neighbors(propagate_to).to_vec();
        let allowed = send_rels(propagate_to);

        for (_prefix, unprocessed) in self.base.local_rib.prefix_anns() {
            if !allowed.contains(&unprocessed.recv_relationship) {
                continue;
            }
            let out = unprocessed.copy_with(AnnOverrides {
                next_hop_asn: Some(self.base.asn),
                ..Default::default()
            });
            for &neighbor_asn in &neighbors {
                if self.prev_sent(neighbor_asn, &out) {
                    continue;
                }
                if let Some(send_ann) =
                    self.base
                        .run_export_hooks(&out, neighbor_asn, propagate_to, ctx)?
                {
                    self.send_q.add_ann(self.base.asn, neighbor_asn, send_ann)?;
                }
            }
        }

        // End-of-phase flush for this phase's neighbors, including any
        // withdrawals scheduled while processing.
        let mut deliveries = Vec::new();
        for &neighbor_asn in &neighbors {
            for ann in self.send_q.drain_neighbor(neighbor_asn) {
                if !ann.withdraw {
                    self.ribs_out.add_ann(neighbor_asn, ann.clone());
                }
                deliveries.push((neighbor_asn, ann));
            }
        }
        Ok(deliveries)
    }

    fn withdraw_seeded_ann(&mut self, prefix: &Prefix) -> Result<(), EngineError> {
        let Some(seeded) = self.base.local_rib.pop(prefix) else {
            return Err(EngineError::NoRouteToWithdraw {
                asn: self.base.asn,
                prefix: *prefix,
            });
        };
        let withdraw_ann = seeded.copy_with(AnnOverrides {
            next_hop_asn: Some(self.base.asn),
            withdraw: Some(true),
            ..Default::default()
        });
        self.withdraw_ann_from_neighbors(withdraw_ann)
    }

    fn local_rib(&self) -> &LocalRIB {
        &self.base.local_rib
    }

    fn local_rib_mut(&mut self) -> &mut LocalRIB {
        &mut self.base.local_rib
    }

    fn ribs_in(&self) -> Option<&RIBsIn> {
        Some(&self.ribs_in)
    }

    fn ribs_out(&self) -> Option<&RIBsOut> {
        Some(&self.ribs_out)
    }
}
