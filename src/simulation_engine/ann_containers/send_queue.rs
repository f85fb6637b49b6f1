use std::collections::HashMap;

use crate::as_graph::ASN;
use crate::shared::EngineError;
use crate::simulation_engine::announcement::{Announcement, Prefix};

/// At most one pending announcement and one pending withdrawal per
/// (neighbor, prefix), flushed at the end of a propagation phase.
#[derive(Debug, Clone, Default)]
pub struct SendInfo {
    pub withdrawal_ann: Option<Announcement>,
    pub ann: Option<Announcement>,
}

impl SendInfo {
    /// Withdrawal first so the receiver retracts before it re-learns.
    pub fn into_anns(self) -> Vec<Announcement> {
        let mut anns = Vec::new();
        if let Some(withdrawal) = self.withdrawal_ann {
            anns.push(withdrawal);
        }
        if let Some(ann) = self.ann {
            anns.push(ann);
        }
        anns
    }
}

/// Pending outbound traffic per neighbor. A withdrawal that path-matches a
/// not-yet-flushed announcement cancels both: the neighbor never saw the
/// route, so it must not see the retraction either.
#[derive(Debug, Clone, Default)]
pub struct SendQueue {
    info: HashMap<ASN, HashMap<Prefix, SendInfo>>,
}

impl SendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ann(
        &mut self,
        owner: ASN,
        neighbor: ASN,
        ann: Announcement,
    ) -> Result<(), EngineError> {
        let existing = self.info.get(&neighbor).and_then(|m| m.get(&ann.prefix));

        if ann.withdraw {
            if existing.map(|si| si.withdrawal_ann.is_some()).unwrap_or(false) {
                return Err(EngineError::PendingWithdrawalReplaced {
                    asn: owner,
                    prefix: ann.prefix,
                    neighbor,
                });
            }
            let cancels_pending = existing
                .and_then(|si| si.ann.as_ref())
                .map(|pending| pending.prefix_path_eq(&ann))
                .unwrap_or(false);
            if cancels_pending {
                if let Some(prefix_map) = self.info.get_mut(&neighbor) {
                    prefix_map.remove(&ann.prefix);
                }
            } else {
                let prefix = ann.prefix;
                self.info
                    .entry(neighbor)
                    .or_default()
                    .entry(prefix)
                    .or_default()
                    .withdrawal_ann = Some(ann);
            }
        } else {
            if existing.map(|si| si.ann.is_some()).unwrap_or(false) {
                return Err(EngineError::PendingAnnouncementReplaced {
                    asn: owner,
                    prefix: ann.prefix,
                    neighbor,
                });
            }
            if existing
                .and_then(|si| si.withdrawal_ann.as_ref())
                .map(|w| w.prefix_path_eq(&ann))
                .unwrap_or(false)
            {
                return Err(EngineError::PendingWithdrawalReplaced {
                    asn: owner,
                    prefix: ann.prefix,
                    neighbor,
                });
            }
            let prefix = ann.prefix;
            self.info
                .entry(neighbor)
                .or_default()
                .entry(prefix)
                .or_default()
                .ann = Some(ann);
        }
        Ok(())
    }

    pub fn get(&self, neighbor: ASN, prefix: &Prefix) -> Option<&SendInfo> {
        self.info.get(&neighbor).and_then(|m| m.get(prefix))
    }

    /// Drains everything pending for one neighbor, in deterministic prefix
    /// order, withdrawals before replacement announcements.
    pub fn drain_neighbor(&mut self, neighbor: ASN) -> Vec<Announcement> {
        let Some(prefix_map) = self.info.remove(&neighbor) else {
            return Vec::new();
        };
        let mut entries: Vec<(Prefix, SendInfo)> = prefix_map.into_iter().collect();
        entries.sort_by_key(|(prefix, _)| prefix.to_string());
        entries
            .into_iter()
            .flat_map(|(_, send_info)| send_info.into_anns())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.info.values().all(|m| m.is_empty())
    }

    pub fn clear(&mut self) {
        self.info.clear();
    }
}
