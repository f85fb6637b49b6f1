use std::collections::HashMap;

use crate::as_graph::ASN;
use crate::shared::{EngineError, Relationships};
use crate::simulation_engine::announcement::{Announcement, Prefix};

/// A received-but-unprocessed route plus the relationship it arrived over.
/// The relationship cannot be read off the stored announcement because that
/// one still carries the sender's receive relationship.
#[derive(Debug, Clone)]
pub struct AnnInfo {
    pub unprocessed_ann: Announcement,
    pub recv_relationship: Relationships,
}

/// Every neighbor's latest route per prefix, as received. Needed to retract
/// the right entry on withdrawal and to recompute the best survivor.
#[derive(Debug, Clone, Default)]
pub struct RIBsIn {
    info: HashMap<ASN, HashMap<Prefix, AnnInfo>>,
}

impl RIBsIn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, neighbor: ASN, prefix: &Prefix) -> Option<&AnnInfo> {
        self.info.get(&neighbor).and_then(|m| m.get(prefix))
    }

    /// Inserts an unprocessed announcement keyed by its sending neighbor
    /// (the first path entry). Overwriting an un-withdrawn entry is an
    /// implicit withdrawal: an invariant failure when `strict` is on.
    pub fn add_unprocessed_ann(
        &mut self,
        owner: ASN,
        ann: Announcement,
        recv_relationship: Relationships,
        strict: bool,
    ) -> Result<(), EngineError> {
        let neighbor = ann.as_path[0];
        let entry = self.info.entry(neighbor).or_default();
        if strict && entry.contains_key(&ann.prefix) {
            return Err(EngineError::ImplicitWithdrawal {
                asn: owner,
                prefix: ann.prefix,
                neighbor,
            });
        }
        entry.insert(
            ann.prefix,
            AnnInfo {
                unprocessed_ann: ann,
                recv_relationship,
            },
        );
        Ok(())
    }

    /// Removes the entry a withdrawal names. Withdrawing a route that was
    /// never received is an invariant failure when `strict` is on; attackers
    /// that forge withdrawals are modeled with `strict` off.
    pub fn remove_entry(
        &mut self,
        owner: ASN,
        neighbor: ASN,
        prefix: &Prefix,
        strict: bool,
    ) -> Result<(), EngineError> {
        let removed = self
            .info
            .get_mut(&neighbor)
            .and_then(|m| m.remove(prefix))
            .is_some();
        if !removed && strict {
            return Err(EngineError::WithdrawalNotInRibsIn {
                asn: owner,
                prefix: *prefix,
                neighbor,
            });
        }
        Ok(())
    }

    /// All surviving entries for a prefix, across neighbors.
    pub fn ann_infos<'a>(&'a self, prefix: &'a Prefix) -> impl Iterator<Item = &'a AnnInfo> + 'a {
        self.info.values().filter_map(move |m| m.get(prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ASN, &HashMap<Prefix, AnnInfo>)> {
        self.info.iter()
    }

    pub fn clear(&mut self) {
        self.info.clear();
    }
}
