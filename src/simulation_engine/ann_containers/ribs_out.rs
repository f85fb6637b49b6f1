use std::collections::HashMap;

use crate::as_graph::ASN;
use crate::simulation_engine::announcement::{Announcement, Prefix};

/// The last route actually sent to each neighbor, per prefix. Consulted to
/// suppress identical re-sends and to find who must hear a withdrawal.
#[derive(Debug, Clone, Default)]
pub struct RIBsOut {
    info: HashMap<ASN, HashMap<Prefix, Announcement>>,
}

impl RIBsOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_ann(&self, neighbor: ASN, prefix: &Prefix) -> Option<&Announcement> {
        self.info.get(&neighbor).and_then(|m| m.get(prefix))
    }

    pub fn add_ann(&mut self, neighbor: ASN, ann: Announcement) {
        self.info.entry(neighbor).or_default().insert(ann.prefix, ann);
    }

    /// Returns whether an entry was actually removed, so a withdrawal is
    /// only scheduled toward neighbors that were really sent the route.
    pub fn remove_entry(&mut self, neighbor: ASN, prefix: &Prefix) -> bool {
        self.info
            .get_mut(&neighbor)
            .and_then(|m| m.remove(prefix))
            .is_some()
    }

    pub fn neighbors(&self) -> Vec<ASN> {
        let mut asns: Vec<ASN> = self.info.keys().copied().collect();
        asns.sort_unstable();
        asns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ASN, &HashMap<Prefix, Announcement>)> {
        self.info.iter()
    }

    pub fn clear(&mut self) {
        self.info.clear();
    }
}
