use std::collections::HashMap;

use crate::as_graph::ASN;
use crate::simulation_engine::announcement::{Announcement, Prefix};

#[derive(Debug, Clone, Default)]
struct PathNode {
    children: HashMap<ASN, PathNode>,
    withdrawn: bool,
}

/// Records every withdrawal an AS has seen, keyed by prefix and then by the
/// withdrawn AS path. Queried when deciding whether a route still sitting in
/// RIBsIn should be re-suppressed because its withdrawal was lost upstream.
#[derive(Debug, Clone, Default)]
pub struct WithdrawalTrie {
    roots: HashMap<Prefix, PathNode>,
}

impl WithdrawalTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a withdrawal. Non-withdrawals are ignored so callers can feed
    /// whole queues through without filtering.
    pub fn add_ann(&mut self, ann: &Announcement) {
        if !ann.withdraw {
            return;
        }
        let mut node = self.roots.entry(ann.prefix).or_default();
        for &asn in &ann.as_path {
            node = node.children.entry(asn).or_default();
        }
        node.withdrawn = true;
    }

    /// Whether a withdrawal has been recorded for exactly this route. The
    /// suffix of the queried path is matched so an AS can ask about routes it
    /// has already prepended itself to.
    pub fn seen_withdrawal(&self, ann: &Announcement) -> bool {
        let Some(root) = self.roots.get(&ann.prefix) else {
            return false;
        };
        let mut node = root;
        for &asn in &ann.as_path {
            match node.children.get(&asn) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.withdrawn
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}
