use std::num::NonZeroUsize;
use std::sync::Mutex;

use ipnetwork::IpNetwork;
use lru::LruCache;

use crate::as_graph::ASN;
use crate::shared::ROAValidity;

const ROA_CACHE_SIZE: usize = 10_000;

/// A Route Origin Authorization: binds a prefix to the ASN allowed to
/// originate it, up to `max_length` bits of subprefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ROA {
    pub prefix: IpNetwork,
    pub origin: ASN,
    pub max_length: u8,
}

impl ROA {
    pub fn new(prefix: IpNetwork, origin: ASN, max_length: Option<u8>) -> Self {
        let max_length = max_length.unwrap_or_else(|| prefix.prefix());
        ROA {
            prefix,
            origin,
            max_length,
        }
    }

    /// Whether this ROA has anything to say about `prefix` (same family,
    /// equal-or-longer announced prefix inside the ROA's network).
    pub fn covers_prefix(&self, prefix: &IpNetwork) -> bool {
        match (self.prefix, prefix) {
            (IpNetwork::V4(roa_net), IpNetwork::V4(net)) => {
                roa_net.contains(net.ip()) && net.prefix() >= roa_net.prefix()
            }
            (IpNetwork::V6(roa_net), IpNetwork::V6(net)) => {
                roa_net.contains(net.ip()) && net.prefix() >= roa_net.prefix()
            }
            _ => false,
        }
    }

    pub fn validity(&self, prefix: &IpNetwork, origin: ASN) -> ROAValidity {
        if !self.covers_prefix(prefix) {
            return ROAValidity::Unknown;
        }
        let valid_length = prefix.prefix() <= self.max_length;
        let valid_origin = self.origin == origin;
        match (valid_length, valid_origin) {
            (true, true) => ROAValidity::Valid,
            (false, true) => ROAValidity::InvalidLength,
            (true, false) => ROAValidity::InvalidOrigin,
            (false, false) => ROAValidity::InvalidLengthAndOrigin,
        }
    }
}

#[derive(Debug, Default)]
struct ROANode {
    roas: Vec<ROA>,
    left: Option<Box<ROANode>>,
    right: Option<Box<ROANode>>,
}

/// The trial-owned ROA lookup table: a binary trie over prefix bits with an
/// LRU cache over (prefix, origin) outcomes. One table per trial, passed by
/// reference into policy calls; `clear` resets it between trials.
pub struct RouteValidator {
    root: ROANode,
    cache: Mutex<LruCache<(IpNetwork, ASN), ROAValidity>>,
}

impl RouteValidator {
    pub fn new() -> Self {
        RouteValidator {
            root: ROANode::default(),
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(ROA_CACHE_SIZE).unwrap())),
        }
    }

    pub fn add_roa(&mut self, roa: ROA) {
        let bits = Self::prefix_bits(&roa.prefix);
        let mut node = &mut self.root;
        for bit in bits {
            let child = if bit { &mut node.right } else { &mut node.left };
            node = &mut **child.get_or_insert_with(Box::default);
        }
        node.roas.push(roa);
        self.cache.lock().unwrap().clear();
    }

    pub fn clear(&mut self) {
        self.root = ROANode::default();
        self.cache.lock().unwrap().clear();
    }

    /// Validity of (prefix, origin) against every covering ROA. With several
    /// covering ROAs the best outcome wins, as in RFC 6811: one valid ROA is
    /// enough no matter how many others mismatch.
    pub fn roa_validity(&self, prefix: &IpNetwork, origin: ASN) -> ROAValidity {
        if let Some(validity) = self.cache.lock().unwrap().get(&(*prefix, origin)) {
            return *validity;
        }

        let mut best: Option<ROAValidity> = None;
        let mut node = Some(&self.root);
        let bits = Self::prefix_bits(prefix);
        let mut depth = 0usize;
        while let Some(current) = node {
            for roa in &current.roas {
                let validity = roa.validity(prefix, origin);
                if validity != ROAValidity::Unknown
                    && best.map(|b| (validity as u8) < (b as u8)).unwrap_or(true)
                {
                    best = Some(validity);
                }
            }
            node = if depth < bits.len() {
                let bit = bits[depth];
                depth += 1;
                if bit {
                    current.right.as_deref()
                } else {
                    current.left.as_deref()
                }
            } else {
                None
            };
        }

        let result = best.unwrap_or(ROAValidity::Unknown);
        self.cache.lock().unwrap().put((*prefix, origin), result);
        result
    }

    /// Whether any ROA covers this prefix at all.
    pub fn covered_by_roa(&self, prefix: &IpNetwork) -> bool {
        let mut node = Some(&self.root);
        let bits = Self::prefix_bits(prefix);
        let mut depth = 0usize;
        while let Some(current) = node {
            if current.roas.iter().any(|roa| roa.covers_prefix(prefix)) {
                return true;
            }
            node = if depth < bits.len() {
                let bit = bits[depth];
                depth += 1;
                if bit {
                    current.right.as_deref()
                } else {
                    current.left.as_deref()
                }
            } else {
                None
            };
        }
        false
    }

    fn prefix_bits(prefix: &IpNetwork) -> Vec<bool> {
        match prefix {
            IpNetwork::V4(net) => {
                let addr = u32::from(net.ip());
                (0..net.prefix() as usize)
                    .map(|i| addr & (1 << (31 - i)) != 0)
                    .collect()
            }
            IpNetwork::V6(net) => {
                let addr = u128::from(net.ip());
                (0..net.prefix() as usize)
                    .map(|i| addr & (1 << (127 - i)) != 0)
                    .collect()
            }
        }
    }
}

impl Default for RouteValidator {
    fn default() -> Self {
        Self::new()
    }
}
