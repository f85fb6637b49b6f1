use std::collections::{HashMap, HashSet};

use crate::shared::{EngineError, Relationships};

pub type ASN = u32;

/// One autonomous system in the topology. Adjacency is stored as ASN lists;
/// the graph is read-only for the lifetime of a trial and may be shared
/// across trials.
#[derive(Debug, Clone)]
pub struct AS {
    pub asn: ASN,
    pub peers: Vec<ASN>,
    pub providers: Vec<ASN>,
    pub customers: Vec<ASN>,
    /// Member of the provider-free core clique (tier-1).
    pub input_clique: bool,
    pub ixp: bool,
    /// Precomputed cone sets, filled by `ASGraph::add_customer_cone_asns` /
    /// `add_provider_cone_asns`. Only cone-dependent extensions need them.
    pub customer_cone_asns: Option<HashSet<ASN>>,
    pub provider_cone_asns: Option<HashSet<ASN>>,
    pub propagation_rank: Option<u32>,
}

impl AS {
    pub fn new(asn: ASN) -> Self {
        AS {
            asn,
            peers: Vec::new(),
            providers: Vec::new(),
            customers: Vec::new(),
            input_clique: false,
            ixp: false,
            customer_cone_asns: None,
            provider_cone_asns: None,
            propagation_rank: None,
        }
    }

    pub fn neighbors(&self, rel: Relationships) -> &[ASN] {
        match rel {
            Relationships::Providers => &self.providers,
            Relationships::Peers => &self.peers,
            Relationships::Customers => &self.customers,
            Relationships::Origin => &[],
        }
    }

    pub fn is_neighbor(&self, asn: ASN) -> bool {
        self.peers.contains(&asn) || self.providers.contains(&asn) || self.customers.contains(&asn)
    }

    /// Which side of the relationship `asn` sits on, if it is a neighbor.
    pub fn relationship_to(&self, asn: ASN) -> Option<Relationships> {
        if self.customers.contains(&asn) {
            Some(Relationships::Customers)
        } else if self.peers.contains(&asn) {
            Some(Relationships::Peers)
        } else if self.providers.contains(&asn) {
            Some(Relationships::Providers)
        } else {
            None
        }
    }

    pub fn is_stub(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn is_multihomed(&self) -> bool {
        self.customers.is_empty() && (self.providers.len() + self.peers.len()) > 1
    }

    pub fn is_transit(&self) -> bool {
        !self.customers.is_empty()
    }

    pub fn neighbor_asns(&self) -> HashSet<ASN> {
        let mut result = HashSet::new();
        result.extend(&self.peers);
        result.extend(&self.providers);
        result.extend(&self.customers);
        result
    }
}

/// Builder used to declare one AS and its links before graph construction.
/// Links only need declaring on one side; `ASGraph::build` symmetrizes them.
#[derive(Debug, Clone)]
pub struct ASBuilder {
    pub asn: ASN,
    pub peer_asns: Vec<ASN>,
    pub provider_asns: Vec<ASN>,
    pub customer_asns: Vec<ASN>,
    pub input_clique: bool,
    pub ixp: bool,
}

impl ASBuilder {
    pub fn new(asn: ASN) -> Self {
        ASBuilder {
            asn,
            peer_asns: Vec::new(),
            provider_asns: Vec::new(),
            customer_asns: Vec::new(),
            input_clique: false,
            ixp: false,
        }
    }

    pub fn with_peers(mut self, asns: Vec<ASN>) -> Self {
        self.peer_asns = asns;
        self
    }

    pub fn with_providers(mut self, asns: Vec<ASN>) -> Self {
        self.provider_asns = asns;
        self
    }

    pub fn with_customers(mut self, asns: Vec<ASN>) -> Self {
        self.customer_asns = asns;
        self
    }

    pub fn as_input_clique(mut self) -> Self {
        self.input_clique = true;
        self
    }

    pub fn as_ixp(mut self) -> Self {
        self.ixp = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ASGraph {
    pub as_dict: HashMap<ASN, AS>,
    /// ASNs grouped by propagation rank, edge (rank 0) to core, each rank
    /// sorted by ASN for deterministic iteration.
    pub propagation_ranks: Vec<Vec<ASN>>,
    /// All ASNs, sorted. The scheduler iterates this for the peer phase.
    pub asns: Vec<ASN>,
}

impl ASGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from builders: inserts every AS, mirrors every
    /// declared link on its far side, then assigns propagation ranks.
    pub fn build(builders: Vec<ASBuilder>) -> ASGraph {
        let mut graph = ASGraph::new();
        for builder in &builders {
            let mut as_obj = AS::new(builder.asn);
            as_obj.input_clique = builder.input_clique;
            as_obj.ixp = builder.ixp;
            graph.as_dict.insert(builder.asn, as_obj);
        }

        for builder in &builders {
            for &peer in &builder.peer_asns {
                graph.add_peer_link(builder.asn, peer);
            }
            for &provider in &builder.provider_asns {
                graph.add_customer_provider_link(provider, builder.asn);
            }
            for &customer in &builder.customer_asns {
                graph.add_customer_provider_link(builder.asn, customer);
            }
        }

        graph.asns = graph.as_dict.keys().copied().collect();
        graph.asns.sort_unstable();
        graph.assign_propagation_ranks();
        graph
    }

    fn add_peer_link(&mut self, a: ASN, b: ASN) {
        if let Some(as_a) = self.as_dict.get_mut(&a) {
            if !as_a.peers.contains(&b) {
                as_a.peers.push(b);
            }
        }
        if let Some(as_b) = self.as_dict.get_mut(&b) {
            if !as_b.peers.contains(&a) {
                as_b.peers.push(a);
            }
        }
    }

    fn add_customer_provider_link(&mut self, provider: ASN, customer: ASN) {
        if let Some(p) = self.as_dict.get_mut(&provider) {
            if !p.customers.contains(&customer) {
                p.customers.push(customer);
            }
        }
        if let Some(c) = self.as_dict.get_mut(&customer) {
            if !c.providers.contains(&provider) {
                c.providers.push(provider);
            }
        }
    }

    pub fn get(&self, asn: &ASN) -> Option<&AS> {
        self.as_dict.get(asn)
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut AS> {
        self.as_dict.get_mut(asn)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.as_dict.values()
    }

    pub fn len(&self) -> usize {
        self.as_dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_dict.is_empty()
    }

    /// Errors if the customer→provider hierarchy contains a cycle; such a
    /// graph has no propagation-rank order and cannot be simulated.
    pub fn check_for_cycles(&self) -> Result<(), EngineError> {
        let mut state: HashMap<ASN, u8> = HashMap::new(); // 1 = in progress, 2 = done

        fn visit(graph: &ASGraph, asn: ASN, state: &mut HashMap<ASN, u8>) -> Result<(), EngineError> {
            match state.get(&asn) {
                Some(1) => return Err(EngineError::CycleDetected),
                Some(2) => return Ok(()),
                _ => {}
            }
            state.insert(asn, 1);
            if let Some(as_obj) = graph.as_dict.get(&asn) {
                for &provider in &as_obj.providers {
                    visit(graph, provider, state)?;
                }
            }
            state.insert(asn, 2);
            Ok(())
        }

        for &asn in &self.asns {
            visit(self, asn, &mut state)?;
        }
        Ok(())
    }

    /// Assigns each AS a rank such that every customer of an AS has a lower
    /// rank. Rank 0 is the edge; the last rank is the provider-free core.
    pub fn assign_propagation_ranks(&mut self) {
        let mut unassigned: HashSet<ASN> = self.as_dict.keys().copied().collect();
        let mut ranks: Vec<Vec<ASN>> = Vec::new();
        let mut current_rank = 0u32;

        while !unassigned.is_empty() {
            let mut rank_asns: Vec<ASN> = unassigned
                .iter()
                .copied()
                .filter(|asn| {
                    self.as_dict[asn].customers.iter().all(|c| {
                        self.as_dict
                            .get(c)
                            .map(|customer| customer.propagation_rank.is_some())
                            .unwrap_or(true)
                    })
                })
                .collect();

            // A cycle in the customer/provider hierarchy would stall here.
            if rank_asns.is_empty() {
                break;
            }
            rank_asns.sort_unstable();

            for &asn in &rank_asns {
                unassigned.remove(&asn);
                if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                    as_obj.propagation_rank = Some(current_rank);
                }
            }
            ranks.push(rank_asns);
            current_rank += 1;
        }

        self.propagation_ranks = ranks;
    }

    /// Fills `customer_cone_asns` for every AS: the AS itself plus every ASN
    /// reachable by repeatedly descending customer links.
    pub fn add_customer_cone_asns(&mut self) {
        let mut memo: HashMap<ASN, HashSet<ASN>> = HashMap::new();
        for &asn in &self.asns.clone() {
            let cone = self.cone_helper(asn, Relationships::Customers, &mut memo);
            if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                as_obj.customer_cone_asns = Some(cone);
            }
        }
    }

    /// Fills `provider_cone_asns` for every AS: the AS itself plus every ASN
    /// reachable by repeatedly ascending provider links.
    pub fn add_provider_cone_asns(&mut self) {
        let mut memo: HashMap<ASN, HashSet<ASN>> = HashMap::new();
        for &asn in &self.asns.clone() {
            let cone = self.cone_helper(asn, Relationships::Providers, &mut memo);
            if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                as_obj.provider_cone_asns = Some(cone);
            }
        }
    }

    pub fn has_provider_cones(&self) -> bool {
        self.iter().all(|as_obj| as_obj.provider_cone_asns.is_some())
    }

    fn cone_helper(
        &self,
        asn: ASN,
        rel: Relationships,
        memo: &mut HashMap<ASN, HashSet<ASN>>,
    ) -> HashSet<ASN> {
        if let Some(cone) = memo.get(&asn) {
            return cone.clone();
        }
        let mut cone = HashSet::new();
        cone.insert(asn);
        if let Some(as_obj) = self.as_dict.get(&asn) {
            for &next in as_obj.neighbors(rel) {
                cone.extend(self.cone_helper(next, rel, memo));
            }
        }
        memo.insert(asn, cone.clone());
        cone
    }
}
