use crate::as_graph::ASN;
use crate::shared::{AnnouncementError, Relationships, Timestamps};

pub type Prefix = ipnetwork::IpNetwork;

/// A BGP route record. Announcements are value types: they are copied (with
/// overrides) as they move between ASes, never mutated in place, so no two
/// ASes ever hold references to the same route object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub prefix: Prefix,
    /// Ordered ASNs, origin last. Loop-free once processed.
    pub as_path: Vec<ASN>,
    pub next_hop_asn: ASN,
    /// Set only at origination; stripped on every copy. A seeded local RIB
    /// entry is never displaced.
    pub seed_asn: Option<ASN>,
    pub recv_relationship: Relationships,
    pub timestamp: Timestamps,
    pub withdraw: bool,
    /// ROA outcome stamped at seeding time: the authorized origin and
    /// whether the announced length is within the ROA's max length. Both
    /// `None` when no ROA covers the prefix.
    pub roa_origin: Option<ASN>,
    pub roa_valid_length: Option<bool>,
    /// Signature path accumulated by BGPsec-style extensions. Empty when the
    /// route has no signatures.
    pub bgpsec_as_path: Vec<ASN>,
    /// The ASN the signed announcement was addressed to.
    pub bgpsec_next_asn: Option<ASN>,
    /// RFC 9234 OTC attribute: the ASN that marked this route as
    /// downstream-only.
    pub only_to_customers: Option<ASN>,
}

/// Field overrides for `Announcement::copy_with`. Fields left `None` keep
/// the source value, except `seed_asn` and `withdraw`, which are cleared on
/// every copy unless explicitly overridden.
#[derive(Debug, Clone, Default)]
pub struct AnnOverrides {
    pub as_path: Option<Vec<ASN>>,
    pub next_hop_asn: Option<ASN>,
    pub seed_asn: Option<Option<ASN>>,
    pub recv_relationship: Option<Relationships>,
    pub withdraw: Option<bool>,
    pub roa_origin: Option<Option<ASN>>,
    pub roa_valid_length: Option<Option<bool>>,
    pub bgpsec_as_path: Option<Vec<ASN>>,
    pub bgpsec_next_asn: Option<Option<ASN>>,
    pub only_to_customers: Option<Option<ASN>>,
}

impl Announcement {
    /// Builds an announcement. With a single-entry path the next hop may be
    /// omitted (it defaults to the origin, and the announcement counts as
    /// seeded there); longer paths require an explicit next hop.
    pub fn new(
        prefix: Prefix,
        as_path: Vec<ASN>,
        next_hop_asn: Option<ASN>,
    ) -> Result<Self, AnnouncementError> {
        if as_path.is_empty() {
            return Err(AnnouncementError::EmptyAsPath { prefix });
        }
        let next_hop_asn = match next_hop_asn {
            Some(asn) => asn,
            None if as_path.len() == 1 => as_path[0],
            None => return Err(AnnouncementError::AmbiguousNextHop { prefix }),
        };
        let seed_asn = if as_path.len() == 1 { Some(as_path[0]) } else { None };
        Ok(Announcement {
            prefix,
            as_path,
            next_hop_asn,
            seed_asn,
            recv_relationship: Relationships::Origin,
            timestamp: Timestamps::Victim,
            withdraw: false,
            roa_origin: None,
            roa_valid_length: None,
            bgpsec_as_path: Vec::new(),
            bgpsec_next_asn: None,
            only_to_customers: None,
        })
    }

    pub fn origin(&self) -> ASN {
        *self.as_path.last().expect("announcement with empty AS path")
    }

    /// The neighbor this route was learned from, once processed: the second
    /// path entry (the first is the local ASN). Used as the final
    /// Gao-Rexford tiebreak.
    pub fn neighbor_asn(&self) -> ASN {
        if self.as_path.len() > 1 {
            self.as_path[1]
        } else {
            self.as_path[0]
        }
    }

    /// Copy with overrides. `seed_asn` and `withdraw` are always reset
    /// unless the overrides say otherwise.
    pub fn copy_with(&self, overrides: AnnOverrides) -> Self {
        Announcement {
            prefix: self.prefix,
            as_path: overrides.as_path.unwrap_or_else(|| self.as_path.clone()),
            next_hop_asn: overrides.next_hop_asn.unwrap_or(self.next_hop_asn),
            seed_asn: overrides.seed_asn.unwrap_or(None),
            recv_relationship: overrides.recv_relationship.unwrap_or(self.recv_relationship),
            timestamp: self.timestamp,
            withdraw: overrides.withdraw.unwrap_or(false),
            roa_origin: overrides.roa_origin.unwrap_or(self.roa_origin),
            roa_valid_length: overrides.roa_valid_length.unwrap_or(self.roa_valid_length),
            bgpsec_as_path: overrides
                .bgpsec_as_path
                .unwrap_or_else(|| self.bgpsec_as_path.clone()),
            bgpsec_next_asn: overrides.bgpsec_next_asn.unwrap_or(self.bgpsec_next_asn),
            only_to_customers: overrides.only_to_customers.unwrap_or(self.only_to_customers),
        }
    }

    /// Equality used for withdrawal matching: prefix and AS path only.
    pub fn prefix_path_eq(&self, other: &Announcement) -> bool {
        self.prefix == other.prefix && self.as_path == other.as_path
    }

    /// True when a covering ROA exists and either the origin or the length
    /// is wrong. False means valid *or* unknown.
    pub fn invalid_by_roa(&self) -> bool {
        match self.roa_origin {
            None => false,
            Some(roa_origin) => {
                self.origin() != roa_origin || !self.roa_valid_length.unwrap_or(false)
            }
        }
    }

    /// True when a covering ROA exists and both origin and length match.
    /// False means invalid *or* unknown.
    pub fn valid_by_roa(&self) -> bool {
        self.roa_origin == Some(self.origin()) && self.roa_valid_length == Some(true)
    }

    /// True when no ROA covers the prefix: the announcement is neither valid
    /// nor invalid.
    pub fn unknown_by_roa(&self) -> bool {
        self.roa_origin.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn prefix() -> Prefix {
        Prefix::from_str("1.2.0.0/16").unwrap()
    }

    #[test]
    fn test_new_defaults_next_hop_for_origin() {
        let ann = Announcement::new(prefix(), vec![777], None).unwrap();
        assert_eq!(ann.next_hop_asn, 777);
        assert_eq!(ann.seed_asn, Some(777));
        assert_eq!(ann.origin(), 777);
    }

    #[test]
    fn test_new_requires_next_hop_for_longer_paths() {
        let err = Announcement::new(prefix(), vec![1, 777], None);
        assert!(matches!(err, Err(AnnouncementError::AmbiguousNextHop { .. })));
        let ann = Announcement::new(prefix(), vec![1, 777], Some(1)).unwrap();
        assert_eq!(ann.seed_asn, None);
        assert_eq!(ann.neighbor_asn(), 777);
    }

    #[test]
    fn test_copy_with_clears_seed_and_withdraw() {
        let mut ann = Announcement::new(prefix(), vec![777], None).unwrap();
        ann.withdraw = true;
        let copy = ann.copy_with(AnnOverrides::default());
        assert_eq!(copy.seed_asn, None);
        assert!(!copy.withdraw);

        let kept = ann.copy_with(AnnOverrides {
            seed_asn: Some(Some(777)),
            withdraw: Some(true),
            ..Default::default()
        });
        assert_eq!(kept.seed_asn, Some(777));
        assert!(kept.withdraw);
    }

    #[test]
    fn test_roa_predicates_three_valued() {
        let mut ann = Announcement::new(prefix(), vec![777], None).unwrap();
        // No covering ROA: neither valid nor invalid
        assert!(ann.unknown_by_roa());
        assert!(!ann.valid_by_roa());
        assert!(!ann.invalid_by_roa());

        ann.roa_origin = Some(777);
        ann.roa_valid_length = Some(true);
        assert!(ann.valid_by_roa());
        assert!(!ann.invalid_by_roa());

        ann.roa_valid_length = Some(false);
        assert!(ann.invalid_by_roa());
        assert!(!ann.valid_by_roa());

        ann.roa_origin = Some(666);
        ann.roa_valid_length = Some(true);
        assert!(ann.invalid_by_roa());
    }

    #[test]
    fn test_prefix_path_eq_ignores_other_fields() {
        let a = Announcement::new(prefix(), vec![1, 777], Some(1)).unwrap();
        let mut b = a.clone();
        b.recv_relationship = Relationships::Customers;
        b.withdraw = true;
        assert!(a.prefix_path_eq(&b));
    }
}
