use std::fmt;

use crate::as_graph::ASN;
use crate::simulation_engine::Prefix;

/// The relationship an announcement was received over. The discriminant
/// doubles as the local-preference rank: customer-learned routes beat
/// peer-learned routes beat provider-learned routes, and a locally seeded
/// (Origin) route beats everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Relationships {
    Providers = 1,
    Peers = 2,
    Customers = 3,
    Origin = 4,
}

impl Relationships {
    /// The relationship the receiver sees when we send toward `self`.
    /// Sending to providers means the provider hears from a customer.
    pub fn invert(&self) -> Self {
        match self {
            Relationships::Providers => Relationships::Customers,
            Relationships::Customers => Relationships::Providers,
            Relationships::Peers => Relationships::Peers,
            Relationships::Origin => Relationships::Origin,
        }
    }

    pub fn local_pref(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationships::Providers => "PROVIDERS",
            Relationships::Peers => "PEERS",
            Relationships::Customers => "CUSTOMERS",
            Relationships::Origin => "ORIGIN",
        };
        write!(f, "{}", s)
    }
}

/// Seeding-time ordering attribute: the victim announces before the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Timestamps {
    Victim = 0,
    Attacker = 1,
}

/// Security extensions an AS can adopt on top of its base decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum Settings {
    Rov = 0,
    PeerRov = 1,
    Aspa = 2,
    Bgpsec = 3,
    BgpisecTransitive = 4,
    OnlyToCustomers = 5,
    EdgeFilter = 6,
    EnforceFirstAs = 7,
    PathEnd = 8,
    PeerlockLite = 9,
    ProviderConeId = 10,
    RouteSuppression = 11,
}

impl Settings {
    /// Composition order for validators and export hooks.
    pub const ALL: [Settings; 12] = [
        Settings::Rov,
        Settings::PeerRov,
        Settings::Aspa,
        Settings::Bgpsec,
        Settings::BgpisecTransitive,
        Settings::OnlyToCustomers,
        Settings::EdgeFilter,
        Settings::EnforceFirstAs,
        Settings::PathEnd,
        Settings::PeerlockLite,
        Settings::ProviderConeId,
        Settings::RouteSuppression,
    ];
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Settings::Rov => "ROV",
            Settings::PeerRov => "PEER_ROV",
            Settings::Aspa => "ASPA",
            Settings::Bgpsec => "BGPSEC",
            Settings::BgpisecTransitive => "BGPISEC_TRANSITIVE",
            Settings::OnlyToCustomers => "ONLY_TO_CUSTOMERS",
            Settings::EdgeFilter => "EDGE_FILTER",
            Settings::EnforceFirstAs => "ENFORCE_FIRST_AS",
            Settings::PathEnd => "PATH_END",
            Settings::PeerlockLite => "PEERLOCK_LITE",
            Settings::ProviderConeId => "PROVIDER_CONE_ID",
            Settings::RouteSuppression => "ROUTE_SUPPRESSION",
        };
        write!(f, "{}", s)
    }
}

/// A small set of `Settings`, cheap to copy into every policy object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SettingsSet(u32);

impl SettingsSet {
    pub const EMPTY: SettingsSet = SettingsSet(0);

    pub fn new(settings: &[Settings]) -> Self {
        let mut set = SettingsSet::EMPTY;
        for s in settings {
            set.insert(*s);
        }
        set
    }

    pub fn with(mut self, setting: Settings) -> Self {
        self.insert(setting);
        self
    }

    pub fn insert(&mut self, setting: Settings) {
        self.0 |= 1 << setting as u32;
    }

    pub fn contains(&self, setting: Settings) -> bool {
        self.0 & (1 << setting as u32) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Settings> + '_ {
        Settings::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Settings> for SettingsSet {
    fn from_iter<T: IntoIterator<Item = Settings>>(iter: T) -> Self {
        let mut set = SettingsSet::EMPTY;
        for s in iter {
            set.insert(s);
        }
        set
    }
}

/// Which per-AS decision engine variant to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PolicyClass {
    /// Stateless base engine. Rejects withdrawals outright.
    Bgp,
    /// Stateful engine with RIBsIn/RIBsOut/SendQueue and withdrawal handling.
    BgpFull,
}

/// Validity of a (prefix, origin) pair against the trial's ROA table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ROAValidity {
    Valid = 0,
    Unknown = 1,
    InvalidLength = 2,
    InvalidOrigin = 3,
    InvalidLengthAndOrigin = 4,
}

impl ROAValidity {
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            ROAValidity::InvalidLength
                | ROAValidity::InvalidOrigin
                | ROAValidity::InvalidLengthAndOrigin
        )
    }
}

impl fmt::Display for ROAValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ROAValidity::Valid => "VALID",
            ROAValidity::Unknown => "UNKNOWN",
            ROAValidity::InvalidLength => "INVALID_LENGTH",
            ROAValidity::InvalidOrigin => "INVALID_ORIGIN",
            ROAValidity::InvalidLengthAndOrigin => "INVALID_LENGTH_AND_ORIGIN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonASNs;

impl CommonASNs {
    pub const ATTACKER: u32 = 666;
    pub const VICTIM: u32 = 777;
}

/// Errors raised while constructing an announcement.
#[derive(Debug, thiserror::Error)]
pub enum AnnouncementError {
    #[error("announcement for {prefix} has an empty AS path")]
    EmptyAsPath { prefix: Prefix },
    #[error(
        "announcement for {prefix} has an AS path longer than 1 \
         but no explicit next hop"
    )]
    AmbiguousNextHop { prefix: Prefix },
}

/// Setup-time failures. These fire before any propagation runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ASN {asn} is not in the AS graph")]
    UnknownAsn { asn: ASN },
    #[error(
        "AS {asn} adopts a cone-dependent extension but the graph has \
         no precomputed provider cones"
    )]
    MissingProviderCones { asn: ASN },
    #[error("AS {asn} adopts route suppression but its policy class is not BgpFull")]
    SuppressionRequiresStateful { asn: ASN },
}

/// Fatal invariant violations. A trial that hits one of these aborts; they
/// indicate a bug in scenario construction or in an extension, never a
/// recoverable routing condition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cycle detected in AS graph")]
    CycleDetected,
    #[error(
        "AS {asn}: no Gao-Rexford winner for {prefix}: two distinct routes \
         from neighbor {neighbor} tie on every criterion"
    )]
    GaoRexfordTie {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error("AS {asn}: seeding conflict, local RIB already holds {prefix}")]
    SeedingConflict { asn: ASN, prefix: Prefix },
    #[error("AS {asn}: policy class cannot handle withdrawals")]
    WithdrawalsUnsupported { asn: ASN },
    #[error(
        "AS {asn}: more than one withdrawal for {prefix} from neighbor \
         {neighbor} in a single round"
    )]
    DuplicateWithdrawal {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error(
        "AS {asn}: more than one announcement for {prefix} from neighbor \
         {neighbor} in a single round"
    )]
    DuplicateAnnouncement {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error(
        "AS {asn}: announcement from neighbor {neighbor} overwrote an \
         un-withdrawn RIBsIn entry for {prefix}; withdraw first, then announce"
    )]
    ImplicitWithdrawal {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error(
        "AS {asn}: withdrawal for {prefix} from neighbor {neighbor} does not \
         match any RIBsIn entry"
    )]
    WithdrawalNotInRibsIn {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error("AS {asn}: send queue already holds a withdrawal for {prefix} toward {neighbor}")]
    PendingWithdrawalReplaced {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error(
        "AS {asn}: send queue already holds an announcement for {prefix} \
         toward {neighbor}; withdraw it before sending a replacement"
    )]
    PendingAnnouncementReplaced {
        asn: ASN,
        prefix: Prefix,
        neighbor: ASN,
    },
    #[error("AS {asn} has no route for {prefix} to withdraw")]
    NoRouteToWithdraw { asn: ASN, prefix: Prefix },
    #[error("engine not set up to run round {got}, expected round {expected}")]
    RoundOutOfOrder { expected: u32, got: u32 },
    #[error("no policy instantiated for ASN {asn}")]
    UnknownAsn { asn: ASN },
    #[error(transparent)]
    Announcement(#[from] AnnouncementError),
}
