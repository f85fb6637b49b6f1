pub mod ann_containers;
pub mod announcement;
pub mod engine;
pub mod policy;

pub use ann_containers::{
    AnnInfo, LocalRIB, RIBsIn, RIBsOut, RecvQueue, SendInfo, SendQueue, WithdrawalTrie,
};
pub use announcement::{AnnOverrides, Announcement, Prefix};
pub use engine::{
    AsDiagnostics, PolicySpec, RibEntrySnapshot, SimulationEngine, TrialSetup,
};
pub use policy::{
    build_policy, create_extensions, AdoptionMap, AnnChoice, Bgp, BgpFull, ExportAction, Policy,
    PolicyCtx, PolicyExtension, PolicyStore,
};
