pub mod as_graph;
pub mod route_validator;
pub mod shared;
pub mod simulation_engine;
pub mod simulation_framework;

// Commonly used types at the crate root
pub use as_graph::{ASBuilder, ASGraph, ASN, AS};
pub use route_validator::{RouteValidator, ROA};
pub use shared::{
    CommonASNs, ConfigError, EngineError, PolicyClass, ROAValidity, Relationships, Settings,
    SettingsSet, Timestamps,
};
pub use simulation_engine::{
    Announcement, PolicySpec, Prefix, SimulationEngine, TrialSetup,
};
