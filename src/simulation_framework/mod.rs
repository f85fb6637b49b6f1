pub mod scenario;
pub mod scenario_config;

pub use scenario::{
    run_scenario, AccidentalRouteLeak, PrefixHijack, Prefixes, Scenario, SubprefixHijack,
    ValidPrefix,
};
pub use scenario_config::ScenarioConfig;
