pub mod aspa;
pub mod bgpsec;
pub mod bgpisec_transitive;
pub mod edge_filter;
pub mod enforce_first_as;
pub mod only_to_customers;
pub mod path_end;
pub mod peer_rov;
pub mod peerlock_lite;
pub mod provider_cone_id;
pub mod rov;

use crate::shared::{Settings, SettingsSet};
use crate::simulation_engine::policy::PolicyExtension;

pub use aspa::{Aspa, AspaOutcome};
pub use bgpsec::Bgpsec;
pub use bgpisec_transitive::BgpisecTransitive;
pub use edge_filter::EdgeFilter;
pub use enforce_first_as::EnforceFirstAs;
pub use only_to_customers::OnlyToCustomers;
pub use path_end::PathEnd;
pub use peer_rov::PeerRov;
pub use peerlock_lite::PeerlockLite;
pub use provider_cone_id::ProviderConeId;
pub use rov::Rov;

/// Builds the ordered extension stack for one AS. Path-End and provider-cone
/// filtering only make sense on top of origin validation, so they pull in
/// the ROV validator when it was not requested explicitly.
pub fn create_extensions(settings: SettingsSet) -> Vec<Box<dyn PolicyExtension>> {
    let mut extensions: Vec<Box<dyn PolicyExtension>> = Vec::new();
    let needs_rov = settings.contains(Settings::Rov)
        || settings.contains(Settings::PathEnd)
        || settings.contains(Settings::ProviderConeId);

    for setting in settings.iter() {
        match setting {
            Settings::Rov => {} // handled below so implied ROV stays deduped
            Settings::PeerRov => extensions.push(Box::new(PeerRov)),
            Settings::Aspa => extensions.push(Box::new(Aspa)),
            Settings::Bgpsec => extensions.push(Box::new(Bgpsec)),
            Settings::BgpisecTransitive => extensions.push(Box::new(BgpisecTransitive)),
            Settings::OnlyToCustomers => extensions.push(Box::new(OnlyToCustomers)),
            Settings::EdgeFilter => extensions.push(Box::new(EdgeFilter)),
            Settings::EnforceFirstAs => extensions.push(Box::new(EnforceFirstAs)),
            Settings::PathEnd => extensions.push(Box::new(PathEnd)),
            Settings::PeerlockLite => extensions.push(Box::new(PeerlockLite)),
            Settings::ProviderConeId => extensions.push(Box::new(ProviderConeId)),
            Settings::RouteSuppression => {} // lives inside BgpFull, not a validator
        }
    }
    if needs_rov {
        extensions.insert(0, Box::new(Rov));
    }
    extensions
}
