use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Provider-cone filtering: a customer-learned route should only traverse
/// ASes inside the origin's provider cone. Adopting ASes found outside it
/// mark a leaked or forged path. Requires precomputed provider cones; the
/// engine refuses the trial configuration without them.
pub struct ProviderConeId;

impl PolicyExtension for ProviderConeId {
    fn setting(&self) -> Settings {
        Settings::ProviderConeId
    }

    fn validate(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        if from_rel != Relationships::Customers {
            return true;
        }
        let Some(origin_as) = ctx.graph.get(&ann.origin()) else {
            return false;
        };
        // Presence is validated at setup; absent cones here mean the graph
        // was swapped out from under the trial, so fail closed.
        let Some(cone) = origin_as.provider_cone_asns.as_ref() else {
            return false;
        };
        // The receiving AS is not yet on the path, so check it alongside
        // every path hop short of the origin itself.
        std::iter::once(as_obj.asn)
            .chain(ann.as_path[..ann.as_path.len() - 1].iter().copied())
            .all(|asn| {
                !ctx.adoption.adopts(asn, Settings::ProviderConeId) || cone.contains(&asn)
            })
    }
}
