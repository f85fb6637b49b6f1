use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Peerlock-lite: the provider-free core never buys transit, so a
/// customer-learned path containing a clique member is a route leak.
pub struct PeerlockLite;

impl PolicyExtension for PeerlockLite {
    fn setting(&self) -> Settings {
        Settings::PeerlockLite
    }

    fn validate(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        if from_rel != Relationships::Customers {
            return true;
        }
        !ann.as_path.iter().any(|asn| {
            ctx.graph
                .get(asn)
                .map(|as_obj| as_obj.input_clique)
                .unwrap_or(false)
        })
    }
}
