use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// The real-world partial deployment of ROV that only filters routes
/// learned from peers.
pub struct PeerRov;

impl PolicyExtension for PeerRov {
    fn setting(&self) -> Settings {
        Settings::PeerRov
    }

    fn validate(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        if from_rel != Relationships::Peers {
            return true;
        }
        !ctx.route_validator
            .roa_validity(&ann.prefix, ann.origin())
            .is_invalid()
    }
}
