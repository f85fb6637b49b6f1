use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Path-End validation: when the origin publishes its adjacencies, the hop
/// next to the origin must be one of its real neighbors. Catches forged
/// origin attacks one hop out.
pub struct PathEnd;

impl PolicyExtension for PathEnd {
    fn setting(&self) -> Settings {
        Settings::PathEnd
    }

    fn validate(
        &self,
        ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        let Some(origin_as) = ctx.graph.get(&ann.origin()) else {
            return false;
        };
        if !ctx.adoption.adopts(origin_as.asn, Settings::PathEnd) || ann.as_path.len() < 2 {
            return true;
        }
        let hop_to_origin = ann.as_path[ann.as_path.len() - 2];
        origin_as.is_neighbor(hop_to_origin)
    }
}
