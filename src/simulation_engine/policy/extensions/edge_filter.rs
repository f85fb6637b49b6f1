use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Edge ASes (stubs and multihomed networks) transit nothing, so a path
/// from one of them containing any ASN but their own is forged.
pub struct EdgeFilter;

impl PolicyExtension for EdgeFilter {
    fn setting(&self) -> Settings {
        Settings::EdgeFilter
    }

    fn validate(
        &self,
        ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        let Some(neighbor) = ctx.graph.get(&ann.as_path[0]) else {
            return false;
        };
        if neighbor.is_stub() || neighbor.is_multihomed() {
            ann.as_path.iter().all(|&asn| asn == neighbor.asn)
        } else {
            true
        }
    }
}
