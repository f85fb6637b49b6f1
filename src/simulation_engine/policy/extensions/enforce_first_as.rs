use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Enforce-First-AS, as implemented on most routers: the first ASN in the
/// path must be the sending neighbor, on the interface the announcement
/// actually came in over.
pub struct EnforceFirstAs;

impl PolicyExtension for EnforceFirstAs {
    fn setting(&self) -> Settings {
        Settings::EnforceFirstAs
    }

    fn validate(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        as_obj: &AS,
        _ctx: &PolicyCtx<'_>,
    ) -> bool {
        if from_rel == Relationships::Origin {
            return true;
        }
        ann.next_hop_asn == ann.as_path[0] && as_obj.neighbors(from_rel).contains(&ann.as_path[0])
    }
}
