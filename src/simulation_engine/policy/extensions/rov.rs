use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// Route origin validation: drop announcements whose (prefix, origin) is
/// invalid against the trial's ROA table. Unknown (no covering ROA) passes.
pub struct Rov;

impl PolicyExtension for Rov {
    fn setting(&self) -> Settings {
        Settings::Rov
    }

    fn validate(
        &self,
        ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        !ctx.route_validator
            .roa_validity(&ann.prefix, ann.origin())
            .is_invalid()
    }
}
