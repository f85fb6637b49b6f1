use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement};
use crate::simulation_engine::policy::{ExportAction, PolicyCtx, PolicyExtension};

/// BGP-iSec transitive signatures. Unlike classic BGPsec the signature path
/// survives passage through non-adopters, so a missing signature from an
/// adopting AS on the path proves tampering: every adopting AS between the
/// receiver and the origin must appear in the carried signature path.
/// Deliberately leaves best-path preference alone, per the BGP-iSec paper.
pub struct BgpisecTransitive;

impl PolicyExtension for BgpisecTransitive {
    fn setting(&self) -> Settings {
        Settings::BgpisecTransitive
    }

    fn validate(
        &self,
        ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        for &asn in &ann.as_path {
            if ctx.adoption.adopts(asn, Settings::BgpisecTransitive)
                && !ann.bgpsec_as_path.contains(&asn)
            {
                return false;
            }
        }
        true
    }

    fn on_seed(&self, ann: &mut Announcement, as_obj: &AS) {
        if ann.as_path == [as_obj.asn] {
            ann.bgpsec_as_path = ann.as_path.clone();
        }
    }

    fn on_copy_and_process(
        &self,
        original: &Announcement,
        processed: &mut Announcement,
        _from_rel: Relationships,
        as_obj: &AS,
        _ctx: &PolicyCtx<'_>,
    ) {
        // Transitive: always add our signature, never strip the others
        let mut signed = Vec::with_capacity(original.bgpsec_as_path.len() + 1);
        signed.push(as_obj.asn);
        signed.extend_from_slice(&original.bgpsec_as_path);
        processed.bgpsec_as_path = signed;
    }

    fn on_export(
        &self,
        ann: &Announcement,
        neighbor: &AS,
        _propagate_to: Relationships,
        _ctx: &PolicyCtx<'_>,
    ) -> ExportAction {
        ExportAction::Handled(ann.copy_with(AnnOverrides {
            bgpsec_next_asn: Some(Some(neighbor.asn)),
            ..Default::default()
        }))
    }
}
