use crate::as_graph::{ASN, AS};
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement};
use crate::simulation_engine::policy::{AnnChoice, ExportAction, PolicyCtx, PolicyExtension};

/// Classic BGPsec. Signatures survive only along chains of adopters: the
/// moment a route passes a non-adopter the signature path is dropped. Path
/// preference is "security third" (after local pref and path length), in
/// line with operator survey data on route selection.
pub struct Bgpsec;

/// A carried signature chain is valid at `asn` when the announcement was
/// signed over to us and every path hop signed.
fn bgpsec_valid(ann: &Announcement, asn: ASN) -> bool {
    ann.bgpsec_next_asn == Some(asn) && ann.bgpsec_as_path == ann.as_path
}

impl PolicyExtension for Bgpsec {
    fn setting(&self) -> Settings {
        Settings::Bgpsec
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
        if bgpsec_valid(original, as_obj.asn) {
            let mut signed = Vec::with_capacity(original.bgpsec_as_path.len() + 1);
            signed.push(as_obj.asn);
            signed.extend_from_slice(&original.bgpsec_as_path);
            processed.bgpsec_as_path = signed;
        } else {
            processed.bgpsec_as_path = Vec::new();
            processed.bgpsec_next_asn = None;
        }
    }

    fn on_export(
        &self,
        ann: &Announcement,
        neighbor: &AS,
        _propagate_to: Relationships,
        ctx: &PolicyCtx<'_>,
    ) -> ExportAction {
        let send_ann = if ctx.adoption.adopts(neighbor.asn, Settings::Bgpsec) {
            ann.copy_with(AnnOverrides {
                bgpsec_next_asn: Some(Some(neighbor.asn)),
                ..Default::default()
            })
        } else {
            // Signatures are useless to a non-adopter; strip them
            ann.copy_with(AnnOverrides {
                bgpsec_next_asn: Some(None),
                bgpsec_as_path: Some(Vec::new()),
                ..Default::default()
            })
        };
        ExportAction::Handled(send_ann)
    }

    fn prefer(&self, current: &Announcement, new: &Announcement, asn: ASN) -> Option<AnnChoice> {
        let current_valid = bgpsec_valid(current, asn);
        let new_valid = bgpsec_valid(new, asn);
        match (current_valid, new_valid) {
            (true, false) => Some(AnnChoice::Current),
            (false, true) => Some(AnnChoice::New),
            _ => None,
        }
    }
}
