use crate::as_graph::AS;
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::{AnnOverrides, Announcement};
use crate::simulation_engine::policy::{ExportAction, PolicyCtx, PolicyExtension};

/// RFC 9234 Only-to-Customers. A route marked OTC must only ever travel
/// down: hearing one from a customer, or from a peer other than the marker
/// itself, means somebody leaked it.
pub struct OnlyToCustomers;

impl PolicyExtension for OnlyToCustomers {
    fn setting(&self) -> Settings {
        Settings::OnlyToCustomers
    }

    fn validate(
        &self,
        ann: &Announcement,
        from_rel: Relationships,
        _as_obj: &AS,
        _ctx: &PolicyCtx<'_>,
    ) -> bool {
        let Some(otc_asn) = ann.only_to_customers else {
            return true;
        };
        match from_rel {
            Relationships::Peers => ann.next_hop_asn == otc_asn,
            Relationships::Customers => false,
            _ => true,
        }
    }

    fn on_export(
        &self,
        ann: &Announcement,
        _neighbor: &AS,
        propagate_to: Relationships,
        _ctx: &PolicyCtx<'_>,
    ) -> ExportAction {
        // Mark everything we send sideways or down; the first marker wins
        let sends_down = matches!(
            propagate_to,
            Relationships::Customers | Relationships::Peers
        );
        if sends_down && ann.only_to_customers.is_none() {
            ExportAction::Handled(ann.copy_with(AnnOverrides {
                only_to_customers: Some(Some(ann.next_hop_asn)),
                ..Default::default()
            }))
        } else {
            ExportAction::Default
        }
    }
}
