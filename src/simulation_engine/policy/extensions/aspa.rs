use crate::as_graph::{ASN, AS};
use crate::shared::{Relationships, Settings};
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{PolicyCtx, PolicyExtension};

/// What one AS-path hop attests: `from` either provably lists `to` as a
/// provider, provably does not, or has published nothing (non-adopter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hop {
    Provider,
    NotProvider,
    Unknown,
}

/// Result of the full ramp computation over an AS path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspaOutcome {
    Valid,
    /// The optimistic ramps cover the path but the strict ones do not; the
    /// path may contain a detour through non-adopters. Accepted by policy
    /// choice.
    Unknown,
    Invalid,
}

/// ASPA-style path attestation. A valley-free path climbs provider links
/// from the origin (the up-ramp), crosses at most one peak, and descends
/// provider links to the receiver (the down-ramp). If even the most
/// generous reading of the attestations leaves a gap between the two ramps,
/// the path provably contains an unattested detour and is rejected.
///
/// Attestation data is a property of the graph and the adoption map, not of
/// the announcement, so all four ramp lengths are re-derived per
/// announcement.
pub struct Aspa;

impl Aspa {
    fn hop(&self, from: ASN, to: ASN, ctx: &PolicyCtx<'_>) -> Hop {
        if !ctx.adoption.adopts(from, Settings::Aspa) {
            return Hop::Unknown;
        }
        match ctx.graph.get(&from) {
            Some(as_obj) if as_obj.providers.contains(&to) => Hop::Provider,
            Some(_) => Hop::NotProvider,
            // An ASN with no graph entry publishes nothing
            None => Hop::Unknown,
        }
    }

    /// Length of the contiguous attested ramp starting at `path[0]`. With
    /// `strict` off an unknown hop extends the ramp (`max` ramps); with it
    /// on only provable provider hops count (`min` ramps).
    fn ramp_length(&self, path: &[ASN], strict: bool, ctx: &PolicyCtx<'_>) -> usize {
        for i in 0..path.len().saturating_sub(1) {
            let breaks = match self.hop(path[i], path[i + 1], ctx) {
                Hop::Provider => false,
                Hop::NotProvider => true,
                Hop::Unknown => strict,
            };
            if breaks {
                return i + 1;
            }
        }
        path.len()
    }

    pub fn outcome(&self, ann: &Announcement, ctx: &PolicyCtx<'_>) -> AspaOutcome {
        let n = ann.as_path.len();
        let reversed: Vec<ASN> = ann.as_path.iter().rev().copied().collect();

        let max_up_ramp = self.ramp_length(&reversed, false, ctx);
        let max_down_ramp = self.ramp_length(&ann.as_path, false, ctx);
        if max_up_ramp + max_down_ramp < n {
            return AspaOutcome::Invalid;
        }

        let min_up_ramp = self.ramp_length(&reversed, true, ctx);
        let min_down_ramp = self.ramp_length(&ann.as_path, true, ctx);
        if min_up_ramp + min_down_ramp < n {
            return AspaOutcome::Unknown;
        }
        AspaOutcome::Valid
    }
}

impl PolicyExtension for Aspa {
    fn setting(&self) -> Settings {
        Settings::Aspa
    }

    fn validate(
        &self,
        ann: &Announcement,
        _from_rel: Relationships,
        _as_obj: &AS,
        ctx: &PolicyCtx<'_>,
    ) -> bool {
        // Path attestation presumes the path starts at the sending neighbor
        if ann.next_hop_asn != ann.as_path[0] {
            return false;
        }
        self.outcome(ann, ctx) != AspaOutcome::Invalid
    }
}
