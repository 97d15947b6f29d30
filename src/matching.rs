//! Angular matching of reconstructed objects to generator-level objects
//!
//! Matching is greedy: every (reco, gen) pair closer than the maximal
//! separation is considered, pairs are visited by increasing ΔR, and a pair is
//! accepted when neither of its members has been matched yet. The result is
//! not necessarily the assignment of minimal total distance.

use crate::{
    numeric::Float,
    object::{MatchRef, PhysicsObject},
};

/// A (reco, gen) pair considered by the matching
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPair {
    /// Index in the reconstructed collection
    pub reco: usize,

    /// Index in the generator-level collection
    pub gen: usize,

    /// Angular separation between the two objects
    pub delta_r: Float,
}

/// Result of a matching pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchOutcome {
    /// Every pair below the separation threshold, by increasing ΔR
    pub considered: Vec<MatchPair>,

    /// Pairs which were accepted, in acceptance order
    pub accepted: Vec<MatchPair>,
}
//
impl MatchOutcome {
    /// Generator-level partner of a reconstructed object, if any
    pub fn gen_partner(&self, reco: usize) -> Option<usize> {
        self.accepted
            .iter()
            .find(|pair| pair.reco == reco)
            .map(|pair| pair.gen)
    }
}

/// Match reconstructed objects to generator-level objects one-to-one
///
/// Accepted pairs are recorded on both sides through `PhysicsObject::matched`.
/// Objects which were already matched beforehand are left alone.
///
pub fn match_objects(
    reco: &mut [PhysicsObject],
    gen: &mut [PhysicsObject],
    max_separation: Float,
) -> MatchOutcome {
    // Pairs are discovered reco-major, which fixes the order of ties
    let mut considered = Vec::new();
    for (reco_idx, reco_obj) in reco.iter().enumerate() {
        for (gen_idx, gen_obj) in gen.iter().enumerate() {
            let delta_r = reco_obj.delta_r(gen_obj);
            if delta_r < max_separation {
                considered.push(MatchPair {
                    reco: reco_idx,
                    gen: gen_idx,
                    delta_r,
                });
            }
        }
    }
    considered.sort_by(|a, b| a.delta_r.total_cmp(&b.delta_r));

    let mut accepted = Vec::new();
    for pair in &considered {
        if reco[pair.reco].is_matched() || gen[pair.gen].is_matched() {
            continue;
        }
        reco[pair.reco].matched = Some(MatchRef {
            index: pair.gen,
            delta_r: pair.delta_r,
        });
        gen[pair.gen].matched = Some(MatchRef {
            index: pair.reco,
            delta_r: pair.delta_r,
        });
        accepted.push(*pair);
    }

    MatchOutcome {
        considered,
        accepted,
    }
}
