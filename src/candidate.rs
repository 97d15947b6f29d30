//! Construction of the heavy resonance candidate from two daughter collections

use crate::{momentum, numeric::Float, object::PhysicsObject};

/// Requirements on the daughter pair of a resonance candidate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairingCuts {
    /// Minimal angular separation between the daughters
    pub min_separation: Float,

    /// Whether the daughters must have opposite charges
    pub require_opposite_sign: bool,
}
//
impl Default for PairingCuts {
    /// No requirement at all
    fn default() -> Self {
        Self {
            min_separation: -1.,
            require_opposite_sign: false,
        }
    }
}
//
impl PairingCuts {
    /// Build the best candidate allowed by these requirements
    pub fn build(
        &self,
        daughters1: &[PhysicsObject],
        daughters2: &[PhysicsObject],
    ) -> Option<CandidatePair> {
        build(
            daughters1,
            daughters2,
            self.min_separation,
            self.require_opposite_sign,
        )
    }
}

/// Heavy resonance candidate built out of two daughters
#[derive(Clone, Debug, PartialEq)]
pub struct CandidatePair {
    /// Index of the first daughter in the first collection
    pub first: usize,

    /// Index of the second daughter in the second collection
    pub second: usize,

    /// Angular separation between the daughters
    pub delta_r: Float,

    /// Composite object (summed 4-momentum and charge)
    pub composite: PhysicsObject,
}
//
impl CandidatePair {
    /// Invariant mass of the candidate
    pub fn mass(&self) -> Float {
        self.composite.mass()
    }

    /// Resolve the daughters in the collections the candidate was built from
    pub fn daughters<'a>(
        &self,
        first: &'a [PhysicsObject],
        second: &'a [PhysicsObject],
    ) -> (&'a PhysicsObject, &'a PhysicsObject) {
        (&first[self.first], &second[self.second])
    }
}

/// Find the daughter pair of highest invariant mass which passes the cuts
///
/// Pairs are scanned with the first collection in the outer loop and only a
/// strictly heavier pair displaces the current best, so the first pair found
/// wins ties. Pairing an object with itself is not prevented here.
///
pub fn build(
    daughters1: &[PhysicsObject],
    daughters2: &[PhysicsObject],
    min_separation: Float,
    require_opposite_sign: bool,
) -> Option<CandidatePair> {
    let mut best: Option<(usize, usize, Float, Float)> = None;
    for (idx1, dau1) in daughters1.iter().enumerate() {
        for (idx2, dau2) in daughters2.iter().enumerate() {
            if require_opposite_sign && dau1.charge * dau2.charge > 0. {
                continue;
            }
            let delta_r = dau1.delta_r(dau2);
            if !(delta_r >= min_separation) {
                continue;
            }
            let mass = momentum::mass(&(dau1.momentum + dau2.momentum));
            if best.map_or(true, |(_, _, _, best_mass)| mass > best_mass) {
                best = Some((idx1, idx2, delta_r, mass));
            }
        }
    }

    best.map(|(first, second, delta_r, _)| CandidatePair {
        first,
        second,
        delta_r,
        composite: PhysicsObject::composite(&daughters1[first], &daughters2[second]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        momentum::{from_pt_eta_phi_m, from_px_py_pz_e, E, X, Y, Z},
        object::Species,
    };
    use prefix_num_ops::real::*;
    use proptest::prelude::*;

    fn lepton(species: Species, pt: Float, eta: Float, phi: Float, charge: Float) -> PhysicsObject {
        let mut obj = PhysicsObject::new(
            species,
            from_pt_eta_phi_m(pt, eta, phi, species.rest_mass()),
        );
        obj.charge = charge;
        obj
    }

    #[test]
    fn opposite_sign_muon_pair() {
        let mu1 = lepton(Species::Muon, 60., 0.1, 0.2, 1.);
        let mu2 = lepton(Species::Muon, 55., -1.2, 2.9, -1.);
        let cand = build(&[mu1.clone()], &[mu2.clone()], 0.3, true).expect("valid pair");
        assert_eq!((cand.first, cand.second), (0, 0));
        assert!(abs(cand.delta_r - 3.0) < 0.01);
        assert_eq!(cand.composite.charge, 0.);
        assert_eq!(cand.composite.species, Species::Composite);

        // Mass recomputed from the summed components
        let sum = mu1.momentum + mu2.momentum;
        let expected = sqrt(sum[E] * sum[E] - sum[X] * sum[X] - sum[Y] * sum[Y] - sum[Z] * sum[Z]);
        assert!(abs(cand.mass() - expected) < 1e-9 * expected);
        let (first, second) = ([mu1.clone()], [mu2.clone()]);
        let (dau1, dau2) = cand.daughters(&first, &second);
        assert_eq!((dau1, dau2), (&mu1, &mu2));
    }

    #[test]
    fn collinear_pair_along_the_beam_is_close() {
        let mut mu = PhysicsObject::new(Species::Muon, from_px_py_pz_e(0., 0., 100., 100.));
        mu.charge = 1.;
        let mut tau = PhysicsObject::new(Species::Tau, from_px_py_pz_e(0., 0., 50., 60.));
        tau.charge = -1.;
        let (muons, taus) = ([mu], [tau]);
        assert!(build(&muons, &taus, 0.5, true).is_none());

        let cand = build(&muons, &taus, -1., true).expect("no separation required");
        assert_eq!(cand.delta_r, 0.);
    }

    #[test]
    fn same_sign_pairs_are_rejected_on_request() {
        let mu = lepton(Species::Muon, 60., 0.1, 0.2, 1.);
        let tau = lepton(Species::Tau, 55., -1.2, 2.9, 1.);
        let os = PairingCuts {
            min_separation: -1.,
            require_opposite_sign: true,
        };
        assert!(os.build(&[mu.clone()], &[tau.clone()]).is_none());
        assert!(PairingCuts::default().build(&[mu], &[tau]).is_some());
    }

    #[test]
    fn close_pairs_are_rejected() {
        let mu = lepton(Species::Muon, 60., 0.1, 0.2, 1.);
        let tau = lepton(Species::Tau, 55., 0.11, 0.2, -1.);
        assert!(build(&[mu], &[tau], 0.5, false).is_none());
    }

    #[test]
    fn empty_inputs_give_nothing() {
        let mu = lepton(Species::Muon, 60., 0.1, 0.2, 1.);
        assert!(build(&[], &[mu.clone()], -1., false).is_none());
        assert!(build(&[mu], &[], -1., false).is_none());
    }

    #[test]
    fn heaviest_pair_wins_and_ties_keep_the_first() {
        let muons = [
            lepton(Species::Muon, 50., 0., 0., 1.),
            lepton(Species::Muon, 200., 0., 0.5, 1.),
        ];
        let taus = [
            lepton(Species::Tau, 80., 0., 3., -1.),
            lepton(Species::Tau, 80., 0., 3., -1.),
        ];
        let cand = PairingCuts::default()
            .build(&muons, &taus)
            .expect("valid pair");
        assert_eq!((cand.first, cand.second), (1, 0));
    }

    proptest! {
        #[test]
        fn no_valid_pair_is_heavier(
            first in proptest::collection::vec((10f64..300., -2.4f64..2.4, -3.1f64..3.1, prop::bool::ANY), 0..5),
            second in proptest::collection::vec((10f64..300., -2.4f64..2.4, -3.1f64..3.1, prop::bool::ANY), 0..5),
            min_separation in -1f64..3.,
            require_opposite_sign in prop::bool::ANY,
        ) {
            let make = |species, list: &Vec<(f64, f64, f64, bool)>| {
                list.iter()
                    .map(|&(pt, eta, phi, positive)| {
                        let charge = if positive { 1. } else { -1. };
                        lepton(species, pt as Float, eta as Float, phi as Float, charge)
                    })
                    .collect::<Vec<_>>()
            };
            let first = make(Species::Muon, &first);
            let second = make(Species::Tau, &second);
            let min_separation = min_separation as Float;
            let cand = build(&first, &second, min_separation, require_opposite_sign);

            let valid = |a: &PhysicsObject, b: &PhysicsObject| {
                !(require_opposite_sign && a.charge * b.charge > 0.)
                    && a.delta_r(b) >= min_separation
            };
            let any_valid = first.iter().any(|a| second.iter().any(|b| valid(a, b)));
            prop_assert_eq!(cand.is_some(), any_valid);
            if let Some(cand) = cand {
                let (a, b) = cand.daughters(&first, &second);
                prop_assert!(valid(a, b));
                prop_assert_eq!(cand.composite.charge, a.charge + b.charge);
                for a in &first {
                    for b in &second {
                        if valid(a, b) {
                            prop_assert!(momentum::mass(&(a.momentum + b.momentum)) <= cand.mass());
                        }
                    }
                }
            }
        }
    }
}
