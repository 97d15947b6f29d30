//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::{floats, functions::sqr, Float};
use nalgebra::SVector;
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Build a 4-momentum from its cartesian components
pub fn from_px_py_pz_e(px: Float, py: Float, pz: Float, e: Float) -> Momentum {
    Momentum::new(px, py, pz, e)
}

/// Build a 4-momentum from collider coordinates and a rest mass
pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, m: Float) -> Momentum {
    let px = pt * cos(phi);
    let py = pt * sin(phi);
    let pz = pt * eta.sinh();
    let e = sqrt(sqr(px) + sqr(py) + sqr(pz) + sqr(m));
    Momentum::new(px, py, pz, e)
}

/// Build a 4-momentum from a 3-momentum and a rest mass (on-shell energy)
pub fn from_p_and_mass(px: Float, py: Float, pz: Float, m: Float) -> Momentum {
    let e = sqrt(sqr(px) + sqr(py) + sqr(pz) + sqr(m));
    Momentum::new(px, py, pz, e)
}

/// Transverse momentum
pub fn pt(p: &Momentum) -> Float {
    sqrt(sqr(p[X]) + sqr(p[Y]))
}

/// Magnitude of the 3-momentum
pub fn p_mag(p: &Momentum) -> Float {
    p.xyz().norm()
}

/// Cosine of the polar angle, taken to be 1 for a null 3-momentum
pub fn cos_theta(p: &Momentum) -> Float {
    let mag = p_mag(p);
    if mag == 0. {
        1.
    } else {
        p[Z] / mag
    }
}

/// Pseudorapidity
///
/// Undefined along the beam axis, where it saturates to an infinity whose
/// sign follows the longitudinal momentum.
///
pub fn eta(p: &Momentum) -> Float {
    if sqr(cos_theta(p)) < 1. {
        (p[Z] / pt(p)).asinh()
    } else if p[Z] > 0. {
        floats::INFINITY
    } else {
        floats::NEG_INFINITY
    }
}

/// Azimuthal angle in (-pi, pi], zero for a momentum along the beam axis
pub fn phi(p: &Momentum) -> Float {
    if p[X] == 0. && p[Y] == 0. {
        0.
    } else {
        p[Y].atan2(p[X])
    }
}

/// Squared invariant mass (negative for space-like vectors)
pub fn mass2(p: &Momentum) -> Float {
    sqr(p[E]) - p.xyz().norm_squared()
}

/// Invariant mass, reported as -sqrt(-m²) for space-like vectors
pub fn mass(p: &Momentum) -> Float {
    let m2 = mass2(p);
    if m2 < 0. {
        -sqrt(-m2)
    } else {
        sqrt(m2)
    }
}

/// Angular separation ΔR = sqrt(Δη² + Δφ²)
///
/// The azimuthal difference is taken as-is, without folding into (-pi, pi].
/// Two momenta along the same beam direction have no pseudorapidity gap.
///
pub fn delta_r(p1: &Momentum, p2: &Momentum) -> Float {
    let (eta1, eta2) = (eta(p1), eta(p2));
    let delta_eta = if eta1 == eta2 { 0. } else { eta1 - eta2 };
    sqrt(sqr(delta_eta) + sqr(phi(p1) - phi(p2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: Float = 1e-6;

    #[test]
    fn collider_coordinates_round_trip() {
        let p = from_pt_eta_phi_m(60., 0.1, 0.2, 0.105);
        assert!(abs(pt(&p) - 60.) < TOLERANCE * 60.);
        assert!(abs(eta(&p) - 0.1) < TOLERANCE);
        assert!(abs(phi(&p) - 0.2) < TOLERANCE);
        assert!(abs(mass(&p) - 0.105) < 1e-3);
    }

    #[test]
    fn eta_saturates_along_beam_axis() {
        assert_eq!(eta(&from_px_py_pz_e(0., 0., 10., 10.)), floats::INFINITY);
        assert_eq!(eta(&from_px_py_pz_e(0., 0., -10., 10.)), floats::NEG_INFINITY);
        assert_eq!(eta(&from_px_py_pz_e(0., 0., 0., 1.)), floats::NEG_INFINITY);
    }

    #[test]
    fn phi_is_zero_on_beam_axis() {
        assert_eq!(phi(&from_px_py_pz_e(0., 0., 3., 3.)), 0.);
    }

    #[test]
    fn space_like_mass_is_negative() {
        let p = from_px_py_pz_e(3., 4., 0., 3.);
        assert!(abs(mass(&p) + 4.) < TOLERANCE);
    }

    #[test]
    fn delta_r_of_scenario_muons() {
        let mu1 = from_pt_eta_phi_m(60., 0.1, 0.2, 0.105);
        let mu2 = from_pt_eta_phi_m(55., -1.2, 2.9, 0.105);
        let dr = delta_r(&mu1, &mu2);
        assert!(abs(dr - sqrt(sqr(1.3) + sqr(2.7))) < 1e-5);
        assert!(abs(dr - 3.0) < 0.01);
    }

    #[test]
    fn delta_r_along_the_beam_axis() {
        let forward1 = from_px_py_pz_e(0., 0., 100., 100.);
        let forward2 = from_px_py_pz_e(0., 0., 50., 60.);
        let backward = from_px_py_pz_e(0., 0., -50., 60.);
        assert_eq!(delta_r(&forward1, &forward2), 0.);
        assert_eq!(delta_r(&forward1, &backward), floats::INFINITY);
    }
}
