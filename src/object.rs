//! This module defines the physics objects that the analysis manipulates

use crate::{
    momentum::{self, Momentum, E, X, Y, Z},
    numeric::{Float, UNSET},
};
use std::collections::BTreeMap;

/// PDG id of the electron
pub const PDG_ELECTRON: i32 = 11;

/// PDG id of the muon
pub const PDG_MUON: i32 = 13;

/// PDG id of the tau
pub const PDG_TAU: i32 = 15;

/// Particle species handled by the analysis
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Species {
    /// Electron (reconstructed as a GSF electron)
    Electron,
    /// Muon
    Muon,
    /// Hadronically decaying tau
    Tau,
    /// Heavy resonance candidate built from two daughters
    Composite,
    /// Generator particle that is none of the above (photon, quark...)
    Other,
}
//
impl Species {
    /// Species that are selected from the event record
    pub const SELECTED: [Species; 3] = [Species::Electron, Species::Muon, Species::Tau];

    /// Identify a lepton species from a (possibly signed) PDG id
    pub fn from_pdg_id(pdg_id: i32) -> Option<Self> {
        match pdg_id.abs() {
            PDG_ELECTRON => Some(Species::Electron),
            PDG_MUON => Some(Species::Muon),
            PDG_TAU => Some(Species::Tau),
            _ => None,
        }
    }

    /// Unsigned PDG id of this species (none for composites and others)
    pub fn pdg_id(self) -> Option<i32> {
        match self {
            Species::Electron => Some(PDG_ELECTRON),
            Species::Muon => Some(PDG_MUON),
            Species::Tau => Some(PDG_TAU),
            Species::Composite | Species::Other => None,
        }
    }

    /// Short name used in outputs
    pub fn name(self) -> &'static str {
        match self {
            Species::Electron => "el",
            Species::Muon => "mu",
            Species::Tau => "tau",
            Species::Composite => "HvyRes",
            Species::Other => "other",
        }
    }

    /// Rest mass in GeV, used when the record carries no energy
    pub fn rest_mass(self) -> Float {
        match self {
            Species::Electron => 0.000_510_998_95,
            Species::Muon => 0.105_658_374_5,
            Species::Tau => 1.776_86,
            Species::Composite | Species::Other => 0.,
        }
    }
}
//
impl std::fmt::Display for Species {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(self.name())
    }
}

/// Back-reference from an object to its counterpart in another collection of
/// the same event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchRef {
    /// Position of the counterpart in its collection
    pub index: usize,

    /// Angular separation at the time of matching
    pub delta_r: Float,
}

/// A reconstructed or generated particle candidate
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsObject {
    /// What kind of particle this is
    pub species: Species,

    /// Relativistic 4-momentum (px, py, pz, E)
    pub momentum: Momentum,

    /// Signed PDG id, -1 when unknown
    pub pdg_id: i32,

    /// Monte Carlo status code, -1 for reconstructed objects
    pub status: i32,

    /// Electric charge
    pub charge: Float,

    /// Transverse impact parameter
    pub dxy: Float,

    /// Longitudinal impact parameter
    pub dz: Float,

    /// Identification and isolation scores, keyed by attribute name
    pub attributes: BTreeMap<String, Float>,

    /// Counterpart found by angular matching, if any
    pub matched: Option<MatchRef>,
}
//
impl PhysicsObject {
    /// Build an object with unset auxiliary attributes
    pub fn new(species: Species, momentum: Momentum) -> Self {
        Self {
            species,
            momentum,
            pdg_id: species.pdg_id().unwrap_or(-1),
            status: -1,
            charge: UNSET,
            dxy: UNSET,
            dz: UNSET,
            attributes: BTreeMap::new(),
            matched: None,
        }
    }

    /// Build the composite of two daughters: momenta and charges add up
    pub fn composite(first: &PhysicsObject, second: &PhysicsObject) -> Self {
        let mut composite = Self::new(Species::Composite, first.momentum + second.momentum);
        composite.charge = first.charge + second.charge;
        composite
    }

    /// Momentum along X
    pub fn px(&self) -> Float {
        self.momentum[X]
    }

    /// Momentum along Y
    pub fn py(&self) -> Float {
        self.momentum[Y]
    }

    /// Momentum along the beam axis
    pub fn pz(&self) -> Float {
        self.momentum[Z]
    }

    /// Energy
    pub fn energy(&self) -> Float {
        self.momentum[E]
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        momentum::pt(&self.momentum)
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        momentum::eta(&self.momentum)
    }

    /// Azimuthal angle
    pub fn phi(&self) -> Float {
        momentum::phi(&self.momentum)
    }

    /// Invariant mass
    pub fn mass(&self) -> Float {
        momentum::mass(&self.momentum)
    }

    /// Angular separation from another object
    pub fn delta_r(&self, other: &PhysicsObject) -> Float {
        momentum::delta_r(&self.momentum, &other.momentum)
    }

    /// Look up an identification or isolation score
    pub fn attribute(&self, name: &str) -> Option<Float> {
        self.attributes.get(name).copied()
    }

    /// Truth that this object has been matched to a counterpart
    pub fn is_matched(&self) -> bool {
        self.matched.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::from_pt_eta_phi_m;

    #[test]
    fn species_from_signed_pdg_id() {
        assert_eq!(Species::from_pdg_id(-13), Some(Species::Muon));
        assert_eq!(Species::from_pdg_id(11), Some(Species::Electron));
        assert_eq!(Species::from_pdg_id(15), Some(Species::Tau));
        assert_eq!(Species::from_pdg_id(22), None);
    }

    #[test]
    fn fresh_objects_carry_sentinels() {
        let obj = PhysicsObject::new(Species::Tau, from_pt_eta_phi_m(30., 0., 0., 1.7));
        assert_eq!(obj.pdg_id, PDG_TAU);
        assert_eq!(obj.status, -1);
        assert_eq!(obj.charge, UNSET);
        assert!(!obj.is_matched());
        assert_eq!(obj.attribute("decayModeFinding"), None);
    }

    #[test]
    fn composite_sums_daughters() {
        let mut mu = PhysicsObject::new(Species::Muon, from_pt_eta_phi_m(60., 0.1, 0.2, 0.1));
        mu.charge = 1.;
        let mut tau = PhysicsObject::new(Species::Tau, from_pt_eta_phi_m(55., -1.2, 2.9, 1.7));
        tau.charge = -1.;
        let res = PhysicsObject::composite(&mu, &tau);
        assert_eq!(res.species, Species::Composite);
        assert_eq!(res.pdg_id, -1);
        assert_eq!(res.charge, 0.);
        assert_eq!(res.momentum, mu.momentum + tau.momentum);
    }
}
