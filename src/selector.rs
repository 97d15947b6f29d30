//! Selection of physics objects out of the raw event record
//!
//! Each species is stored in the record as a set of parallel arrays, one
//! entry per object slot, plus a branch holding the number of slots. The
//! layout of those branches is described by `SpeciesBranches`.

use crate::{
    errors::EventError,
    event::EventRecord,
    momentum::{from_p_and_mass, from_px_py_pz_e},
    numeric::Float,
    object::{PhysicsObject, Species},
    selection::{CutSet, SelectionLevel, SelectionTable},
};
use std::collections::BTreeMap;

/// Generator status code of the hard-process particles
pub const GEN_STATUS_HARD_PROCESS: i32 = 23;

/// Which muon track the muon kinematics are taken from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MuonTrack {
    /// Inner best track (`mu_ibt_*` branches)
    #[default]
    InnerBest,
    /// Global track (`mu_gt_*` branches)
    Global,
}
//
impl MuonTrack {
    fn prefix(self) -> &'static str {
        match self {
            MuonTrack::InnerBest => "mu_ibt",
            MuonTrack::Global => "mu_gt",
        }
    }
}

/// Names of the branches holding one species' objects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesBranches {
    /// Species that these branches describe
    pub species: Species,

    /// Per-event multiplicity
    pub count: String,

    /// Momentum along x
    pub px: String,

    /// Momentum along y
    pub py: String,

    /// Momentum along the beam axis
    pub pz: String,

    /// Energy, computed from the rest mass when absent
    pub energy: Option<String>,

    /// Electric charge
    pub charge: String,

    /// Transverse impact parameter, read when the record has it
    pub dxy: Option<String>,

    /// Longitudinal impact parameter, read when the record has it
    pub dz: Option<String>,

    /// Identification and isolation scores as (attribute name, branch name),
    /// read when the record has them
    pub attributes: Vec<(String, String)>,
}
//
impl SpeciesBranches {
    /// Layout of the GSF electron branches
    pub fn electron() -> Self {
        Self {
            species: Species::Electron,
            count: "gsf_n".to_owned(),
            px: "gsf_px".to_owned(),
            py: "gsf_py".to_owned(),
            pz: "gsf_pz".to_owned(),
            energy: Some("gsf_energy".to_owned()),
            charge: "gsf_charge".to_owned(),
            dxy: Some("gsf_dxy_firstPVtx".to_owned()),
            dz: Some("gsf_dz_firstPVtx".to_owned()),
            attributes: attribute_branches("gsf", &["isHEEP"]),
        }
    }

    /// Layout of the muon branches for a given track choice
    pub fn muon(track: MuonTrack) -> Self {
        let prefix = track.prefix();
        let mut attributes = attribute_branches(
            "mu",
            &[
                "isHighPtMuon",
                "isTrackerMuon",
                "isGlobalMuon",
                "isStandAloneMuon",
                "isPFMuon",
                "numberOfMatchedStations",
                "numberOfValidPixelHits",
                "numberOfValidTrackerLayers",
                "numberOfValidMuonHits",
                "isoTrackerBased03",
            ],
        );
        attributes.extend(attribute_branches(prefix, &["normChi2"]));
        Self {
            species: Species::Muon,
            count: "mu_n".to_owned(),
            px: format!("{prefix}_px"),
            py: format!("{prefix}_py"),
            pz: format!("{prefix}_pz"),
            energy: None,
            charge: format!("{prefix}_charge"),
            dxy: Some(format!("{prefix}_dxy_firstPVtx")),
            dz: Some(format!("{prefix}_dz_firstPVtx")),
            attributes,
        }
    }

    /// Layout of the hadronic tau branches
    pub fn tau() -> Self {
        Self {
            species: Species::Tau,
            count: "tau_n".to_owned(),
            px: "tau_px".to_owned(),
            py: "tau_py".to_owned(),
            pz: "tau_pz".to_owned(),
            energy: Some("tau_energy".to_owned()),
            charge: "tau_charge".to_owned(),
            dxy: Some("tau_dxy".to_owned()),
            dz: None,
            attributes: attribute_branches(
                "tau",
                &[
                    "decayMode",
                    "decayModeFinding",
                    "decayModeFindingNewDMs",
                    "againstElectronVLooseMVA6",
                    "againstMuonTight3",
                    "isPF",
                    "byTightIsolationMVArun2v1DBoldDMwLT",
                    "byTightIsolationMVArun2v1DBnewDMwLT",
                ],
            ),
        }
    }

    /// Default layout of a selected species
    pub fn for_species(species: Species, track: MuonTrack) -> Option<Self> {
        match species {
            Species::Electron => Some(Self::electron()),
            Species::Muon => Some(Self::muon(track)),
            Species::Tau => Some(Self::tau()),
            Species::Composite | Species::Other => None,
        }
    }

    /// Number of object slots in an event
    pub fn object_count<E: EventRecord + ?Sized>(&self, event: &E) -> Result<usize, EventError> {
        let count = event.scalar(&self.count)?;
        // Negative or NaN multiplicities saturate to zero
        Ok(count as usize)
    }

    /// Materialize the object stored in a slot
    pub fn build_object<E: EventRecord + ?Sized>(
        &self,
        event: &E,
        index: usize,
    ) -> Result<PhysicsObject, EventError> {
        let px = event.value_at(&self.px, index)?;
        let py = event.value_at(&self.py, index)?;
        let pz = event.value_at(&self.pz, index)?;
        let momentum = match &self.energy {
            Some(energy) => from_px_py_pz_e(px, py, pz, event.value_at(energy, index)?),
            None => from_p_and_mass(px, py, pz, self.species.rest_mass()),
        };

        let mut object = PhysicsObject::new(self.species, momentum);
        object.charge = event.value_at(&self.charge, index)?;
        if let Some(dxy) = optional_value(event, self.dxy.as_deref(), index)? {
            object.dxy = dxy;
        }
        if let Some(dz) = optional_value(event, self.dz.as_deref(), index)? {
            object.dz = dz;
        }
        for (attribute, branch) in &self.attributes {
            if let Some(value) = optional_value(event, Some(branch.as_str()), index)? {
                object.attributes.insert(attribute.clone(), value);
            }
        }
        Ok(object)
    }
}

/// Map attribute names to branch names of the form {prefix}_{attribute}
fn attribute_branches(prefix: &str, attributes: &[&str]) -> Vec<(String, String)> {
    attributes
        .iter()
        .map(|&attribute| (attribute.to_owned(), format!("{prefix}_{attribute}")))
        .collect()
}

/// Read a branch which the record may not have
fn optional_value<E: EventRecord + ?Sized>(
    event: &E,
    branch: Option<&str>,
    index: usize,
) -> Result<Option<Float>, EventError> {
    match branch {
        Some(branch) if event.has_branch(branch) => event.value_at(branch, index).map(Some),
        _ => Ok(None),
    }
}

/// Select the objects of one species which pass a set of cuts
///
/// Every branch named by the cuts must exist in the record. Objects are
/// returned in slot order.
///
pub fn select<E: EventRecord + ?Sized>(
    event: &E,
    cuts: &CutSet,
    object_count: usize,
    branches: &SpeciesBranches,
) -> Result<Vec<PhysicsObject>, EventError> {
    if let Some(missing) = cuts.keys().find(|name| !event.has_branch(name)) {
        return Err(event.branch_not_found(missing));
    }

    let mut selected = Vec::new();
    'slots: for index in 0..object_count {
        for (branch, cut) in cuts {
            if !cut.passes(event.value_at(branch, index)?) {
                continue 'slots;
            }
        }
        selected.push(branches.build_object(event, index)?);
    }
    Ok(selected)
}

/// Per-species object selection at every selection level
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSelector {
    /// Where the species lives in the record
    pub branches: SpeciesBranches,

    /// Cuts of every level
    pub table: SelectionTable,
}
//
impl ObjectSelector {
    /// Set up the selection of a species
    pub fn new(branches: SpeciesBranches, table: SelectionTable) -> Self {
        Self { branches, table }
    }

    /// Species being selected
    pub fn species(&self) -> Species {
        self.branches.species
    }

    /// Run the selection of every level on one event
    pub fn select_all_levels<E: EventRecord + ?Sized>(
        &self,
        event: &E,
    ) -> Result<BTreeMap<SelectionLevel, Vec<PhysicsObject>>, EventError> {
        let object_count = self.branches.object_count(event)?;
        self.table
            .iter()
            .map(|(level, cuts)| -> Result<_, EventError> {
                Ok((level, select(event, cuts, object_count, &self.branches)?))
            })
            .collect()
    }
}

/// Names of the generator particle branches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenBranches {
    /// Momentum along x
    pub px: String,
    /// Momentum along y
    pub py: String,
    /// Momentum along the beam axis
    pub pz: String,
    /// Energy
    pub energy: String,
    /// Signed PDG id
    pub pdg_id: String,
    /// Generator status code
    pub status: String,
    /// Electric charge
    pub charge: String,
}
//
impl Default for GenBranches {
    fn default() -> Self {
        Self {
            px: "mc_px".to_owned(),
            py: "mc_py".to_owned(),
            pz: "mc_pz".to_owned(),
            energy: "mc_energy".to_owned(),
            pdg_id: "mc_pdgId".to_owned(),
            status: "mc_status".to_owned(),
            charge: "mc_charge".to_owned(),
        }
    }
}
//
impl GenBranches {
    /// Materialize every generator particle of an event, in record order
    pub fn all_particles<E: EventRecord + ?Sized>(
        &self,
        event: &E,
    ) -> Result<Vec<PhysicsObject>, EventError> {
        let num_particles = event.array(&self.px)?.len();
        (0..num_particles)
            .map(|index| {
                let momentum = from_px_py_pz_e(
                    event.value_at(&self.px, index)?,
                    event.value_at(&self.py, index)?,
                    event.value_at(&self.pz, index)?,
                    event.value_at(&self.energy, index)?,
                );
                let pdg_id = event.value_at(&self.pdg_id, index)? as i32;
                let species = Species::from_pdg_id(pdg_id).unwrap_or(Species::Other);
                let mut particle = PhysicsObject::new(species, momentum);
                particle.pdg_id = pdg_id;
                particle.status = event.value_at(&self.status, index)? as i32;
                particle.charge = event.value_at(&self.charge, index)?;
                Ok(particle)
            })
            .collect()
    }
}

/// Keep the generator particles of the requested species and status, grouped
/// by species and in record order
pub fn select_gen_daughters(
    particles: &[PhysicsObject],
    species: &[Species],
    status: i32,
) -> BTreeMap<Species, Vec<PhysicsObject>> {
    let mut selected = BTreeMap::<Species, Vec<PhysicsObject>>::new();
    for particle in particles {
        let wanted = Species::from_pdg_id(particle.pdg_id)
            .filter(|sp| species.contains(sp))
            .filter(|_| particle.status == status);
        if let Some(sp) = wanted {
            selected.entry(sp).or_default().push(particle.clone());
        }
    }
    selected
}
