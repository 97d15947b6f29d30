//! Default output layer: fixed-binning histograms and cut-flow counters
//!
//! Histogram names follow `h_{tier}_{object}_{variable}_{level}`, where the
//! tier is `reco` or `gen` and the object is a species short name or
//! `HvyRes` for the resonance candidate.
//!
//! Two-dimensional histograms are stored sparsely, as only a small fraction
//! of their cells ever gets filled.

use crate::{
    analyzer::{EventSink, EventSummary},
    numeric::{Float, UNSET},
    object::{PhysicsObject, Species},
    selection::SelectionLevel,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Identification flags of GSF electrons, one `idLabel` bin each
pub const ELECTRON_ID_FLAGS: &[&str] = &["isHEEP"];

/// Identification flags of muons, one `idLabel` bin each
pub const MUON_ID_FLAGS: &[&str] = &[
    "isGlobalMuon",
    "isHighPtMuon",
    "isPFMuon",
    "isStandAloneMuon",
    "isTrackerMuon",
];

/// Muon hit counts, histogrammed for every identification flag
pub const MUON_HIT_COUNTS: &[&str] = &[
    "numberOfMatchedStations",
    "numberOfValidMuonHits",
    "numberOfValidPixelHits",
    "numberOfValidTrackerLayers",
];

/// Hadronic tau decay modes, one `idLabel` bin each
pub const TAU_DECAY_MODES: &[(i32, &str)] = &[
    (0, "1 prong + 0 pi0"),
    (1, "1 prong + 1pi0"),
    (2, "1 prong + 2pi0s"),
    (5, "2 prongs + 0pi0"),
    (6, "2 prongs + 1 pi0s"),
    (7, "2 prongs + 2 pi0s"),
    (10, "3 prongs + 0 pi0s"),
    (11, "3 prongs + 1 pi0"),
];

/// Bin of a value on a uniform axis, if it is within range
fn uniform_bin(value: Float, low: Float, high: Float, num_bins: usize) -> Option<usize> {
    if !(low..high).contains(&value) {
        return None;
    }
    let width = (high - low) / num_bins as Float;
    let bin = ((value - low) / width) as usize;
    Some(bin.min(num_bins - 1))
}

/// One-dimensional histogram with uniform binning
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram1D {
    /// Unique name
    pub name: String,

    /// Lower edge of the first bin
    pub low: Float,

    /// Upper edge of the last bin
    pub high: Float,

    /// Number of entries in each bin
    pub counts: Vec<u64>,

    /// Entries below `low`
    pub underflow: u64,

    /// Entries at or above `high`
    pub overflow: u64,

    /// Entries which were not a number
    pub invalid: u64,

    /// Sum of the in-range entries, for the mean
    sum: Float,
}
//
impl Histogram1D {
    /// Create an empty histogram
    pub fn new(name: impl Into<String>, num_bins: usize, low: Float, high: Float) -> Self {
        assert!(num_bins > 0 && high > low, "Invalid histogram binning");
        Self {
            name: name.into(),
            low,
            high,
            counts: vec![0; num_bins],
            underflow: 0,
            overflow: 0,
            invalid: 0,
            sum: 0.,
        }
    }

    /// Bin which a value falls into, if it is within range
    pub fn bin_of(&self, value: Float) -> Option<usize> {
        uniform_bin(value, self.low, self.high, self.counts.len())
    }

    /// Record a value
    pub fn fill(&mut self, value: Float) {
        if value.is_nan() {
            self.invalid += 1;
        } else if let Some(bin) = self.bin_of(value) {
            self.counts[bin] += 1;
            self.sum += value;
        } else if value < self.low {
            self.underflow += 1;
        } else {
            self.overflow += 1;
        }
    }

    /// Number of in-range entries
    pub fn in_range(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Total number of entries, out of range included
    pub fn entries(&self) -> u64 {
        self.in_range() + self.underflow + self.overflow + self.invalid
    }

    /// Mean of the in-range entries
    pub fn mean(&self) -> Option<Float> {
        let in_range = self.in_range();
        (in_range > 0).then(|| self.sum / in_range as Float)
    }
}

/// Uniform binning of one axis of a 2D histogram
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Axis {
    /// Number of bins
    pub num_bins: usize,

    /// Lower edge of the first bin
    pub low: Float,

    /// Upper edge of the last bin
    pub high: Float,
}
//
impl Axis {
    /// Describe an axis
    pub fn new(num_bins: usize, low: Float, high: Float) -> Self {
        assert!(num_bins > 0 && high > low, "Invalid histogram binning");
        Self {
            num_bins,
            low,
            high,
        }
    }

    /// Bin which a value falls into, if it is within range
    pub fn bin_of(&self, value: Float) -> Option<usize> {
        uniform_bin(value, self.low, self.high, self.num_bins)
    }
}

/// Two-dimensional histogram with uniform binning on both axes
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram2D {
    /// Unique name
    pub name: String,

    /// Horizontal axis
    pub x: Axis,

    /// Vertical axis
    pub y: Axis,

    /// Non-empty cells, as (x bin, y bin) -> entries
    #[serde(serialize_with = "serialize_cells")]
    pub cells: BTreeMap<(usize, usize), u64>,

    /// Entries outside of the axes' range
    pub outside: u64,

    /// Entries where either coordinate was not a number
    pub invalid: u64,
}
//
impl Histogram2D {
    /// Create an empty histogram
    pub fn new(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            cells: BTreeMap::new(),
            outside: 0,
            invalid: 0,
        }
    }

    /// Record a pair of values
    pub fn fill(&mut self, x: Float, y: Float) {
        if x.is_nan() || y.is_nan() {
            self.invalid += 1;
            return;
        }
        match (self.x.bin_of(x), self.y.bin_of(y)) {
            (Some(bin_x), Some(bin_y)) => *self.cells.entry((bin_x, bin_y)).or_default() += 1,
            _ => self.outside += 1,
        }
    }

    /// Entries of one cell
    pub fn count(&self, bin_x: usize, bin_y: usize) -> u64 {
        self.cells.get(&(bin_x, bin_y)).copied().unwrap_or(0)
    }

    /// Number of in-range entries
    pub fn in_range(&self) -> u64 {
        self.cells.values().sum()
    }

    /// Total number of entries, out of range included
    pub fn entries(&self) -> u64 {
        self.in_range() + self.outside + self.invalid
    }
}

/// Sparse cells are written as a list of [x bin, y bin, entries]
fn serialize_cells<S: Serializer>(
    cells: &BTreeMap<(usize, usize), u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(cells.iter().map(|(&(x, y), &count)| (x, y, count)))
}

/// Kinematic distributions of one kind of object at one selection level
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KinematicHistos {
    /// Objects per event
    pub multiplicity: Histogram1D,
    /// Transverse momentum
    pub pt: Histogram1D,
    /// Pseudorapidity
    pub eta: Histogram1D,
    /// Electric charge
    pub charge: Histogram1D,
    /// Energy
    pub energy: Histogram1D,
    /// Invariant mass
    pub mass: Histogram1D,
    /// Longitudinal momentum
    pub pz: Histogram1D,
    /// Transverse impact parameter, when recorded
    pub dxy: Histogram1D,
    /// Longitudinal impact parameter, when recorded
    pub dz: Histogram1D,
}
//
impl KinematicHistos {
    /// Book the histograms of an object kind, tier and level
    pub fn new(tier: &str, object: &str, level: SelectionLevel) -> Self {
        let name = |variable: &str| format!("h_{tier}_{object}_{variable}_{level}");
        Self {
            multiplicity: Histogram1D::new(name("multi"), 11, -0.5, 10.5),
            pt: Histogram1D::new(name("pt"), 300, 0., 3000.),
            eta: Histogram1D::new(name("eta"), 100, -5., 5.),
            charge: Histogram1D::new(name("charge"), 5, -2.5, 2.5),
            energy: Histogram1D::new(name("energy"), 350, 0., 3500.),
            mass: Histogram1D::new(name("mass"), 700, -0.5, 6999.5),
            pz: Histogram1D::new(name("pz"), 400, -4000., 4000.),
            dxy: Histogram1D::new(name("dxy"), 110, -5.5, 5.5),
            dz: Histogram1D::new(name("dz"), 210, -10.5, 10.5),
        }
    }

    /// Record the kinematics of an object (multiplicity is filled separately)
    pub fn fill(&mut self, object: &PhysicsObject) {
        self.pt.fill(object.pt());
        self.eta.fill(object.eta());
        self.charge.fill(object.charge);
        self.energy.fill(object.energy());
        self.mass.fill(object.mass());
        self.pz.fill(object.pz());
        if object.dxy != UNSET {
            self.dxy.fill(object.dxy);
        }
        if object.dz != UNSET {
            self.dz.fill(object.dz);
        }
    }

    /// Record a collection of objects and its size
    pub fn fill_all(&mut self, objects: &[PhysicsObject]) {
        self.multiplicity.fill(objects.len() as Float);
        for object in objects {
            self.fill(object);
        }
    }

    /// Every histogram of this set
    pub fn histograms(&self) -> [&Histogram1D; 9] {
        [
            &self.multiplicity,
            &self.pt,
            &self.eta,
            &self.charge,
            &self.energy,
            &self.mass,
            &self.pz,
            &self.dxy,
            &self.dz,
        ]
    }
}

/// Which identification bin an object falls into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IdLabels {
    /// One bin per flag, filled when the flag is set
    Flags(&'static [&'static str]),
    /// One bin per decay mode, filled for the object's `decayMode`
    DecayModes,
}
//
impl IdLabels {
    fn names(self) -> Vec<String> {
        match self {
            IdLabels::Flags(flags) => flags.iter().map(|&flag| flag.to_owned()).collect(),
            IdLabels::DecayModes => TAU_DECAY_MODES
                .iter()
                .map(|&(_, label)| label.to_owned())
                .collect(),
        }
    }
}

/// Score histogram layout: attribute, histogram variable, bins, low, high
type ScoreHisto = (&'static str, &'static str, usize, Float, Float);

const NO_HIT_COUNTS: &[&str] = &[];

const NO_SCORES: &[ScoreHisto] = &[];

const MUON_SCORES: &[ScoreHisto] = &[
    ("normChi2", "normChi2", 100, -0.5, 99.5),
    ("isoTrackerBased03", "isoTrackerBased03", 110, -0.05, 1.05),
];

const TAU_SCORES: &[ScoreHisto] = &[
    ("decayModeFinding", "decayModeFinding", 105, -1.05, 1.05),
    ("decayModeFindingNewDMs", "decayModeFindingNewDMs", 105, -1.05, 1.05),
    ("againstMuonTight3", "againstMuonTight3", 105, -1.05, 1.05),
    ("againstElectronVLooseMVA6", "againstElVLooseMVA6", 105, -1.05, 1.05),
    (
        "byTightIsolationMVArun2v1DBoldDMwLT",
        "tightIsoMVArun2v1DBoldDMwLT",
        110,
        -0.05,
        1.05,
    ),
];

/// Identification and isolation distributions of one species at one
/// selection level
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentificationHistos {
    /// Meaning of the `id_label` bins, first bin first
    pub labels: Vec<String>,

    /// Identification outcome, bin `n` standing for `labels[n - 1]`
    pub id_label: Histogram1D,

    /// Hit counts (x) of each hit kind (y), per identification flag
    pub hits: BTreeMap<String, Histogram2D>,

    /// Score distributions, by attribute name
    pub scores: BTreeMap<String, Histogram1D>,

    /// New versus old tau decay mode finding
    pub decay_mode_new_vs_old: Option<Histogram2D>,

    #[serde(skip)]
    id_labels: IdLabels,

    #[serde(skip)]
    hit_counts: &'static [&'static str],
}
//
impl IdentificationHistos {
    /// Book the identification histograms of a selected species, if it has any
    pub fn new(tier: &str, species: Species, level: SelectionLevel) -> Option<Self> {
        let object = species.name();
        let name = |variable: &str| format!("h_{tier}_{object}_{variable}_{level}");
        let (id_labels, hit_counts, scores) = match species {
            Species::Electron => (IdLabels::Flags(ELECTRON_ID_FLAGS), NO_HIT_COUNTS, NO_SCORES),
            Species::Muon => (IdLabels::Flags(MUON_ID_FLAGS), MUON_HIT_COUNTS, MUON_SCORES),
            Species::Tau => (IdLabels::DecayModes, NO_HIT_COUNTS, TAU_SCORES),
            Species::Composite | Species::Other => return None,
        };

        let labels = id_labels.names();
        let num_labels = labels.len();
        let id_label = Histogram1D::new(
            name("idLabel"),
            num_labels,
            0.5,
            num_labels as Float + 0.5,
        );
        let hits = match id_labels {
            IdLabels::Flags(flags) if !hit_counts.is_empty() => flags
                .iter()
                .map(|&flag| {
                    let histo = Histogram2D::new(
                        name(&format!("{flag}_hits")),
                        Axis::new(61, -0.5, 60.5),
                        Axis::new(hit_counts.len(), 0.5, hit_counts.len() as Float + 0.5),
                    );
                    (flag.to_owned(), histo)
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        let scores = scores
            .iter()
            .map(|&(attribute, variable, num_bins, low, high)| {
                (
                    attribute.to_owned(),
                    Histogram1D::new(name(variable), num_bins, low, high),
                )
            })
            .collect();
        let decay_mode_new_vs_old = (species == Species::Tau).then(|| {
            Histogram2D::new(
                name("decayModeFinding_NewVsOld"),
                Axis::new(105, -1.05, 1.05),
                Axis::new(105, -1.05, 1.05),
            )
        });

        Some(Self {
            labels,
            id_label,
            hits,
            scores,
            decay_mode_new_vs_old,
            id_labels,
            hit_counts,
        })
    }

    /// Record the identification of an object
    ///
    /// Attributes which the event record did not provide are skipped.
    ///
    pub fn fill(&mut self, object: &PhysicsObject) {
        match self.id_labels {
            IdLabels::Flags(flags) => {
                for (bin, &flag) in flags.iter().enumerate() {
                    if !object.attribute(flag).map_or(false, |value| value > 0.) {
                        continue;
                    }
                    self.id_label.fill((bin + 1) as Float);
                    if let Some(hits) = self.hits.get_mut(flag) {
                        for (bin_y, &hit_count) in self.hit_counts.iter().enumerate() {
                            if let Some(value) = object.attribute(hit_count) {
                                hits.fill(value, (bin_y + 1) as Float);
                            }
                        }
                    }
                }
            }
            IdLabels::DecayModes => {
                let bin = object.attribute("decayMode").and_then(|mode| {
                    TAU_DECAY_MODES
                        .iter()
                        .position(|&(known, _)| known as Float == mode)
                });
                if let Some(bin) = bin {
                    self.id_label.fill((bin + 1) as Float);
                }
            }
        }

        for (attribute, histo) in &mut self.scores {
            if let Some(value) = object.attribute(attribute) {
                histo.fill(value);
            }
        }

        if let Some(new_vs_old) = &mut self.decay_mode_new_vs_old {
            if let (Some(old), Some(new)) = (
                object.attribute("decayModeFinding"),
                object.attribute("decayModeFindingNewDMs"),
            ) {
                new_vs_old.fill(old, new);
            }
        }
    }

    /// Every 1D histogram of this set
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram1D> {
        std::iter::once(&self.id_label).chain(self.scores.values())
    }

    /// Every 2D histogram of this set
    pub fn histograms_2d(&self) -> impl Iterator<Item = &Histogram2D> {
        self.hits.values().chain(self.decay_mode_new_vs_old.as_ref())
    }
}

/// Number of events surviving each analysis stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CutFlow {
    /// Events read from the input
    pub read: u64,
    /// Events which passed the trigger requirement
    pub triggered: u64,
    /// Events with a reconstructed resonance candidate
    pub with_candidate: u64,
    /// Events which also have a generator-level candidate
    pub with_gen_candidate: u64,
}

/// All histograms of the analysis
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisHistograms {
    /// Reconstructed objects, by species and selection level
    pub reco: BTreeMap<String, BTreeMap<String, KinematicHistos>>,

    /// Identification of reconstructed objects, by species and selection
    /// level
    pub reco_id: BTreeMap<String, BTreeMap<String, IdentificationHistos>>,

    /// Hard-process generator daughters, by species
    pub gen: BTreeMap<String, KinematicHistos>,

    /// Reconstructed resonance candidate
    pub hvy_res_reco: KinematicHistos,

    /// Generator-level resonance candidate
    pub hvy_res_gen: KinematicHistos,

    /// Angular separation between the candidate daughters
    pub daughter_delta_r: Histogram1D,

    /// Relative candidate mass resolution, (reco - gen) / gen
    pub mass_resolution: Histogram1D,

    /// Reconstructed (y) versus generator-level (x) candidate mass
    pub mass_response: Histogram2D,

    /// Event counts
    pub cut_flow: CutFlow,
}
//
impl AnalysisHistograms {
    /// Book every histogram
    pub fn new() -> Self {
        let reco = Species::SELECTED
            .into_iter()
            .map(|species| {
                let levels = SelectionLevel::ALL
                    .into_iter()
                    .map(|level| {
                        (
                            level.to_string(),
                            KinematicHistos::new("reco", species.name(), level),
                        )
                    })
                    .collect();
                (species.to_string(), levels)
            })
            .collect();
        let reco_id = Species::SELECTED
            .into_iter()
            .map(|species| {
                let levels = SelectionLevel::ALL
                    .into_iter()
                    .filter_map(|level| {
                        IdentificationHistos::new("reco", species, level)
                            .map(|histos| (level.to_string(), histos))
                    })
                    .collect();
                (species.to_string(), levels)
            })
            .collect();
        let gen = Species::SELECTED
            .into_iter()
            .map(|species| {
                (
                    species.to_string(),
                    KinematicHistos::new("gen", species.name(), SelectionLevel::All),
                )
            })
            .collect();
        let hvy_res = Species::Composite.name();
        let final_level = SelectionLevel::FINAL;
        let mass_axis = Axis::new(3500, -0.5, 6999.5);
        Self {
            reco,
            reco_id,
            gen,
            hvy_res_reco: KinematicHistos::new("reco", hvy_res, final_level),
            hvy_res_gen: KinematicHistos::new("gen", hvy_res, final_level),
            daughter_delta_r: Histogram1D::new(
                format!("h_reco_{hvy_res}_dR_{final_level}"),
                102,
                -0.05,
                5.05,
            ),
            mass_resolution: Histogram1D::new(
                format!("h_{hvy_res}_massResol_{final_level}"),
                100,
                -2.5,
                2.5,
            ),
            mass_response: Histogram2D::new(
                format!("h_{hvy_res}_massReco_vs_massGen_{final_level}"),
                mass_axis,
                mass_axis,
            ),
            cut_flow: CutFlow::default(),
        }
    }

    /// Reconstructed object histograms of a species and level
    pub fn reco(&self, species: Species, level: SelectionLevel) -> Option<&KinematicHistos> {
        self.reco.get(species.name())?.get(level.name())
    }

    /// Reconstructed object identification histograms of a species and level
    pub fn reco_id(
        &self,
        species: Species,
        level: SelectionLevel,
    ) -> Option<&IdentificationHistos> {
        self.reco_id.get(species.name())?.get(level.name())
    }

    /// Generator daughter histograms of a species
    pub fn gen(&self, species: Species) -> Option<&KinematicHistos> {
        self.gen.get(species.name())
    }

    /// Every histogram, in a stable order
    pub fn histograms(&self) -> Vec<&Histogram1D> {
        let kinematics = self
            .reco
            .values()
            .flat_map(BTreeMap::values)
            .chain(self.gen.values())
            .chain([&self.hvy_res_reco, &self.hvy_res_gen]);
        let identification = self
            .reco_id
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(IdentificationHistos::histograms);
        kinematics
            .flat_map(KinematicHistos::histograms)
            .chain(identification)
            .chain([&self.daughter_delta_r, &self.mass_resolution])
            .collect()
    }

    /// Every 2D histogram, in a stable order
    pub fn histograms_2d(&self) -> Vec<&Histogram2D> {
        self.reco_id
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(IdentificationHistos::histograms_2d)
            .chain([&self.mass_response])
            .collect()
    }
}
//
impl Default for AnalysisHistograms {
    fn default() -> Self {
        Self::new()
    }
}
//
impl EventSink for AnalysisHistograms {
    fn event_read(&mut self) {
        self.cut_flow.read += 1;
    }

    fn record(&mut self, summary: &EventSummary) {
        self.cut_flow.triggered += 1;

        for (species, levels) in &summary.selected {
            for (level, objects) in levels {
                if let Some(histos) = self
                    .reco
                    .get_mut(species.name())
                    .and_then(|by_level| by_level.get_mut(level.name()))
                {
                    histos.fill_all(objects);
                }
                if let Some(histos) = self
                    .reco_id
                    .get_mut(species.name())
                    .and_then(|by_level| by_level.get_mut(level.name()))
                {
                    for object in objects {
                        histos.fill(object);
                    }
                }
            }
        }

        // Only species with generator daughters get a multiplicity entry
        if let Some(gen_daughters) = &summary.gen_daughters {
            for (species, particles) in gen_daughters {
                if particles.is_empty() {
                    continue;
                }
                if let Some(histos) = self.gen.get_mut(species.name()) {
                    histos.fill_all(particles);
                }
            }
        }

        let Some(candidate) = &summary.candidate else {
            return;
        };
        self.cut_flow.with_candidate += 1;
        self.hvy_res_reco.fill(&candidate.composite);
        self.daughter_delta_r.fill(candidate.delta_r);

        if let Some(gen_candidate) = &summary.gen_candidate {
            self.cut_flow.with_gen_candidate += 1;
            self.hvy_res_gen.fill(gen_candidate);
            let gen_mass = gen_candidate.mass();
            self.mass_response.fill(gen_mass, candidate.mass());
            if gen_mass != 0. {
                self.mass_resolution
                    .fill((candidate.mass() - gen_mass) / gen_mass);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::DaughterPair, candidate, momentum::from_pt_eta_phi_m, numeric::floats,
    };

    #[test]
    fn binning_edges() {
        let mut histo = Histogram1D::new("h", 4, 0., 2.);
        assert_eq!(histo.bin_of(0.), Some(0));
        assert_eq!(histo.bin_of(0.49), Some(0));
        assert_eq!(histo.bin_of(0.5), Some(1));
        assert_eq!(histo.bin_of(1.999), Some(3));
        assert_eq!(histo.bin_of(2.), None);
        assert_eq!(histo.bin_of(-0.1), None);

        for value in [-1., 0.2, 0.6, 1.9, 2., floats::INFINITY, floats::NEG_INFINITY, floats::NAN] {
            histo.fill(value);
        }
        assert_eq!(histo.counts, vec![1, 1, 0, 1]);
        assert_eq!(histo.underflow, 2);
        assert_eq!(histo.overflow, 2);
        assert_eq!(histo.invalid, 1);
        assert_eq!(histo.entries(), 8);
        let mean = histo.mean().expect("in-range entries");
        assert!((mean - 0.9).abs() < 1e-6);
        assert_eq!(Histogram1D::new("empty", 1, 0., 1.).mean(), None);
    }

    fn lepton(species: Species, pt: Float, eta: Float, phi: Float, charge: Float) -> PhysicsObject {
        let mut obj = PhysicsObject::new(species, from_pt_eta_phi_m(pt, eta, phi, species.rest_mass()));
        obj.charge = charge;
        obj
    }

    fn summary() -> EventSummary {
        let muons = vec![lepton(Species::Muon, 60., 0.1, 0.2, 1.)];
        let taus = vec![
            lepton(Species::Tau, 55., -1.2, 2.9, -1.),
            lepton(Species::Tau, 25., 0.5, -1., 1.),
        ];
        let mut selected = BTreeMap::new();
        selected.insert(
            Species::Muon,
            SelectionLevel::ALL
                .into_iter()
                .map(|level| (level, muons.clone()))
                .collect(),
        );
        selected.insert(
            Species::Tau,
            SelectionLevel::ALL
                .into_iter()
                .map(|level| (level, taus.clone()))
                .collect(),
        );
        let candidate = candidate::build(&muons, &taus, -1., true);
        let gen_candidate = candidate.as_ref().map(|cand| {
            let mut gen = cand.composite.clone();
            gen.momentum *= 1.25;
            gen
        });
        let mut gen_daughters = BTreeMap::new();
        gen_daughters.insert(Species::Muon, muons.clone());
        gen_daughters.insert(Species::Tau, Vec::new());
        EventSummary {
            daughters: DaughterPair::from_pdg_ids(13, 15).expect("mu tau"),
            gen_daughters: Some(gen_daughters),
            selected,
            matches: BTreeMap::new(),
            candidate,
            gen_candidate,
        }
    }

    #[test]
    fn summaries_fill_every_tier() {
        let mut histos = AnalysisHistograms::new();
        histos.event_read();
        histos.event_read();
        histos.record(&summary());
        assert_eq!(
            histos.cut_flow,
            CutFlow {
                read: 2,
                triggered: 1,
                with_candidate: 1,
                with_gen_candidate: 1,
            }
        );

        let taus = histos.reco(Species::Tau, SelectionLevel::Kin).expect("booked");
        assert_eq!(taus.multiplicity.bin_of(2.), Some(2));
        assert_eq!(taus.multiplicity.counts[2], 1);
        assert_eq!(taus.pt.in_range(), 2);
        assert_eq!(taus.dxy.entries(), 0);
        let electrons = histos.reco(Species::Electron, SelectionLevel::All).expect("booked");
        assert_eq!(electrons.multiplicity.entries(), 0);

        let gen_muons = histos.gen(Species::Muon).expect("booked");
        assert_eq!(gen_muons.multiplicity.entries(), 1);
        let gen_taus = histos.gen(Species::Tau).expect("booked");
        assert_eq!(gen_taus.multiplicity.entries(), 0);

        assert_eq!(histos.hvy_res_reco.mass.in_range(), 1);
        assert_eq!(histos.daughter_delta_r.in_range(), 1);
        // Scaling the 4-momentum by 1.25 scales the mass too: (1 - 1.25) / 1.25
        let resolution = histos.mass_resolution.mean().expect("filled");
        assert!((resolution + 0.2).abs() < 1e-6);
        assert_eq!(histos.mass_response.in_range(), 1);
    }

    #[test]
    fn muon_identification_follows_attributes() {
        let mut histos = IdentificationHistos::new("reco", Species::Muon, SelectionLevel::Kin)
            .expect("muons are identified");
        assert_eq!(histos.id_label.name, "h_reco_mu_idLabel_kin");
        assert_eq!(histos.labels.len(), MUON_ID_FLAGS.len());

        let mut muon = lepton(Species::Muon, 60., 0.1, 0.2, 1.);
        for (attribute, value) in [
            ("isGlobalMuon", 1.),
            ("isHighPtMuon", 1.),
            ("isPFMuon", 0.),
            ("numberOfValidMuonHits", 25.),
            ("normChi2", 2.),
        ] {
            muon.attributes.insert(attribute.to_owned(), value);
        }
        histos.fill(&muon);

        assert_eq!(histos.id_label.counts, vec![1, 1, 0, 0, 0]);
        // Only the recorded hit count is filled, in the row of its kind
        let global_hits = &histos.hits["isGlobalMuon"];
        assert_eq!(global_hits.in_range(), 1);
        assert_eq!(global_hits.count(25, 1), 1);
        assert_eq!(histos.hits["isPFMuon"].entries(), 0);
        assert_eq!(histos.scores["normChi2"].in_range(), 1);
        assert_eq!(histos.scores["isoTrackerBased03"].entries(), 0);
        assert!(histos.decay_mode_new_vs_old.is_none());
    }

    #[test]
    fn tau_identification_uses_decay_modes() {
        let mut histos = IdentificationHistos::new("reco", Species::Tau, SelectionLevel::All)
            .expect("taus are identified");
        assert_eq!(histos.labels[6], "3 prongs + 0 pi0s");
        assert!(histos.hits.is_empty());

        let mut three_prongs = lepton(Species::Tau, 50., 0., 0., -1.);
        three_prongs.attributes.insert("decayMode".to_owned(), 10.);
        three_prongs.attributes.insert("decayModeFinding".to_owned(), 1.);
        three_prongs.attributes.insert("decayModeFindingNewDMs".to_owned(), 1.);
        three_prongs
            .attributes
            .insert("byTightIsolationMVArun2v1DBoldDMwLT".to_owned(), 0.);
        let mut unknown_mode = lepton(Species::Tau, 30., 0., 1., 1.);
        unknown_mode.attributes.insert("decayMode".to_owned(), 3.);
        histos.fill(&three_prongs);
        histos.fill(&unknown_mode);

        assert_eq!(histos.id_label.in_range(), 1);
        assert_eq!(histos.id_label.counts[6], 1);
        let iso = &histos.scores["byTightIsolationMVArun2v1DBoldDMwLT"];
        assert_eq!(iso.name, "h_reco_tau_tightIsoMVArun2v1DBoldDMwLT_all");
        assert_eq!(iso.in_range(), 1);
        let new_vs_old = histos.decay_mode_new_vs_old.as_ref().expect("tau only");
        assert_eq!(new_vs_old.in_range(), 1);

        assert!(IdentificationHistos::new("reco", Species::Composite, SelectionLevel::All).is_none());
    }

    #[test]
    fn sparse_2d_cells() {
        let mut histo = Histogram2D::new("h2", Axis::new(2, 0., 2.), Axis::new(2, 0., 2.));
        histo.fill(0.5, 1.5);
        histo.fill(0.5, 1.5);
        histo.fill(3., 0.5);
        histo.fill(floats::NAN, 0.5);
        assert_eq!(histo.count(0, 1), 2);
        assert_eq!(histo.count(1, 1), 0);
        assert_eq!((histo.in_range(), histo.outside, histo.invalid), (2, 1, 1));
        let json = serde_json::to_value(&histo).expect("serializable");
        assert_eq!(json["cells"], serde_json::json!([[0, 1, 2]]));
    }

    #[test]
    fn histogram_names_are_unique() {
        let histos = AnalysisHistograms::new();
        let names = histos
            .histograms()
            .into_iter()
            .map(|histo| histo.name.as_str())
            .collect::<std::collections::BTreeSet<_>>();
        assert_eq!(names.len(), histos.histograms().len());
        assert!(names.contains("h_reco_mu_pt_kin-id-iso"));
        assert!(names.contains("h_gen_HvyRes_mass_kin-id-iso"));
        assert!(names.contains("h_reco_el_idLabel_all"));

        let names_2d = histos
            .histograms_2d()
            .into_iter()
            .map(|histo| histo.name.as_str())
            .collect::<std::collections::BTreeSet<_>>();
        assert_eq!(names_2d.len(), histos.histograms_2d().len());
        assert!(names_2d.contains("h_reco_mu_isGlobalMuon_hits_kin"));
        assert!(names_2d.contains("h_HvyRes_massReco_vs_massGen_kin-id-iso"));
    }

    #[test]
    fn histograms_serialize_to_json() {
        let mut histos = AnalysisHistograms::new();
        histos.record(&summary());
        let json = serde_json::to_value(&histos).expect("serializable");
        assert_eq!(json["cut_flow"]["with_candidate"], 1);
        assert_eq!(
            json["reco"]["mu"]["kin"]["multiplicity"]["counts"][1],
            1
        );
    }
}
