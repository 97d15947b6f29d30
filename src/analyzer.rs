//! Event-by-event driver of the analysis
//!
//! Every event goes through the same stages: trigger requirement, event
//! filters, generator particle selection, reconstructed object selection at every level,
//! reco/gen matching, and construction of the heavy resonance candidate. The
//! outcome is handed over to an `EventSink`.

use crate::{
    candidate::CandidatePair,
    config::Configuration,
    errors::{ConfigError, EventError},
    event::EventRecord,
    matching::{match_objects, MatchOutcome},
    numeric::Float,
    object::{PhysicsObject, Species, PDG_ELECTRON, PDG_MUON, PDG_TAU},
    output,
    selection::SelectionLevel,
    selector::{select_gen_daughters, GenBranches, GEN_STATUS_HARD_PROCESS},
};
use std::{collections::BTreeMap, io::Write};
use tracing::{debug, info};

/// Species of the two heavy resonance daughters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaughterPair {
    /// Species of the first daughter
    pub first: Species,

    /// Species of the second daughter
    pub second: Species,
}
//
impl DaughterPair {
    /// Resolve the daughter species from their PDG ids, in either order
    pub fn from_pdg_ids(pdg_id1: i32, pdg_id2: i32) -> Result<Self, ConfigError> {
        let (first, second) = match (pdg_id1.min(pdg_id2), pdg_id1.max(pdg_id2)) {
            (PDG_MUON, PDG_TAU) => (Species::Muon, Species::Tau),
            (PDG_ELECTRON, PDG_MUON) => (Species::Electron, Species::Muon),
            (PDG_ELECTRON, PDG_TAU) => (Species::Electron, Species::Tau),
            _ => {
                return Err(ConfigError::UnsupportedDaughterPair {
                    first: pdg_id1,
                    second: pdg_id2,
                })
            }
        };
        Ok(Self { first, second })
    }

    /// Both daughter species
    pub fn species(&self) -> [Species; 2] {
        [self.first, self.second]
    }
}
//
impl std::fmt::Display for DaughterPair {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{} + {}", self.first, self.second)
    }
}

/// Everything the analysis found in an event which passed the trigger and
/// the event filters
#[derive(Clone, Debug, PartialEq)]
pub struct EventSummary {
    /// Species of the resonance daughters
    pub daughters: DaughterPair,

    /// Hard-process generator daughters per species, if the generator level
    /// was analyzed
    pub gen_daughters: Option<BTreeMap<Species, Vec<PhysicsObject>>>,

    /// Reconstructed objects per species and selection level
    pub selected: BTreeMap<Species, BTreeMap<SelectionLevel, Vec<PhysicsObject>>>,

    /// Reco/gen matching of the final-level daughters, per species
    pub matches: BTreeMap<Species, MatchOutcome>,

    /// Heavy resonance candidate
    pub candidate: Option<CandidatePair>,

    /// Generator-level counterpart of the candidate
    pub gen_candidate: Option<PhysicsObject>,
}
//
impl EventSummary {
    /// Objects of a species which passed a selection level
    pub fn selected(&self, species: Species, level: SelectionLevel) -> &[PhysicsObject] {
        self.selected
            .get(&species)
            .and_then(|levels| levels.get(&level))
            .map_or(&[], Vec::as_slice)
    }

    /// Generator daughters of a species
    pub fn gen_daughters(&self, species: Species) -> &[PhysicsObject] {
        self.gen_daughters
            .as_ref()
            .and_then(|gen| gen.get(&species))
            .map_or(&[], Vec::as_slice)
    }

    /// Reconstructed daughters of the candidate
    pub fn candidate_daughters(&self) -> Option<(&PhysicsObject, &PhysicsObject)> {
        let candidate = self.candidate.as_ref()?;
        Some(candidate.daughters(
            self.selected(self.daughters.first, SelectionLevel::FINAL),
            self.selected(self.daughters.second, SelectionLevel::FINAL),
        ))
    }
}

/// Receiver of the per-event analysis results
pub trait EventSink {
    /// Called for every event that was read, before the trigger requirement
    fn event_read(&mut self) {}

    /// Called for every event which passed the trigger and the event filters
    fn record(&mut self, summary: &EventSummary);
}

/// Event counts of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Events read from the input
    pub read: usize,

    /// Events which passed the trigger requirement and the event filters
    pub triggered: usize,

    /// Events with a heavy resonance candidate
    pub with_candidate: usize,
}

/// Per-event analysis, as set up by the configuration
pub struct Analyzer<'cfg> {
    /// Analysis configuration
    cfg: &'cfg Configuration,

    /// Where generator particles live in the record
    gen_branches: GenBranches,
}
//
impl<'cfg> Analyzer<'cfg> {
    /// Prepare for analysis
    pub fn new(cfg: &'cfg Configuration) -> Self {
        Self {
            cfg,
            gen_branches: GenBranches::default(),
        }
    }

    /// Analyze every event of a source, sending the results to a sink
    ///
    /// Per-event reports requested by the configuration go to `report`.
    ///
    pub fn run<E, S>(
        &self,
        events: impl IntoIterator<Item = Result<E, EventError>>,
        sink: &mut S,
        report: &mut impl Write,
    ) -> Result<RunStats, EventError>
    where
        E: EventRecord,
        S: EventSink + ?Sized,
    {
        let print_lvl = self.cfg.print_lvl.max(1);
        let mut stats = RunStats::default();
        for event in events {
            if self.cfg.num_events.map_or(false, |max| stats.read >= max) {
                break;
            }
            let event = event?;
            stats.read += 1;
            sink.event_read();
            if stats.read % print_lvl == 0 {
                info!("Processed {} events", stats.read);
            }

            let Some(summary) = self.process_event(&event, report)? else {
                continue;
            };
            stats.triggered += 1;
            if summary.candidate.is_some() {
                stats.with_candidate += 1;
            }
            sink.record(&summary);
        }
        info!(
            read = stats.read,
            triggered = stats.triggered,
            with_candidate = stats.with_candidate,
            "Analysis finished"
        );
        Ok(stats)
    }

    /// Analyze one event, returning nothing if it fails the trigger or an
    /// event filter
    pub fn process_event<E: EventRecord + ?Sized>(
        &self,
        event: &E,
        report: &mut impl Write,
    ) -> Result<Option<EventSummary>, EventError> {
        if !self.trigger_fired(event, report)? || !self.passes_event_filters(event)? {
            return Ok(None);
        }
        let daughters = self.cfg.daughters;

        // Generator level
        let mut gen_daughters = if self.cfg.gen_enabled() {
            let particles = self.gen_branches.all_particles(event)?;
            if self.cfg.reports.gen_list {
                output::write_gen_table(report, &particles).map_err(EventError::Report)?;
            }
            Some(select_gen_daughters(
                &particles,
                &daughters.species(),
                GEN_STATUS_HARD_PROCESS,
            ))
        } else {
            None
        };

        // Reconstruction level
        let mut selected = BTreeMap::new();
        for selector in &self.cfg.selectors {
            selected.insert(selector.species(), selector.select_all_levels(event)?);
        }

        // Reco/gen matching of the final-level daughters
        let mut matches = BTreeMap::new();
        if let Some(gen_daughters) = &mut gen_daughters {
            for species in daughters.species() {
                let Some(reco) = selected
                    .get_mut(&species)
                    .and_then(|levels| levels.get_mut(&SelectionLevel::FINAL))
                else {
                    continue;
                };
                let gen = gen_daughters.entry(species).or_default();
                matches.insert(species, match_objects(reco, gen, self.cfg.max_match_dr));
            }
        }

        let mut summary = EventSummary {
            daughters,
            gen_daughters,
            selected,
            matches,
            candidate: None,
            gen_candidate: None,
        };
        summary.candidate = self.cfg.pairing.build(
            summary.selected(daughters.first, SelectionLevel::FINAL),
            summary.selected(daughters.second, SelectionLevel::FINAL),
        );
        summary.gen_candidate = gen_counterpart(&summary);
        debug!(
            candidate = summary.candidate.is_some(),
            gen_candidate = summary.gen_candidate.is_some(),
            "Event analyzed"
        );

        if self.cfg.reports.hvy_res {
            self.report_candidate(&summary, report)
                .map_err(EventError::Report)?;
        }
        Ok(Some(summary))
    }

    /// Evaluate the OR of the configured triggers (always true without any)
    fn trigger_fired<E: EventRecord + ?Sized>(
        &self,
        event: &E,
        report: &mut impl Write,
    ) -> Result<bool, EventError> {
        let Some(triggers) = &self.cfg.triggers else {
            return Ok(true);
        };
        let decisions = triggers
            .iter()
            .map(|name| -> Result<(&str, Float), EventError> {
                Ok((name.as_str(), event.scalar(name)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let fired = decisions.iter().any(|&(_, decision)| decision > 0.);
        if self.cfg.reports.triggers {
            output::write_trigger_table(report, &decisions, fired).map_err(EventError::Report)?;
        }
        Ok(fired)
    }

    /// Check every event filter, each of which reads a per-event branch
    fn passes_event_filters<E: EventRecord + ?Sized>(&self, event: &E) -> Result<bool, EventError> {
        for (branch, cut) in &self.cfg.event_filters {
            if !cut.passes(event.scalar(branch)?) {
                debug!(branch = %branch, "Event rejected by filter");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Print out the candidate and its daughters at reco and gen level
    fn report_candidate(&self, summary: &EventSummary, report: &mut impl Write) -> std::io::Result<()> {
        let (Some(candidate), Some((dau1, dau2))) =
            (&summary.candidate, summary.candidate_daughters())
        else {
            return Ok(());
        };
        writeln!(report, "reco info:")?;
        output::write_object_table(report, &[dau1, dau2, &candidate.composite])?;
        if let Some(gen_candidate) = &summary.gen_candidate {
            let (gen1, gen2) = gen_daughters_of(summary);
            let mut gen_objects = gen1.into_iter().chain(gen2).collect::<Vec<_>>();
            gen_objects.push(gen_candidate);
            writeln!(report, "gen info:")?;
            output::write_object_table(report, &gen_objects)?;
        }
        Ok(())
    }
}

/// Generator objects that the candidate daughters correspond to
///
/// These are the matched generator daughters when both reconstructed
/// daughters were matched, and otherwise the first generator daughter of each
/// species.
///
fn gen_daughters_of(summary: &EventSummary) -> (Option<&PhysicsObject>, Option<&PhysicsObject>) {
    let gen1 = summary.gen_daughters(summary.daughters.first);
    let gen2 = summary.gen_daughters(summary.daughters.second);
    let matched = summary
        .candidate_daughters()
        .and_then(|(dau1, dau2)| Some((dau1.matched?, dau2.matched?)));
    match matched {
        Some((match1, match2)) => (gen1.get(match1.index), gen2.get(match2.index)),
        None => (gen1.first(), gen2.first()),
    }
}

/// Build the generator-level counterpart of the candidate
fn gen_counterpart(summary: &EventSummary) -> Option<PhysicsObject> {
    summary.candidate.as_ref()?;
    match gen_daughters_of(summary) {
        (Some(gen1), Some(gen2)) => Some(PhysicsObject::composite(gen1, gen2)),
        _ => None,
    }
}
