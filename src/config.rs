//! Mechanism for loading and sharing the analysis configuration

use crate::{
    analyzer::DaughterPair,
    candidate::PairingCuts,
    numeric::Float,
    object::Species,
    selection::{CutSet, FillPolicy, SelectionLevel, SelectionTable},
    selector::{MuonTrack, ObjectSelector, SpeciesBranches},
    Result,
};

use clap::Parser;
use eyre::{ensure, WrapErr};
use tracing::{info, warn};

use std::path::{Path, PathBuf};

/// Triggers whose logical OR is required when none are specified
pub const DEFAULT_TRIGGERS: &str = "trig_HLT_Mu50_accept,trig_HLT_TkMu50_accept";

/// Command line interface of the analysis
#[derive(Clone, Debug, Parser)]
#[command(
    name = "lfv_analysis",
    version,
    about = "Search for a heavy resonance decaying to two leptons of different flavours"
)]
pub struct Cli {
    /// Event records to be analyzed (JSON lines, one event per line)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Stop after this many events (all events when not set)
    #[arg(short = 'n', long)]
    pub num_evts: Option<usize>,

    /// Text summary to be written, histograms go next to it as JSON
    #[arg(short, long, default_value = "lfv_results.txt")]
    pub output: PathBuf,

    /// Log progress every this many events
    #[arg(long, default_value_t = 100)]
    pub print_lvl: usize,

    /// Print the generator particle list of every event
    #[arg(long)]
    pub print_gen: bool,

    /// Print the trigger decisions of every event
    #[arg(long)]
    pub print_trig: bool,

    /// Print the heavy resonance candidate of every event
    #[arg(long)]
    pub print_hvy_res: bool,

    /// Triggers whose logical OR must fire (comma separated)
    #[arg(short, long, value_delimiter = ',', default_value = DEFAULT_TRIGGERS)]
    pub triggers: Vec<String>,

    /// Do not apply any trigger requirement
    #[arg(long)]
    pub no_trigger: bool,

    /// Input is collision data (no generator information)
    #[arg(long)]
    pub is_data: bool,

    /// Skip the generator level analysis
    #[arg(long)]
    pub no_gen: bool,

    /// Minimal angular separation between the resonance daughters
    #[arg(long, default_value_t = -1., allow_hyphen_values = true)]
    pub min_dr: Float,

    /// Require the resonance daughters to have opposite charges
    #[arg(long)]
    pub opposite_sign: bool,

    /// PDG id of the first resonance daughter
    #[arg(long, default_value_t = 13, allow_hyphen_values = true)]
    pub sig_pdg_id1: i32,

    /// PDG id of the second resonance daughter
    #[arg(long, default_value_t = 15, allow_hyphen_values = true)]
    pub sig_pdg_id2: i32,

    /// Take muon kinematics from the global track instead of the inner best track
    #[arg(long)]
    pub use_global_muon_track: bool,

    /// Electron selection table
    #[arg(long)]
    pub sel_file_el: Option<PathBuf>,

    /// Muon selection table
    #[arg(long)]
    pub sel_file_mu: Option<PathBuf>,

    /// Tau selection table
    #[arg(long)]
    pub sel_file_tau: Option<PathBuf>,

    /// Event filter table (cuts on per-event branches such as noise flags)
    #[arg(long)]
    pub sel_file_evt: Option<PathBuf>,

    /// Fill levels missing from a selection table from their nearest
    /// predecessor instead of the last declared level
    #[arg(long)]
    pub fill_from_ancestor: bool,

    /// Maximal angular separation of a reco/gen match
    #[arg(long, default_value_t = 0.3)]
    pub max_match_dr: Float,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}
//
impl Cli {
    /// Selection table configured for a species
    fn selection_file(&self, species: Species) -> Option<&Path> {
        match species {
            Species::Electron => self.sel_file_el.as_deref(),
            Species::Muon => self.sel_file_mu.as_deref(),
            Species::Tau => self.sel_file_tau.as_deref(),
            Species::Composite | Species::Other => None,
        }
    }
}

/// Which per-event reports are printed out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reports {
    /// Generator particle list
    pub gen_list: bool,

    /// Trigger decisions
    pub triggers: bool,

    /// Heavy resonance candidate and its daughters
    pub hvy_res: bool,
}

/// Analysis configuration
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Event records to be analyzed
    pub input: PathBuf,

    /// Text summary destination
    pub output: PathBuf,

    /// Maximal number of events to be read
    pub num_events: Option<usize>,

    /// Progress logging period, in events
    pub print_lvl: usize,

    /// Per-event printouts
    pub reports: Reports,

    /// Triggers whose OR must fire, none for no trigger requirement
    pub triggers: Option<Vec<String>>,

    /// Whether the input is collision data
    pub is_data: bool,

    /// Whether the generator level analysis was requested
    pub analyze_gen: bool,

    /// Species of the heavy resonance daughters
    pub daughters: DaughterPair,

    /// Requirements on the daughter pair
    pub pairing: PairingCuts,

    /// Maximal angular separation of a reco/gen match
    pub max_match_dr: Float,

    /// Muon track choice
    pub muon_track: MuonTrack,

    /// Handling of levels missing from the selection tables
    pub fill_policy: FillPolicy,

    /// Object selection of every species
    pub selectors: Vec<ObjectSelector>,

    /// Cuts on per-event branches, all of which an event must pass after
    /// the trigger requirement
    pub event_filters: CutSet,
}
//
impl Configuration {
    /// Build the configuration from the command line, check it, and print it
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        ensure!(cli.print_lvl > 0, "The progress period must be at least one event");
        ensure!(
            cli.max_match_dr > 0.,
            "The maximal matching separation must be positive, got {}",
            cli.max_match_dr
        );

        let daughters = DaughterPair::from_pdg_ids(cli.sig_pdg_id1, cli.sig_pdg_id2)
            .wrap_err("Failed to set up the heavy resonance daughters")?;

        let fill_policy = if cli.fill_from_ancestor {
            FillPolicy::NearestAncestor
        } else {
            FillPolicy::LastSeen
        };
        let muon_track = if cli.use_global_muon_track {
            MuonTrack::Global
        } else {
            MuonTrack::InnerBest
        };

        let mut selectors = Vec::with_capacity(Species::SELECTED.len());
        for species in Species::SELECTED {
            let table = load_table(species, cli.selection_file(species), fill_policy)?;
            let branches = SpeciesBranches::for_species(species, muon_track)
                .ok_or_else(|| eyre::eyre!("No branch layout for species {species}"))?;
            selectors.push(ObjectSelector::new(branches, table));
        }

        let event_filters = match &cli.sel_file_evt {
            Some(path) => SelectionTable::load(path, fill_policy)
                .wrap_err("Failed to load the event filters")?
                .cuts(SelectionLevel::FINAL)
                .clone(),
            None => CutSet::new(),
        };

        let config = Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            num_events: cli.num_evts,
            print_lvl: cli.print_lvl,
            reports: Reports {
                gen_list: cli.print_gen,
                triggers: cli.print_trig,
                hvy_res: cli.print_hvy_res,
            },
            triggers: (!cli.no_trigger).then(|| cli.triggers.clone()),
            is_data: cli.is_data,
            analyze_gen: !cli.no_gen,
            daughters,
            pairing: PairingCuts {
                min_separation: cli.min_dr,
                require_opposite_sign: cli.opposite_sign,
            },
            max_match_dr: cli.max_match_dr,
            muon_track,
            fill_policy,
            selectors,
            event_filters,
        };
        config.print();
        Ok(config)
    }

    /// Truth that generator level information is to be used
    pub fn gen_enabled(&self) -> bool {
        !self.is_data && self.analyze_gen
    }

    /// Object selection of a species
    pub fn selector(&self, species: Species) -> Option<&ObjectSelector> {
        self.selectors.iter().find(|sel| sel.species() == species)
    }

    /// Log the configuration
    pub fn print(&self) {
        info!("INPUT          : {}", self.input.display());
        info!("OUTPUT         : {}", self.output.display());
        match self.num_events {
            Some(num_events) => info!("NUMEVTS        : {num_events}"),
            None => info!("NUMEVTS        : all"),
        }
        info!("PRINTLVL       : {}", self.print_lvl);
        match &self.triggers {
            Some(triggers) => info!("TRIGGERS       : {}", triggers.join(" OR ")),
            None => info!("TRIGGERS       : none"),
        }
        info!("ISDATA         : {}", self.is_data);
        info!("ANAGEN         : {}", self.gen_enabled());
        info!("DAUGHTERS      : {}", self.daughters);
        info!("MINDR          : {}", self.pairing.min_separation);
        info!("OS             : {}", self.pairing.require_opposite_sign);
        info!("MAXMATCHDR     : {}", self.max_match_dr);
        info!("MUONTRACK      : {:?}", self.muon_track);
        info!("FILLPOLICY     : {:?}", self.fill_policy);
        for (branch, cut) in &self.event_filters {
            info!("EVENTFILTER    : {branch} {} {}", cut.operator, cut.threshold);
        }
        for selector in &self.selectors {
            for (level, cuts) in selector.table.iter() {
                info!(
                    species = %selector.species(),
                    level = %level,
                    "{} cut(s): {}",
                    cuts.len(),
                    cuts.iter()
                        .map(|(branch, cut)| format!("{branch} {} {}", cut.operator, cut.threshold))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }
}

/// Load the selection table of a species, falling back to no cut at all when
/// the species has no table
fn load_table(
    species: Species,
    path: Option<&Path>,
    policy: FillPolicy,
) -> Result<SelectionTable> {
    match path {
        Some(path) => SelectionTable::load(path, policy)
            .wrap_err_with(|| format!("Failed to load the {species} selection")),
        None => {
            warn!(
                species = %species,
                "no selection table configured, every {species} object will pass"
            );
            Ok(SelectionTable::permissive())
        }
    }
}
