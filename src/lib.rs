//! LFV analysis: search for a heavy resonance decaying into two leptons of
//! different flavours
//!
//!
//! # Introduction (for the physicist)
//!
//! Some extensions of the Standard Model predict heavy neutral resonances
//! (Z′ bosons, R-parity violating sneutrinos...) which may decay into a pair of
//! leptons of different flavours: eμ, eτ or μτ. This program looks for such a
//! decay in collision records, by selecting electrons, muons and hadronic
//! taus, and building out of them the pair of highest invariant mass.
//!
//! On simulated samples, the hard-process generator particles are selected as
//! well and matched to the reconstructed objects, which gives access to the
//! resolution of the resonance mass.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The analysis runs in a purely sequential fashion:
//!
//! * read in the configuration and the per-species selection tables
//! * loop over events,
//!     * require one of the configured triggers to have fired,
//!     * select the generator particles of the resonance daughters,
//!     * select the reconstructed objects of every species at every level of
//!       the selection chain ("all" → "kin" → "kin-id" → "kin-id-iso"),
//!     * match the final reconstructed daughters to the generator ones,
//!     * build the heavy resonance candidate,
//!     * hand everything over to the histograms
//! * then store the histograms and a summary of the run.
//!
//! Selection tables are markdown-style tables of cuts, one row per cut, and
//! each level inherits the cuts of the level it was derived from.

#![warn(missing_docs)]

pub mod analyzer;
pub mod candidate;
pub mod config;
pub mod cut;
pub mod errors;
pub mod event;
pub mod histos;
pub mod matching;
pub mod momentum;
pub mod numeric;
pub mod object;
pub mod output;
pub mod selection;
pub mod selector;

/// We'll use eyre's type-erased result type at the application level
pub type Result<T> = eyre::Result<T>;
