//! End-to-end run of the analysis over a small event file

use clap::Parser;
use lfv_analysis::{
    analyzer::{Analyzer, RunStats},
    config::{Cli, Configuration},
    event::JsonLinesReader,
    histos::AnalysisHistograms,
    object::Species,
    output,
    selection::SelectionLevel,
};
use serde_json::{json, Value};
use std::{fs, path::Path, time::Duration};

const MUON_SELECTION: &str = "\
| selLvl | parentLvl | branchName | Value | Operator |
| :----: | :-------: | :--------: | :---: | :------: |
| all | None | mu_ibt_pt | 0 | ge |
| kin | all | mu_ibt_pt | 53 | ge |
| kin | all | mu_ibt_eta | 2.4 | fabs-le |
# identification
| kin-id | kin | mu_isHighPtMuon | 0 | g |
";

const TAU_SELECTION: &str = "\
| selLvl | parentLvl | branchName | Value | Operator |
| :----: | :-------: | :--------: | :---: | :------: |
| all | none | tau_pt | 0 | ge |
| kin | all | tau_pt | 20 | ge |
| kin-id | kin | tau_decayModeFinding | 0.5 | g |
| kin-id-iso | kin-id | tau_byTightIsolationMVArun2v1DBoldDMwLT | 0.5 | g |
";

/// One muon, one tau and their generator counterparts
fn event(trigger: bool, tau_pt: f64) -> Value {
    json!({
        "trig_HLT_Mu50_accept": false,
        "trig_HLT_TkMu50_accept": trigger,
        "gsf_n": 0,
        "mu_n": 1,
        "mu_ibt_px": [60.0],
        "mu_ibt_py": [0.0],
        "mu_ibt_pz": [10.0],
        "mu_ibt_pt": [60.0],
        "mu_ibt_eta": [0.1659],
        "mu_ibt_charge": [1],
        "mu_isHighPtMuon": [true],
        "tau_n": 1,
        "tau_px": [-50.0],
        "tau_py": [1.0],
        "tau_pz": [-20.0],
        "tau_energy": [54.0],
        "tau_pt": [tau_pt],
        "tau_charge": [-1],
        "tau_dxy": [0.01],
        "tau_decayModeFinding": [1],
        "tau_byTightIsolationMVArun2v1DBoldDMwLT": [1],
        "mc_px": [61.0, -49.0],
        "mc_py": [0.0, 1.0],
        "mc_pz": [10.0, -20.0],
        "mc_energy": [62.0, 53.0],
        "mc_pdgId": [-13, 15],
        "mc_status": [23, 23],
        "mc_charge": [1, -1],
    })
}

fn write_inputs(dir: &Path) {
    let events = [event(true, 50.01), event(false, 50.01), event(true, 15.0)]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n\n");
    fs::write(dir.join("events.jsonl"), events).expect("write events");
    fs::write(dir.join("mu.sel"), MUON_SELECTION).expect("write muon selection");
    fs::write(dir.join("tau.sel"), TAU_SELECTION).expect("write tau selection");
}

fn configuration(dir: &Path, extra: &[&str]) -> Configuration {
    let path = |name: &str| dir.join(name).to_str().expect("utf-8 path").to_owned();
    let mut args = vec![
        "lfv_analysis".to_owned(),
        "-i".to_owned(),
        path("events.jsonl"),
        "-o".to_owned(),
        path("results.txt"),
        "--sel-file-mu".to_owned(),
        path("mu.sel"),
        "--sel-file-tau".to_owned(),
        path("tau.sel"),
        "--opposite-sign".to_owned(),
        "--min-dr".to_owned(),
        "0.3".to_owned(),
    ];
    args.extend(extra.iter().map(|arg| arg.to_string()));
    let cli = Cli::try_parse_from(args).expect("valid command line");
    Configuration::from_cli(&cli).expect("valid configuration")
}

fn analyze(cfg: &Configuration) -> (RunStats, AnalysisHistograms) {
    let events = JsonLinesReader::open(&cfg.input).expect("readable events");
    let mut histos = AnalysisHistograms::new();
    let stats = Analyzer::new(cfg)
        .run(events, &mut histos, &mut std::io::sink())
        .expect("valid events");
    (stats, histos)
}

#[test]
fn full_analysis_run() {
    let dir = tempfile::tempdir().expect("temporary directory");
    write_inputs(dir.path());
    let cfg = configuration(dir.path(), &[]);
    let (stats, histos) = analyze(&cfg);

    assert_eq!(
        stats,
        RunStats {
            read: 3,
            triggered: 2,
            with_candidate: 1,
        }
    );
    assert_eq!(histos.cut_flow.read, 3);
    assert_eq!(histos.cut_flow.with_gen_candidate, 1);

    // Both triggered events have their muon at every level
    let muons = histos
        .reco(Species::Muon, SelectionLevel::FINAL)
        .expect("booked");
    assert_eq!(muons.multiplicity.counts[1], 2);
    let muon_id = histos
        .reco_id(Species::Muon, SelectionLevel::FINAL)
        .expect("booked");
    assert_eq!(muon_id.labels[1], "isHighPtMuon");
    assert_eq!(muon_id.id_label.counts[1], 2);
    assert_eq!(histos.mass_response.in_range(), 1);

    // The soft tau is only kept by the "all" level
    let taus_all = histos.reco(Species::Tau, SelectionLevel::All).expect("booked");
    assert_eq!(taus_all.pt.in_range(), 2);
    assert_eq!(taus_all.dxy.in_range(), 2);
    let taus_kin = histos.reco(Species::Tau, SelectionLevel::Kin).expect("booked");
    assert_eq!(taus_kin.multiplicity.counts[0], 1);
    assert_eq!(taus_kin.multiplicity.counts[1], 1);

    // Generator daughters are filled even without a candidate
    let gen_taus = histos.gen(Species::Tau).expect("booked");
    assert_eq!(gen_taus.multiplicity.entries(), 2);
    assert_eq!(histos.mass_resolution.in_range(), 1);
    assert!(histos.mass_resolution.mean().expect("filled").abs() < 0.01);

    output::dump_results(&cfg, &stats, &histos, Duration::from_millis(30))
        .expect("writable output");
    let summary = fs::read_to_string(dir.path().join("results.txt")).expect("summary");
    assert!(summary.contains(&format!(" {:<31}: 3\n", "Number of events")));
    assert!(summary.contains(&format!(" {:<31}: 1\n", "... with candidate")));
    assert!(summary.contains("mu + tau"));
    assert!(summary.contains("h_HvyRes_massReco_vs_massGen_kin-id-iso"));
    let json = fs::read_to_string(output::histograms_path(&cfg.output)).expect("histograms");
    let json: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(json["cut_flow"]["triggered"], 2);
}

#[test]
fn event_limit_and_data_mode() {
    let dir = tempfile::tempdir().expect("temporary directory");
    write_inputs(dir.path());
    let cfg = configuration(dir.path(), &["-n", "2", "--is-data"]);
    let (stats, histos) = analyze(&cfg);
    assert_eq!(stats.read, 2);
    assert_eq!(stats.triggered, 1);
    assert_eq!(histos.cut_flow.with_gen_candidate, 0);
    assert_eq!(histos.gen(Species::Muon).expect("booked").multiplicity.entries(), 0);
}

#[test]
fn missing_branch_aborts_the_run() {
    let dir = tempfile::tempdir().expect("temporary directory");
    write_inputs(dir.path());
    let cfg = configuration(dir.path(), &["-t", "trig_HLT_IsoMu24_accept"]);
    let events = JsonLinesReader::open(&cfg.input).expect("readable events");
    let err = Analyzer::new(&cfg)
        .run(events, &mut AnalysisHistograms::new(), &mut std::io::sink())
        .expect_err("unknown trigger");
    assert!(err.to_string().contains("trig_HLT_IsoMu24_accept"));
}

#[test]
fn malformed_line_is_reported() {
    let dir = tempfile::tempdir().expect("temporary directory");
    write_inputs(dir.path());
    let events_path = dir.path().join("events.jsonl");
    let mut events = fs::read_to_string(&events_path).expect("events");
    events.push_str("\n{\"mu_n\": \n");
    fs::write(&events_path, events).expect("write events");

    let cfg = configuration(dir.path(), &[]);
    let events = JsonLinesReader::open(&cfg.input).expect("readable events");
    let err = Analyzer::new(&cfg)
        .run(events, &mut AnalysisHistograms::new(), &mut std::io::sink())
        .expect_err("malformed record");
    assert!(err.to_string().contains(":6: malformed event record"));
}
