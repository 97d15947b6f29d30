//! This module is in charge of outputting the analysis results to disk, and of
//! the markdown reports that can be printed for every event

use crate::{
    analyzer::RunStats,
    config::Configuration,
    histos::AnalysisHistograms,
    numeric::Float,
    object::PhysicsObject,
    Result,
};

use eyre::WrapErr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Number of significant digits in the text summary, as with printf's %g
const SIG_DIGITS: usize = 6;

/// Where the histograms go for a given text summary path
pub fn histograms_path(summary_path: &Path) -> PathBuf {
    summary_path.with_extension("json")
}

/// Output the analysis results to disk
pub fn dump_results(
    cfg: &Configuration,
    stats: &RunStats,
    histos: &AnalysisHistograms,
    elapsed_time: Duration,
) -> Result<()> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .wrap_err("Failed to format the run timestamp")?;

    // Text summary
    {
        let file = File::create(&cfg.output)
            .wrap_err_with(|| format!("Failed to create {}", cfg.output.display()))?;
        let mut out = BufWriter::new(file);
        write_summary(&mut out, cfg, stats, histos, &timestamp, elapsed_time)
            .and_then(|()| out.flush())
            .wrap_err_with(|| format!("Failed to write {}", cfg.output.display()))?;
    }

    // Histograms
    let json_path = histograms_path(&cfg.output);
    {
        let file = File::create(&json_path)
            .wrap_err_with(|| format!("Failed to create {}", json_path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, histos)
            .map_err(io::Error::from)
            .and_then(|()| out.flush())
            .wrap_err_with(|| format!("Failed to write {}", json_path.display()))?;
    }

    info!(
        summary = %cfg.output.display(),
        histograms = %json_path.display(),
        "Results written"
    );
    Ok(())
}

/// Write the text summary of a run
fn write_summary(
    out: &mut impl Write,
    cfg: &Configuration,
    stats: &RunStats,
    histos: &AnalysisHistograms,
    timestamp: &str,
    elapsed_time: Duration,
) -> io::Result<()> {
    writeln_summary(out, timestamp)?;
    writeln_summary(out, "---------------------------------------------")?;
    writeln_summary(out, ("Input file", cfg.input.display().to_string().as_str()))?;
    writeln_summary(out, ("Resonance daughters", cfg.daughters.to_string().as_str()))?;
    writeln_summary(out, ("Minimal daughter separation", cfg.pairing.min_separation))?;
    let os = if cfg.pairing.require_opposite_sign { "yes" } else { "no" };
    writeln_summary(out, ("Opposite charges required", os))?;
    writeln_summary(out, ("Maximal gen/reco separation", cfg.max_match_dr))?;
    writeln_summary(out, "---------------------------------------------")?;
    writeln_summary(out, ("Number of events", stats.read))?;
    writeln_summary(out, ("... after trigger", stats.triggered))?;
    writeln_summary(out, ("... with candidate", stats.with_candidate))?;
    let with_gen = histos.cut_flow.with_gen_candidate as usize;
    writeln_summary(out, ("... with gen candidate", with_gen))?;
    writeln_summary(out, "---------------------------------------------")?;
    let elapsed_secs = elapsed_time.as_secs_f64() as Float;
    writeln_summary(out, ("Elapsed time (s)", elapsed_secs))?;
    let secs_per_ev = elapsed_secs / (stats.read.max(1) as Float);
    writeln_summary(out, ("Elapsed time per event (s)", secs_per_ev))?;
    writeln_summary(out, "---------------------------------------------")?;

    // One line per non-empty histogram: entries, then mean of in-range ones
    for histo in histos.histograms() {
        if histo.entries() == 0 {
            continue;
        }
        write!(out, " {:<31}: {:>8} ", histo.name, histo.entries())?;
        match histo.mean() {
            Some(mean) => write_engineering(out, mean, SIG_DIGITS)?,
            None => write!(out, "-")?,
        }
        writeln!(out)?;
    }
    for histo in histos.histograms_2d() {
        if histo.entries() > 0 {
            writeln!(out, " {:<31}: {:>8}", histo.name, histo.entries())?;
        }
    }
    Ok(())
}

/// Print the trigger decisions of an event as a markdown table
pub fn write_trigger_table(
    out: &mut impl Write,
    decisions: &[(&str, Float)],
    fired: bool,
) -> io::Result<()> {
    writeln!(out, "| idx | trigName | Decision |")?;
    writeln!(out, "| --- | -------- | -------- |")?;
    for (idx, (name, decision)) in decisions.iter().enumerate() {
        writeln!(out, "| {idx} | {name} | {decision} |")?;
    }
    let accepted = decisions.iter().filter(|(_, decision)| *decision > 0.).count();
    writeln!(out, "trigAccept = {accepted}")?;
    if fired {
        writeln!(out, "trigger selection passed")?;
    }
    Ok(())
}

/// Print the generator particles of an event as a markdown table
pub fn write_gen_table(out: &mut impl Write, particles: &[PhysicsObject]) -> io::Result<()> {
    writeln!(out, "| pdgId | status | px | py | pz | E | pt | eta | M |")?;
    writeln!(out, "| ----- | ------ | -- | -- | -- | - | -- | --- | - |")?;
    for part in particles {
        writeln!(
            out,
            "| {} | {} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} |",
            part.pdg_id,
            part.status,
            part.px(),
            part.py(),
            part.pz(),
            part.energy(),
            part.pt(),
            part.eta(),
            part.mass()
        )?;
    }
    Ok(())
}

/// Print a few objects, charge included, as a markdown table
pub fn write_object_table(out: &mut impl Write, objects: &[&PhysicsObject]) -> io::Result<()> {
    writeln!(out, "| pdgId | status | charge | px | py | pz | E | pt | eta | mass |")?;
    writeln!(out, "| :---: | :----: | :----: | -- | -- | -- | - | -- | :-: | :--: |")?;
    for obj in objects {
        writeln!(
            out,
            "| {} | {} | {} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} |",
            obj.pdg_id,
            obj.status,
            obj.charge,
            obj.px(),
            obj.py(),
            obj.pz(),
            obj.energy(),
            obj.pt(),
            obj.eta(),
            obj.mass()
        )?;
    }
    Ok(())
}

/// Text output facility for the key/value summary format
fn writeln_summary(out: &mut impl Write, data: impl SummaryValue) -> io::Result<()> {
    write!(out, " ")?;
    data.write(out)?;
    writeln!(out)
}

/// Trait implemented by things which can be written in the summary format
trait SummaryValue: Sized {
    /// Write down `self` to the output
    fn write(self, out: &mut impl Write) -> io::Result<()>;
}

impl SummaryValue for &str {
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{self}")
    }
}

impl SummaryValue for usize {
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{self}")
    }
}

impl SummaryValue for Float {
    // Close approximation of %g
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write_engineering(out, self, SIG_DIGITS)
    }
}

impl<T: SummaryValue> SummaryValue for (&str, T) {
    // Key-value output that uses fixed-size columns for better readability
    fn write(self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{:<31}: ", self.0)?;
        self.1.write(out)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Like the %g format of printf, this switches to scientific notation when the
/// naive notation would need leading zeroes or more significant digits than
/// requested.
///
fn write_engineering(out: &mut impl Write, x: Float, sig_digits: usize) -> io::Result<()> {
    if x == 0. {
        return write!(out, "0");
    }
    if !x.is_finite() {
        return write!(out, "{x}");
    }
    let log_x = x.abs().log10();
    if log_x >= -3. && log_x < (sig_digits as Float) {
        // Rust's precision counts digits after the decimal point, so it must
        // shrink as the magnitude grows
        let int_digits = log_x.floor() as isize + 1;
        let precision = (sig_digits as isize - int_digits).max(0) as usize;
        let with_zeros = format!("{x:.precision$}");
        if with_zeros.contains('.') {
            write!(out, "{}", with_zeros.trim_end_matches('0').trim_end_matches('.'))
        } else {
            write!(out, "{with_zeros}")
        }
    } else {
        write!(out, "{:.1$e}", x, sig_digits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::floats;

    fn engineering(x: Float) -> String {
        let mut out = Vec::new();
        write_engineering(&mut out, x, SIG_DIGITS).expect("write to memory");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn engineering_notation() {
        assert_eq!(engineering(0.), "0");
        assert_eq!(engineering(1.), "1");
        assert_eq!(engineering(0.3), "0.3");
        assert_eq!(engineering(-1.5), "-1.5");
        assert_eq!(engineering(123.456789), "123.457");
        assert_eq!(engineering(0.00123), "0.00123");
        assert_eq!(engineering(999_999.), "999999");
        assert_eq!(engineering(1234567.), "1.23457e6");
        assert_eq!(engineering(0.0000123), "1.23000e-5");
        assert_eq!(engineering(floats::INFINITY), "inf");
    }

    #[test]
    fn key_value_columns() {
        let mut out = Vec::new();
        writeln_summary(&mut out, ("Number of events", 42usize)).expect("write to memory");
        writeln_summary(&mut out, ("Separation", 0.3 as Float)).expect("write to memory");
        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text,
            format!(" {:<31}: 42\n {:<31}: 0.3\n", "Number of events", "Separation")
        );
    }

    #[test]
    fn trigger_table() {
        let mut out = Vec::new();
        write_trigger_table(&mut out, &[("trig_A", 0.), ("trig_B", 1.)], true)
            .expect("write to memory");
        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text,
            "| idx | trigName | Decision |\n\
             | --- | -------- | -------- |\n\
             | 0 | trig_A | 0 |\n\
             | 1 | trig_B | 1 |\n\
             trigAccept = 1\n\
             trigger selection passed\n"
        );
    }
}
