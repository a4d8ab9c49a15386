use std::io::Write;

use anyhow::Result;
use blinkcheck_core::{FrameReport, Region, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::OutputFormat;

#[derive(Serialize)]
struct VerdictRecord<'a> {
    frame: u64,
    timestamp: DateTime<Utc>,
    face: Option<Region>,
    eyes: &'a [Region],
    live: bool,
    verdict: Verdict,
}

/// Writes one verdict line per evaluated frame.
pub struct Reporter<W: Write> {
    format: OutputFormat,
    out: W,
    frames: u64,
}

impl<W: Write> Reporter<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            out,
            frames: 0,
        }
    }

    /// Frames reported so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn emit(&mut self, report: &FrameReport, at: DateTime<Utc>) -> Result<()> {
        self.frames += 1;
        match self.format {
            OutputFormat::Text => writeln!(self.out, "Liveness: {}", report.verdict)?,
            OutputFormat::Json => {
                let record = VerdictRecord {
                    frame: self.frames,
                    timestamp: at,
                    face: report.face,
                    eyes: &report.eyes,
                    live: report.is_live,
                    verdict: report.verdict,
                };
                serde_json::to_writer(&mut self.out, &record)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn live_report() -> FrameReport {
        FrameReport {
            face: Some(Region::new(100, 80, 200, 200)),
            eyes: vec![Region::new(140, 130, 30, 30)],
            is_live: true,
            verdict: Verdict::Real,
        }
    }

    fn spoof_report() -> FrameReport {
        FrameReport {
            face: None,
            eyes: Vec::new(),
            is_live: false,
            verdict: Verdict::Spoof,
        }
    }

    #[test]
    fn text_lines_match_operator_output() {
        let mut reporter = Reporter::new(OutputFormat::Text, Vec::new());
        let at = Utc::now();
        reporter.emit(&live_report(), at).unwrap();
        reporter.emit(&spoof_report(), at).unwrap();
        assert_eq!(reporter.frames(), 2);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "Liveness: Real\nLiveness: Spoof\n");
    }

    #[test]
    fn json_lines_carry_regions_and_timestamp() {
        let mut reporter = Reporter::new(OutputFormat::Json, Vec::new());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        reporter.emit(&live_report(), at).unwrap();
        reporter.emit(&spoof_report(), at).unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["frame"], 1);
        assert_eq!(lines[0]["timestamp"], "2026-03-01T12:00:00Z");
        assert_eq!(lines[0]["face"]["x"], 100);
        assert_eq!(lines[0]["eyes"][0]["width"], 30);
        assert_eq!(lines[0]["live"], true);
        assert_eq!(lines[0]["verdict"], "Real");

        assert_eq!(lines[1]["frame"], 2);
        assert!(lines[1]["face"].is_null());
        assert_eq!(lines[1]["verdict"], "Spoof");
    }
}
