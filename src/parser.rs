// src/parser.rs
//
// Scrapes PSNR / SSIM / VMAF summary values out of the calculator's free-form text output.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const PSNR_MARKER: &str = "psnr:";
pub const SSIM_MARKER: &str = "SSIM Score:";
pub const VMAF_MARKER: &str = "VMAF HD:";

/// Values extracted from one calculator run. Any field may be missing.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct MetricResult {
    pub psnr: Option<f64>,
    pub ssim: Option<f64>,
    /// Kept verbatim; the calculator does not always print a plain number here.
    pub vmaf: Option<String>,
}

impl MetricResult {
    pub fn is_complete(&self) -> bool {
        self.psnr.is_some() && self.ssim.is_some() && self.vmaf.is_some()
    }

    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.psnr.is_none() {
            missing.push("psnr".to_string());
        }
        if self.ssim.is_none() {
            missing.push("ssim".to_string());
        }
        if self.vmaf.is_none() {
            missing.push("vmaf".to_string());
        }
        missing
    }

    /// VMAF as a number, when the text is one.
    pub fn vmaf_score(&self) -> Option<f64> {
        self.vmaf.as_deref().and_then(|v| v.trim().parse::<f64>().ok())
    }
}

/// How a marker has to appear on a line to count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerMode {
    /// Marker anywhere on the line; value is whatever follows its last occurrence.
    #[default]
    Substring,
    /// Marker must open the line (leading whitespace allowed).
    Anchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Psnr,
    Ssim,
    Vmaf,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Psnr => "psnr",
            Field::Ssim => "ssim",
            Field::Vmaf => "vmaf",
        }
    }
}

// Checked in this order; the first marker found on a line claims it.
const MARKERS: [(Field, &str); 3] = [
    (Field::Psnr, PSNR_MARKER),
    (Field::Ssim, SSIM_MARKER),
    (Field::Vmaf, VMAF_MARKER),
];

static ANCHORED_PATTERNS: Lazy<[(Field, Regex); 3]> = Lazy::new(|| {
    MARKERS.map(|(field, marker)| {
        let pattern = format!(r"^\s*{}\s*(?P<value>.*)$", regex::escape(marker));
        (field, Regex::new(&pattern).expect("Invalid marker regex"))
    })
});

/// A parsed result plus the per-field problems that were swallowed along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub result: MetricResult,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricParser {
    mode: MarkerMode,
}

impl MetricParser {
    pub fn new(mode: MarkerMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MarkerMode {
        self.mode
    }

    pub fn parse(&self, text: &str) -> MetricResult {
        self.parse_with_diagnostics(text).result
    }

    /// Scans every line; later matches overwrite earlier ones. A number that fails to parse
    /// is reported as a diagnostic and does not clear an earlier good value for that field:
    /// `psnr: 41.0` followed by `psnr: n/a` yields `psnr = 41.0`.
    pub fn parse_with_diagnostics(&self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();

        for (index, line) in text.lines().enumerate() {
            let Some((field, raw)) = self.match_line(line) else {
                continue;
            };
            let value = raw.trim();

            match field {
                Field::Psnr | Field::Ssim => match value.parse::<f64>() {
                    Ok(number) => {
                        let slot = if field == Field::Psnr {
                            &mut report.result.psnr
                        } else {
                            &mut report.result.ssim
                        };
                        if slot.is_some() {
                            debug!("{} overridden by line {}", field.name(), index + 1);
                        }
                        *slot = Some(number);
                    }
                    Err(_) => {
                        let message = format!(
                            "{}: cannot parse '{}' as a number (line {})",
                            field.name(),
                            value,
                            index + 1
                        );
                        warn!("{}", message);
                        report.diagnostics.push(message);
                    }
                },
                Field::Vmaf => {
                    report.result.vmaf = Some(value.to_string());
                }
            }
        }

        report
    }

    fn match_line<'a>(&self, line: &'a str) -> Option<(Field, &'a str)> {
        match self.mode {
            MarkerMode::Substring => MARKERS.iter().find_map(|(field, marker)| {
                line.rfind(marker)
                    .map(|idx| (*field, &line[idx + marker.len()..]))
            }),
            MarkerMode::Anchored => ANCHORED_PATTERNS.iter().find_map(|(field, re)| {
                re.captures(line)
                    .and_then(|caps| caps.name("value"))
                    .map(|m| (*field, m.as_str()))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_OUTPUT: &str = "psnr: 42.5\nSSIM Score: 0.98\nVMAF HD: 95.3\n";

    #[test]
    fn extracts_all_three_metrics() {
        let result = MetricParser::default().parse(FULL_OUTPUT);
        assert_eq!(
            result,
            MetricResult {
                psnr: Some(42.5),
                ssim: Some(0.98),
                vmaf: Some("95.3".to_string()),
            }
        );
        assert!(result.is_complete());
        assert!(result.missing().is_empty());
        assert_eq!(result.vmaf_score(), Some(95.3));
    }

    #[test]
    fn reparsing_gives_the_same_result() {
        let parser = MetricParser::default();
        let noisy = "loading...\npsnr: 31.2\ngarbage psnr: x\nSSIM Score: 0.9\n";
        assert_eq!(parser.parse(noisy), parser.parse(noisy));
        assert_eq!(
            parser.parse_with_diagnostics(noisy),
            parser.parse_with_diagnostics(noisy)
        );
    }

    #[test]
    fn last_match_wins() {
        let result = MetricParser::default().parse("psnr: 30.0\nother\npsnr: 35.25\n");
        assert_eq!(result.psnr, Some(35.25));

        let result = MetricParser::default().parse("VMAF HD: 80\nVMAF HD: 81.5 (pooled)\n");
        assert_eq!(result.vmaf.as_deref(), Some("81.5 (pooled)"));
    }

    #[test]
    fn missing_ssim_is_absent_not_an_error() {
        let report = MetricParser::default().parse_with_diagnostics("psnr: 40\nVMAF HD: 90\n");
        assert_eq!(report.result.ssim, None);
        assert!(report.diagnostics.is_empty());
        assert!(!report.result.is_complete());
        assert_eq!(report.result.missing(), vec!["ssim".to_string()]);
    }

    #[test]
    fn malformed_number_is_swallowed_and_reported() {
        let report = MetricParser::default()
            .parse_with_diagnostics("psnr: 41.0\npsnr: n/a\nSSIM Score: abc\nVMAF HD: 93\n");
        assert_eq!(report.result.psnr, Some(41.0));
        assert_eq!(report.result.ssim, None);
        assert_eq!(report.result.vmaf.as_deref(), Some("93"));
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics[0].starts_with("psnr: cannot parse 'n/a'"));
        assert!(report.diagnostics[1].contains("line 3"));
    }

    #[test]
    fn value_follows_last_marker_occurrence() {
        let result = MetricParser::default().parse("[stats] psnr: psnr:  27.75  \n");
        assert_eq!(result.psnr, Some(27.75));
    }

    #[test]
    fn first_marker_on_a_line_claims_it() {
        // SSIM on the same line as a PSNR marker is not picked up.
        let result = MetricParser::default().parse("psnr: SSIM Score: 0.5\n");
        assert_eq!(result.ssim, None);
        assert_eq!(result.psnr, None);
    }

    #[test]
    fn markers_are_case_sensitive() {
        let result = MetricParser::default().parse("PSNR: 40\nssim score: 0.9\nvmaf hd: 90\n");
        assert_eq!(result, MetricResult::default());
    }

    #[test]
    fn non_numeric_vmaf_is_kept_as_text() {
        let result = MetricParser::default().parse("VMAF HD: unavailable\n");
        assert_eq!(result.vmaf.as_deref(), Some("unavailable"));
        assert_eq!(result.vmaf_score(), None);
    }

    #[test]
    fn anchored_mode_ignores_markers_mid_line() {
        let parser = MetricParser::new(MarkerMode::Anchored);
        let text = "frame 12 psnr: 10.0\n  psnr: 44.1\n\
                    log: SSIM Score: 0.1\nSSIM Score:0.97\nVMAF HD: 96\n";
        let result = parser.parse(text);
        assert_eq!(result.psnr, Some(44.1));
        assert_eq!(result.ssim, Some(0.97));
        assert_eq!(result.vmaf.as_deref(), Some("96"));
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let report = MetricParser::default().parse_with_diagnostics("");
        assert_eq!(report, ParseReport::default());
        assert_eq!(report.result.missing().len(), 3);
    }
}
