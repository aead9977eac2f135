// src/comparison.rs

use crate::error::AnalysisError;
use crate::parser::MetricResult;
use serde::Serialize;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    #[serde(rename = "H.264")]
    H264,
    #[serde(rename = "H.265")]
    H265,
}

impl Codec {
    /// Analysis order.
    pub const ALL: [Codec; 2] = [Codec::H264, Codec::H265];

    pub fn label(self) -> &'static str {
        match self {
            Codec::H264 => "H.264",
            Codec::H265 => "H.265",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal state of one codec's analysis.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum CodecStatus {
    Completed,
    Failed(AnalysisError),
}

impl CodecStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, CodecStatus::Completed)
    }
}

/// What one codec's job left behind, whether it succeeded or not.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CodecOutcome {
    pub codec: Codec,
    pub status: CodecStatus,
    /// Whatever could be extracted, even for failed jobs.
    pub result: MetricResult,
    pub diagnostics: Vec<String>,
}

impl CodecOutcome {
    /// Completed with all three metrics present.
    pub fn is_usable(&self) -> bool {
        self.status.is_completed() && self.result.is_complete()
    }
}

/// Both codecs' outcomes. Only built once both analyses have reached a terminal state.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    h264: CodecOutcome,
    h265: CodecOutcome,
}

/// One metric's values side by side, ready for a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartRow {
    pub metric: &'static str,
    pub h264: f64,
    pub h265: f64,
}

impl ComparisonRecord {
    pub fn new(h264: CodecOutcome, h265: CodecOutcome) -> Self {
        debug_assert_eq!(h264.codec, Codec::H264);
        debug_assert_eq!(h265.codec, Codec::H265);
        Self { h264, h265 }
    }

    pub fn outcome(&self, codec: Codec) -> &CodecOutcome {
        match codec {
            Codec::H264 => &self.h264,
            Codec::H265 => &self.h265,
        }
    }

    /// Both sides completed with complete results.
    pub fn is_comparable(&self) -> bool {
        self.h264.is_usable() && self.h265.is_usable()
    }

    /// Numeric rows for charting; `None` unless comparable and both VMAF values are numbers.
    pub fn chart_rows(&self) -> Option<[ChartRow; 3]> {
        if !self.is_comparable() {
            return None;
        }
        let (a, b) = (&self.h264.result, &self.h265.result);
        Some([
            ChartRow { metric: "PSNR", h264: a.psnr?, h265: b.psnr? },
            ChartRow { metric: "SSIM", h264: a.ssim?, h265: b.ssim? },
            ChartRow { metric: "VMAF", h264: a.vmaf_score()?, h265: b.vmaf_score()? },
        ])
    }

    pub fn is_chartable(&self) -> bool {
        self.chart_rows().is_some()
    }

    /// Plain-text table: PSNR/SSIM to 10 decimals, VMAF as printed by the tool, `-` when absent.
    pub fn render_table(&self) -> String {
        let number = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.10}", v));
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let (a, b) = (&self.h264.result, &self.h265.result);

        let rows = [
            ("Status".to_string(), status_text(&self.h264.status), status_text(&self.h265.status)),
            ("PSNR".to_string(), number(a.psnr), number(b.psnr)),
            ("SSIM".to_string(), number(a.ssim), number(b.ssim)),
            ("VMAF".to_string(), text(&a.vmaf), text(&b.vmaf)),
        ];

        let header = (
            "Metric".to_string(),
            Codec::H264.label().to_string(),
            Codec::H265.label().to_string(),
        );
        let widths = rows.iter().chain(std::iter::once(&header)).fold((0, 0, 0), |w, r| {
            (w.0.max(r.0.len()), w.1.max(r.1.len()), w.2.max(r.2.len()))
        });

        let mut out = String::new();
        for (name, h264, h265) in std::iter::once(&header).chain(rows.iter()) {
            out.push_str(&format!(
                "{:<w0$}  {:>w1$}  {:>w2$}\n",
                name,
                h264,
                h265,
                w0 = widths.0,
                w1 = widths.1,
                w2 = widths.2
            ));
        }
        out
    }
}

fn status_text(status: &CodecStatus) -> String {
    match status {
        CodecStatus::Completed => "completed".to_string(),
        CodecStatus::Failed(_) => "failed".to_string(),
    }
}
