// src/report.rs

use crate::comparison::ComparisonRecord;
use crate::error::Result;
use crate::params::AnalysisParameters;
use chrono::Local;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug)]
struct ComparisonReport<'a> {
    generated_at: String,
    reference: &'a Path,
    h264: &'a Path,
    h265: &'a Path,
    parameters: &'a AnalysisParameters,
    comparable: bool,
    results: &'a ComparisonRecord,
}

/// Input locators the record was produced from.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub reference: PathBuf,
    pub h264: PathBuf,
    pub h265: PathBuf,
    pub params: AnalysisParameters,
}

/// Writes the record and its inputs as pretty-printed JSON.
pub fn write_json_report(
    record: &ComparisonRecord,
    inputs: &ReportInputs,
    path: &Path,
) -> Result<()> {
    let report = ComparisonReport {
        generated_at: Local::now().to_rfc3339(),
        reference: &inputs.reference,
        h264: &inputs.h264,
        h265: &inputs.h265,
        parameters: &inputs.params,
        comparable: record.is_comparable(),
        results: record,
    };

    let content = serde_json::to_string_pretty(&report)?;
    fs::write(path, content)?;

    info!("Saved comparison report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{Codec, CodecOutcome, CodecStatus};
    use crate::error::AnalysisError;
    use crate::parser::MetricResult;
    use tempfile::TempDir;

    fn outcome(codec: Codec, status: CodecStatus, vmaf: Option<&str>) -> CodecOutcome {
        CodecOutcome {
            codec,
            status,
            result: MetricResult {
                psnr: Some(40.0),
                ssim: Some(0.95),
                vmaf: vmaf.map(str::to_string),
            },
            diagnostics: Vec::new(),
        }
    }

    fn inputs() -> ReportInputs {
        ReportInputs {
            reference: PathBuf::from("ref.mp4"),
            h264: PathBuf::from("x264.mp4"),
            h265: PathBuf::from("x265.mp4"),
            params: AnalysisParameters::new(3, 4, 24, 2, 6).unwrap(),
        }
    }

    #[test]
    fn writes_parameters_and_results() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("report.json");
        let record = ComparisonRecord::new(
            outcome(Codec::H264, CodecStatus::Completed, Some("92.1")),
            outcome(Codec::H265, CodecStatus::Completed, Some("94.0")),
        );

        write_json_report(&record, &inputs(), &path).expect("write report");
        let content = fs::read_to_string(&path).expect("read report");
        let json: serde_json::Value = serde_json::from_str(&content).expect("parse report");

        assert_eq!(json["comparable"], true);
        assert_eq!(json["reference"], "ref.mp4");
        assert_eq!(json["parameters"]["sync_window"], 3);
        assert_eq!(json["parameters"]["thread_count"], 6);
        assert_eq!(json["results"]["h265"]["result"]["vmaf"], "94.0");
        assert!(json["generated_at"].as_str().is_some());
    }

    #[test]
    fn failed_side_is_recorded() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("report.json");
        let record = ComparisonRecord::new(
            outcome(Codec::H264, CodecStatus::Completed, Some("92.1")),
            outcome(
                Codec::H265,
                CodecStatus::Failed(AnalysisError::NonZeroExit { code: 137 }),
                None,
            ),
        );

        write_json_report(&record, &inputs(), &path).expect("write report");
        let content = fs::read_to_string(&path).expect("read report");
        let json: serde_json::Value = serde_json::from_str(&content).expect("parse report");

        assert_eq!(json["comparable"], false);
        assert_eq!(json["results"]["h265"]["status"]["error"]["kind"], "non_zero_exit");
        assert_eq!(json["results"]["h265"]["status"]["error"]["detail"]["code"], 137);
        assert!(json["results"]["h265"]["result"]["vmaf"].is_null());
    }
}
