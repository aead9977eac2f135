// src/cli.rs

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use vqcompare::job::{ExitCodePolicy, ToolCommand};
use vqcompare::params::{self, AnalysisParameters};
use vqcompare::parser::MarkerMode;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicyArg {
    /// Keep a complete result even if the tool exits non-zero
    Salvage,
    /// Fail the analysis on any non-zero exit
    Strict,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compare H.264 and H.265 encodes against a reference video",
    long_about = None
)]
pub struct CliArgs {
    /// Original/reference video file
    #[arg(required = true)]
    pub reference: PathBuf,

    /// H.264 encode of the reference
    #[arg(required = true)]
    pub h264: PathBuf,

    /// H.265 encode of the reference
    #[arg(required = true)]
    pub h265: PathBuf,

    /// Sync window in seconds (1-100)
    #[arg(long, default_value_t = 1)]
    pub sync_window: u32,

    /// Sync start time in seconds (1-100)
    #[arg(long, default_value_t = 1)]
    pub sync_start_time: u32,

    /// Frame rate passed to the calculator (1-120)
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Analyse every Nth frame (1-10)
    #[arg(long, default_value_t = 1)]
    pub subsample: u32,

    /// Calculator threads (1-32, default: logical CPUs)
    #[arg(long)]
    pub threads: Option<u32>,

    /// Analysis tool executable (default: python3 Vmaf_calculator/Vmaf_calculator.py)
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Extra leading argument for --tool (repeatable)
    #[arg(
        long = "tool-arg",
        value_name = "ARG",
        requires = "tool",
        allow_hyphen_values = true
    )]
    pub tool_args: Vec<String>,

    /// Kill an analysis that runs longer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// How to treat a non-zero exit from the calculator
    #[arg(long, value_enum, default_value_t = ExitPolicyArg::Salvage)]
    pub exit_policy: ExitPolicyArg,

    /// Only accept metric markers at the start of a line
    #[arg(long)]
    pub anchored_markers: bool,

    /// Specify output directory for results (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix for output files (default: comparison)
    #[arg(long)]
    pub output_prefix: Option<String>,

    /// Skip the comparison chart
    #[arg(long)]
    pub no_plot: bool,

    /// Enable logging to file (e.g., vqcompare_YYYYMMDD_HHMMSS.log)
    #[arg(long)]
    pub log: bool,
}

impl CliArgs {
    pub fn analysis_parameters(&self) -> vqcompare::error::Result<AnalysisParameters> {
        AnalysisParameters::new(
            self.sync_window,
            self.sync_start_time,
            self.fps,
            self.subsample,
            self.threads.unwrap_or_else(params::default_thread_count),
        )
    }

    pub fn tool_command(&self) -> ToolCommand {
        match &self.tool {
            Some(program) => ToolCommand::new(program.clone(), self.tool_args.clone()),
            None => ToolCommand::default(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn exit_policy(&self) -> ExitCodePolicy {
        match self.exit_policy {
            ExitPolicyArg::Salvage => ExitCodePolicy::Salvage,
            ExitPolicyArg::Strict => ExitCodePolicy::Strict,
        }
    }

    pub fn marker_mode(&self) -> MarkerMode {
        if self.anchored_markers {
            MarkerMode::Anchored
        } else {
            MarkerMode::Substring
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn output_prefix(&self) -> String {
        self.output_prefix.clone().unwrap_or_else(|| "comparison".to_string())
    }
}

pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
