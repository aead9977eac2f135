// src/job.rs

use crate::comparison::{Codec, CodecOutcome, CodecStatus};
use crate::error::AnalysisError;
use crate::params::AnalysisRequest;
use crate::parser::{MetricParser, MetricResult};
use crate::runner::ProcessRunner;
use log::{debug, error, info, warn};
use std::time::Instant;

pub const DEFAULT_TOOL_PROGRAM: &str = "python3";
pub const DEFAULT_TOOL_SCRIPT: &str = "Vmaf_calculator/Vmaf_calculator.py";

/// Program plus any leading arguments (e.g. an interpreter and its script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Full argument vector for one request.
    pub fn command_line(&self, request: &AnalysisRequest) -> Vec<String> {
        let mut command = Vec::with_capacity(1 + self.args.len() + 14);
        command.push(self.program.clone());
        command.extend(self.args.iter().cloned());
        command.extend(request.to_args());
        command
    }
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_PROGRAM, vec![DEFAULT_TOOL_SCRIPT.to_string()])
    }
}

/// What to do when the tool exits non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitCodePolicy {
    /// Accept a complete result despite a non-zero exit, with a warning.
    #[default]
    Salvage,
    /// Any non-zero exit fails the job.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed(AnalysisError),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed(_))
    }
}

/// One analysis of one codec's encode against the reference.
#[derive(Debug)]
pub struct CodecAnalysisJob {
    codec: Codec,
    tool: ToolCommand,
    parser: MetricParser,
    policy: ExitCodePolicy,
    state: JobState,
    result: MetricResult,
    diagnostics: Vec<String>,
}

impl CodecAnalysisJob {
    pub fn new(
        codec: Codec,
        tool: ToolCommand,
        parser: MetricParser,
        policy: ExitCodePolicy,
    ) -> Self {
        Self {
            codec,
            tool,
            parser,
            policy,
            state: JobState::Pending,
            result: MetricResult::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Metrics extracted so far; retained even when the job fails.
    pub fn partial_result(&self) -> &MetricResult {
        &self.result
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Runs the tool once and parses its stdout. Output chunks are passed to `on_output`
    /// after the process exits, stdout first.
    pub fn execute(
        &mut self,
        runner: &dyn ProcessRunner,
        request: &AnalysisRequest,
        on_output: &mut dyn FnMut(OutputStream, &str),
    ) -> Result<MetricResult, AnalysisError> {
        if self.state != JobState::Pending {
            warn!("{} job executed twice; ignoring", self.codec);
            return Err(AnalysisError::AlreadyExecuted);
        }

        self.state = JobState::Running;
        let command = self.tool.command_line(request);
        info!("Starting {} analysis of {}", self.codec, request.distorted().display());
        debug!("{} command: {:?}", self.codec, command);
        let start_time = Instant::now();

        let output = match runner.run(&command) {
            Ok(output) => output,
            Err(e) => {
                let err = AnalysisError::from(e);
                return Err(self.fail(err));
            }
        };

        let stdout = output.stdout.trim();
        let stderr = output.stderr.trim();
        if !stdout.is_empty() {
            on_output(OutputStream::Stdout, stdout);
        }
        if !stderr.is_empty() {
            on_output(OutputStream::Stderr, stderr);
            warn!("{} analysis wrote to stderr: {}", self.codec, stderr);
            self.diagnostics.push(format!("stderr: {}", stderr));
        }

        let report = self.parser.parse_with_diagnostics(&output.stdout);
        self.result = report.result;
        self.diagnostics.extend(report.diagnostics);

        let complete = self.result.is_complete();
        if !complete {
            let missing = AnalysisError::ParseIncomplete {
                missing: self.result.missing(),
            };
            warn!("{} analysis: {}", self.codec, missing);
            self.diagnostics.push(missing.to_string());
        }

        if !output.success() {
            let code = output.exit_code;
            self.diagnostics.push(format!("Process exited with code {}", code));
            if !complete || self.policy == ExitCodePolicy::Strict {
                return Err(self.fail(AnalysisError::NonZeroExit { code }));
            }
            warn!(
                "{} analysis exited with code {} but produced a complete result; keeping it",
                self.codec, code
            );
        }

        info!(
            "{} analysis completed in {:.2?}",
            self.codec,
            start_time.elapsed()
        );
        self.state = JobState::Completed;
        Ok(self.result.clone())
    }

    fn fail(&mut self, err: AnalysisError) -> AnalysisError {
        error!("{} analysis failed: {}", self.codec, err);
        self.diagnostics.push(err.to_string());
        self.state = JobState::Failed(err.clone());
        err
    }

    /// Snapshot for the comparison record. Jobs that never ran are reported as failed.
    pub fn outcome(&self) -> CodecOutcome {
        let status = match &self.state {
            JobState::Completed => CodecStatus::Completed,
            JobState::Failed(err) => CodecStatus::Failed(err.clone()),
            JobState::Pending | JobState::Running => {
                CodecStatus::Failed(AnalysisError::Io("analysis did not finish".to_string()))
            }
        };
        CodecOutcome {
            codec: self.codec,
            status,
            result: self.result.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}
