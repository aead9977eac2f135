// src/pipeline.rs

use crate::comparison::{Codec, CodecOutcome, ComparisonRecord};
use crate::error::{Result, VqError};
use crate::job::{CodecAnalysisJob, ExitCodePolicy, OutputStream, ToolCommand};
use crate::params::{AnalysisParameters, AnalysisRequest};
use crate::parser::MetricParser;
use crate::runner::ProcessRunner;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    JobStarted(Codec),
    Output {
        codec: Codec,
        stream: OutputStream,
        text: String,
    },
    JobFinished(CodecOutcome),
}

/// Analyses the H.264 encode, then the H.265 encode, against one reference.
pub struct ComparisonPipeline<R: ProcessRunner> {
    runner: R,
    tool: ToolCommand,
    parser: MetricParser,
    policy: ExitCodePolicy,
}

impl<R: ProcessRunner> ComparisonPipeline<R> {
    pub fn new(runner: R, tool: ToolCommand, parser: MetricParser, policy: ExitCodePolicy) -> Self {
        Self {
            runner,
            tool,
            parser,
            policy,
        }
    }

    /// Runs both jobs on the calling thread. The second job starts only after the first has
    /// reached a terminal state; a failure on one side never stops the other.
    pub fn run(
        &self,
        reference: &Path,
        encoded_h264: &Path,
        encoded_h265: &Path,
        params: AnalysisParameters,
        on_event: &mut dyn FnMut(PipelineEvent),
    ) -> ComparisonRecord {
        let h264_request = AnalysisRequest::new(reference, encoded_h264, params);
        let h264 = self.run_job(Codec::H264, h264_request, on_event);
        let h265_request = AnalysisRequest::new(reference, encoded_h265, params);
        let h265 = self.run_job(Codec::H265, h265_request, on_event);

        let record = ComparisonRecord::new(h264, h265);
        info!(
            "Comparison finished: {}",
            if record.is_comparable() { "comparable" } else { "not comparable" }
        );
        record
    }

    fn run_job(
        &self,
        codec: Codec,
        request: AnalysisRequest,
        on_event: &mut dyn FnMut(PipelineEvent),
    ) -> CodecOutcome {
        let mut job = CodecAnalysisJob::new(codec, self.tool.clone(), self.parser, self.policy);
        on_event(PipelineEvent::JobStarted(codec));

        let mut forward = |stream: OutputStream, text: &str| {
            on_event(PipelineEvent::Output {
                codec,
                stream,
                text: text.to_string(),
            })
        };
        // Failure details are kept on the job and surface through its outcome.
        let _ = job.execute(&self.runner, &request, &mut forward);

        let outcome = job.outcome();
        on_event(PipelineEvent::JobFinished(outcome.clone()));
        outcome
    }
}

impl<R: ProcessRunner + 'static> ComparisonPipeline<R> {
    /// Moves the pipeline onto a worker thread. Events arrive on the handle's channel; the
    /// channel closes when the worker is done.
    pub fn spawn(
        self,
        reference: PathBuf,
        encoded_h264: PathBuf,
        encoded_h265: PathBuf,
        params: AnalysisParameters,
    ) -> PipelineHandle {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            // A dropped receiver only means nobody is listening any more.
            let mut send = |event: PipelineEvent| {
                let _ = tx.send(event);
            };
            self.run(&reference, &encoded_h264, &encoded_h265, params, &mut send)
        });
        PipelineHandle { events: rx, worker }
    }
}

pub struct PipelineHandle {
    events: Receiver<PipelineEvent>,
    worker: JoinHandle<ComparisonRecord>,
}

impl PipelineHandle {
    pub fn events(&self) -> mpsc::Iter<'_, PipelineEvent> {
        self.events.iter()
    }

    /// Waits for the worker and returns the finished record.
    pub fn join(self) -> Result<ComparisonRecord> {
        self.worker
            .join()
            .map_err(|_| VqError::Worker("comparison worker panicked".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::CodecStatus;
    use crate::error::{AnalysisError, RunnerError};
    use crate::runner::ProcessOutput;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    const GOOD_OUTPUT: &str = "psnr: 42.5\nSSIM Score: 0.98\nVMAF HD: 95.3\n";

    #[derive(Debug, Clone)]
    struct Call {
        distorted: String,
        started: Instant,
        finished: Instant,
    }

    /// Blocks for a while per call and replies based on the distorted path.
    struct FakeRunner {
        delay: Duration,
        calls: Mutex<Vec<Call>>,
        reply: fn(&str) -> std::result::Result<ProcessOutput, RunnerError>,
    }

    impl FakeRunner {
        fn new(reply: fn(&str) -> std::result::Result<ProcessOutput, RunnerError>) -> Self {
            Self {
                delay: Duration::from_millis(50),
                calls: Mutex::new(Vec::new()),
                reply,
            }
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, command: &[String]) -> std::result::Result<ProcessOutput, RunnerError> {
            let started = Instant::now();
            let distorted = command
                .windows(2)
                .find(|pair| pair[0] == "-d")
                .map(|pair| pair[1].clone())
                .unwrap_or_default();
            thread::sleep(self.delay);
            let reply = (self.reply)(&distorted);
            self.calls.lock().unwrap().push(Call {
                distorted,
                started,
                finished: Instant::now(),
            });
            reply
        }
    }

    fn ok(stdout: &str, exit_code: i32) -> std::result::Result<ProcessOutput, RunnerError> {
        Ok(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code,
        })
    }

    fn always_good(_: &str) -> std::result::Result<ProcessOutput, RunnerError> {
        ok(GOOD_OUTPUT, 0)
    }

    fn params() -> AnalysisParameters {
        AnalysisParameters::new(1, 1, 30, 1, 4).unwrap()
    }

    fn pipeline<R: ProcessRunner>(runner: R) -> ComparisonPipeline<R> {
        ComparisonPipeline::new(
            runner,
            ToolCommand::default(),
            MetricParser::default(),
            ExitCodePolicy::Salvage,
        )
    }

    fn run_sync<R: ProcessRunner>(
        pipeline: &ComparisonPipeline<R>,
    ) -> (ComparisonRecord, Vec<PipelineEvent>) {
        let mut events = Vec::new();
        let record = pipeline.run(
            Path::new("ref.mp4"),
            Path::new("a.h264.mp4"),
            Path::new("b.h265.mp4"),
            params(),
            &mut |event| events.push(event),
        );
        (record, events)
    }

    #[test]
    fn second_job_starts_after_first_finishes() {
        let pipeline = pipeline(FakeRunner::new(always_good));
        let (record, _) = run_sync(&pipeline);

        let calls = pipeline.runner.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].distorted, "a.h264.mp4");
        assert_eq!(calls[1].distorted, "b.h265.mp4");
        assert!(calls[1].started >= calls[0].finished);
        assert!(record.is_comparable());
    }

    #[test]
    fn both_sides_complete_gives_comparable_record() {
        let (record, _) = run_sync(&pipeline(FakeRunner::new(always_good)));
        for codec in Codec::ALL {
            let outcome = record.outcome(codec);
            assert_eq!(outcome.codec, codec);
            assert_eq!(outcome.status, CodecStatus::Completed);
            assert_eq!(outcome.result.psnr, Some(42.5));
        }
        assert!(record.is_chartable());
    }

    #[test]
    fn failed_first_job_does_not_stop_the_second() {
        fn launch_fails_for_h264(
            distorted: &str,
        ) -> std::result::Result<ProcessOutput, RunnerError> {
            if distorted.contains("h264") {
                Err(RunnerError::Launch {
                    program: "python3".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                })
            } else {
                ok(GOOD_OUTPUT, 0)
            }
        }

        let pipeline = pipeline(FakeRunner::new(launch_fails_for_h264));
        let (record, _) = run_sync(&pipeline);

        assert_eq!(pipeline.runner.calls.lock().unwrap().len(), 2);
        assert!(matches!(
            record.outcome(Codec::H264).status,
            CodecStatus::Failed(AnalysisError::LaunchFailure(_))
        ));
        assert!(record.outcome(Codec::H265).is_usable());
        assert!(!record.is_comparable());
    }

    #[test]
    fn partial_failure_keeps_both_results_retrievable() {
        fn h265_crashes(distorted: &str) -> std::result::Result<ProcessOutput, RunnerError> {
            if distorted.contains("h265") {
                ok("psnr: 10.0\n", 1)
            } else {
                ok(GOOD_OUTPUT, 0)
            }
        }

        let (record, _) = run_sync(&pipeline(FakeRunner::new(h265_crashes)));
        let h265 = record.outcome(Codec::H265);
        assert_eq!(h265.status, CodecStatus::Failed(AnalysisError::NonZeroExit { code: 1 }));
        assert_eq!(h265.result.psnr, Some(10.0));
        assert!(record.outcome(Codec::H264).result.is_complete());
        assert!(!record.is_comparable());
    }

    #[test]
    fn events_arrive_in_job_order() {
        let (_, events) = run_sync(&pipeline(FakeRunner::new(always_good)));
        let kinds: Vec<String> = events
            .iter()
            .map(|event| match event {
                PipelineEvent::JobStarted(codec) => format!("start {codec}"),
                PipelineEvent::Output { codec, .. } => format!("output {codec}"),
                PipelineEvent::JobFinished(outcome) => format!("finish {}", outcome.codec),
            })
            .collect();
        assert_eq!(
            kinds,
            [
                "start H.264",
                "output H.264",
                "finish H.264",
                "start H.265",
                "output H.265",
                "finish H.265",
            ]
        );
    }

    #[test]
    fn spawned_pipeline_streams_events_then_joins() {
        let handle = pipeline(FakeRunner::new(always_good)).spawn(
            PathBuf::from("ref.mp4"),
            PathBuf::from("a.h264.mp4"),
            PathBuf::from("b.h265.mp4"),
            params(),
        );

        let finished: Vec<Codec> = handle
            .events()
            .filter_map(|event| match event {
                PipelineEvent::JobFinished(outcome) => Some(outcome.codec),
                _ => None,
            })
            .collect();
        assert_eq!(finished, Codec::ALL);

        let record = handle.join().unwrap();
        assert!(record.is_comparable());
    }
}
