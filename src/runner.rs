// src/runner.rs

use crate::error::RunnerError;
use log::{debug, info, warn};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Exit code reported when the process ended without one (killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Everything a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command to completion. Implementations must not go through a shell.
pub trait ProcessRunner: Send + Sync {
    /// `command[0]` is the program, the rest are its arguments.
    fn run(&self, command: &[String]) -> Result<ProcessOutput, RunnerError>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &[String]) -> Result<ProcessOutput, RunnerError> {
        let (program, args) = command.split_first().ok_or_else(|| RunnerError::Launch {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        info!("Running: {}", command.join(" "));

        let start_time = Instant::now();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches whatever the tool spawned.
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd.spawn().map_err(|source| RunnerError::Launch {
            program: program.clone(),
            source,
        })?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        // On error the readers are left detached: a surviving grandchild may still hold the
        // pipes open.
        let status = wait_for_exit(&mut child, self.timeout)?;

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;
        let exit_code = status.code().unwrap_or(NO_EXIT_CODE);

        debug!(
            "{} finished in {}ms with code {} ({} bytes stdout, {} bytes stderr)",
            program,
            start_time.elapsed().as_millis(),
            exit_code,
            stdout.len(),
            stderr.len()
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

fn wait_for_exit(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, RunnerError> {
    let Some(limit) = timeout else {
        return Ok(child.wait()?);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() > limit {
            warn!("Process exceeded {:.1}s, terminating it", limit.as_secs_f64());
            kill_process_tree(child);
            let _ = child.wait();
            return Err(RunnerError::Timeout { limit });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    let group = format!("-{}", child.id());
    match Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => debug!("kill {} exited with {}", group, status),
        Err(e) => debug!("Failed to run kill for group {}: {}", group, e),
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<String, RunnerError> {
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}
