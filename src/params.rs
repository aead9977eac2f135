// src/params.rs

use crate::error::{Result, VqError};
use serde::Serialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const SYNC_WINDOW_RANGE: RangeInclusive<u32> = 1..=100;
pub const SYNC_START_TIME_RANGE: RangeInclusive<u32> = 1..=100;
pub const FRAME_RATE_RANGE: RangeInclusive<u32> = 1..=120;
pub const SUBSAMPLE_RANGE: RangeInclusive<u32> = 1..=10;
pub const THREAD_COUNT_RANGE: RangeInclusive<u32> = 1..=32;

/// Settings shared by both codec analyses. Only constructible through [`AnalysisParameters::new`],
/// so every instance is within range.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisParameters {
    sync_window: u32,
    sync_start_time: u32,
    frame_rate: u32,
    subsample: u32,
    thread_count: u32,
}

impl AnalysisParameters {
    pub fn new(
        sync_window: u32,
        sync_start_time: u32,
        frame_rate: u32,
        subsample: u32,
        thread_count: u32,
    ) -> Result<Self> {
        check_range("sync_window", sync_window, &SYNC_WINDOW_RANGE)?;
        check_range("sync_start_time", sync_start_time, &SYNC_START_TIME_RANGE)?;
        check_range("frame_rate", frame_rate, &FRAME_RATE_RANGE)?;
        check_range("subsample", subsample, &SUBSAMPLE_RANGE)?;
        check_range("thread_count", thread_count, &THREAD_COUNT_RANGE)?;

        Ok(Self {
            sync_window,
            sync_start_time,
            frame_rate,
            subsample,
            thread_count,
        })
    }

    pub fn sync_window(&self) -> u32 {
        self.sync_window
    }

    pub fn sync_start_time(&self) -> u32 {
        self.sync_start_time
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn subsample(&self) -> u32 {
        self.subsample
    }

    pub fn thread_count(&self) -> u32 {
        self.thread_count
    }

    /// Flag/value pairs in the order the calculator expects them.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-sw".to_string(),
            self.sync_window.to_string(),
            "-ss".to_string(),
            self.sync_start_time.to_string(),
            "-fps".to_string(),
            self.frame_rate.to_string(),
            "-subsample".to_string(),
            self.subsample.to_string(),
            "-threads".to_string(),
            self.thread_count.to_string(),
        ]
    }
}

fn check_range(name: &str, value: u32, range: &RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(VqError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

/// Default worker thread count: logical CPUs, clamped to what the calculator accepts.
pub fn default_thread_count() -> u32 {
    let cpus = u32::try_from(num_cpus::get()).unwrap_or(*THREAD_COUNT_RANGE.end());
    cpus.clamp(*THREAD_COUNT_RANGE.start(), *THREAD_COUNT_RANGE.end())
}

/// One reference/distorted pairing for a single analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    reference: PathBuf,
    distorted: PathBuf,
    params: AnalysisParameters,
}

impl AnalysisRequest {
    pub fn new(reference: &Path, distorted: &Path, params: AnalysisParameters) -> Self {
        Self {
            reference: reference.to_path_buf(),
            distorted: distorted.to_path_buf(),
            params,
        }
    }

    pub fn reference(&self) -> &Path {
        &self.reference
    }

    pub fn distorted(&self) -> &Path {
        &self.distorted
    }

    pub fn params(&self) -> &AnalysisParameters {
        &self.params
    }

    /// Tool arguments after the program prefix: `-d <distorted> -r <reference>`, then the
    /// parameters.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            self.distorted.to_string_lossy().to_string(),
            "-r".to_string(),
            self.reference.to_string_lossy().to_string(),
        ];
        args.extend(self.params.to_args());
        args
    }
}
