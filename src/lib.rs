//! Runs an external video quality calculator against an H.264 and an H.265 encode of the
//! same reference, scrapes PSNR / SSIM / VMAF from its output and pairs the results up.

pub mod comparison;
pub mod error;
pub mod job;
pub mod params;
pub mod parser;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod runner;
