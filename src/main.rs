mod cli;

use crate::cli::CliArgs;
use chrono::Local;
use log::{error, info, warn, LevelFilter};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use vqcompare::comparison::ComparisonRecord;
use vqcompare::error::{Result, VqError};
use vqcompare::job::OutputStream;
use vqcompare::parser::MetricParser;
use vqcompare::pipeline::{ComparisonPipeline, PipelineEvent};
use vqcompare::report::{self, ReportInputs};
use vqcompare::plot;
use vqcompare::runner::SystemRunner;

fn main() -> ExitCode {
    let start_time = Instant::now();

    let args = cli::parse_args();

    if let Err(e) = setup_logging(&args) {
        eprintln!("Error setting up logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting vqcompare...");
    info!("Arguments: {:?}", args);

    match run(args) {
        Ok(record) if record.is_comparable() => {
            info!("Comparison completed in {:.2?}", start_time.elapsed());
            ExitCode::SUCCESS
        }
        Ok(_) => {
            warn!(
                "Comparison finished after {:.2?} without enough data to compare",
                start_time.elapsed()
            );
            eprintln!("Not enough data to compare H.264 and H.265");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Comparison failed after {:.2?}: {}", start_time.elapsed(), e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up logging to console and optionally to a file.
fn setup_logging(args: &CliArgs) -> std::result::Result<(), fern::InitError> {
    let base_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Info)
        .level_for("vqcompare", LevelFilter::Debug);

    let mut logger = base_config.chain(std::io::stdout());

    let mut log_path = None;
    if args.log {
        let output_dir = args.output_dir();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = output_dir.join(format!("vqcompare_{}.log", timestamp));
        logger = logger.chain(fern::log_file(&path)?);
        log_path = Some(path);
    }

    logger.apply()?;
    if let Some(path) = log_path {
        info!("Logging to file: {}", path.display());
    }
    Ok(())
}

fn check_input(label: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(VqError::Input(format!("{} video not found: {}", label, path.display())))
    }
}

fn run(args: CliArgs) -> Result<ComparisonRecord> {
    let params = args.analysis_parameters()?;
    check_input("Reference", &args.reference)?;
    check_input("H.264", &args.h264)?;
    check_input("H.265", &args.h265)?;

    info!("Reference: {}", args.reference.display());
    info!("H.264: {}", args.h264.display());
    info!("H.265: {}", args.h265.display());

    let output_dir = args.output_dir();
    if !output_dir.exists() {
        info!("Creating output directory: {}", output_dir.display());
        fs::create_dir_all(&output_dir)?;
    }
    let prefix = args.output_prefix();
    let report_path = output_dir.join(format!("{}.json", prefix));
    let chart_path = output_dir.join(format!("{}.png", prefix));

    let pipeline = ComparisonPipeline::new(
        SystemRunner::new(args.timeout()),
        args.tool_command(),
        MetricParser::new(args.marker_mode()),
        args.exit_policy(),
    );
    let handle = pipeline.spawn(
        args.reference.clone(),
        args.h264.clone(),
        args.h265.clone(),
        params,
    );

    for event in handle.events() {
        match event {
            PipelineEvent::JobStarted(codec) => println!("Starting {} analysis...", codec),
            PipelineEvent::Output { codec, stream, text } => match stream {
                OutputStream::Stdout => println!("[{}] {}", codec, text),
                OutputStream::Stderr => eprintln!("[{}] {}", codec, text),
            },
            PipelineEvent::JobFinished(outcome) => {
                if outcome.status.is_completed() {
                    println!("{} analysis completed.", outcome.codec);
                } else {
                    println!("{} analysis failed.", outcome.codec);
                }
                for line in &outcome.diagnostics {
                    println!("  {}", line);
                }
            }
        }
    }
    let record = handle.join()?;

    println!();
    print!("{}", record.render_table());

    let inputs = ReportInputs {
        reference: args.reference.clone(),
        h264: args.h264.clone(),
        h265: args.h265.clone(),
        params,
    };
    report::write_json_report(&record, &inputs, &report_path)?;
    println!("Results saved:");
    println!("  JSON: {}", report_path.display());

    if args.no_plot {
        info!("Chart generation disabled");
    } else if record.is_chartable() {
        plot::generate_comparison_chart(&record, &chart_path)?;
        println!("  Chart: {}", chart_path.display());
    } else {
        println!("Not enough data to plot a comparison.");
    }

    Ok(record)
}
