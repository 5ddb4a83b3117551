//! hrtrack CLI - heart-rate file tools
//!
//! Commands:
//! - points: Score recordings in heart points
//! - split: Split recordings into hour-aligned heart-rate logs (or one ZIP of them)
//! - encode: Convert a recording into a single heart-rate log
//! - inspect: Summarize a recording

use clap::{Parser, Subcommand, ValueEnum};
use chrono::FixedOffset;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use hrtrack::consumers::{DetailLogWriter, HeartPoints, HeartPointsConfig, HeartPointsResult};
use hrtrack::pipeline::{NamedInput, Pipeline};
use hrtrack::producers::FormatHint;
use hrtrack::transformers::{SampleFilter, Splitter, DEFAULT_HR_MAX, DEFAULT_HR_MIN};
use hrtrack::types::SessionSummary;
use hrtrack::{PipelineError, VERSION};

/// hrtrack - decode wearable heart-rate exports, split them by hour, score heart points
#[derive(Parser)]
#[command(name = "hrtrack")]
#[command(version = VERSION)]
#[command(about = "Heart-rate file pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input files (use - for stdin)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Input format
    #[arg(long, value_enum, default_value = "auto")]
    format: InputFormat,

    /// Drop samples below this heart rate (bpm)
    #[arg(long)]
    hr_min: Option<u16>,

    /// Drop samples above this heart rate (bpm)
    #[arg(long)]
    hr_max: Option<u16>,

    /// Drop repeated readings with the same timestamp
    #[arg(long)]
    dedup: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score recordings in heart points
    Points {
        #[command(flatten)]
        input: InputArgs,

        /// Age in years (maximum heart rate is estimated as 220 - age)
        #[arg(long)]
        age: Option<u16>,

        /// Maximum heart rate (bpm); overrides --age
        #[arg(long)]
        max_hr: Option<u16>,

        /// Resting heart rate (bpm); thresholds become heart-rate reserve based
        #[arg(long)]
        resting_hr: Option<u16>,

        /// Add the extra-vigorous zone (85 %, 3 points per minute)
        #[arg(long)]
        three_tier: bool,

        /// Load heart points configuration from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split recordings into hour-aligned heart-rate logs
    Split {
        #[command(flatten)]
        input: InputArgs,

        /// Local UTC offset that hours are aligned to (e.g. +05:30)
        #[arg(long, default_value = "+00:00")]
        utc_offset: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Write one ZIP archive instead of individual logs
        #[arg(long)]
        zip: bool,
    },

    /// Convert one recording into a heart-rate log
    Encode {
        #[command(flatten)]
        input: InputArgs,

        /// Output file or directory (use - for stdout)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Summarize recordings
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Detect from the file's magic bytes
    Auto,
    /// Binary FIT activity file
    Fit,
    /// PNN-SGT heart-rate log
    Log,
    /// ZIP archive of heart-rate logs
    Zip,
}

impl From<InputFormat> for FormatHint {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Auto => FormatHint::Auto,
            InputFormat::Fit => FormatHint::Fit,
            InputFormat::Log => FormatHint::DetailLog,
            InputFormat::Zip => FormatHint::DetailArchive,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), HrCliError> {
    match cli.command {
        Commands::Points {
            input,
            age,
            max_hr,
            resting_hr,
            three_tier,
            config,
            json,
        } => {
            let mut points_config = match config {
                Some(path) => HeartPointsConfig::from_json(&fs::read_to_string(path)?)?,
                None => HeartPointsConfig::default(),
            };
            if max_hr.is_some() {
                points_config.max_heart_rate_override = max_hr;
            }
            if age.is_some() {
                points_config.age = age;
            }
            if resting_hr.is_some() {
                points_config.resting_heart_rate = resting_hr;
            }
            if three_tier {
                points_config.zones = HeartPointsConfig::three_tier_zones();
            }
            cmd_points(&input, &points_config, json)
        }

        Commands::Split {
            input,
            utc_offset,
            output,
            zip,
        } => cmd_split(&input, parse_utc_offset(&utc_offset)?, &output, zip),

        Commands::Encode { input, output } => cmd_encode(&input, &output),

        Commands::Inspect { input, json } => cmd_inspect(&input, json),
    }
}

fn cmd_points(args: &InputArgs, config: &HeartPointsConfig, json: bool) -> Result<(), HrCliError> {
    let reducer = HeartPoints::new(config)?;
    let pipeline = build_pipeline(args);

    let inputs = args
        .inputs
        .iter()
        .map(|path| Ok((path, read_input(path)?)))
        .collect::<Result<Vec<_>, HrCliError>>()?;

    let reports: Vec<PointsReport> = pipeline
        .heart_points_each(
            inputs
                .iter()
                .map(|(path, bytes)| NamedInput::new(input_name(path), bytes)),
            &reducer,
        )?
        .into_iter()
        .map(|(index, result)| PointsReport {
            input: inputs[index].0.display().to_string(),
            result,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut total = 0.0_f64;
    for report in &reports {
        let r = &report.result;
        println!(
            "{}: {} - {}  {} points",
            report.input,
            r.start.format("%Y-%m-%d %H:%M:%S"),
            r.end.format("%H:%M:%S"),
            r.rounded_points()
        );
        for zone in &r.zones {
            println!(
                "  {:<16} >= {:>5.1} bpm  {:>7.1} min  {:>7.1} points",
                zone.name, zone.min_bpm, zone.minutes, zone.points
            );
        }
        if let Some(calories) = r.calories {
            println!("  calories: {calories}");
        }
        total += r.total_points;
    }
    if reports.len() > 1 {
        println!("total: {} points", total.round() as u64);
    }

    Ok(())
}

fn cmd_split(
    args: &InputArgs,
    utc_offset: FixedOffset,
    output: &Path,
    zip: bool,
) -> Result<(), HrCliError> {
    let pipeline = build_pipeline(args).with_splitter(Splitter::hourly_in(utc_offset));
    let inputs = args
        .inputs
        .iter()
        .map(|path| Ok((path, read_input(path)?)))
        .collect::<Result<Vec<_>, HrCliError>>()?;

    fs::create_dir_all(output)?;

    if zip {
        let archive = pipeline.hourly_archive(
            inputs
                .iter()
                .map(|(path, bytes)| NamedInput::new(input_name(path), bytes)),
        )?;
        let path = output.join(&archive.name);
        fs::write(&path, &archive.bytes)?;
        println!("{}", path.display());
        return Ok(());
    }

    for (path, bytes) in &inputs {
        for file in pipeline.split_files(NamedInput::new(input_name(path), bytes))? {
            println!("{}", file.write_to(output)?.display());
        }
    }

    Ok(())
}

fn cmd_encode(args: &InputArgs, output: &Path) -> Result<(), HrCliError> {
    let pipeline = build_pipeline(args);
    let [path] = args.inputs.as_slice() else {
        return Err(HrCliError::Usage(
            "encode takes exactly one input".to_string(),
        ));
    };

    let bytes = read_input(path)?;
    let stream = pipeline.decode(NamedInput::new(input_name(path), &bytes))?;
    let file = DetailLogWriter.write(&stream)?;

    if output.to_string_lossy() == "-" {
        io::stdout().write_all(&file.bytes)?;
    } else if output.is_dir() {
        println!("{}", file.write_to(output)?.display());
    } else {
        fs::write(output, &file.bytes)?;
    }

    Ok(())
}

fn cmd_inspect(args: &InputArgs, json: bool) -> Result<(), HrCliError> {
    let pipeline = build_pipeline(args);

    let mut reports = Vec::new();
    for path in &args.inputs {
        let bytes = read_input(path)?;
        let stream = pipeline.decode(NamedInput::new(input_name(path), &bytes))?;
        let summary = stream.summary().ok_or(PipelineError::EmptyStream)?;
        reports.push(InspectReport {
            input: path.display().to_string(),
            summary,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let s = &report.summary;
        println!("{}", report.input);
        println!("  format:   {}", s.format.as_str());
        if let Some(device) = &s.device {
            println!("  device:   {device}");
        }
        println!("  start:    {}", s.start.to_rfc3339());
        println!("  end:      {}", s.end.to_rfc3339());
        println!("  duration: {} s", s.duration_sec);
        println!("  samples:  {}", s.sample_count);
        println!(
            "  bpm:      min {} / avg {:.1} / max {}",
            s.min_hr_bpm, s.average_hr_bpm, s.max_hr_bpm
        );
        if let Some(calories) = s.calories {
            println!("  calories: {calories}");
        }
    }

    Ok(())
}

fn build_pipeline(args: &InputArgs) -> Pipeline {
    let mut pipeline = Pipeline::new().with_hint(args.format.into());
    if args.dedup {
        pipeline = pipeline.with_filter(SampleFilter::Deduplicate);
    }
    if args.hr_min.is_some() || args.hr_max.is_some() {
        pipeline = pipeline.with_filter(SampleFilter::heart_rate_range(
            args.hr_min.unwrap_or(DEFAULT_HR_MIN),
            args.hr_max.unwrap_or(DEFAULT_HR_MAX),
        ));
    }
    pipeline
}

fn read_input(path: &Path) -> Result<Vec<u8>, HrCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(HrCliError::Usage(
                "refusing to read a recording from an interactive terminal".to_string(),
            ));
        }
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(path)?)
    }
}

fn input_name(path: &Path) -> Option<&str> {
    if path.to_string_lossy() == "-" {
        return None;
    }
    path.file_name().and_then(|n| n.to_str())
}

/// Parse `Z`, `UTC`, `+HH:MM`, `-HH:MM` or `+HHMM`
fn parse_utc_offset(value: &str) -> Result<FixedOffset, HrCliError> {
    let invalid = || HrCliError::Usage(format!("invalid UTC offset '{value}', expected e.g. +05:30"));

    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

// Report types

#[derive(serde::Serialize)]
struct PointsReport {
    input: String,
    #[serde(flatten)]
    result: HeartPointsResult,
}

#[derive(serde::Serialize)]
struct InspectReport {
    input: String,
    #[serde(flatten)]
    summary: SessionSummary,
}

// Error types

#[derive(Debug)]
enum HrCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    Usage(String),
}

impl From<io::Error> for HrCliError {
    fn from(e: io::Error) -> Self {
        HrCliError::Io(e)
    }
}

impl From<PipelineError> for HrCliError {
    fn from(e: PipelineError) -> Self {
        HrCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for HrCliError {
    fn from(e: serde_json::Error) -> Self {
        HrCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HrCliError> for CliError {
    fn from(e: HrCliError) -> Self {
        match e {
            HrCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HrCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HrCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'hrtrack --help' for usage".to_string()),
            },
            HrCliError::Pipeline(e) => {
                let (code, hint) = match &e {
                    PipelineError::Format(_) => (
                        "FORMAT_ERROR",
                        Some("Input must be a FIT file, a heart-rate log or a ZIP of logs"),
                    ),
                    PipelineError::FieldMissing { .. } => (
                        "FIELD_MISSING",
                        Some("The recording has a damaged record"),
                    ),
                    PipelineError::EmptyStream => (
                        "EMPTY_STREAM",
                        Some("The input holds no heart-rate samples after filtering"),
                    ),
                    PipelineError::Config(_) => (
                        "CONFIG_ERROR",
                        Some("Pass --age or --max-hr with plausible values"),
                    ),
                    PipelineError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    PipelineError::Json(_) => (
                        "JSON_ERROR",
                        Some("Check the configuration file's JSON syntax"),
                    ),
                    PipelineError::Archive(_) => ("ARCHIVE_ERROR", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}
