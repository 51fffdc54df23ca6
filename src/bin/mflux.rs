//! mflux CLI - Command-line interface for Motion Flux
//!
//! Commands:
//! - check: Validate a recorded trial (batch mode)
//! - run: Validate samples streamed on stdin (streaming mode)
//! - replay: Print the points of a target trajectory at a frame rate
//! - doctor: Diagnose environment and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use motion_flux::trajectory::{
    parse_csv_table, CircularTrajectoryConfig, CircularTrajectoryGenerator,
    CustomTrajectoryGenerator, TrajectoryGenerator, TrajectoryPoint,
};
use motion_flux::{run_trial, MotionError, Sample, TrialConfig, TrialProcessor};
use motion_flux::{MFLUX_VERSION, PRODUCER_NAME};

/// mflux - Real-time kinematic monitoring and movement validation
#[derive(Parser)]
#[command(name = "mflux")]
#[command(author = "Synheart AI Inc")]
#[command(version = MFLUX_VERSION)]
#[command(about = "Validate pointer movement trials", long_about = None)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a recorded trial and print the trial report (batch mode)
    Check {
        /// Trial configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Samples file, a JSON array of {x, y, t} (use - for stdin)
        #[arg(short, long)]
        samples: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Validate samples streamed on stdin, one JSON object per line (streaming mode)
    Run {
        /// Trial configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Zero point of elapsed time (defaults to the first sample)
        #[arg(long)]
        start_time: Option<f64>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Print the points of a target trajectory at a fixed frame rate
    Replay {
        /// Trajectory table (CSV with x, y, time and optional visible, traj_id)
        #[arg(short, long, required_unless_present = "circle", conflicts_with = "circle")]
        input: Option<PathBuf>,

        /// Circular trajectory configuration (JSON)
        #[arg(long)]
        circle: Option<PathBuf>,

        /// Trajectory to play (defaults to the first one)
        #[arg(long)]
        traj_id: Option<String>,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Seconds to replay (defaults to the trajectory's duration or one rotation)
        #[arg(long)]
        duration: Option<f64>,

        /// Restart the trajectory when it ends
        #[arg(long)]
        cyclic: bool,

        /// Jump between defined points instead of interpolating
        #[arg(long)]
        no_interpolate: bool,
    },

    /// Diagnose environment and configuration
    Doctor {
        /// Check a trial configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), MfluxCliError> {
    match cli.command {
        Commands::Check {
            config,
            samples,
            output_format,
        } => cmd_check(&config, &samples, output_format),
        Commands::Run {
            config,
            start_time,
            flush,
        } => cmd_run(&config, start_time, flush),
        Commands::Replay {
            input,
            circle,
            traj_id,
            fps,
            duration,
            cyclic,
            no_interpolate,
        } => {
            let source = match (input, circle) {
                (Some(path), _) => ReplaySource::Table {
                    path,
                    traj_id,
                    cyclic,
                    interpolate: !no_interpolate,
                },
                (None, Some(path)) => ReplaySource::Circle(path),
                (None, None) => {
                    return Err(MfluxCliError::Usage(
                        "either --input or --circle is required".to_string(),
                    ))
                }
            };
            cmd_replay(source, fps, duration)
        }
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(path: &Path) -> Result<String, MfluxCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn cmd_check(
    config: &Path,
    samples: &Path,
    output_format: OutputFormat,
) -> Result<(), MfluxCliError> {
    let config_json = fs::read_to_string(config)?;
    let samples_json = read_input(samples)?;

    let report = run_trial(&config_json, &samples_json)?;

    match output_format {
        OutputFormat::Json => println!("{}", report),
        OutputFormat::JsonPretty => {
            let value: serde_json::Value = serde_json::from_str(&report)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn cmd_run(config: &Path, start_time: Option<f64>, flush: bool) -> Result<(), MfluxCliError> {
    let config = TrialConfig::from_json(&fs::read_to_string(config)?)?;
    let mut processor = TrialProcessor::from_config(&config)?;
    processor.start_trial(start_time.or(config.start_time));
    info!(validators = ?processor.validator_names(), "streaming trial started");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut failed = 0usize;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let sample: Sample = serde_json::from_str(trimmed).map_err(|e| {
            MfluxCliError::ParseError(format!("Failed to parse sample: {}", e))
        })?;

        let outcome = processor.process_sample(sample)?;
        if !outcome.passed() {
            failed += 1;
        }

        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    info!(
        samples = processor.samples_processed(),
        failed,
        curves = ?processor.curve_count(),
        "stream ended"
    );
    Ok(())
}

enum ReplaySource {
    Table {
        path: PathBuf,
        traj_id: Option<String>,
        cyclic: bool,
        interpolate: bool,
    },
    Circle(PathBuf),
}

#[derive(Serialize)]
struct ReplayFrame {
    time: f64,
    #[serde(flatten)]
    point: TrajectoryPoint,
}

fn cmd_replay(source: ReplaySource, fps: f64, duration: Option<f64>) -> Result<(), MfluxCliError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(MfluxCliError::Usage(format!("--fps must be positive, got {}", fps)));
    }

    let (mut generator, start, default_duration): (Box<dyn TrajectoryGenerator>, f64, f64) =
        match source {
            ReplaySource::Table {
                path,
                traj_id,
                cyclic,
                interpolate,
            } => {
                let (columns, rows) = parse_csv_table(&read_input(&path)?)?;
                let mut generator = CustomTrajectoryGenerator::new(cyclic, interpolate);
                let loaded = generator.load_rows(&columns, &rows)?;
                debug!(trajectories = ?loaded, "trajectory table loaded");

                generator.set_active_traj_id(traj_id.as_deref())?;
                let active = match traj_id.or_else(|| loaded.first().cloned()) {
                    Some(id) => id,
                    None => return Err(MfluxCliError::Usage("trajectory table has no rows".to_string())),
                };
                let start = if cyclic {
                    0.0
                } else {
                    generator.start_time(&active).unwrap_or(0.0)
                };
                let end = generator.duration(&active).unwrap_or(0.0);
                (Box::new(generator) as Box<dyn TrajectoryGenerator>, start, end - start)
            }
            ReplaySource::Circle(path) => {
                let config: CircularTrajectoryConfig = serde_json::from_str(&read_input(&path)?)?;
                let generator = CircularTrajectoryGenerator::new(config)?;
                let rotation = generator.full_rotation_duration();
                (Box::new(generator) as Box<dyn TrajectoryGenerator>, 0.0, rotation)
            }
        };

    let duration = duration.unwrap_or(default_duration);
    if !duration.is_finite() || duration < 0.0 {
        return Err(MfluxCliError::Usage(format!(
            "--duration must be non-negative, got {}",
            duration
        )));
    }

    let mut stdout = io::stdout();
    let n_frames = (duration * fps).floor() as usize;
    for frame in 0..=n_frames {
        let time = start + frame as f64 / fps;
        let point = generator.get_traj_point(time)?;
        writeln!(stdout, "{}", serde_json::to_string(&ReplayFrame { time, point })?)?;
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MfluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    // Check library version
    checks.push(DoctorCheck {
        name: "mflux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Motion Flux version {}", MFLUX_VERSION),
    });

    // Check trial configuration if provided
    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match TrialConfig::from_json(&content)
                    .and_then(|c| TrialProcessor::from_config(&c))
                {
                    Ok(processor) => {
                        let names = processor.validator_names();
                        let validators = if names.is_empty() {
                            "no validators".to_string()
                        } else {
                            names.join(", ")
                        };
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: if names.is_empty() && processor.curves().is_none() {
                                CheckStatus::Warning
                            } else {
                                CheckStatus::Ok
                            },
                            message: format!(
                                "Configuration valid ({}; curve detection {})",
                                validators,
                                if processor.curves().is_some() { "on" } else { "off" }
                            ),
                        });
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid configuration: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read configuration file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: "Configuration file does not exist".to_string(),
            });
        }
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MFLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("mflux Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MfluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum MfluxCliError {
    Io(io::Error),
    Motion(MotionError),
    Json(serde_json::Error),
    DoctorFailed,
    ParseError(String),
    Usage(String),
}

impl From<io::Error> for MfluxCliError {
    fn from(e: io::Error) -> Self {
        MfluxCliError::Io(e)
    }
}

impl From<MotionError> for MfluxCliError {
    fn from(e: MotionError) -> Self {
        MfluxCliError::Motion(e)
    }
}

impl From<serde_json::Error> for MfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        MfluxCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MfluxCliError> for CliError {
    fn from(e: MfluxCliError) -> Self {
        match e {
            MfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MfluxCliError::Motion(e) => {
                let (code, hint) = match &e {
                    MotionError::InvalidConfig(_) | MotionError::NotInitialized { .. } => {
                        ("CONFIG_ERROR", "Run 'mflux doctor --config <file>' for details")
                    }
                    MotionError::OutOfOrderTime { .. } => {
                        ("SEQUENCE_ERROR", "Samples must be sent in time order")
                    }
                    MotionError::BadFormat(_) | MotionError::ParseError(_) => {
                        ("FORMAT_ERROR", "Check the trajectory table columns and values")
                    }
                    MotionError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    MotionError::InvalidArgument(_) | MotionError::InvalidState(_) => {
                        ("INVALID_ARGUMENT", "Check command arguments")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            MfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MfluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            MfluxCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be a JSON object with x, y and t".to_string()),
            },
            MfluxCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'mflux --help' for usage".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
