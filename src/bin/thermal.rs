//! Thermal CLI - Command-line interface for Synheart Thermal
//!
//! Commands:
//! - simulate: Run a scenario and write the recorded time series
//! - evaluate: Run the perception chain on one set of body temperatures
//! - doctor: Diagnose model tables and input files

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_thermal::comfort::OverallComfortModel;
use synheart_thermal::encoder::{ReportEncoder, StepRecord};
use synheart_thermal::pipeline::{ComfortProcessor, Perception, Simulation};
use synheart_thermal::sensation::SensationMemory;
use synheart_thermal::types::{
    segment_values, BodyTemperatures, SegmentValues, ThermalSample, SEGMENT_COUNT,
};
use synheart_thermal::{
    BodyParameters, Environment, PhysiologicalEngine, Scenario, ThermalError, PRODUCER_NAME,
    THERMAL_VERSION,
};

/// Largest steady-state rate the doctor accepts at the neutral environment (K/s)
const NEUTRAL_RATE_TOLERANCE: f64 = 1e-3;

/// Thermal - Human thermoregulation and thermal comfort engine
#[derive(Parser)]
#[command(name = "thermal")]
#[command(author = "Synheart AI Inc")]
#[command(version = THERMAL_VERSION)]
#[command(about = "Simulate body temperatures, thermal sensation and comfort", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write the recorded time series
    Simulate {
        /// Scenario file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Load sensation memory from file before the run
        #[arg(long)]
        load_memory: Option<PathBuf>,

        /// Save sensation memory to file after the run
        #[arg(long)]
        save_memory: Option<PathBuf>,
    },

    /// Run the perception chain on one set of body temperatures
    Evaluate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Load sensation memory from file
        #[arg(long)]
        load_memory: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Diagnose model tables and input files
    Doctor {
        /// Check a scenario file
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Check a sensation memory file
        #[arg(long)]
        memory: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Full report as compact JSON
    Json,
    /// Full report as pretty-printed JSON
    JsonPretty,
}

/// Input of the `evaluate` command
#[derive(Deserialize)]
struct EvaluateInput {
    /// Skin temperature per segment (K)
    skin_temperature_k: Vec<f64>,
    /// Core-blood temperature (K)
    core_blood_temperature_k: f64,
    /// Skin temperature rate per segment (K/s)
    #[serde(default)]
    skin_rate: Option<Vec<f64>>,
    #[serde(default)]
    core_rate: f64,
    /// Driving signal; above 0.5 means the load is applied
    #[serde(default)]
    signal: f64,
    #[serde(default)]
    transient: bool,
    #[serde(default)]
    control: bool,
}

fn main() -> ExitCode {
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

fn run(cli: Cli) -> Result<(), ThermalCliError> {
    match cli.command {
        Commands::Simulate {
            input,
            output,
            output_format,
            load_memory,
            save_memory,
        } => cmd_simulate(
            &input,
            &output,
            output_format,
            load_memory.as_deref(),
            save_memory.as_deref(),
        ),

        Commands::Evaluate {
            input,
            load_memory,
            pretty,
        } => cmd_evaluate(&input, load_memory.as_deref(), pretty),

        Commands::Doctor {
            scenario,
            memory,
            json,
        } => cmd_doctor(scenario.as_deref(), memory.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, ThermalCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_simulate(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    load_memory: Option<&Path>,
    save_memory: Option<&Path>,
) -> Result<(), ThermalCliError> {
    let scenario = Scenario::from_json(&read_input(input)?)?;
    let mut simulation = Simulation::new(&scenario)?;

    if let Some(memory_path) = load_memory {
        let memory_json = fs::read_to_string(memory_path)?;
        simulation.load_memory(&memory_json)?;
    }

    let outcome = simulation.run()?;

    if let Some(memory_path) = save_memory {
        fs::write(memory_path, outcome.memory.to_json()?)?;
    }

    let encoder = ReportEncoder::new();
    let output_data = match output_format {
        OutputFormat::Ndjson => format_records(&outcome.records)?,
        OutputFormat::Json => serde_json::to_string(&encoder.encode(&scenario, &outcome))?,
        OutputFormat::JsonPretty => encoder.encode_to_json(&scenario, &outcome)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_evaluate(
    input: &Path,
    load_memory: Option<&Path>,
    pretty: bool,
) -> Result<(), ThermalCliError> {
    let request: EvaluateInput = serde_json::from_str(&read_input(input)?)?;

    let skin_k = segment_values("skin_temperature_k", &request.skin_temperature_k)?;
    let skin_rate: SegmentValues = match &request.skin_rate {
        Some(rates) => segment_values("skin_rate", rates)?,
        None => [0.0; SEGMENT_COUNT],
    };
    let sample = ThermalSample {
        temperatures: BodyTemperatures {
            skin_k,
            core_blood_k: request.core_blood_temperature_k,
        },
        skin_rate,
        core_rate: request.core_rate,
    };

    let mut processor = ComfortProcessor::new(
        &BodyParameters::default(),
        OverallComfortModel::new(request.transient, request.control),
        request.signal,
    );
    if let Some(memory_path) = load_memory {
        processor.load_memory(&fs::read_to_string(memory_path)?)?;
    }

    let perception: Perception = processor.evaluate(&sample);
    let output = if pretty {
        serde_json::to_string_pretty(&perception)?
    } else {
        serde_json::to_string(&perception)?
    };
    println!("{}", output);
    Ok(())
}

fn cmd_doctor(
    scenario: Option<&Path>,
    memory: Option<&Path>,
    json: bool,
) -> Result<(), ThermalCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "thermal_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Thermal version {}", THERMAL_VERSION),
    });

    // Control distributions must each sum to one
    let params = BodyParameters::default();
    for (name, weights) in params.distributions() {
        let sum: f64 = weights.iter().sum();
        let status = if (sum - 1.0).abs() < 1e-6 {
            CheckStatus::Ok
        } else {
            CheckStatus::Error
        };
        checks.push(DoctorCheck {
            name: name.to_string(),
            status,
            message: format!("Distribution sums to {:.6}", sum),
        });
    }

    checks.push(DoctorCheck {
        name: "body_surface".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "{:.3} m² surface, {:.2} W basal metabolism",
            params.total_area_m2(),
            params.total_basal_metabolism_w()
        ),
    });

    checks.push(neutral_check());

    if let Some(path) = scenario {
        checks.push(file_check("scenario", path, |content| {
            let scenario = Scenario::from_json(content)?;
            Ok(format!(
                "Scenario '{}' valid ({} environment phases, {} s)",
                scenario.name,
                scenario.environment.len(),
                scenario.options.duration_s
            ))
        }));
    }

    if let Some(path) = memory {
        checks.push(file_check("memory", path, |content| {
            let memory = SensationMemory::from_json(content)?;
            Ok(format!(
                "Memory file valid ({} load events recorded)",
                memory.event_count()
            ))
        }));
    }

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
            message: "stdin is a pipe (scenario input ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: THERMAL_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Thermal Doctor Report");
        println!("=====================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ThermalCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// The body at its setpoints must be at rest in the neutral environment
fn neutral_check() -> DoctorCheck {
    let engine = PhysiologicalEngine::default();
    let htc = [4.5; SEGMENT_COUNT];
    let air = engine.neutral_air_temperatures(&htc);
    let environment = Environment {
        air_temperature_k: air,
        heat_transfer_coefficient: htc,
        radiation: [0.0; SEGMENT_COUNT],
        mean_radiant_temperature_k: air[0],
        ambient_temperature_k: air[0],
    };
    let max_rate = engine
        .derivatives(&engine.initial_state(), &environment)
        .max_abs();

    DoctorCheck {
        name: "neutral_steady_state".to_string(),
        status: if max_rate < NEUTRAL_RATE_TOLERANCE {
            CheckStatus::Ok
        } else {
            CheckStatus::Warning
        },
        message: format!("Largest node rate at the neutral environment {:.2e} K/s", max_rate),
    }
}

fn file_check(
    name: &str,
    path: &Path,
    validate: impl FnOnce(&str) -> Result<String, ThermalError>,
) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} file does not exist", name),
        };
    }
    match fs::read_to_string(path) {
        Ok(content) => match validate(&content) {
            Ok(message) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message,
            },
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid {} file: {}", name, e),
            },
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read {} file: {}", name, e),
        },
    }
}

// Helper functions

fn format_records(records: &[StepRecord]) -> Result<String, ThermalCliError> {
    let mut lines: Vec<String> = Vec::new();
    for record in records {
        lines.push(serde_json::to_string(record)?);
    }
    Ok(lines.join("\n"))
}

// Error types

enum ThermalCliError {
    Io(io::Error),
    Model(ThermalError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for ThermalCliError {
    fn from(e: io::Error) -> Self {
        ThermalCliError::Io(e)
    }
}

impl From<ThermalError> for ThermalCliError {
    fn from(e: ThermalError) -> Self {
        ThermalCliError::Model(e)
    }
}

impl From<serde_json::Error> for ThermalCliError {
    fn from(e: serde_json::Error) -> Self {
        ThermalCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ThermalCliError> for CliError {
    fn from(e: ThermalCliError) -> Self {
        match e {
            ThermalCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ThermalCliError::Model(e @ ThermalError::JsonError(_)) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a valid scenario document".to_string()),
            },
            ThermalCliError::Model(e) => CliError {
                code: "MODEL_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'thermal doctor --scenario <file>' for details".to_string()),
            },
            ThermalCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ThermalCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
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
