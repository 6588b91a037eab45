//! Cogtrain CLI - command-line interface for the training scoring core
//!
//! Commands:
//! - sequence: Generate N-back stimulus sequences
//! - replay-nback: Score recorded N-back sessions
//! - replay-attention: Score recorded attention sessions
//! - level-up: Evaluate the promotion rule
//! - config: Print the resolved configuration
//! - doctor: Diagnose configuration and profile files

use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use cogtrain::logging::init_tracing;
use cogtrain::nback::sequence::{generate_sequence, SequenceParams};
use cogtrain::nback::types::NBackSequence;
use cogtrain::pipeline::{replay_attention, replay_nback, AttentionReplay, NBackReplay, TrainingProcessor};
use cogtrain::{Group, Level, Participant, PromotionPolicy, TrainingConfig, TrainingError};
use cogtrain::{COGTRAIN_VERSION, PRODUCER_NAME};

/// Cogtrain - scoring and adaptation core for cognitive-training tasks
#[derive(Parser)]
#[command(name = "cogtrain")]
#[command(version = COGTRAIN_VERSION)]
#[command(about = "Score N-back and gaze-attention training sessions", long_about = None)]
struct Cli {
    /// Log filter directive (e.g. "info", "cogtrain=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Configuration file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate N-back stimulus sequences
    Sequence {
        /// N-back level (1-3)
        #[arg(short, long, default_value = "2")]
        level: u32,

        /// Sequence length (defaults to the configured length)
        #[arg(long)]
        length: Option<usize>,

        /// Number of sequences to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Score recorded N-back sessions ({level, sequence, responses})
    ReplayNback {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Complete sessions for this participant (applies promotion and logs records)
        #[arg(long)]
        user: Option<String>,

        /// Participant group (G1-G4)
        #[arg(long, default_value = "G4")]
        group: String,

        /// Load participant levels from file
        #[arg(long)]
        load_profiles: Option<PathBuf>,

        /// Save participant levels to file after processing
        #[arg(long)]
        save_profiles: Option<PathBuf>,
    },

    /// Score recorded attention sessions ({level, task_area, frames})
    ReplayAttention {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Evaluate the promotion rule for an accuracy and current level
    LevelUp {
        /// Session accuracy (0-1)
        #[arg(long)]
        accuracy: f64,

        /// Current level (1-3)
        #[arg(long)]
        level: u32,

        /// Task whose promotion rule applies
        #[arg(long, default_value = "nback")]
        task: TaskArg,

        /// Use the server-side threshold
        #[arg(long)]
        server: bool,
    },

    /// Print the resolved configuration
    Config,

    /// Diagnose configuration and profile files
    Doctor {
        /// Check a saved profile file
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum TaskArg {
    Nback,
    Attention,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// One JSON document
    Json,
    /// Newline-delimited JSON (one session per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CogtrainCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sequence {
            level,
            length,
            count,
            seed,
            output_format,
        } => cmd_sequence(&config, level, length, count, seed, output_format),

        Commands::ReplayNback {
            input,
            input_format,
            output_format,
            user,
            group,
            load_profiles,
            save_profiles,
        } => cmd_replay_nback(
            &config,
            &input,
            input_format,
            output_format,
            user,
            &group,
            load_profiles.as_deref(),
            save_profiles.as_deref(),
        ),

        Commands::ReplayAttention {
            input,
            input_format,
            output_format,
        } => cmd_replay_attention(&config, &input, input_format, output_format),

        Commands::LevelUp {
            accuracy,
            level,
            task,
            server,
        } => cmd_level_up(&config, accuracy, level, task, server),

        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }

        Commands::Doctor { profiles, json } => cmd_doctor(cli.config.as_deref(), profiles.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig, CogtrainCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(TrainingConfig::from_json(&json)?)
        }
        None => Ok(TrainingConfig::default()),
    }
}

fn cmd_sequence(
    config: &TrainingConfig,
    level: u32,
    length: Option<usize>,
    count: usize,
    seed: Option<u64>,
    output_format: OutputFormat,
) -> Result<(), CogtrainCliError> {
    let level = Level::new(level)?;
    let params = SequenceParams::new(
        length.unwrap_or(config.nback.sequence_length),
        level.get() as usize,
    )
    .with_probability(config.nback.forced_match_probability);
    let alphabet = config.nback.alphabet_symbols();

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let sequences = (0..count)
        .map(|_| generate_sequence(params, &alphabet, &mut rng))
        .collect::<Result<Vec<NBackSequence>, TrainingError>>()?;

    write_stdout(&format_output(&sequences, &output_format)?)
}

#[allow(clippy::too_many_arguments)]
fn cmd_replay_nback(
    config: &TrainingConfig,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    user: Option<String>,
    group: &str,
    load_profiles: Option<&Path>,
    save_profiles: Option<&Path>,
) -> Result<(), CogtrainCliError> {
    let replays: Vec<NBackReplay> = parse_input(&read_input(input)?, &input_format)?;
    if replays.is_empty() {
        return Err(CogtrainCliError::NoSessions);
    }

    let Some(user_id) = user else {
        let reports = replays
            .iter()
            .map(|replay| replay_nback(config, replay))
            .collect::<Result<Vec<_>, TrainingError>>()?;
        return write_stdout(&format_output(&reports, &output_format)?);
    };

    let group = Group::parse(group).ok_or_else(|| CogtrainCliError::UnknownGroup(group.to_string()))?;
    let participant = Participant::new(user_id, group);

    let mut processor = TrainingProcessor::in_memory(config.clone())?;
    if let Some(path) = load_profiles {
        processor.load_profiles(&fs::read_to_string(path)?)?;
    }

    let mut completions = Vec::with_capacity(replays.len());
    for replay in &replays {
        let completion = processor.process_nback_replay(&participant, &serde_json::to_string(replay)?)?;
        completions.push(serde_json::from_str::<serde_json::Value>(&completion)?);
    }
    info!(
        user_id = participant.user_id.as_str(),
        sessions = completions.len(),
        "replayed n-back sessions"
    );

    if let Some(path) = save_profiles {
        fs::write(path, processor.save_profiles()?)?;
    }

    write_stdout(&format_output(&completions, &output_format)?)
}

fn cmd_replay_attention(
    config: &TrainingConfig,
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), CogtrainCliError> {
    let replays: Vec<AttentionReplay> = parse_input(&read_input(input)?, &input_format)?;
    if replays.is_empty() {
        return Err(CogtrainCliError::NoSessions);
    }
    let reports = replays
        .iter()
        .map(|replay| replay_attention(config, replay))
        .collect::<Result<Vec<_>, TrainingError>>()?;
    write_stdout(&format_output(&reports, &output_format)?)
}

fn cmd_level_up(
    config: &TrainingConfig,
    accuracy: f64,
    level: u32,
    task: TaskArg,
    server: bool,
) -> Result<(), CogtrainCliError> {
    let policy = match (server, task) {
        (true, _) => PromotionPolicy::server_mirror(),
        (false, TaskArg::Nback) => config.promotion.clone(),
        (false, TaskArg::Attention) => config.attention_promotion.clone(),
    };
    let current = Level::new(level)?;
    let next = policy.next_level(accuracy, current);

    let decision = LevelUpDecision {
        accuracy,
        threshold: policy.threshold,
        current_level: current,
        should_level_up: next.is_some(),
        next_level: next.unwrap_or(current),
    };
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, profiles: Option<&Path>, json: bool) -> Result<(), CogtrainCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Cogtrain version {COGTRAIN_VERSION}"),
    });

    checks.push(match config {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        },
        Some(path) => match load_config(Some(path)) {
            Ok(cfg) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid ({} sets x {}s, n-back length {})",
                    cfg.attention.total_sets, cfg.attention.set_duration_sec, cfg.nback.sequence_length
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", CliError::from(e).message),
            },
        },
    });

    if let Some(profiles_path) = profiles {
        let check = if !profiles_path.exists() {
            DoctorCheck {
                name: "profiles".to_string(),
                status: CheckStatus::Warning,
                message: "Profiles file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(profiles_path) {
                Ok(content) => match cogtrain::MemoryProfileStore::from_json(&content) {
                    Ok(store) => DoctorCheck {
                        name: "profiles".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Profiles file valid ({} participants)", store.participant_count()),
                    },
                    Err(e) => DoctorCheck {
                        name: "profiles".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid profiles JSON: {e}"),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "profiles".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read profiles file: {e}"),
                },
            }
        };
        checks.push(check);
    }

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (pass input files with --input)".to_string()
        } else {
            "stdin is a pipe (--input - ready)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: COGTRAIN_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Cogtrain Doctor Report");
        println!("======================");
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

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(CogtrainCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// I/O helpers

fn read_input(input: &Path) -> Result<String, CogtrainCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(
    data: &str,
    format: &InputFormat,
) -> Result<Vec<T>, CogtrainCliError> {
    match format {
        InputFormat::Json => Ok(vec![serde_json::from_str(data)?]),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| CogtrainCliError::ParseError(format!("line {}: {}", i + 1, e)))
            })
            .collect(),
    }
}

fn format_output<T: Serialize>(records: &[T], format: &OutputFormat) -> Result<String, CogtrainCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn write_stdout(output: &str) -> Result<(), CogtrainCliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

// Error types

#[derive(Debug)]
enum CogtrainCliError {
    Io(io::Error),
    Training(TrainingError),
    Json(serde_json::Error),
    UnknownGroup(String),
    NoSessions,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for CogtrainCliError {
    fn from(e: io::Error) -> Self {
        CogtrainCliError::Io(e)
    }
}

impl From<TrainingError> for CogtrainCliError {
    fn from(e: TrainingError) -> Self {
        CogtrainCliError::Training(e)
    }
}

impl From<serde_json::Error> for CogtrainCliError {
    fn from(e: serde_json::Error) -> Self {
        CogtrainCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CogtrainCliError> for CliError {
    fn from(e: CogtrainCliError) -> Self {
        match e {
            CogtrainCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CogtrainCliError::Training(e) => {
                let hint = match &e {
                    TrainingError::InvalidLevel(_) => "Levels run from 1 to 3",
                    TrainingError::InvalidConfig(_) => "Run 'cogtrain config' to see the defaults",
                    TrainingError::InvalidSequenceParams(_) => "Sequence length must exceed the level",
                    _ => "Check the input against the expected session format",
                };
                CliError {
                    code: "TRAINING_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CogtrainCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CogtrainCliError::UnknownGroup(group) => CliError {
                code: "UNKNOWN_GROUP".to_string(),
                message: format!("Unknown group: {group}"),
                hint: Some("Use one of G1, G2, G3, G4".to_string()),
            },
            CogtrainCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CogtrainCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            CogtrainCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct LevelUpDecision {
    accuracy: f64,
    threshold: f64,
    current_level: Level,
    should_level_up: bool,
    next_level: Level,
}

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
