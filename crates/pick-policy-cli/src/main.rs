// crates/pick-policy-cli/src/main.rs
// ============================================================================
// Module: Pick Policy CLI Entry Point
// Description: Command dispatcher for policy evaluation and operator tasks.
// Purpose: Evaluate predictions, inspect and reset the hard stop, audit the log.
// Dependencies: clap, pick-policy-config, pick-policy-service, serde, thiserror
// ============================================================================

//! ## Overview
//! The Pick Policy CLI wraps [`pick_policy_service::PolicyService`] for
//! orchestrators and operators. Service responses are written to stdout as
//! JSON envelopes; CLI failures (unreadable input, bad config) go to stderr.
//! Inputs are untrusted and read with hard size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use pick_policy_config::PickPolicyConfig;
use pick_policy_config::StoreType;
use pick_policy_core::Actor;
use pick_policy_core::ActorId;
use pick_policy_core::ActorRole;
use pick_policy_core::Clock;
use pick_policy_core::PolicyEvaluationResult;
use pick_policy_core::PredictionInput;
use pick_policy_core::RunContext;
use pick_policy_core::TraceId;
use pick_policy_service::PolicyService;
use pick_policy_service::ResetView;
use pick_policy_service::ServiceError;
use pick_policy_service::SystemClock;
use pick_policy_service::build_service;
use pick_policy_store_sqlite::AuditChainReport;
use pick_policy_store_sqlite::AuditRecord;
use pick_policy_store_sqlite::SqlitePolicyStore;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a prediction input file.
const MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;
/// Default number of audit rows listed.
const DEFAULT_AUDIT_LIMIT: usize = 50;
/// Default run identifier for CLI evaluations.
const DEFAULT_RUN_ID: &str = "cli";
/// Default actor for CLI evaluations.
const DEFAULT_ACTOR: &str = "cli";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "pick-policy", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Config file path (defaults to pick-policy.toml or `PICK_POLICY_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one prediction or a JSON array of predictions.
    Evaluate(EvaluateCommand),
    /// Show the hard-stop state.
    Status,
    /// Reset an active hard stop.
    Reset(ResetCommand),
    /// Audit log utilities (sqlite store only).
    Audit {
        /// Selected audit subcommand.
        #[command(subcommand)]
        command: AuditCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `evaluate`.
#[derive(Args, Debug)]
struct EvaluateCommand {
    /// Path to a prediction JSON object or array.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Run identifier recorded on each decision.
    #[arg(long, value_name = "RUN_ID", default_value = DEFAULT_RUN_ID)]
    run_id: String,
    /// Trace identifier to propagate; generated when omitted.
    #[arg(long, value_name = "TRACE_ID")]
    trace_id: Option<String>,
    /// Actor recorded on a hard-stop trigger.
    #[arg(long, value_name = "ACTOR_ID", default_value = DEFAULT_ACTOR)]
    actor: String,
}

/// Arguments for `reset`.
#[derive(Args, Debug)]
struct ResetCommand {
    /// Operator identifier.
    #[arg(long, value_name = "ACTOR_ID")]
    actor: String,
    /// Operator role.
    #[arg(long, value_enum)]
    role: Option<RoleArg>,
    /// Reason recorded in the audit log.
    #[arg(long, value_name = "TEXT")]
    reason: Option<String>,
    /// Trace identifier to correlate the reset with an incident.
    #[arg(long, value_name = "TRACE_ID")]
    trace_id: Option<String>,
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// List the most recent audit entries.
    List(AuditListCommand),
    /// Recompute the audit hash chain.
    Verify,
}

/// Arguments for `audit list`.
#[derive(Args, Debug)]
struct AuditListCommand {
    /// Maximum entries to list.
    #[arg(long, default_value_t = DEFAULT_AUDIT_LIMIT)]
    limit: usize,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the config file.
    Validate,
    /// Print the active policy and its fingerprint.
    Show,
}

/// Operator roles accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum RoleArg {
    /// Read-only user.
    User,
    /// Operations engineer.
    Ops,
    /// Administrator.
    Admin,
}

impl From<RoleArg> for ActorRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Self::User,
            RoleArg::Ops => Self::Ops,
            RoleArg::Admin => Self::Admin,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for operator-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("pick-policy {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    let config = PickPolicyConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;

    match command {
        Commands::Evaluate(command) => command_evaluate(&config, &command),
        Commands::Status => command_status(&config),
        Commands::Reset(command) => command_reset(&config, command),
        Commands::Audit {
            command,
        } => command_audit(&config, &command),
        Commands::Config {
            command,
        } => command_config(&config, &command),
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(&help).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Evaluation Commands
// ============================================================================

/// Executes `evaluate`.
///
/// Exits non-zero when any prediction was rejected; a `HARD_STOP` decision
/// is a successful evaluation.
fn command_evaluate(config: &PickPolicyConfig, command: &EvaluateCommand) -> CliResult<ExitCode> {
    let input = read_predictions(&command.input)?;
    let service = open_service(config)?;
    let mut context =
        RunContext::new(command.run_id.clone(), command.actor.clone(), SystemClock.now());
    if let Some(trace) = &command.trace_id {
        context = context.with_trace_id(TraceId::new(trace.clone()));
    }
    let caller_trace = context.trace_id.clone();
    let is_single = matches!(input, PredictionBatch::Single(_));

    let values = match input {
        PredictionBatch::Single(prediction) => {
            let result = service.evaluate_prediction(&prediction, &context);
            vec![evaluation_json(&service, result, caller_trace.as_ref())?]
        }
        PredictionBatch::Many(predictions) => service
            .evaluate_batch(&predictions, &context)
            .into_iter()
            .map(|result| evaluation_json(&service, result, caller_trace.as_ref()))
            .collect::<CliResult<Vec<Value>>>()?,
    };
    let failed = values.iter().any(|value| value.get("success") != Some(&Value::Bool(true)));
    if is_single {
        for value in &values {
            write_json(value)?;
        }
    } else {
        write_json(&values)?;
    }
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Prediction input parsed from a file.
#[derive(Debug, PartialEq)]
enum PredictionBatch {
    /// A single JSON object.
    Single(PredictionInput),
    /// A JSON array, evaluated as one batch.
    Many(Vec<PredictionInput>),
}

/// Reads and parses prediction input.
fn read_predictions(path: &Path) -> CliResult<PredictionBatch> {
    let bytes = read_bytes_with_limit(path, MAX_INPUT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read input {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "input {} is too large ({size} bytes, limit {limit})",
            path.display()
        )),
    })?;
    parse_predictions(&bytes)
        .map_err(|err| CliError::new(format!("failed to parse input {}: {err}", path.display())))
}

/// Parses a prediction object or array.
fn parse_predictions(bytes: &[u8]) -> Result<PredictionBatch, serde_json::Error> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.is_array() {
        serde_json::from_value(value).map(PredictionBatch::Many)
    } else {
        serde_json::from_value(value).map(PredictionBatch::Single)
    }
}

/// Renders one evaluation outcome as an envelope.
fn evaluation_json(
    service: &PolicyService,
    result: Result<PolicyEvaluationResult, ServiceError>,
    caller_trace: Option<&TraceId>,
) -> CliResult<Value> {
    match result {
        Ok(result) => to_value(&service.format_api_response(&result)),
        Err(err) => to_value(&service.format_error_response(&err, caller_trace)),
    }
}

// ============================================================================
// SECTION: Hard-Stop Commands
// ============================================================================

/// Executes `status`.
fn command_status(config: &PickPolicyConfig) -> CliResult<ExitCode> {
    let service = open_service(config)?;
    match service.get_status() {
        Ok(status) => {
            write_json(&service.format_data_response(status, None))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_json(&service.format_error_response(&err, None))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `reset`.
fn command_reset(config: &PickPolicyConfig, command: ResetCommand) -> CliResult<ExitCode> {
    let service = open_service(config)?;
    let actor = Actor {
        user_id: ActorId::new(command.actor),
        role: command.role.map(ActorRole::from),
    };
    let trace = command.trace_id.as_deref().map(TraceId::new);
    match service.reset(actor, command.reason, command.trace_id.as_deref()) {
        Ok(outcome) => {
            let trace = outcome.audit_entry.trace_id.clone();
            write_json(&service.format_data_response(ResetView::from(&outcome), Some(&trace)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_json(&service.format_error_response(&err, trace.as_ref()))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Audit Commands
// ============================================================================

/// Dispatches audit subcommands.
fn command_audit(config: &PickPolicyConfig, command: &AuditCommand) -> CliResult<ExitCode> {
    let store = open_audit_store(config)?;
    match command {
        AuditCommand::List(command) => {
            let entries = store
                .list_audit_entries(command.limit)
                .map_err(|err| CliError::new(format!("audit list failed: {err}")))?;
            write_json(&AuditListOutput {
                entries,
            })?;
            Ok(ExitCode::SUCCESS)
        }
        AuditCommand::Verify => {
            let report = store
                .verify_audit_chain()
                .map_err(|err| CliError::new(format!("audit verify failed: {err}")))?;
            let intact = report.is_intact();
            write_json(&AuditVerifyOutput {
                status: if intact { AuditVerifyStatus::Pass } else { AuditVerifyStatus::Fail },
                report,
            })?;
            Ok(if intact { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Opens the configured sqlite store for audit inspection.
fn open_audit_store(config: &PickPolicyConfig) -> CliResult<SqlitePolicyStore> {
    if config.store.store_type != StoreType::Sqlite {
        return Err(CliError::new("audit commands require a sqlite store".to_string()));
    }
    let sqlite = config
        .store
        .sqlite_config()
        .ok_or_else(|| CliError::new("sqlite store requires path".to_string()))?;
    SqlitePolicyStore::new(sqlite)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Output for `audit list`.
#[derive(Serialize)]
struct AuditListOutput {
    /// Entries ordered oldest to newest.
    entries: Vec<AuditRecord>,
}

/// Verification status for the audit chain.
#[derive(Serialize, Copy, Clone)]
#[serde(rename_all = "snake_case")]
enum AuditVerifyStatus {
    /// Every row verified.
    Pass,
    /// A row failed verification.
    Fail,
}

/// Output for `audit verify`.
#[derive(Serialize)]
struct AuditVerifyOutput {
    /// Overall verdict.
    status: AuditVerifyStatus,
    /// Chain details.
    report: AuditChainReport,
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands. Loading already validated the file.
fn command_config(config: &PickPolicyConfig, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            write_stdout_line("config ok")
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Show => {
            let service = open_service(config)?;
            write_json(&service.format_data_response(service.get_config(), None))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the service from configuration.
fn open_service(config: &PickPolicyConfig) -> CliResult<PolicyService> {
    build_service(config).map_err(|err| {
        CliError::new(format!("failed to start policy service: {} ({err})", err.code()))
    })
}

/// Errors returned when reading bounded inputs.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Serializes a value to JSON.
fn to_value<T: Serialize>(value: &T) -> CliResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))
}

/// Writes a value as one line of JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
