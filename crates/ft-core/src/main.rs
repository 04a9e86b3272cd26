//! Fleet Telemetry Core - command line front end
//!
//! Loads the data point catalogue and a JSONL readings file, then answers:
//! - latest reading per device and type (composite priority-pick included)
//! - raw readings for a period
//! - AVG/SUM/MIN/MAX/COUNT aggregates, optionally per hour/day bucket
//! - a per-device dashboard over the whole catalogue

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ft_common::error::format_error_human;
use ft_common::{
    DataPointTypeId, DeviceId, Error, OutputFormat, Reading, Result, StructuredError,
    SCHEMA_VERSION,
};
use ft_config::{load_config, CatalogueFile, ConfigOptions, LoadedConfig, Registry};
use ft_core::exit_codes::ExitCode;
use ft_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use ft_telemetry::{Bucket, MemoryStore, TelemetryService};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info_span};

/// Fleet Telemetry Core - data point resolution and aggregation
#[derive(Parser)]
#[command(name = "ft-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Catalogue file (JSON or TOML); falls back to FT_CATALOGUE, FT_CONFIG_DIR, XDG, /etc
    #[arg(long, global = true)]
    catalogue: Option<PathBuf>,

    /// Engine settings file (TOML); falls back to FT_SETTINGS, FT_CONFIG_DIR, XDG, /etc
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Readings file (JSON Lines); falls back to FT_READINGS, FT_CONFIG_DIR, XDG, /etc
    #[arg(long, global = true)]
    readings: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Omit timestamps from human-readable log lines
    #[arg(long, global = true)]
    no_log_timestamps: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest reading for a device and data point type
    Latest(SeriesArgs),

    /// Raw readings of an atomic type within an inclusive period
    Period(PeriodArgs),

    /// Aggregate readings over a period
    Aggregate(AggregateArgs),

    /// Latest reading for every catalogue type of a device
    Dashboard(DeviceArgs),

    /// Inspect or validate the catalogue
    Catalogue(CatalogueArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// Device id
    #[arg(long)]
    device: DeviceId,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    /// Device id
    #[arg(long)]
    device: DeviceId,

    /// Data point type id
    #[arg(long = "type", value_name = "TYPE_ID")]
    type_id: DataPointTypeId,
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Period start (RFC 3339, inclusive)
    #[arg(long)]
    start: DateTime<Utc>,

    /// Period end (RFC 3339, inclusive)
    #[arg(long)]
    end: DateTime<Utc>,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    #[command(flatten)]
    period: PeriodArgs,

    /// Aggregation keyword: AVG, SUM, MIN, MAX or COUNT (case-sensitive)
    #[arg(long, short = 'a')]
    aggregation: String,

    /// Split the period into buckets
    #[arg(long, value_enum, default_value_t = BucketChoice::None)]
    bucket: BucketChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BucketChoice {
    /// Hourly up to the configured range length, daily beyond
    Auto,
    Hour,
    Day,
    /// Single aggregate over the whole period
    None,
}

#[derive(Args, Debug)]
struct CatalogueArgs {
    #[command(subcommand)]
    action: CatalogueCommand,
}

#[derive(Subcommand, Debug)]
enum CatalogueCommand {
    /// List the configured data point types
    List,

    /// Validate a catalogue file (or the configured one)
    Check {
        /// Catalogue file to check instead of the configured one
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let cli_level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(
        &LogConfig::from_env(cli_level, cli.global.log_format)
            .with_timestamps(!cli.global.no_log_timestamps),
    );

    let run_id = generate_run_id();
    let span = info_span!("cli", run_id = %run_id, command = command_name(&cli.command));
    let _guard = span.enter();

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => output_error(&cli.global, &err),
    };

    debug!(exit_code = %exit_code, "finished");
    std::process::exit(exit_code.as_i32());
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Latest(_) => "latest",
        Commands::Period(_) => "period",
        Commands::Aggregate(_) => "aggregate",
        Commands::Dashboard(_) => "dashboard",
        Commands::Catalogue(_) => "catalogue",
        Commands::Version => "version",
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let global = &cli.global;
    match &cli.command {
        Commands::Latest(args) => run_latest(global, args),
        Commands::Period(args) => run_period(global, args),
        Commands::Aggregate(args) => run_aggregate(global, args),
        Commands::Dashboard(args) => run_dashboard(global, args),
        Commands::Catalogue(args) => match &args.action {
            CatalogueCommand::List => run_catalogue_list(global),
            CatalogueCommand::Check { path } => run_catalogue_check(global, path.as_ref()),
        },
        Commands::Version => {
            print_version(global)?;
            Ok(ExitCode::Clean)
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

fn load(global: &GlobalOpts) -> Result<LoadedConfig> {
    let options = ConfigOptions {
        catalogue_path: global.catalogue.clone(),
        settings_path: global.settings.clone(),
        readings_path: global.readings.clone(),
    };
    Ok(load_config(&options)?)
}

fn build_service(global: &GlobalOpts) -> Result<TelemetryService> {
    let config = load(global)?;
    let store = match &config.paths.readings.path {
        Some(path) => {
            debug!(path = %path.display(), source = %config.paths.readings.source, "loading readings");
            MemoryStore::load_jsonl(path)?
        }
        None => {
            debug!("no readings file found; store is empty");
            MemoryStore::new()
        }
    };

    Ok(TelemetryService::from_settings(
        Arc::new(config.registry),
        Arc::new(store),
        &config.settings,
    ))
}

// ============================================================================
// Commands
// ============================================================================

fn run_latest(global: &GlobalOpts, args: &SeriesArgs) -> Result<ExitCode> {
    let service = build_service(global)?;
    let reading = service.latest_reading(args.device, args.type_id)?;

    let data = json!({
        "device_id": args.device,
        "data_point_type_id": args.type_id,
        "reading": reading,
    });
    let summary = match &reading {
        Some(r) => format!(
            "device {} type {}: {} (source {}) at {}",
            args.device,
            args.type_id,
            r.value,
            r.data_point_type_id,
            r.recorded_at.to_rfc3339()
        ),
        None => format!("device {} type {}: no data", args.device, args.type_id),
    };

    emit(global, "latest", &data, &[to_value(&reading)?], &[summary])?;
    Ok(if reading.is_some() {
        ExitCode::Clean
    } else {
        ExitCode::NoData
    })
}

fn run_period(global: &GlobalOpts, args: &PeriodArgs) -> Result<ExitCode> {
    let service = build_service(global)?;
    let SeriesArgs { device, type_id } = args.series;
    let readings = service.readings_for_period(device, type_id, args.start, args.end)?;

    let data = json!({
        "device_id": device,
        "data_point_type_id": type_id,
        "start": args.start,
        "end": args.end,
        "count": readings.len(),
        "readings": readings,
    });
    let items = readings.iter().map(to_value).collect::<Result<Vec<_>>>()?;
    let summary: Vec<String> = readings.iter().map(reading_line).collect();

    emit(global, "period", &data, &items, &summary)?;
    Ok(if readings.is_empty() {
        ExitCode::NoData
    } else {
        ExitCode::Clean
    })
}

fn run_aggregate(global: &GlobalOpts, args: &AggregateArgs) -> Result<ExitCode> {
    let service = build_service(global)?;
    let PeriodArgs { start, end, .. } = args.period;
    let SeriesArgs { device, type_id } = args.period.series;

    let bucket = match args.bucket {
        BucketChoice::None => None,
        BucketChoice::Auto => Some(service.bucket_for_range(start, end)),
        BucketChoice::Hour => Some(Bucket::Hour),
        BucketChoice::Day => Some(Bucket::Day),
    };

    let mut data = json!({
        "device_id": device,
        "data_point_type_id": type_id,
        "start": start,
        "end": end,
        "aggregation": args.aggregation,
    });

    let Some(bucket) = bucket else {
        let value = service.aggregated_reading(device, type_id, start, end, &args.aggregation)?;
        data["value"] = to_value(&value)?;
        let summary = match value {
            Some(v) => format!("{} = {}", args.aggregation, v),
            None => format!("{} = no data", args.aggregation),
        };
        emit(global, "aggregate", &data, &[data.clone()], &[summary])?;
        return Ok(if value.is_some() {
            ExitCode::Clean
        } else {
            ExitCode::NoData
        });
    };

    let points = service.aggregated_buckets(
        device,
        type_id,
        start,
        end,
        &args.aggregation,
        Some(bucket),
    )?;
    data["bucket"] = to_value(&bucket)?;
    data["points"] = to_value(&points)?;

    let items = points.iter().map(to_value).collect::<Result<Vec<_>>>()?;
    let summary: Vec<String> = points
        .iter()
        .map(|p| {
            let value = p
                .value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("{}  {}", p.bucket_start.to_rfc3339(), value)
        })
        .collect();

    emit(global, "aggregate", &data, &items, &summary)?;
    Ok(if points.is_empty() {
        ExitCode::NoData
    } else {
        ExitCode::Clean
    })
}

fn run_dashboard(global: &GlobalOpts, args: &DeviceArgs) -> Result<ExitCode> {
    let service = build_service(global)?;
    let snapshots = service.dashboard(args.device)?;

    let data = json!({
        "device_id": args.device,
        "data_points": snapshots,
    });
    let items = snapshots.iter().map(to_value).collect::<Result<Vec<_>>>()?;
    let summary: Vec<String> = snapshots
        .iter()
        .map(|s| {
            let ty = &s.data_point_type;
            let unit = ty.unit.as_deref().unwrap_or("");
            match &s.latest {
                Some(r) => format!("{:>6}  {:<24} {} {}", ty.id.0, ty.name, r.value, unit),
                None => format!("{:>6}  {:<24} no data", ty.id.0, ty.name),
            }
        })
        .collect();

    emit(global, "dashboard", &data, &items, &summary)?;
    Ok(ExitCode::Clean)
}

fn run_catalogue_list(global: &GlobalOpts) -> Result<ExitCode> {
    let config = load(global)?;
    let types: Vec<_> = config.registry.iter().collect();

    let data = json!({
        "source": config.paths.catalogue.source.to_string(),
        "path": config.paths.catalogue.path.as_ref().map(|p| p.display().to_string()),
        "data_point_types": types,
    });
    let items = types.iter().map(to_value).collect::<Result<Vec<_>>>()?;
    let summary: Vec<String> = types
        .iter()
        .map(|ty| {
            let sources: Vec<String> = ty
                .sources()
                .iter()
                .map(|s| s.source_type_id.to_string())
                .collect();
            let mut line = format!("{:>6}  {:<24} {}", ty.id.0, ty.name, ty.category());
            if !sources.is_empty() {
                line.push_str(&format!(" <- {}", sources.join(", ")));
            }
            line
        })
        .collect();

    emit(global, "catalogue list", &data, &items, &summary)?;
    Ok(ExitCode::Clean)
}

fn run_catalogue_check(global: &GlobalOpts, path: Option<&PathBuf>) -> Result<ExitCode> {
    let (registry, source) = match path {
        Some(path) => {
            let file = CatalogueFile::from_file(path)?;
            (Registry::from_catalogue(&file)?, path.display().to_string())
        }
        None => {
            let config = load(global)?;
            let source = config
                .paths
                .catalogue
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| config.paths.catalogue.source.to_string());
            (config.registry, source)
        }
    };

    let composites = registry.iter().filter(|t| !t.is_atomic()).count();
    let data = json!({
        "source": source,
        "valid": true,
        "types": registry.len(),
        "composites": composites,
    });
    let summary = format!(
        "{}: ok ({} types, {} composite)",
        source,
        registry.len(),
        composites
    );

    emit(global, "catalogue check", &data, &[data.clone()], &[summary])?;
    Ok(ExitCode::Clean)
}

fn print_version(global: &GlobalOpts) -> Result<()> {
    let info = json!({
        "ft_core_version": env!("CARGO_PKG_VERSION"),
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });
    let summary = vec![
        format!("ft-core {}", env!("CARGO_PKG_VERSION")),
        format!("schema version: {}", SCHEMA_VERSION),
    ];
    emit(global, "version", &info, &[info.clone()], &summary)
}

// ============================================================================
// Output
// ============================================================================

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn reading_line(r: &Reading) -> String {
    format!("{}  {}", r.recorded_at.to_rfc3339(), r.value)
}

/// Write a command payload to stdout.
///
/// `json` wraps `data` in an envelope, `jsonl` writes each of `items` on its
/// own line, and `summary` prints the prepared human lines.
fn emit(
    global: &GlobalOpts,
    command: &str,
    data: &Value,
    items: &[Value],
    summary: &[String],
) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            let envelope = json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": Utc::now().to_rfc3339(),
                "command": command,
                "status": "ok",
                "data": data,
            });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Jsonl => {
            for item in items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
        OutputFormat::Summary => {
            for line in summary {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let exit_code = ExitCode::from_error(err);
    tracing::error!(code = err.code(), exit_code = %exit_code, "{}", err);

    match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let structured = StructuredError::from(err).with_context("exit_code", exit_code.code_name());
            eprintln!("{}", structured.to_json());
        }
        OutputFormat::Summary => {
            eprintln!("{}", format_error_human(err));
        }
    }

    exit_code
}
