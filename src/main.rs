//! Dossier Audit - audit trail viewer for business dossiers
//!
//! Fetches the audit log of one parent entity (and its configured child
//! record kinds), then prints the filtered and grouped timeline as text or
//! as a JSON snapshot.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::LogFormat;
use dossier_audit::{
    config,
    models::{FilterCriteria, FilterField, GroupView, TimelineSnapshot},
    services::{AuditTrailView, LoadOutcome, StoreClient},
    AppConfig, StrategyRegistry,
};

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    entity_type: String,
    parent_id: String,
    filters: Vec<FilterField>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().skip(1).collect();

    // Check for --help flag
    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    // Check for --version flag
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Dossier Audit {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Check for --init-config flag
    if let Some(pos) = args.iter().position(|arg| arg == "--init-config") {
        let path = args
            .get(pos + 1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));
        AppConfig::create_default_config(&path)
            .with_context(|| format!("Failed to write default config to {:?}", path))?;
        println!("Default configuration written to {:?}", path);
        return Ok(());
    }

    let cli = parse_args(&args)?;

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    let profile = config.entity(&cli.entity_type).with_context(|| {
        format!(
            "Unknown entity type '{}'. Configured: {}",
            cli.entity_type,
            config.entities.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    })?;

    let store = StoreClient::new(&config.store).context("Failed to initialize store client")?;
    let loader = store.loader_for_profile(profile, &cli.parent_id);
    let strategy = StrategyRegistry::from_config(&config).resolve(&cli.entity_type);

    let view = AuditTrailView::with_criteria(
        cli.entity_type.clone(),
        loader,
        strategy,
        FilterCriteria::with_offset_minutes(config.timeline.utc_offset_minutes),
    );
    for filter in cli.filters {
        view.set_filter(filter)
            .await
            .context("Invalid filter")?;
    }

    info!("Opening {} audit trail for {}", cli.entity_type, cli.parent_id);
    if view.open().await == LoadOutcome::Failed {
        warn!("Audit log could not be loaded; showing an empty timeline");
    }

    let snapshot = view.snapshot().await;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize timeline")?
        );
    } else {
        print_timeline(&snapshot);
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("Missing value for {}", flag))
        };
        match arg.as_str() {
            "--from" => cli.filters.push(FilterField::DateFrom(Some(value("--from")?))),
            "--to" => cli.filters.push(FilterField::DateTo(Some(value("--to")?))),
            "--action" => cli.filters.push(FilterField::Action(value("--action")?)),
            "--actor" => cli.filters.push(FilterField::ActorText(value("--actor")?)),
            "--json" => cli.json = true,
            flag if flag.starts_with("--") => anyhow::bail!("Unknown option: {}", flag),
            _ => positional.push(arg.clone()),
        }
    }

    match positional.as_slice() {
        [entity_type, parent_id] => {
            cli.entity_type = entity_type.clone();
            cli.parent_id = parent_id.clone();
            Ok(cli)
        }
        _ => anyhow::bail!("Expected <ENTITY> <PARENT_ID>, see --help"),
    }
}

fn print_timeline(snapshot: &TimelineSnapshot) {
    println!(
        "{} · {} de {} registros · {} operaciones",
        snapshot.entity_type,
        snapshot.filtered_records,
        snapshot.total_records,
        snapshot.groups.len()
    );

    if let Some(message) = snapshot.empty_message() {
        println!("\n{}", message);
        return;
    }

    for group in &snapshot.groups {
        print_group(group, &snapshot.criteria);
    }
}

fn print_group(group: &GroupView, criteria: &FilterCriteria) {
    let when = group.anchor_timestamp.with_timezone(&criteria.offset());

    let badge = group
        .badge
        .as_ref()
        .map(|badge| format!(" [{}]", badge.label))
        .unwrap_or_default();
    let grouped = if group.member_count > 1 {
        format!(" ({} cambios)", group.member_count)
    } else {
        String::new()
    };

    println!(
        "\n{}  {}{}  {}{}",
        when.format("%Y-%m-%d %H:%M:%S"),
        group.presentation.label,
        badge,
        group.actor.display_name(),
        grouped
    );

    if let Some(ref narrative) = group.narrative {
        println!("    {}", narrative);
    }
    for change in &group.changes {
        println!(
            "    {}: {} → {}",
            change.label, change.old_value, change.new_value
        );
    }
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer(&log_config.format, writer));
            init_console_logging(subscriber, &log_config.format);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    // Ensure log directory exists
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Initialize console logging. Console output goes to stderr so the
/// timeline on stdout stays machine-readable.
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber
        + for<'a> tracing_subscriber::registry::LookupSpan<'a>
        + Send
        + Sync
        + 'static,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

/// Initialize file-only logging
fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber
        + for<'a> tracing_subscriber::registry::LookupSpan<'a>
        + Send
        + Sync
        + 'static,
{
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    file_layer(format, writer).with_subscriber(subscriber).init();
}

/// Formatting layer writing to the log file
fn file_layer<S>(
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
{
    use tracing_subscriber::{fmt, Layer};

    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
    }
}

fn print_help() {
    println!(
        r#"Dossier Audit {}

USAGE:
    dossier-audit <ENTITY> <PARENT_ID> [OPTIONS]

ARGS:
    <ENTITY>                Entity type configured under `entities` (e.g. empresa)
    <PARENT_ID>             Identifier of the parent record

OPTIONS:
    --from <YYYY-MM-DD>     Only show changes on or after this day
    --to <YYYY-MM-DD>       Only show changes on or before this day
    --action <TAG>          Only show this action (created, updated, status_changed, deleted)
    --actor <TEXT>          Only show changes whose actor name or email contains TEXT
    --json                  Print the timeline snapshot as JSON
    --init-config [PATH]    Write a default configuration file (default: config.yaml)
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    DOSSIER_AUDIT_CONFIG        Path to configuration file (default: config.yaml)
    DOSSIER_STORE_URL           Audit store base URL
    DOSSIER_STORE_API_KEY       Audit store API key
    DOSSIER_LOG_FORMAT          pretty, compact or json
    DOSSIER_GROUPING_WINDOW_MS  Grouping window in milliseconds
    RUST_LOG                    Log filter (default: warn)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by DOSSIER_AUDIT_CONFIG environment variable
    2. ./config.yaml, ./config/config.yaml
    3. /etc/dossier-audit/config.yaml
    4. <user config dir>/dossier-audit/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
