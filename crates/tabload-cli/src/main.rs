//! tabload CLI - load tabular data into MySQL.

mod input;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tabload::loader::create_table_sql;
use tabload::{
    channel_sink, no_progress, Config, InferredSchema, LoadConfig, LoadError, LoadOutcome,
    LoadPhase, Loader, MysqlSession, RecordingSession, Session, Table,
};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};

/// Exit code after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "tabload")]
#[command(about = "Load tabular data into MySQL tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the inferred MySQL column types and CREATE TABLE statement
    Infer {
        /// JSON table document
        #[arg(short, long)]
        input: PathBuf,

        /// Target table name used in the printed DDL
        #[arg(short, long, default_value = "data")]
        table: String,
    },

    /// Create the target table and insert every row
    Load {
        /// JSON table document
        #[arg(short, long)]
        input: PathBuf,

        /// Target table name (optionally `database.table`)
        #[arg(short, long)]
        table: String,

        /// Override rows per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Dry run: print the statements a load would send without connecting
        #[arg(long)]
        dry_run: bool,
    },

    /// Test the target database connection
    HealthCheck,
}

#[derive(Serialize)]
struct InferReport<'a> {
    table: &'a str,
    columns: &'a InferredSchema,
    ddl: String,
}

#[derive(Serialize)]
struct HealthReport {
    target: String,
    connected: bool,
    latency_ms: u64,
    server_version: Option<String>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, LoadError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::Infer {
            input: ref input_path,
            table: ref table_name,
        } => {
            let mut table = input::read_table(input_path, table_name)?;
            let schema = Loader::default().prepare(&mut table)?;
            let ddl = create_table_sql(&table.name, &schema);

            if cli.output_json {
                let report = InferReport {
                    table: &table.name,
                    columns: &schema,
                    ddl,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for column in schema.iter() {
                    println!("{} {}", column.name, column.sql_type);
                }
                println!("\n{}", ddl);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Load {
            input: ref input_path,
            table: ref table_name,
            batch_size,
            dry_run,
        } => {
            let mut table = input::read_table(input_path, table_name)?;

            if dry_run {
                let mut load_config = LoadConfig::default();
                if let Some(size) = batch_size {
                    load_config.batch_size = size;
                }
                load_config.validate()?;
                let loader = Loader::new(load_config);
                loader.prepare(&mut table)?;
                return dry_run_load(&cli, loader, &mut table).await;
            }

            let mut config = Config::load(&cli.config)?;
            if let Some(size) = batch_size {
                config.load.batch_size = size;
            }
            config.validate()?;
            info!("Loaded configuration from {:?}", cli.config);

            let loader = Loader::new(config.load.clone());
            // Reject bad names before connecting.
            loader.prepare(&mut table)?;

            let mut session = match MysqlSession::connect(&config.target).await {
                Ok(session) => session,
                Err(e) => {
                    let outcome = LoadOutcome::failed(LoadPhase::Connect, &e, 0);
                    return report_outcome(&outcome, cli.output_json);
                }
            };

            let outcome = tokio::select! {
                outcome = run_load(&loader, &mut session, &mut table, cli.progress) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("\nReceived Ctrl-C. Stopping; batches already committed remain in the target.");
                    return Ok(ExitCode::from(EXIT_INTERRUPTED));
                }
            };

            if let Err(e) = session.close().await {
                warn!("Failed to close MySQL session: {}", e);
            }
            report_outcome(&outcome, cli.output_json)
        }

        Commands::HealthCheck => {
            let config = Config::load(&cli.config)?;
            let start = Instant::now();

            let report = match MysqlSession::connect(&config.target).await {
                Ok(session) => {
                    let server_version = session.server_version();
                    let latency_ms = start.elapsed().as_millis() as u64;
                    if let Err(e) = session.close().await {
                        warn!("Failed to close MySQL session: {}", e);
                    }
                    HealthReport {
                        target: config.target.display_target(),
                        connected: true,
                        latency_ms,
                        server_version: Some(server_version),
                        error: None,
                    }
                }
                Err(e) => HealthReport {
                    target: config.target.display_target(),
                    connected: false,
                    latency_ms: start.elapsed().as_millis() as u64,
                    server_version: None,
                    error: Some(e.backend_message()),
                },
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Target (MySQL) {}: {} ({}ms)",
                    report.target,
                    if report.connected { "OK" } else { "FAILED" },
                    report.latency_ms
                );
                if let Some(ref version) = report.server_version {
                    println!("    Server version: {}", version);
                }
                if let Some(ref err) = report.error {
                    println!("    Error: {}", err);
                }
            }

            if report.connected {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(LoadPhase::Connect.exit_code()))
            }
        }
    }
}

/// Run a load against an in-memory session and print what it sent.
async fn dry_run_load(cli: &Cli, loader: Loader, table: &mut Table) -> Result<ExitCode, LoadError> {
    let mut session = RecordingSession::new();
    let outcome = run_load(&loader, &mut session, table, cli.progress).await;

    if !cli.output_json {
        for statement in session.committed() {
            if statement.rows > 0 {
                let head = statement
                    .sql
                    .split(" VALUES ")
                    .next()
                    .unwrap_or(&statement.sql);
                println!("{} VALUES ... -- {} rows", head, statement.rows);
            } else {
                println!("{};", statement.sql);
            }
        }
        println!("-- {} commits", session.commits());
    }
    report_outcome(&outcome, cli.output_json)
}

async fn run_load(
    loader: &Loader,
    session: &mut dyn Session,
    table: &mut Table,
    show_progress: bool,
) -> LoadOutcome {
    if !show_progress {
        return loader.load(session, table, &mut no_progress()).await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&progress) {
                eprintln!("{}", line);
            }
        }
    });

    let mut sink = channel_sink(tx);
    let outcome = loader.load(session, table, &mut sink).await;
    drop(sink);
    let _ = printer.await;
    outcome
}

fn report_outcome(outcome: &LoadOutcome, output_json: bool) -> Result<ExitCode, LoadError> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    }

    match outcome {
        LoadOutcome::Loaded { table, rows, .. } => {
            if !output_json {
                println!("Loaded {} rows into {}", rows, table);
            }
            Ok(ExitCode::SUCCESS)
        }
        LoadOutcome::Failed {
            phase,
            message,
            rows_committed,
        } => {
            eprintln!("{}", message);
            if *rows_committed > 0 {
                eprintln!(
                    "  {} rows from earlier batches remain committed",
                    rows_committed
                );
            }
            Ok(ExitCode::from(phase.exit_code()))
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries results; logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
