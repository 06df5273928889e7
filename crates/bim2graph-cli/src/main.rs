//! bim2graph CLI - load IFC building models into a Neo4j graph.

use bim2graph::{Bim2GraphError, Config, Neo4jWriter, Pipeline, ScriptWriter};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "bim2graph")]
#[command(about = "Extract spaces, walls and material layers from IFC models into Neo4j")]
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

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the model and upsert it into Neo4j
    Run {
        /// Override the IFC model path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Keep existing nodes instead of resetting the database
        #[arg(long)]
        no_reset: bool,

        /// Override records per UNWIND statement
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Extract the model and print the graph records as JSON
    Extract {
        /// Override the IFC model path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Write JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the Cypher statements to a cypher-shell script without connecting
    Export {
        /// Override the IFC model path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Script file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Test the Neo4j connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), Bim2GraphError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format, cli.log_file.as_deref())
        .map_err(|e| Bim2GraphError::Config(e.to_string()))?;

    match cli.command {
        Commands::Run {
            source,
            no_reset,
            batch_size,
        } => {
            let mut config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);

            // Apply overrides
            if let Some(path) = source {
                config.source.path = path;
            }
            if no_reset {
                config.graph.reset_database = false;
            }
            if let Some(size) = batch_size {
                config.graph.batch_size = size;
            }
            config.validate()?;

            let cancel_token = setup_signal_handler().await?;
            let writer = Neo4jWriter::connect(&config.neo4j).await?;
            let result = Pipeline::new(config).run(&writer, cancel_token).await;
            drop(writer);
            info!("Neo4j driver closed");
            let result = result?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nGraph generation completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Source: {:?} ({})", result.source, result.schema.as_deref().unwrap_or("unknown schema"));
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Spaces: {}", result.spaces);
                println!("  Walls: {}", result.walls);
                println!("  Layers: {}", result.layers);
                println!("  Space-Wall edges: {}", result.space_wall_edges);
                println!(
                    "  Transactions: {} ({} statements)",
                    result.transactions, result.statements
                );
            }
        }

        Commands::Extract { source, output } => {
            let config = load_or_default(&cli.config, source)?;
            let extraction = Pipeline::new(config).extract()?;
            let json = serde_json::to_string_pretty(&extraction.graph)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!(
                        "Wrote {} nodes and {} edges to {:?}",
                        extraction.graph.node_count(),
                        extraction.graph.edge_count(),
                        path
                    );
                }
                None => println!("{}", json),
            }
        }

        Commands::Export { source, output } => {
            let config = load_or_default(&cli.config, source)?;
            let writer = ScriptWriter::create(&output).await?;
            let result = Pipeline::new(config)
                .run(&writer, CancellationToken::new())
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!(
                    "Wrote {} statements in {} transactions to {:?}",
                    result.statements,
                    result.transactions,
                    writer.path()
                );
            }
        }

        Commands::HealthCheck => {
            let config = Config::load(&cli.config)?;
            let pipeline = Pipeline::new(config);
            let result = match Neo4jWriter::connect(&pipeline.config().neo4j).await {
                Ok(writer) => pipeline.health_check(&writer).await,
                Err(e) => bim2graph::HealthCheckResult {
                    target: "neo4j".to_string(),
                    connected: false,
                    latency_ms: 0,
                    error: Some(e.to_string()),
                    healthy: false,
                },
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Neo4j ({}): {} ({}ms)",
                    pipeline.config().neo4j.uri,
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.healthy {
                return Err(Bim2GraphError::graph("health_check", "Neo4j is unreachable"));
            }
        }
    }

    Ok(())
}

/// Load the config file, or fall back to defaults when only `--source` is given.
fn load_or_default(path: &Path, source: Option<PathBuf>) -> Result<Config, Bim2GraphError> {
    let mut config = match source {
        Some(ref source) if !path.exists() => Config::for_source(source.clone()),
        _ => Config::load(path)?,
    };
    if let Some(source) = source {
        config.source.path = source;
    }
    config.validate()?;
    Ok(config)
}

fn setup_logging(verbosity: &str, format: &str, log_file: Option<&Path>) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| format!("cannot create log file {:?}: {}", path, e))?;
            let subscriber = subscriber.with_writer(Mutex::new(file)).with_ansi(false);
            if format == "json" {
                subscriber.json().init();
            } else {
                subscriber.init();
            }
        }
        None => {
            let subscriber = subscriber.with_writer(std::io::stderr);
            if format == "json" {
                subscriber.json().init();
            } else {
                subscriber.init();
            }
        }
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, Bim2GraphError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Stopping after the current transaction..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Stopping after the current transaction..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, Bim2GraphError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current transaction...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
