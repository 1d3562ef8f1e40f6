use std::fs;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use edtech_rubric::config::{Config, ConfigOverrides, LoggingConfig};
use edtech_rubric::evaluation::grade;
use edtech_rubric::evaluation::{
    validate_input, EvaluationEngine, EvaluationInput, EvaluationResult, ValidationReport,
};
use edtech_rubric::output::csv::{result_to_csv, rubric_to_csv};
use edtech_rubric::output::json::{parse_json_input, render_json};
use edtech_rubric::output::table::{
    render_grade_table, render_result_table, render_rubric_table, render_validation_table,
};
use edtech_rubric::rubric::loader::write_rubric_json;
use edtech_rubric::rubric::{resolve_rubric, RubricModel};
use edtech_rubric::server::run_server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "edtech-rubric",
    about = "Rubric scoring for public-education edtech vendor evaluations"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Rubric file (.json or .toml); the built-in rubric when omitted.
    #[arg(short, long)]
    rubric: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Score an evaluation input file, or `-` for stdin.
    Score {
        #[arg(short, long)]
        input: String,
    },
    /// Check an input for errors and missing answers without scoring it.
    Validate {
        #[arg(short, long)]
        input: String,
    },
    /// Show the active rubric, or export it as JSON.
    Model {
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print a blank input with every rubric item unanswered.
    Template,
    /// Map a total score to its grade band.
    Grade {
        #[arg(long)]
        score: f64,
        #[arg(long)]
        failed: bool,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    config.apply_overrides(ConfigOverrides {
        rubric_path: cli.rubric.clone(),
        host,
        port,
        format: None,
    });
    init_tracing(&config.logging)?;

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let format = resolve_format(cli.output, &config);
    let rubric = Arc::new(resolve_rubric(config.resolved_rubric_path().as_deref())?);

    match &cli.command {
        Commands::Score { input } => {
            let input: EvaluationInput = read_input(input)?;
            let report = validate_input(&input, &rubric);
            if !report.is_valid {
                return Err(anyhow!(
                    "input is not scorable: {}",
                    report.error_messages().join("; ")
                ));
            }
            for issue in &report.warnings {
                warn!("{issue}");
            }
            let result = EvaluationEngine::new(Arc::clone(&rubric)).evaluate(&input);
            print_result(&result, format)?;
        }
        Commands::Validate { input } => {
            let input: EvaluationInput = read_input(input)?;
            let report = validate_input(&input, &rubric);
            print_validation(&report, format)?;
        }
        Commands::Model { export } => match export {
            Some(path) => {
                write_rubric_json(&rubric, path)?;
                info!(path = %path.display(), "exported rubric");
                println!("Wrote rubric {} to {}", rubric.version, path.display());
            }
            None => print_rubric(&rubric, format)?,
        },
        Commands::Template => {
            println!("{}", render_json(&EvaluationInput::blank(&rubric))?);
        }
        Commands::Grade { score, failed } => {
            let outcome = grade::outcome(!*failed, *score, &rubric);
            match format {
                OutputFormat::Table => println!("{}", render_grade_table(*score, &outcome)),
                OutputFormat::Json => println!("{}", render_json(&outcome)?),
                OutputFormat::Csv => {
                    warn!("CSV output for grade not implemented, using JSON");
                    println!("{}", render_json(&outcome)?);
                }
            }
        }
        Commands::Serve { .. } => {
            let bind = format!("{}:{}", config.server.host, config.server.port);
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            return run_server(config, addr, rubric).await;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level/filter '{}'", logging.level))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed installing tracing subscriber: {e}"))
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn resolve_format(cli: Option<OutputFormat>, config: &Config) -> OutputFormat {
    if let Some(format) = cli {
        return format;
    }
    OutputFormat::from_str(&config.output.format, true).unwrap_or_else(|_| {
        warn!(format = %config.output.format, "unknown output format in config, using table");
        OutputFormat::Table
    })
}

fn read_input<T: serde::de::DeserializeOwned>(source: &str) -> Result<T> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed reading input from stdin")?;
        buffer
    } else {
        fs::read_to_string(source).with_context(|| format!("failed reading input: {source}"))?
    };
    parse_json_input(&raw, source)
}

fn print_result(result: &EvaluationResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_result_table(result)),
        OutputFormat::Json => println!("{}", render_json(result)?),
        OutputFormat::Csv => println!("{}", result_to_csv(result)?),
    }
    Ok(())
}

fn print_validation(report: &ValidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_validation_table(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => {
            warn!("CSV output for validate not implemented, using JSON");
            println!("{}", render_json(report)?);
        }
    }
    Ok(())
}

fn print_rubric(rubric: &RubricModel, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_rubric_table(rubric)),
        OutputFormat::Json => println!(
            "{}",
            render_json(&serde_json::json!({
                "version": rubric.version,
                "fingerprint": rubric.fingerprint(),
                "rubric": rubric,
            }))?
        ),
        OutputFormat::Csv => println!("{}", rubric_to_csv(rubric)?),
    }
    Ok(())
}
