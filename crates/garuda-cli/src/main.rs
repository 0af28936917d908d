//! garuda - audit workpaper review assistant
//!
//! Reads the assertion table of a workpaper, asks an LLM to review each
//! assertion against its linked evidence sheets, and writes a PDF report.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use garuda_core::{
    extract_blocks, locate_table, ContextAssembler, ReportRenderer, SpreadsheetWorkbook, Workbook,
};
use garuda_runtime::{EvaluationRunner, ProviderRegistry, RuntimeConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "garuda.yaml";

/// garuda - AI-assisted audit workpaper review
#[derive(Parser, Debug)]
#[command(name = "garuda")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Which table to read from the workbook.
#[derive(clap::Args, Debug)]
struct TableArgs {
    /// Workbook file (xlsx, xlsm, xls, ods)
    workbook: PathBuf,

    /// Worksheet holding the assertion table
    #[arg(long)]
    sheet: Option<String>,

    /// Header label that anchors the table
    #[arg(long)]
    label: Option<String>,

    /// YAML configuration file (default: ./garuda.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Review every assertion and write a PDF report
    Evaluate {
        #[command(flatten)]
        table: TableArgs,

        /// PDF output path (default: report_<timestamp>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the evaluation records as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Provider type (e.g. gemini, anthropic)
        #[arg(long)]
        provider: Option<String>,

        /// Model name override
        #[arg(long)]
        model: Option<String>,
    },

    /// Show the assertion blocks found in a workbook without calling a model
    Inspect {
        #[command(flatten)]
        table: TableArgs,

        /// Print the full context each assertion would be evaluated with
        #[arg(long)]
        contexts: bool,
    },

    /// List available LLM providers
    Providers,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Evaluate {
            table,
            output,
            json,
            provider,
            model,
        } => {
            let mut config = load_config(table.config.as_deref())?;
            if let Some(provider) = provider {
                config.provider = provider;
            }
            if model.is_some() {
                config.model = model;
            }
            apply_table_args(&mut config, &table);
            evaluate(config, &table.workbook, output, json).await
        }
        Commands::Inspect { table, contexts } => {
            let mut config = load_config(table.config.as_deref())?;
            apply_table_args(&mut config, &table);
            inspect(&config, &table.workbook, contexts)
        }
        Commands::Providers => {
            list_providers();
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            RuntimeConfig::from_yaml_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn apply_table_args(config: &mut RuntimeConfig, table: &TableArgs) {
    if let Some(sheet) = &table.sheet {
        config.sheet = sheet.clone();
    }
    if let Some(label) = &table.label {
        config.label = label.clone();
    }
}

async fn evaluate(
    config: RuntimeConfig,
    workbook_path: &Path,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let registry = ProviderRegistry::with_defaults();
    if !registry.has_provider(&config.provider) {
        bail!(
            "Unknown provider '{}'. Available: {}",
            config.provider,
            registry.available_types().join(", ")
        );
    }

    let mut workbook = SpreadsheetWorkbook::open(workbook_path)
        .with_context(|| format!("Failed to open workbook {}", workbook_path.display()))?;

    let mut runner = EvaluationRunner::from_registry(&registry, config)
        .await
        .context("Failed to set up LLM provider")?;
    tracing::info!(provider = %runner.provider_name(), model = %runner.model(), "Provider ready");

    let run = runner
        .run(&mut workbook, |done, total| {
            eprintln!("Processing {}/{} ...", done, total);
        })
        .await
        .context("Evaluation could not start")?;

    let renderer = ReportRenderer::new();
    let output = output.unwrap_or_else(|| PathBuf::from(renderer.default_filename()));
    renderer
        .write(&run.records, &output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if let Some(json) = json {
        let body = serde_json::to_string_pretty(&run.records)
            .context("Failed to serialize evaluation records")?;
        std::fs::write(&json, body)
            .with_context(|| format!("Failed to write {}", json.display()))?;
        println!("Records written to {}", json.display());
    }

    for record in &run.records {
        println!("{}: {}", record.assertion, record.parsed_result.summary_line());
    }
    println!(
        "\nEvaluated {} assertion(s) using {} tokens. Report written to {}",
        run.records.len(),
        run.usage.total_tokens,
        output.display()
    );

    Ok(())
}

fn inspect(config: &RuntimeConfig, workbook_path: &Path, contexts: bool) -> Result<()> {
    let mut workbook = SpreadsheetWorkbook::open(workbook_path)
        .with_context(|| format!("Failed to open workbook {}", workbook_path.display()))?;

    let main = workbook
        .read_sheet(&config.sheet)
        .with_context(|| format!("Failed to read worksheet '{}'", config.sheet))?;
    let table = locate_table(&main, &config.label)?;
    let blocks = extract_blocks(&table);

    println!(
        "{} assertion(s) in '{}' (sheets: {})",
        blocks.len(),
        config.sheet,
        workbook.sheet_names().join(", ")
    );

    let mut assembler = ContextAssembler::new(&mut workbook);
    for (i, block) in blocks.iter().enumerate() {
        println!("\n{}. {}", i + 1, block.assertion);
        for entry in &block.procedures {
            let procedure = entry.procedure.as_deref().unwrap_or("(none)");
            match entry.link.as_deref().filter(|_| entry.has_link()) {
                Some(link) => println!("   - {} -> {}", procedure, link),
                None => println!("   - {}", procedure),
            }
        }

        if contexts {
            println!("\n{}", assembler.assemble(block));
        }
    }

    Ok(())
}

fn list_providers() {
    let registry = ProviderRegistry::with_defaults();
    let default = RuntimeConfig::default().provider;

    for factory in registry.factories() {
        let marker = if factory.provider_type() == default { " (default)" } else { "" };
        let model = factory.default_config()["model"]
            .as_str()
            .unwrap_or("-")
            .to_string();
        println!(
            "{}{}\n  {}\n  default model: {}",
            factory.provider_type(),
            marker,
            factory.description(),
            model
        );
    }
}
