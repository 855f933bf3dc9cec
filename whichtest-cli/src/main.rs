//! whichtest CLI - statistical test recommendation and assumption checking

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Logs go to stderr; reports go to stdout

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use whichtest_core::assumptions::{CheckerRegistry, Selections};
use whichtest_core::config::{self, ResolvedConfig};
use whichtest_core::content::ContentLibrary;
use whichtest_core::decision::{DecisionEngine, MultiRecommendationPolicy};
use whichtest_core::input::Field;
use whichtest_core::report::{self, render_json, RecommendationReport, SessionReport};
use whichtest_core::{Dataset, FallbackResolver, InputSpec, SelectionController, TestId};

#[derive(Parser)]
#[command(name = "whichtest")]
#[command(about = "Recommend a statistical test and check its assumptions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend tests for a study description
    Recommend {
        /// JSON file with field labels
        #[arg(long)]
        input: Option<PathBuf>,

        /// Set one field, e.g. --set data_type=Ordinal (applied after --input)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        /// Report only the first test when a rule lists several
        #[arg(long)]
        first_only: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the decision table
    Rules,
    /// List every test and its designated alternative
    Catalog {
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the alternative for a test
    Fallback {
        /// Test identifier, e.g. Paired-samples-T-test
        test: String,
    },
    /// Check a test's assumptions against a dataset
    Check {
        /// Test identifier
        test: String,

        /// JSON file with field labels; the test must be recommended for it
        #[arg(long)]
        input: Option<PathBuf>,

        /// Set one field, e.g. --set data_type=Ordinal (applied after --input)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        /// JSON dataset: an array of row objects
        #[arg(long)]
        dataset: PathBuf,

        /// Bind a role to a column, e.g. --column sample_1=before
        #[arg(long = "column", value_name = "ROLE=COLUMN")]
        columns: Vec<String>,

        /// Confirm or refute an assumption, e.g. --confirm "No Outliers=yes"
        #[arg(long = "confirm", value_name = "ASSUMPTION=yes|no")]
        confirmations: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show explanatory content for a test
    Explain {
        /// Test identifier
        test: String,

        /// JSON content library keyed by test identifier
        #[arg(long)]
        content: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate,
    /// Show the resolved configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Recommend {
            input,
            set,
            first_only,
            format,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let spec = build_input(input.as_deref(), &set)?;
            let policy = if first_only {
                MultiRecommendationPolicy::First
            } else {
                config.multi_recommendations
            };
            let recommendation = DecisionEngine::new(policy).recommend(&spec);
            let report = RecommendationReport::new(spec, recommendation);

            match format {
                OutputFormat::Text => print!("{}", report.render_text()),
                OutputFormat::Json => println!("{}", render_json(&report)),
            }
        }
        Commands::Rules => {
            print!("{}", report::render_rules_text(DecisionEngine::rules()));
        }
        Commands::Catalog { format } => {
            let config = load_config(cli.config.as_deref())?;
            match format {
                OutputFormat::Text => print!("{}", report::render_catalog_text(&config.catalog)),
                OutputFormat::Json => println!("{}", render_json(config.catalog.entries())),
            }
        }
        Commands::Fallback { test } => {
            let config = load_config(cli.config.as_deref())?;
            let test = config.catalog.lookup(&test)?;
            let fallback = FallbackResolver::new(&config.catalog).resolve(test);
            print!("{}", report::render_fallback_text(test, fallback));
        }
        Commands::Check {
            test,
            input,
            set,
            dataset,
            columns,
            confirmations,
            format,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let test = config.catalog.lookup(&test)?;
            let dataset = Dataset::load(&dataset)?;
            let selections = build_selections(&columns, &confirmations)?;
            let registry = CheckerRegistry::standard(config.thresholds);

            let spec = if input.is_some() || !set.is_empty() {
                Some(build_input(input.as_deref(), &set)?)
            } else {
                None
            };

            let mut controller = start_check(&config, spec, test)?;
            let check = controller.run_check(&registry, &dataset, &selections)?;
            let session = SessionReport {
                test,
                report: check,
                state: controller.state().clone(),
                history: controller.history().to_vec(),
            };

            match format {
                OutputFormat::Text => print!("{}", report::render_session_text(&session)),
                OutputFormat::Json => println!("{}", render_json(&session)),
            }
        }
        Commands::Explain {
            test,
            content,
            format,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let test = config.catalog.lookup(&test)?;
            let library = match content {
                Some(path) => ContentLibrary::load(&path)?,
                None => ContentLibrary::new(),
            };
            let view = library.describe(test);

            match format {
                OutputFormat::Text => print!("{}", report::render_content_text(&view)),
                OutputFormat::Json => println!("{}", render_json(&view)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate => match load_config(cli.config.as_deref()) {
                Ok(config) => {
                    if let Some(ref p) = config.config_path {
                        println!("Config valid: {}", p.display());
                    } else {
                        println!("No config file found. Using defaults.");
                    }
                }
                Err(e) => {
                    eprintln!("Config validation failed: {:#}", e);
                    std::process::exit(1);
                }
            },
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", report::render_config_text(&config));
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        tracing::info!(path = %path.display(), "using config");
    }
    Ok(resolved)
}

/// Put `test` up for checking: through a recommendation when input is
/// given, otherwise straight from the catalog
fn start_check(
    config: &ResolvedConfig,
    spec: Option<InputSpec>,
    test: TestId,
) -> anyhow::Result<SelectionController> {
    let mut controller = SelectionController::from_config(config);
    match spec {
        Some(spec) => {
            controller.submit_input(spec);
            controller
                .select(test)
                .with_context(|| format!("{} is not recommended for this input", test))?;
        }
        None => {
            controller
                .select_manual(test)
                .context("manual selection is disabled; pass --input or --set")?;
        }
    }
    Ok(controller)
}

/// Start from the input file, then apply --set pairs in order
fn build_input(input: Option<&Path>, set: &[String]) -> anyhow::Result<InputSpec> {
    let base = match input {
        Some(path) => InputSpec::load(path)?,
        None => InputSpec::new(),
    };
    let pairs = set
        .iter()
        .map(|raw| split_pair(raw, "--set"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    pairs.into_iter().try_fold(base, |spec, (name, value)| {
        let field = name
            .parse::<Field>()
            .with_context(|| format!("invalid --set '{}={}'", name, value))?;
        spec.with_label(field, value)
            .with_context(|| format!("invalid --set '{}={}'", name, value))
    })
}

fn build_selections(columns: &[String], confirmations: &[String]) -> anyhow::Result<Selections> {
    let mut selections = Selections::new();
    for raw in columns {
        let (role, column) = split_pair(raw, "--column")?;
        selections = selections.with_column(role, column);
    }
    for raw in confirmations {
        let (assumption, answer) = split_pair(raw, "--confirm")?;
        let holds = parse_answer(answer)
            .with_context(|| format!("invalid --confirm '{}': expected yes or no", raw))?;
        selections = selections.with_confirmation(assumption, holds);
    }
    Ok(selections)
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> anyhow::Result<(&'a str, &'a str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => anyhow::bail!("{} expects KEY=VALUE (got '{}')", flag, raw),
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "met" => Some(true),
        "no" | "n" | "false" | "not-met" => Some(false),
        _ => None,
    }
}
