//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadscore_core::{
    DataPipelineConfig, InferConfig, StepReporter, TrainConfig, run_data_pipeline,
    run_inference_pipeline, run_training_pipeline,
    monitor::run_standalone_monitor,
    validation::{ValidateConfig, run_validation_checks},
};
use leadscore_registry::ModelRegistry;
use leadscore_shared::{
    AppConfig, Mappings, Mode, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// leadscore: stage, train, and score CRM leads.
#[derive(Parser)]
#[command(
    name = "leadscore",
    version,
    about = "Lead-scoring pipeline: CSV staging, model training, batch predictions, drift monitoring.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.leadscore/leadscore.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Stage a raw lead CSV through the cleaning chain into model input.
    Ingest {
        /// Raw CSV path (defaults to the configured data file).
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Treat the file as an unlabeled scoring batch.
        #[arg(long)]
        inference: bool,
    },

    /// Encode features, fit the classifier, and register a model version.
    Train,

    /// Score the staged batch with the serving model and report drift.
    Predict {
        /// Serving stage to load the model from (defaults to configured).
        #[arg(long)]
        stage: Option<String>,
    },

    /// Run the schema validation checks against the staging store.
    Validate {
        /// Also check a raw CSV file's schema.
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Validate against the unlabeled schemas.
        #[arg(long)]
        inference: bool,
    },

    /// Recompute the prediction-distribution report.
    Monitor,

    /// Move a registered model version into a serving stage.
    Promote {
        /// Model version to promote.
        version: u32,

        /// Target stage (defaults to the configured serving stage).
        #[arg(long)]
        stage: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscore=info",
        1 => "leadscore=debug",
        _ => "leadscore=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Ingest {
            data_file,
            inference,
        } => cmd_ingest(&config, data_file, mode_for(inference)).await,
        Command::Train => cmd_train(&config).await,
        Command::Predict { stage } => cmd_predict(&config, stage).await,
        Command::Validate {
            data_file,
            inference,
        } => cmd_validate(&config, data_file, mode_for(inference)).await,
        Command::Monitor => cmd_monitor(&config).await,
        Command::Promote { version, stage } => cmd_promote(&config, version, stage).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn mode_for(inference: bool) -> Mode {
    if inference { Mode::Inference } else { Mode::Training }
}

/// Mapping tables from the configured file, or the built-in defaults when the
/// file does not exist.
fn load_mappings(config: &AppConfig) -> Result<Mappings> {
    let path = PathBuf::from(&config.paths.mappings_file);
    if path.exists() {
        Ok(Mappings::load_from(&path)?)
    } else {
        Ok(Mappings::default())
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(config: &AppConfig, data_file: Option<PathBuf>, mode: Mode) -> Result<()> {
    let csv_path = data_file.unwrap_or_else(|| PathBuf::from(&config.paths.data_file));
    let interaction_path = PathBuf::from(&config.paths.interaction_mapping_file);

    let pipeline_config = DataPipelineConfig {
        csv_path: csv_path.clone(),
        interaction_mapping_file: interaction_path.exists().then_some(interaction_path),
        staging_db: PathBuf::from(&config.paths.staging_db),
        mappings: load_mappings(config)?,
        mode,
    };

    info!(csv = %csv_path.display(), ?mode, "ingesting leads");

    let reporter = CliProgress::new();
    let result = run_data_pipeline(&pipeline_config, &reporter).await?;

    println!();
    for verdict in &result.validation.verdicts {
        println!("  {verdict}");
    }
    println!();
    println!("  Leads ingested!");
    println!("  Raw rows:         {}", result.raw_rows);
    println!("  After dedup:      {}", result.deduped_rows);
    println!("  Model-input rows: {}", result.model_input_rows);
    println!("  Time:             {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_train(config: &AppConfig) -> Result<()> {
    let train_config = TrainConfig {
        staging_db: PathBuf::from(&config.paths.staging_db),
        registry_root: PathBuf::from(&config.paths.registry_root),
        mappings: load_mappings(config)?,
        training: config.training.clone(),
    };

    info!(experiment = %config.training.experiment, "training model");

    let reporter = CliProgress::new();
    let result = run_training_pipeline(&train_config, &reporter).await?;

    println!();
    println!("  Model trained and registered!");
    println!("  Run:       {}", result.run_name);
    println!(
        "  Version:   {} (model '{}', stage 'none')",
        result.version, config.training.model_name
    );
    println!("  Accuracy:  {:.4}", result.metrics.accuracy);
    println!("  Precision: {:.4}", result.metrics.precision);
    println!("  Recall:    {:.4}", result.metrics.recall);
    println!("  F1:        {:.4}", result.metrics.f1);
    println!("  AUC:       {:.4}", result.metrics.auc);
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();
    println!(
        "  Promote with: leadscore promote {} --stage {}",
        result.version, config.training.serving_stage
    );
    println!();

    Ok(())
}

async fn cmd_predict(config: &AppConfig, stage: Option<String>) -> Result<()> {
    let infer_config = InferConfig {
        staging_db: PathBuf::from(&config.paths.staging_db),
        registry_root: PathBuf::from(&config.paths.registry_root),
        drift_report: PathBuf::from(&config.paths.drift_report),
        mappings: load_mappings(config)?,
        model_name: config.training.model_name.clone(),
        serving_stage: stage.unwrap_or_else(|| config.training.serving_stage.clone()),
    };

    info!(model = %infer_config.model_name, stage = %infer_config.serving_stage, "scoring batch");

    let reporter = CliProgress::new();
    let result = run_inference_pipeline(&infer_config, &reporter).await?;

    println!();
    match result.scored_rows {
        Some(rows) => println!("  Scored {rows} leads."),
        None => println!("  Scoring failed; previous predictions retained (see logs)."),
    }
    println!("  Percentage of 1's: {}", result.drift.pct_ones);
    println!("  Percentage of 0's: {}", result.drift.pct_zeros);
    println!("  Report: {}", config.paths.drift_report);
    println!();

    Ok(())
}

async fn cmd_validate(config: &AppConfig, data_file: Option<PathBuf>, mode: Mode) -> Result<()> {
    let validate_config = ValidateConfig {
        csv_path: data_file,
        staging_db: PathBuf::from(&config.paths.staging_db),
        mappings: load_mappings(config)?,
        mode,
    };

    let report = run_validation_checks(&validate_config).await;
    println!();
    for verdict in &report.verdicts {
        println!("  {verdict}");
    }
    println!();

    if report.all_passed() {
        Ok(())
    } else {
        Err(eyre!("one or more validation checks failed"))
    }
}

async fn cmd_monitor(config: &AppConfig) -> Result<()> {
    let mappings = load_mappings(config)?;
    let report = run_standalone_monitor(
        &PathBuf::from(&config.paths.staging_db),
        &mappings.label_column,
        &PathBuf::from(&config.paths.drift_report),
    )
    .await;

    println!();
    println!("  Percentage of 1's: {}", report.pct_ones);
    println!("  Percentage of 0's: {}", report.pct_zeros);
    if report.empty_input {
        println!("  (no predictions found)");
    }
    println!("  Report: {}", config.paths.drift_report);
    println!();

    Ok(())
}

async fn cmd_promote(config: &AppConfig, version: u32, stage: Option<String>) -> Result<()> {
    let stage = stage.unwrap_or_else(|| config.training.serving_stage.clone());
    let registry = ModelRegistry::open(PathBuf::from(&config.paths.registry_root))?;
    registry.transition(&config.training.model_name, version, &stage)?;

    println!(
        "Promoted {} version {version} to stage '{stage}'.",
        config.training.model_name
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl StepReporter for CliProgress {
    fn step(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}
