// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalogtl::app_config::{self, Config};
use catalogtl::catalog::{Document, SqliteCatalogStore};
use catalogtl::language_utils;
use catalogtl::notify::ConsoleNotifier;
use catalogtl::pipeline::{CancellationController, RunOrchestrator};
use catalogtl::providers::{OllamaBackend, TranslationBackend};
use catalogtl::system_probe::SystemProbe;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate catalog collections
    Translate(TranslateArgs),

    /// Load documents from a JSON array file into a collection
    Import(ImportArgs),

    /// Generate shell completions for catalogtl
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Catalog database file (defaults to the user data directory)
    #[arg(long, env = "CATALOGTL_DB")]
    db: Option<PathBuf>,

    /// Collections to translate, comma separated (defaults to all configured)
    #[arg(long, value_delimiter = ',')]
    collections: Vec<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Fixed number of workers instead of the CPU-derived count
    #[arg(long)]
    workers: Option<usize>,

    /// Fixed batch size instead of the RAM-derived size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Translate documents already stamped as translated
    #[arg(long)]
    retranslate: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// Catalog database file (defaults to the user data directory)
    #[arg(long, env = "CATALOGTL_DB")]
    db: Option<PathBuf>,

    /// Target collection
    #[arg(long)]
    collection: String,

    /// JSON file holding an array of documents with an `_id` field
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// catalogtl - bulk translation for media catalogs
///
/// Translates the text fields of whole catalog collections with a local LLM,
/// in parallel, with live progress and safe cancellation (Ctrl-C).
#[derive(Parser, Debug)]
#[command(name = "catalogtl")]
#[command(version)]
#[command(about = "Bulk translation for media catalogs")]
#[command(long_about = "catalogtl translates movie and series descriptions and episode texts of a media catalog using an LLM backend.

EXAMPLES:
    catalogtl translate                              # Translate all configured collections
    catalogtl translate --collections series -t de   # Translate series into German
    catalogtl translate --workers 2 --batch-size 10  # Fixed sizing
    catalogtl import --collection movies movies.json # Load documents into the catalog
    catalogtl completions bash > catalogtl.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.

CANCELLATION:
    Press Ctrl-C once to stop the run. Batches in flight finish their current
    document, committed translations are kept, and a re-run resumes with the
    documents not translated yet.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    // @returns: Marker for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the config may lower or raise it later
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "catalogtl", &mut std::io::stdout());
            Ok(())
        }
        Commands::Import(args) => run_import(args).await,
        Commands::Translate(args) => run_translate(args).await,
    }
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteCatalogStore> {
    let path = match db {
        Some(path) => path,
        None => SqliteCatalogStore::default_database_path()?,
    };
    SqliteCatalogStore::open(path)
}

async fn run_import(args: ImportArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read import file: {:?}", args.file))?;
    let documents: Vec<Document> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {:?}", args.file))?;

    let store = open_store(args.db)?;
    let imported = store.import(&args.collection, documents).await?;
    info!("Imported {} document(s) into {}", imported, args.collection);
    Ok(())
}

fn load_config(options: &TranslateArgs) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&options.config_path))?;

    if let Some(source_lang) = &options.source_language {
        config.source_language = language_utils::normalize_language_code(source_lang)?;
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = language_utils::normalize_language_code(target_lang)?;
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if options.workers.is_some() {
        config.pipeline.worker_override = options.workers;
    }
    if options.batch_size.is_some() {
        config.pipeline.batch_size_override = options.batch_size;
    }
    if options.retranslate {
        config.pipeline.skip_translated = false;
    }
    if !options.collections.is_empty() {
        config.select_collections(&options.collections)?;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let config = load_config(&options)?;
    log::set_max_level(config.log_level.to_level_filter());

    let store = Arc::new(open_store(options.db)?);
    let backend = Arc::new(OllamaBackend::from_config(&config.provider));
    if let Err(e) = backend.test_connection().await {
        return Err(anyhow!("Translation backend unreachable at {}: {}", config.provider.endpoint, e));
    }

    let notifier = Arc::new(ConsoleNotifier::new());
    let controller = Arc::new(CancellationController::new());

    // Ctrl-C is the external stop trigger
    let signal_controller = controller.clone();
    let signal_task = tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Ctrl-C handler unavailable, runs cannot be cancelled");
                return;
            }
            if signal_controller.cancel() {
                warn!("Stopping after the batches in flight");
            }
        }
    });

    let ticket = controller.begin_run()?;
    let orchestrator = RunOrchestrator::new(store, backend, notifier.clone(), config);
    let summary = orchestrator.run(&ticket, &SystemProbe::new()).await;
    drop(ticket);

    signal_task.abort();
    notifier.finish();

    if summary.total_errors() > 0 {
        error!("{} document(s) failed, re-run to retry them", summary.total_errors());
    }
    Ok(())
}
