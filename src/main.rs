//! # FOHS CLI (`fohs`)
//!
//! Command-line interface for the FOHS scripture store.
//!
//! ## Usage
//!
//! ```bash
//! fohs --config ./config/fohs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fohs init` | Create the SQLite database and the `scriptures` table |
//! | `fohs inspect` | Print schema, counts, and samples (read-only) |
//! | `fohs migrate` | Add and fill the `languageKey` column |
//! | `fohs reconcile --bible <M>` | Find and fill rows missing from a translation |
//!
//! ## Examples
//!
//! ```bash
//! # Report which Spanish rows are missing
//! fohs reconcile --bible FSPAN
//!
//! # Fill them from the passage API
//! fohs reconcile --bible FSPAN --insert
//!
//! # Fill them from an older copy of the database
//! fohs reconcile --bible FSPAN --insert --rebuild-db ./backup/fohs.sqlite
//!
//! # Export one translation as CSV without the id column
//! fohs inspect --bible FSPAN --csv --skip id
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use fohs_verse::config::{self, Config};
use fohs_verse::inspect::{self, InspectArgs};
use fohs_verse::progress::ProgressMode;
use fohs_verse::reconcile::{self, ReconcileArgs};
use fohs_verse::{backfill, store::Store};

/// FOHS CLI: inspect, migrate, and populate a scripture store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/fohs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "fohs",
    about = "Inspect, migrate, and populate a local store of fruit-of-the-spirit scripture passages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fohs.toml")]
    config: PathBuf,

    /// Database path; overrides `[db].path`.
    ///
    /// When the config file does not exist, `init` and `inspect` run with
    /// this path alone.
    #[arg(long, short = 'd', global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the `scriptures` table.
    ///
    /// Idempotent: an existing database is left as it is.
    Init,

    /// Print tables, schemas, row counts, and samples.
    ///
    /// Never writes to the database.
    Inspect {
        /// Only rows whose index mentions this mnemonic (newest first).
        #[arg(long, short = 'b')]
        bible: Option<String>,

        /// Write the selected rows as CSV to stdout.
        #[arg(long)]
        csv: bool,

        /// Fields to omit from CSV output, colon separated (e.g. `id:languageKey`).
        #[arg(long, short = 's', value_delimiter = ':')]
        skip: Vec<String>,

        /// List rows missing `text` or `fohs`.
        #[arg(long)]
        null_check: bool,
    },

    /// Add the `languageKey` column and fill it for every row.
    ///
    /// Re-running only visits rows whose key is still blank.
    Migrate,

    /// Reconcile a translation against the baseline translation.
    ///
    /// Without `--insert` this is a dry run that reports missing rows.
    /// With `--insert` text comes from `--rebuild-db`, `--translate`, or
    /// (by default) the passage API.
    Reconcile {
        /// Target translation mnemonic (a `[[bibles]]` entry).
        #[arg(long, short = 'b')]
        bible: String,

        /// Resolve and write missing rows.
        #[arg(long)]
        insert: bool,

        /// Copy text from a secondary copy of the database.
        #[arg(long, conflicts_with = "translate")]
        rebuild_db: Option<PathBuf>,

        /// Translate the baseline text with the configured translator.
        #[arg(long)]
        translate: bool,

        /// Translator target language; defaults to the Bible's language.
        #[arg(long, requires = "translate")]
        language: Option<String>,

        /// Progress on stderr: off, human, or json (default: human on a TTY).
        #[arg(long, value_name = "MODE")]
        progress: Option<ProgressMode>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_writer(std::io::stdout)
        .init();
}

/// Load the config file, or fall back to a database-only config when the
/// file is absent and `--db` was given.
fn resolve_config(cli: &Cli, allow_minimal: bool) -> anyhow::Result<Config> {
    let mut cfg = match (&cli.db, allow_minimal && !cli.config.exists()) {
        (Some(db), true) => Config::minimal(db.clone()),
        _ => config::load_config(&cli.config)?,
    };
    if let Some(db) = &cli.db {
        cfg.db.path = db.clone();
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init => {
            let cfg = resolve_config(&cli, true)?;
            let store = Store::create(&cfg.db.path).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Inspect {
            bible,
            csv,
            skip,
            null_check,
        } => {
            let cfg = resolve_config(&cli, true)?;
            let args = InspectArgs {
                bible: bible.clone(),
                csv: *csv,
                skip: skip.clone(),
                null_check: *null_check,
            };
            inspect::run_inspect(&cfg, &args).await?;
        }
        Commands::Migrate => {
            let cfg = resolve_config(&cli, false)?;
            backfill::run_migrate(&cfg).await?;
        }
        Commands::Reconcile {
            bible,
            insert,
            rebuild_db,
            translate,
            language,
            progress,
        } => {
            let cfg = resolve_config(&cli, false)?;
            let args = ReconcileArgs {
                mnemonic: bible.clone(),
                insert: *insert,
                rebuild_db: rebuild_db.clone(),
                translate: *translate,
                language: language.clone(),
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            reconcile::run_reconcile(&cfg, &args).await?;
        }
    }

    Ok(())
}
