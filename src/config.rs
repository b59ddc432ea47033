//! TOML configuration parsing.
//!
//! The configuration is loaded once at startup and passed by reference into
//! every command. Nothing in it changes for the lifetime of the process.
//!
//! ```toml
//! [db]
//! path = "./data/fohs.sqlite"
//!
//! [remote]
//! base_url = "https://rest.api.bible/v1/bibles"
//!
//! [reconcile]
//! baseline_version = "WEBUS"
//!
//! [[bibles]]
//! mnemonic = "FSPAN"
//! language = "SPANISH"
//! bible_id = "482ddd53705278cc-01"
//! recs_to_process = 2300
//!
//! [books.SPANISH]
//! "John" = "Juan"
//!
//! [fohs_labels.SPANISH]
//! LOVE = "Amor"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable consulted when a Bible entry carries no `api_key`.
pub const API_KEY_ENV: &str = "API_BIBLE_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub bibles: Vec<BibleConfig>,
    /// Language → (English book name → localized book name).
    #[serde(default)]
    pub books: HashMap<String, HashMap<String, String>>,
    /// Language → (FOHS key → display label).
    #[serde(default)]
    pub fohs_labels: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout. `None` keeps the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://rest.api.bible/v1/bibles".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    /// Version tag of the translation every other translation is derived from.
    #[serde(default = "default_baseline_version")]
    pub baseline_version: String,
    /// Writes (inserts + updates) allowed per run.
    #[serde(default = "default_insert_cap")]
    pub insert_cap: usize,
    /// Source rows visited per run, regardless of writes.
    #[serde(default = "default_visit_cap")]
    pub visit_cap: usize,
    /// Whether a failed passage fetch ends the whole run or only skips the record.
    #[serde(default = "default_abort_on_fetch_error")]
    pub abort_on_fetch_error: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            baseline_version: default_baseline_version(),
            insert_cap: default_insert_cap(),
            visit_cap: default_visit_cap(),
            abort_on_fetch_error: default_abort_on_fetch_error(),
        }
    }
}

fn default_baseline_version() -> String {
    "WEBUS".to_string()
}
fn default_insert_cap() -> usize {
    400
}
fn default_visit_cap() -> usize {
    1000
}
fn default_abort_on_fetch_error() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslatorConfig {
    /// Program and arguments of the interactive translator. Arguments may
    /// contain `{language}`, replaced with the target language at spawn time.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_startup_ms")]
    pub startup_ms: u64,
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            startup_ms: default_startup_ms(),
            pace_ms: default_pace_ms(),
            response_timeout_secs: default_response_timeout_secs(),
        }
    }
}

fn default_startup_ms() -> u64 {
    3000
}
fn default_pace_ms() -> u64 {
    2000
}
fn default_response_timeout_secs() -> u64 {
    60
}

/// Per-translation metadata.
#[derive(Debug, Deserialize, Clone)]
pub struct BibleConfig {
    pub mnemonic: String,
    pub language: String,
    #[serde(default)]
    pub bible_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_recs_to_process")]
    pub recs_to_process: usize,
}

fn default_recs_to_process() -> usize {
    1000
}

impl BibleConfig {
    /// The API key from the config entry, falling back to [`API_KEY_ENV`].
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }
}

pub fn is_english(language: &str) -> bool {
    language.eq_ignore_ascii_case("ENGLISH")
}

impl Config {
    /// Find the Bible entry for a mnemonic (exact match).
    pub fn bible(&self, mnemonic: &str) -> Option<&BibleConfig> {
        self.bibles.iter().find(|b| b.mnemonic == mnemonic)
    }

    /// Localized book-name table for a language.
    pub fn book_map(&self, language: &str) -> Option<&HashMap<String, String>> {
        self.books.get(language)
    }

    /// Configuration with only a database path; used when no config file exists.
    pub fn minimal(db_path: PathBuf) -> Self {
        Self {
            db: DbConfig { path: db_path },
            remote: RemoteConfig::default(),
            reconcile: ReconcileConfig::default(),
            translator: TranslatorConfig::default(),
            bibles: Vec::new(),
            books: HashMap::new(),
            fohs_labels: HashMap::new(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.reconcile.baseline_version.trim().is_empty() {
        bail!("reconcile.baseline_version must not be empty");
    }
    if config.reconcile.insert_cap == 0 {
        bail!("reconcile.insert_cap must be > 0");
    }
    if config.reconcile.visit_cap == 0 {
        bail!("reconcile.visit_cap must be > 0");
    }

    for (i, bible) in config.bibles.iter().enumerate() {
        if bible.mnemonic.trim().is_empty() {
            bail!("bibles[{}].mnemonic must not be empty", i);
        }
        if bible.language.trim().is_empty() {
            bail!("bibles[{}].language must not be empty ({})", i, bible.mnemonic);
        }
        if config.bibles[..i].iter().any(|b| b.mnemonic == bible.mnemonic) {
            bail!("duplicate Bible mnemonic: '{}'", bible.mnemonic);
        }
    }

    Ok(config)
}
