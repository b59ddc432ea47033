//! Replacement-text sources for the reconcile pipeline.
//!
//! A [`TextSource`] turns one missing target row into text. Three
//! implementations exist and exactly one is chosen per run:
//!
//! | Kind | Source of text |
//! |------|----------------|
//! | [`ResolverKind::Rebuild`] | a secondary copy of the store, read-only |
//! | [`ResolverKind::Translate`] | an external translator session fed the source text |
//! | [`ResolverKind::Remote`] | the passage API, HTML reduced to plain text |
//!
//! Returning `Ok(None)` means "nothing to write" and the record is skipped.

pub mod rebuild;
pub mod remote;
pub mod translate;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::{BibleConfig, Config};
use crate::error::ResolveError;
use crate::reference::ScriptureRef;

pub use rebuild::RebuildLookup;
pub use remote::RemoteFetch;
pub use translate::TranslationService;

/// Everything a source may need to produce text for one target row.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    /// The row to produce, in the target translation.
    pub target: &'a ScriptureRef,
    pub fohs_key: &'a str,
    /// Text of the baseline row.
    pub source_text: Option<&'a str>,
    /// Label of the baseline row.
    pub source_fohs: Option<&'a str>,
}

/// Text produced for a target row. `fohs` is set when the source also
/// produced a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    pub fohs: Option<String>,
}

#[async_trait]
pub trait TextSource: Send {
    /// Short name used in logs and reports (e.g. `"remote"`).
    fn name(&self) -> &str;

    async fn resolve(&mut self, req: &ResolveRequest<'_>) -> Result<Option<Resolved>, ResolveError>;

    /// Release anything held for the run. Called once, on every exit path.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Strategy selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverKind {
    Rebuild(PathBuf),
    Translate { language: String },
    Remote,
}

/// Build the text source for a run.
pub async fn build(
    kind: &ResolverKind,
    config: &Config,
    bible: &BibleConfig,
) -> Result<Box<dyn TextSource>> {
    match kind {
        ResolverKind::Rebuild(path) => {
            let lookup = RebuildLookup::open(path)
                .await
                .with_context(|| format!("Could not open rebuild database: {}", path.display()))?;
            Ok(Box::new(lookup))
        }
        ResolverKind::Translate { language } => {
            if config.translator.command.is_empty() {
                bail!("translator.command must be set to use --translate");
            }
            let session = TranslationService::start(&config.translator, language).await?;
            Ok(Box::new(session))
        }
        ResolverKind::Remote => {
            let bible_id = bible.bible_id.clone().ok_or_else(|| {
                anyhow::anyhow!("bibles entry '{}' has no bible_id", bible.mnemonic)
            })?;
            let api_key = bible.resolved_api_key().ok_or_else(|| {
                anyhow::anyhow!(
                    "no API key for '{}': set api_key or {}",
                    bible.mnemonic,
                    crate::config::API_KEY_ENV
                )
            })?;
            let fetch = RemoteFetch::new(&config.remote, bible_id, api_key)?;
            Ok(Box::new(fetch))
        }
    }
}
