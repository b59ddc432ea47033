//! Translation through an external interactive translator.
//!
//! The translator is a long-lived child process started once per run from
//! `[translator].command`. It speaks a line protocol: one line of source text
//! on stdin produces one line of translated text on stdout. Calls are strictly
//! sequential and paced with a fixed delay. The process is shut down by
//! [`TextSource::close`], and killed on drop if the run ends any other way.
//!
//! Short inputs (labels such as `Love`) repeat constantly, so inputs of fewer
//! than [`SHORT_TEXT_WORDS`] words are answered from a per-run cache.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{ResolveRequest, Resolved, TextSource};
use crate::config::TranslatorConfig;
use crate::error::ResolveError;
use crate::models::is_blank;

/// Inputs and outputs with fewer words than this are cached.
pub const SHORT_TEXT_WORDS: usize = 4;

/// Placeholder in translator arguments replaced by the target language.
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

fn is_short(text: &str) -> bool {
    text.split_whitespace().count() < SHORT_TEXT_WORDS
}

/// Exact-text cache for short translations.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<String, String>,
}

impl TranslationCache {
    pub fn lookup(&self, text: &str) -> Option<&str> {
        if !is_short(text) {
            return None;
        }
        self.entries.get(text).map(String::as_str)
    }

    pub fn remember(&mut self, text: &str, translation: &str) {
        if is_short(translation) {
            self.entries
                .insert(text.to_string(), translation.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the program and arguments, substituting the target language.
pub fn command_line(command: &[String], language: &str) -> Result<(String, Vec<String>)> {
    let Some((program, args)) = command.split_first() else {
        bail!("translator.command is empty");
    };
    let args = args
        .iter()
        .map(|a| a.replace(LANGUAGE_PLACEHOLDER, language))
        .collect();
    Ok((program.clone(), args))
}

/// The protocol is line based, so embedded line breaks become spaces.
fn protocol_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

pub struct TranslationService {
    session: Option<Session>,
    cache: TranslationCache,
    pace: Duration,
    response_timeout: Duration,
    calls: u64,
}

impl TranslationService {
    /// Spawn the translator and wait for it to settle.
    pub async fn start(config: &TranslatorConfig, language: &str) -> Result<Self> {
        let (program, args) = command_line(&config.command, language)?;

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start translator: {}", program))?;

        let stdin = child.stdin.take().context("translator stdin unavailable")?;
        let stdout = child
            .stdout
            .take()
            .context("translator stdout unavailable")?;

        tracing::info!(%program, %language, "translator session started");
        if config.startup_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.startup_ms)).await;
        }

        Ok(Self {
            session: Some(Session {
                child,
                stdin: Some(stdin),
                stdout: BufReader::new(stdout).lines(),
            }),
            cache: TranslationCache::default(),
            pace: Duration::from_millis(config.pace_ms),
            response_timeout: Duration::from_secs(config.response_timeout_secs),
            calls: 0,
        })
    }

    /// Number of requests actually sent to the translator.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub async fn translate(&mut self, text: &str) -> Result<String, ResolveError> {
        if let Some(hit) = self.cache.lookup(text) {
            return Ok(hit.to_string());
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ResolveError::Translator("session is closed".to_string()))?;

        let reply = match session.exchange(text, self.response_timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                // A reply that arrives late would answer the next request.
                self.poison(&e);
                return Err(e);
            }
        };

        self.calls += 1;
        let result = reply.trim().to_string();
        let preview: String = text.chars().take(35).collect();
        tracing::info!(result = %result, source = %preview, "translated");

        self.cache.remember(text, &result);

        if !self.pace.is_zero() {
            tokio::time::sleep(self.pace).await;
        }
        Ok(result)
    }

    /// Drop the session after a failed exchange; later calls fail fast.
    fn poison(&mut self, cause: &ResolveError) {
        if let Some(mut session) = self.session.take() {
            drop(session.stdin.take());
            if let Err(e) = session.child.start_kill() {
                tracing::warn!(error = %e, "failed to kill translator");
            }
            tracing::warn!(error = %cause, "translator session abandoned");
        }
    }
}

impl Session {
    /// Send one line and wait for the one line that answers it.
    async fn exchange(&mut self, text: &str, timeout: Duration) -> Result<String, ResolveError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ResolveError::Translator("session is closed".to_string()))?;

        let mut line = protocol_line(text);
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ResolveError::Translator(format!("write failed: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| ResolveError::Translator(format!("write failed: {}", e)))?;

        tokio::time::timeout(timeout, self.stdout.next_line())
            .await
            .map_err(|_| ResolveError::Translator("timed out waiting for translation".to_string()))?
            .map_err(|e| ResolveError::Translator(format!("read failed: {}", e)))?
            .ok_or_else(|| ResolveError::Translator("translator exited".to_string()))
    }
}

#[async_trait]
impl TextSource for TranslationService {
    fn name(&self) -> &str {
        "translate"
    }

    async fn resolve(&mut self, req: &ResolveRequest<'_>) -> Result<Option<Resolved>, ResolveError> {
        let Some(source_text) = req.source_text.filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };

        let text = self.translate(source_text).await?;
        if text.is_empty() {
            return Ok(None);
        }

        let fohs = match req.source_fohs {
            Some(label) if !is_blank(Some(label)) => {
                Some(self.translate(label).await?).filter(|f| !f.is_empty())
            }
            _ => None,
        };

        Ok(Some(Resolved { text, fohs }))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        // EOF on stdin asks the translator to exit.
        drop(session.stdin.take());
        match tokio::time::timeout(Duration::from_secs(5), session.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(
                    %status,
                    calls = self.calls,
                    cached = self.cache.len(),
                    "translator session closed"
                );
            }
            Err(_) => {
                session.child.kill().await?;
                tracing::warn!("translator did not exit; killed");
            }
        }
        Ok(())
    }
}
