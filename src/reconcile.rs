//! Reconciliation of a target translation against the baseline.
//!
//! For every baseline row (index ending in the baseline version tag, e.g.
//! `WEBUS)`) the engine derives the same passage in the target translation
//! and makes sure a complete row exists for it:
//!
//! ```text
//! baseline row ──▶ ScriptureRef ──▶ target index ──▶ store.get ─┬─ complete ──▶ Resolved
//!                                                               └─ absent/incomplete
//!                                                                    │ (dry run) ──▶ Missing
//!                                                                    ▼
//!                                                              TextSource.resolve
//!                                                               ├─ None ──▶ Skipped
//!                                                               └─ text ──▶ Updated | Inserted
//! ```
//!
//! Two caps bound a run: at most `insert_cap` writes, and at most
//! `min(recs_to_process, visit_cap)` baseline rows visited. Complete rows are
//! never touched, so an interrupted run is resumed by running it again.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{BibleConfig, Config};
use crate::error::ResolveError;
use crate::models::{is_blank, NewScripture, ScriptureRecord};
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::reference::ScriptureRef;
use crate::resolver::{self, ResolveRequest, Resolved, ResolverKind, TextSource};
use crate::store::{Order, RowFilter, Store};

/// Fixed parameters of one reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Target translation mnemonic.
    pub mnemonic: String,
    pub baseline_version: String,
    pub recs_to_process: usize,
    pub insert_cap: usize,
    pub visit_cap: usize,
    /// `false` is a dry run: missing rows are reported, nothing is resolved or written.
    pub insert: bool,
    pub abort_on_fetch_error: bool,
    /// FOHS key → label in the target language.
    pub fohs_labels: HashMap<String, String>,
}

impl ReconcilePlan {
    pub fn new(config: &Config, bible: &BibleConfig, insert: bool) -> Self {
        Self {
            mnemonic: bible.mnemonic.clone(),
            baseline_version: config.reconcile.baseline_version.clone(),
            recs_to_process: bible.recs_to_process,
            insert_cap: config.reconcile.insert_cap,
            visit_cap: config.reconcile.visit_cap,
            insert,
            abort_on_fetch_error: config.reconcile.abort_on_fetch_error,
            fohs_labels: config
                .fohs_labels
                .get(&bible.language)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Maximum number of baseline rows visited in one run.
    pub fn visit_limit(&self) -> usize {
        self.recs_to_process.min(self.visit_cap)
    }

    /// Label for a written row: resolver, then existing row, then the
    /// configured label, then the baseline row's label.
    fn label_for(
        &self,
        fohs_key: &str,
        resolved: &Resolved,
        existing: Option<&ScriptureRecord>,
        baseline: &ScriptureRecord,
    ) -> Option<String> {
        let non_blank = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_string);

        non_blank(resolved.fohs.as_deref())
            .or_else(|| non_blank(existing.and_then(|r| r.fohs.as_deref())))
            .or_else(|| non_blank(self.fohs_labels.get(fohs_key).map(String::as_str)))
            .or_else(|| non_blank(baseline.fohs.as_deref()))
    }
}

/// What happened to one baseline row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Target row exists and is complete.
    Resolved,
    /// Target row absent or incomplete; dry run, nothing written.
    Missing,
    /// Existing incomplete target row was completed.
    Updated,
    /// New target row was written.
    Inserted,
    /// No replacement was available.
    Skipped(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The write cap was reached.
    InsertCap(usize),
    /// More baseline rows remain beyond the visit limit.
    VisitLimit(usize),
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::InsertCap(n) => write!(f, "insert cap of {} reached", n),
            HaltReason::VisitLimit(n) => write!(f, "visit limit of {} reached", n),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub visited: u64,
    pub resolved: u64,
    pub missing: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub halted: Option<HaltReason>,
}

impl ReconcileReport {
    /// Inserts plus updates.
    pub fn writes(&self) -> u64 {
        self.inserted + self.updated
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Resolved => self.resolved += 1,
            Outcome::Missing => self.missing += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Inserted => self.inserted += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Run the reconcile loop. The caller owns (and closes) `source`.
pub async fn reconcile(
    store: &Store,
    plan: &ReconcilePlan,
    source: &mut dyn TextSource,
    progress: &dyn ProgressReporter,
) -> Result<ReconcileReport> {
    let limit = plan.visit_limit();
    let mut rows = store
        .scan(
            &RowFilter::VersionTag(plan.baseline_version.clone()),
            Order::IdAsc,
            Some(limit + 1),
        )
        .await
        .context("Failed to read baseline rows")?;
    let more_remaining = rows.len() > limit;
    rows.truncate(limit);

    let total = rows.len() as u64;
    let mut report = ReconcileReport::default();

    for row in &rows {
        report.visited += 1;
        progress.report(ProgressEvent::Visiting {
            mnemonic: plan.mnemonic.clone(),
            n: report.visited,
            total,
            index: row.scripture_index.clone(),
        });

        match reconcile_record(store, plan, source, row).await {
            Ok(outcome) => {
                log_outcome(row, &outcome);
                report.record(&outcome);
            }
            Err(e) if e.is_fetch_failure() && plan.abort_on_fetch_error => {
                return Err(anyhow::Error::new(e).context(format!(
                    "reconcile aborted at {} [{}] after {} visited, {} written",
                    row.scripture_index,
                    row.fohs_key,
                    report.visited,
                    report.writes()
                )));
            }
            Err(e) => {
                tracing::warn!(
                    id = row.id,
                    index = %row.scripture_index,
                    fohs_key = %row.fohs_key,
                    error = %e,
                    "skipping record"
                );
                report.skipped += 1;
            }
        }

        if report.writes() >= plan.insert_cap as u64 {
            report.halted = Some(HaltReason::InsertCap(plan.insert_cap));
            break;
        }
    }

    if report.halted.is_none() && more_remaining {
        report.halted = Some(HaltReason::VisitLimit(limit));
    }
    if let Some(reason) = report.halted {
        progress.report(ProgressEvent::Halted {
            mnemonic: plan.mnemonic.clone(),
            reason: reason.to_string(),
        });
    }

    Ok(report)
}

async fn reconcile_record(
    store: &Store,
    plan: &ReconcilePlan,
    source: &mut dyn TextSource,
    row: &ScriptureRecord,
) -> Result<Outcome, ResolveError> {
    let baseline = ScriptureRef::parse(&row.scripture_index)?;
    let target = baseline.with_version(&plan.mnemonic);
    let target_index = target.to_index();

    let existing = store.get(&target_index, &row.fohs_key).await?;
    if existing.as_ref().is_some_and(|r| r.is_complete()) {
        return Ok(Outcome::Resolved);
    }

    if !plan.insert {
        return Ok(Outcome::Missing);
    }

    let req = ResolveRequest {
        target: &target,
        fohs_key: &row.fohs_key,
        source_text: row.text.as_deref(),
        source_fohs: row.fohs.as_deref(),
    };
    let Some(resolved) = source.resolve(&req).await? else {
        return Ok(Outcome::Skipped(format!("{} had no text", source.name())));
    };
    if is_blank(Some(resolved.text.as_str())) {
        return Ok(Outcome::Skipped(format!("{} returned blank text", source.name())));
    }

    let Some(fohs) = plan.label_for(&row.fohs_key, &resolved, existing.as_ref(), row) else {
        return Ok(Outcome::Skipped(format!("no label for {}", row.fohs_key)));
    };

    if existing.is_some() {
        store
            .update_text(&target_index, &row.fohs_key, &resolved.text, &fohs)
            .await?;
        Ok(Outcome::Updated)
    } else {
        store
            .insert(&NewScripture {
                scripture_index: target_index,
                fohs_key: row.fohs_key.clone(),
                fohs,
                text: resolved.text,
            })
            .await?;
        Ok(Outcome::Inserted)
    }
}

fn log_outcome(row: &ScriptureRecord, outcome: &Outcome) {
    match outcome {
        Outcome::Resolved => {
            tracing::debug!(index = %row.scripture_index, fohs_key = %row.fohs_key, "already complete")
        }
        Outcome::Missing => {
            tracing::info!(index = %row.scripture_index, fohs_key = %row.fohs_key, "missing")
        }
        Outcome::Updated => {
            tracing::info!(index = %row.scripture_index, fohs_key = %row.fohs_key, "updated")
        }
        Outcome::Inserted => {
            tracing::info!(index = %row.scripture_index, fohs_key = %row.fohs_key, "inserted")
        }
        Outcome::Skipped(reason) => {
            tracing::warn!(index = %row.scripture_index, fohs_key = %row.fohs_key, %reason, "skipped")
        }
    }
}

/// Stand-in source for dry runs, where nothing is ever resolved.
struct DryRun;

#[async_trait]
impl TextSource for DryRun {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn resolve(&mut self, _req: &ResolveRequest<'_>) -> Result<Option<Resolved>, ResolveError> {
        Ok(None)
    }
}

/// Options of `fohs reconcile`.
#[derive(Debug, Clone)]
pub struct ReconcileArgs {
    pub mnemonic: String,
    pub insert: bool,
    pub rebuild_db: Option<PathBuf>,
    pub translate: bool,
    pub language: Option<String>,
    pub progress: ProgressMode,
}

impl ReconcileArgs {
    fn resolver_kind(&self, bible: &BibleConfig) -> ResolverKind {
        if let Some(path) = &self.rebuild_db {
            ResolverKind::Rebuild(path.clone())
        } else if self.translate {
            ResolverKind::Translate {
                language: self
                    .language
                    .clone()
                    .unwrap_or_else(|| bible.language.clone()),
            }
        } else {
            ResolverKind::Remote
        }
    }
}

/// CLI entry point for `fohs reconcile`.
pub async fn run_reconcile(config: &Config, args: &ReconcileArgs) -> Result<()> {
    let bible = config
        .bible(&args.mnemonic)
        .ok_or_else(|| anyhow!("Unknown Bible mnemonic: '{}'", args.mnemonic))?;

    let store = Store::open(&config.db.path)
        .await
        .with_context(|| format!("Could not open database: {}", config.db.path.display()))?;

    let plan = ReconcilePlan::new(config, bible, args.insert);
    let kind = args.resolver_kind(bible);

    let mut source: Box<dyn TextSource> = if args.insert {
        resolver::build(&kind, config, bible).await?
    } else {
        Box::new(DryRun)
    };
    let reporter = args.progress.reporter();

    let result = reconcile(&store, &plan, source.as_mut(), reporter.as_ref()).await;
    let closed = source.close().await;
    store.close().await;

    let report = result?;
    closed.context("Failed to close text source")?;

    if args.insert {
        println!("reconcile {} ({})", plan.mnemonic, source.name());
    } else {
        println!("reconcile {} (dry-run)", plan.mnemonic);
    }
    println!("  baseline: {}", plan.baseline_version);
    println!("  visited: {}", report.visited);
    println!("  complete: {}", report.resolved);
    if !args.insert {
        println!("  missing: {}", report.missing);
    }
    println!("  inserted: {}", report.inserted);
    println!("  updated: {}", report.updated);
    println!("  skipped: {}", report.skipped);
    if let Some(reason) = report.halted {
        println!("  halted: {}", reason);
    }
    println!("ok");

    Ok(())
}
