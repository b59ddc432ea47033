//! Reconcile progress reporting.
//!
//! Emits one event per visited baseline row so long runs (especially the
//! paced translator) show how far along they are. Progress goes to **stderr**
//! so the summary on stdout stays parseable for scripts.

use std::io::Write;
use std::str::FromStr;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Row `n` of `total` baseline rows is being reconciled.
    Visiting {
        mnemonic: String,
        n: u64,
        total: u64,
        index: String,
    },
    /// The run stopped; `reason` is a short description.
    Halted { mnemonic: String, reason: String },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "reconcile FSPAN  1,234 / 2,300  (John 3:16 WEBUS)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Visiting {
                mnemonic,
                n,
                total,
                index,
            } => format!(
                "reconcile {}  {} / {}  {}\n",
                mnemonic,
                group_thousands(*n),
                group_thousands(*total),
                index
            ),
            ProgressEvent::Halted { mnemonic, reason } => {
                format!("reconcile {}  halted: {}\n", mnemonic, reason)
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// One JSON object per event on stderr, for wrappers that track long runs.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Visiting {
                mnemonic,
                n,
                total,
                index,
            } => serde_json::json!({
                "event": "progress",
                "mnemonic": mnemonic,
                "n": n,
                "total": total,
                "index": index
            }),
            ProgressEvent::Halted { mnemonic, reason } => serde_json::json!({
                "event": "halted",
                "mnemonic": mnemonic,
                "reason": reason
            }),
        };
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", obj);
        let _ = err.flush();
    }
}

/// Discards every event.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Value of `--progress`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// `Human` when stderr is a terminal, `Off` when it is piped.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}': expected off, human, or json",
                other
            )),
        }
    }
}
