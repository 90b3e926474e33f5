//! `run` command - drive the interrupt-driven scheduler.
//!
//! # Usage
//!
//! ```bash
//! # Two seed nodes, stimuli from stdin, stop after a minute
//! activation-graph run --node apple --node fruit --duration-secs 60 < stimuli.jsonl
//!
//! # Resume from (and autosave to) a snapshot file
//! activation-graph -c engine.toml run --snapshot state/graph.json --stimuli feed.jsonl
//! ```
//!
//! Each stimulus line is a JSON object:
//!
//! ```json
//! {"key": "apple", "strength": 1.5, "entity": 0, "at_ms": 250}
//! {"embedding": [0.6, 0.8], "strength": 1.0, "reconstruct": true}
//! ```
//!
//! Tick reports are written to stdout as JSON lines. Malformed or rejected
//! stimulus lines are logged and skipped.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use activation_graph_core::engine::{Engine, NodeRequest};
use activation_graph_core::error::{EngineError, PersistenceError};
use activation_graph_core::persistence::{JsonFileStore, SnapshotStore};
use activation_graph_core::scheduler::{EngineHandle, Scheduler};
use activation_graph_core::stimulus::{Stimulus, StimulusEntry};
use activation_graph_core::types::{Embedding, EntityId};
use anyhow::{bail, Context};
use clap::Args;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use super::{emit_report, load_config};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many seconds; runs until Ctrl-C when omitted
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Snapshot file, loaded at start when present and saved on exit
    #[arg(long, env = "ACTIVATION_GRAPH_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// JSON-lines stimulus source; `-` reads stdin
    #[arg(long, default_value = "-")]
    pub stimuli: PathBuf,

    /// Create a node with this key before starting (repeatable)
    #[arg(long = "node")]
    pub nodes: Vec<String>,
}

/// One line of the stimulus feed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StimulusLine {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    embedding: Option<Embedding>,
    strength: f64,
    #[serde(default)]
    entity: u32,
    /// Offset from the start of the run.
    #[serde(default)]
    at_ms: u64,
    #[serde(default)]
    goal: Option<Embedding>,
    #[serde(default)]
    reconstruct: bool,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl StimulusLine {
    fn into_stimulus(self) -> anyhow::Result<Stimulus> {
        let entry = match (self.key, self.embedding) {
            (Some(key), None) => StimulusEntry::from(key.as_str()),
            (None, Some(embedding)) => StimulusEntry::from(embedding),
            _ => bail!("exactly one of `key` or `embedding` is required"),
        };
        let mut stimulus = Stimulus::new(entry, self.strength)
            .with_entity(EntityId(self.entity))
            .with_reconstruction(self.reconstruct);
        stimulus.metadata = self.metadata;
        if let Some(goal) = self.goal {
            stimulus = stimulus.with_goal_override(goal);
        }
        Ok(stimulus)
    }
}

/// Execute the run command.
pub async fn run_command(config_path: Option<&Path>, args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = Engine::new(config.clone()).context("building engine")?;

    let store = args.snapshot.as_ref().map(JsonFileStore::new);
    if let Some(store) = &store {
        match store.load() {
            Ok(snapshot) => {
                engine
                    .load_snapshot(&snapshot)
                    .with_context(|| format!("restoring {}", store.describe()))?;
                info!(
                    path = %store.path().display(),
                    tick = engine.current_tick(),
                    nodes = engine.graph().node_count(),
                    "resumed from snapshot"
                );
            }
            Err(PersistenceError::Missing(_)) => {
                info!(path = %store.path().display(), "no snapshot yet, starting fresh");
            }
            Err(e) => {
                return Err(EngineError::from(e))
                    .with_context(|| format!("loading {}", store.describe()));
            }
        }
    }

    for key in &args.nodes {
        match engine.create_node(NodeRequest::new(key.as_str())) {
            Ok(id) => debug!(key = %key, node = %id, "seed node created"),
            Err(EngineError::DuplicateNode(_)) => debug!(key = %key, "seed node already present"),
            Err(e) => return Err(e).with_context(|| format!("creating seed node '{}'", key)),
        }
    }

    let handle = match store {
        Some(store) => Scheduler::spawn_with_store(engine, config.scheduler.clone(), Arc::new(store)),
        None => Scheduler::spawn(engine, config.scheduler.clone()),
    }
    .context("starting scheduler")?;

    let outcome = drive(&handle, &args).await;

    // Shut down even when the loop failed so the final save still runs.
    let engine = handle.shutdown().await.context("stopping scheduler")?;
    let metrics = engine.metrics();
    info!(
        ticks = engine.current_tick(),
        stimuli_applied = metrics.stimuli_applied,
        stimuli_rejected = metrics.stimuli_rejected,
        links_created = metrics.links_created(),
        links_pruned = metrics.links_pruned,
        "run finished"
    );
    if engine.durability().is_degraded() {
        warn!(durability = ?engine.durability(), "snapshot store degraded during run");
    }
    outcome
}

async fn drive(handle: &EngineHandle, args: &RunArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut lines = spawn_reader(&args.stimuli)?;
    let mut lines_open = true;
    let mut reports = handle.subscribe_reports();
    let mut out = std::io::stdout();

    let stop = async {
        match args.duration_secs {
            Some(secs) => sleep_until(start + Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("run duration elapsed");
                break;
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    warn!("scheduler stopped unexpectedly");
                    break;
                }
                let latest = reports.borrow_and_update().clone();
                if let Some(report) = latest {
                    emit_report(&mut out, &report)?;
                }
            }
            line = lines.recv(), if lines_open => match line {
                Some((number, text)) => submit_line(handle, start, number, &text),
                None => {
                    debug!("stimulus source exhausted");
                    lines_open = false;
                }
            },
        }
    }
    out.flush().context("flushing stdout")?;
    Ok(())
}

/// Read the stimulus source on a blocking thread, forwarding non-empty lines.
fn spawn_reader(source: &Path) -> anyhow::Result<mpsc::Receiver<(usize, String)>> {
    let reader: Box<dyn BufRead + Send> = if source == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(source)
            .with_context(|| format!("opening stimulus file {}", source.display()))?;
        Box::new(BufReader::new(file))
    };

    let (tx, rx) = mpsc::channel(256);
    tokio::task::spawn_blocking(move || {
        for (index, line) in reader.lines().enumerate() {
            match line {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => {
                    if tx.blocking_send((index + 1, text)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stimulus source read failed");
                    break;
                }
            }
        }
    });
    Ok(rx)
}

fn submit_line(handle: &EngineHandle, start: Instant, number: usize, text: &str) {
    let parsed = serde_json::from_str::<StimulusLine>(text)
        .map_err(anyhow::Error::from)
        .and_then(|line| {
            let at = start + Duration::from_millis(line.at_ms);
            line.into_stimulus().map(|stimulus| (at, stimulus))
        });
    let (at, stimulus) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(line = number, error = %e, "skipping malformed stimulus line");
            return;
        }
    };

    if at <= Instant::now() {
        submit(handle, number, stimulus);
    } else {
        let handle = handle.clone();
        tokio::spawn(async move {
            sleep(at - Instant::now()).await;
            submit(&handle, number, stimulus);
        });
    }
}

fn submit(handle: &EngineHandle, number: usize, stimulus: Stimulus) {
    match handle.submit(stimulus) {
        Ok(id) => debug!(line = number, stimulus = %id, "stimulus queued"),
        Err(e @ EngineError::Busy { .. }) => warn!(line = number, error = %e, "stimulus dropped"),
        Err(e) => warn!(line = number, error = %e, "stimulus rejected"),
    }
}
