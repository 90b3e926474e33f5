//! The scheduler task.
//!
//! A single spawned task owns the engine. Its loop waits on four sources at
//! once, in priority order: shutdown, commands, stimuli, and the next tick
//! deadline. Whatever wins runs to completion before the loop waits again,
//! so ticks, stimulus batches and commands never interleave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{SchedulerConfig, StimulusConfig};
use crate::context::ReconstructedContext;
use crate::engine::{Engine, EngineView, Highway, NodeRequest, TickReport};
use crate::error::{EngineError, EngineResult};
use crate::goal::ScheduledGoal;
use crate::persistence::{GraphSnapshot, SnapshotStore};
use crate::stimulus::{coalesce, CoalescedBatch, Debouncer, NodeDirectory, Stimulus};
use crate::topology::ExplicitLink;
use crate::types::{Embedding, EntityId, Link, LinkId, NodeId};

use super::cadence::Cadence;
use super::handle::EngineHandle;
use super::SchedulerState;

type Reply<T> = oneshot::Sender<EngineResult<T>>;

// ============================================================================
// COMMANDS
// ============================================================================

/// Requests that mutate or read engine state outside the published view.
pub(crate) enum Command {
    CreateNode {
        request: NodeRequest,
        reply: Reply<NodeId>,
    },
    CreateLink {
        request: ExplicitLink,
        reply: Reply<LinkId>,
    },
    RemoveLink {
        id: LinkId,
        reply: Reply<Link>,
    },
    SetExternalGoal {
        embedding: Embedding,
        confidence: f64,
        reply: Reply<()>,
    },
    ClearExternalGoal {
        reply: Reply<()>,
    },
    ScheduleGoal {
        goal: ScheduledGoal,
        reply: Reply<()>,
    },
    SetTaskComplexity {
        complexity: f64,
        reply: Reply<()>,
    },
    ReconstructContext {
        entry: NodeId,
        entity: EntityId,
        reply: Reply<ReconstructedContext>,
    },
    Highways {
        reply: Reply<Vec<Highway>>,
    },
    SaveSnapshot {
        reply: Reply<GraphSnapshot>,
    },
    /// `None` loads from the attached store.
    LoadSnapshot {
        snapshot: Option<Box<GraphSnapshot>>,
        reply: Reply<()>,
    },
}

// ============================================================================
// SHARED STATE
// ============================================================================

/// State read by handles without going through the task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) view: RwLock<EngineView>,
    pub(crate) directory: RwLock<NodeDirectory>,
    pub(crate) state: RwLock<SchedulerState>,
    /// Stimuli refused at the handle before reaching the queue.
    pub(crate) intake_rejections: AtomicU64,
    pub(crate) stimulus: StimulusConfig,
    pub(crate) queue_capacity: usize,
}

impl Shared {
    pub(crate) fn note_intake_rejection(&self) {
        self.intake_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn intake_rejections(&self) -> u64 {
        self.intake_rejections.load(Ordering::Relaxed)
    }
}

// ============================================================================
// SPAWN
// ============================================================================

/// Entry point for running an engine under the adaptive cadence.
pub struct Scheduler;

impl Scheduler {
    /// Move `engine` into a new scheduler task and return its handle.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` fails validation
    pub fn spawn(engine: Engine, config: SchedulerConfig) -> EngineResult<EngineHandle> {
        Self::launch(engine, config, None)
    }

    /// Like [`Scheduler::spawn`], with a snapshot store for autosave,
    /// explicit saves and loads, and a final save on shutdown.
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` fails validation
    pub fn spawn_with_store(
        engine: Engine,
        config: SchedulerConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> EngineResult<EngineHandle> {
        Self::launch(engine, config, Some(store))
    }

    fn launch(
        engine: Engine,
        config: SchedulerConfig,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> EngineResult<EngineHandle> {
        // FAIL FAST: reject a bad cadence before spawning anything
        config.validate().map_err(EngineError::InvalidConfig)?;

        let (stimulus_tx, stimulus_rx) = mpsc::channel(config.queue_capacity);
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);

        let shared = Arc::new(Shared {
            view: RwLock::new(engine.view()),
            directory: RwLock::new(engine.directory()),
            state: RwLock::new(SchedulerState::IdleWait),
            intake_rejections: AtomicU64::new(0),
            stimulus: engine.config().stimulus.clone(),
            queue_capacity: config.queue_capacity,
        });

        let now = Instant::now();
        let cadence = Cadence::new(&config);
        let first_tick = now + cadence.min_tick();
        info!(
            min_tick_ms = config.min_tick_ms,
            max_tick_ms = config.max_tick_ms,
            queue_capacity = config.queue_capacity,
            store = store.as_ref().map(|s| s.describe()),
            "Scheduler starting"
        );

        // Bounded by config validation, fits comfortably in i64.
        let window = chrono::Duration::milliseconds(config.debounce_window_ms as i64);
        let task = SchedulerTask {
            debouncer: Debouncer::new(window, config.queue_capacity),
            published_nodes: engine.graph().node_count(),
            engine,
            config,
            cadence,
            store,
            shared: Arc::clone(&shared),
            reports: report_tx,
            last_tick: now,
            last_stimulus: now,
            next_tick: first_tick,
        };
        let join = tokio::spawn(task.run(stimulus_rx, command_rx, shutdown_rx));

        Ok(EngineHandle::new(
            stimulus_tx,
            command_tx,
            shutdown_tx,
            report_rx,
            shared,
            join,
        ))
    }
}

// ============================================================================
// TASK
// ============================================================================

struct SchedulerTask {
    engine: Engine,
    config: SchedulerConfig,
    cadence: Cadence,
    store: Option<Arc<dyn SnapshotStore>>,
    shared: Arc<Shared>,
    reports: watch::Sender<Option<TickReport>>,
    last_tick: Instant,
    last_stimulus: Instant,
    next_tick: Instant,
    debouncer: Debouncer,
    published_nodes: usize,
}

impl SchedulerTask {
    async fn run(
        mut self,
        mut stimulus_rx: mpsc::Receiver<Stimulus>,
        mut command_rx: mpsc::Receiver<Command>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Engine {
        loop {
            self.set_state(SchedulerState::IdleWait);
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // A dropped sender means every handle is gone.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                Some(command) = command_rx.recv() => {
                    self.handle_command(command);
                }

                Some(first) = stimulus_rx.recv() => {
                    self.process_stimuli(first, &mut stimulus_rx);
                }

                _ = sleep_until(self.next_tick) => {
                    self.run_tick();
                }
            }
        }

        stimulus_rx.close();
        command_rx.close();
        let mut dropped = 0usize;
        while stimulus_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "Queued stimuli discarded at shutdown");
        }

        if self.store.is_some() {
            if let Err(e) = self.save_to_store() {
                error!(error = %e, "Final snapshot on shutdown failed");
            }
        }

        self.set_state(SchedulerState::Stopped);
        self.publish();
        info!(tick = self.engine.current_tick(), "Scheduler stopped");
        self.engine
    }

    fn set_state(&mut self, state: SchedulerState) {
        *self.shared.state.write() = state;
        self.engine.set_scheduler_state(state);
    }

    // ========== Ticks ==========

    fn run_tick(&mut self) {
        self.set_state(SchedulerState::ExecutingTick);
        let now = Instant::now();
        let dt = self
            .cadence
            .dt(now - self.last_tick, self.engine.config().diffusion.dt_cap);
        self.last_tick = now;

        match self.engine.tick(dt) {
            Ok(mut report) => {
                let (interval, regime) = self.cadence.next_interval(now - self.last_stimulus);
                self.next_tick = now + interval;
                report.scheduler_state = Some(SchedulerState::ExecutingTick);
                debug!(
                    tick = report.tick,
                    dt,
                    next_interval_ms = interval.as_millis() as u64,
                    ?regime,
                    "Tick executed"
                );
                self.maybe_autosave(report.tick);
                self.publish();
                self.reports.send_replace(Some(report));
            }
            Err(e) => {
                error!(dt, error = %e, "Tick failed");
                self.next_tick = now + self.cadence.max_tick();
            }
        }
    }

    fn maybe_autosave(&mut self, tick: u64) {
        let every = self.config.autosave_every_ticks;
        if every == 0 || self.store.is_none() || tick % every != 0 {
            return;
        }
        if let Err(e) = self.save_to_store() {
            warn!(tick, error = %e, "Autosave failed, continuing in memory");
        }
    }

    /// Capture and write a snapshot, folding the outcome into the durability
    /// status. The in-memory graph is unaffected by a failed write.
    fn save_to_store(&mut self) -> EngineResult<GraphSnapshot> {
        let store = match &self.store {
            Some(store) => Arc::clone(store),
            None => {
                return Err(EngineError::validation(
                    "store",
                    "no snapshot store is attached",
                ))
            }
        };
        let snapshot = self.engine.save_snapshot();
        let result = store.save(&snapshot);
        let mut status = self.engine.durability().clone();
        let was_degraded = status.is_degraded();
        status.record(snapshot.tick, &result);
        match &result {
            Ok(()) if was_degraded => {
                info!(store = %store.describe(), tick = snapshot.tick, "Persistence recovered")
            }
            Ok(()) => {}
            Err(e) => error!(
                store = %store.describe(),
                tick = snapshot.tick,
                error = %e,
                "Snapshot write failed, persistence degraded"
            ),
        }
        self.engine.set_durability(status);
        result?;
        Ok(snapshot)
    }

    // ========== Stimuli ==========

    fn process_stimuli(&mut self, first: Stimulus, rx: &mut mpsc::Receiver<Stimulus>) {
        self.set_state(SchedulerState::ProcessingStimulus);

        let mut batch = vec![first];
        while batch.len() < self.config.max_batch {
            match rx.try_recv() {
                Ok(stimulus) => batch.push(stimulus),
                Err(_) => break,
            }
        }
        let received = batch.len();

        let now = chrono::Utc::now();
        let (live, expired): (Vec<_>, Vec<_>) =
            batch.into_iter().partition(|s| !s.is_expired(now));
        for stimulus in &expired {
            debug!(stimulus = %stimulus.id, "Stimulus expired before application");
        }

        let window = chrono::Duration::milliseconds(self.config.debounce_window_ms as i64);
        let CoalescedBatch { stimuli, merged } = coalesce(live, window);

        // Repeats of stimuli applied by earlier batches.
        self.debouncer.expire(now);
        let before = stimuli.len();
        let stimuli: Vec<Stimulus> = stimuli
            .into_iter()
            .filter_map(|s| self.debouncer.admit(s))
            .collect();
        let debounced = before - stimuli.len();
        {
            let metrics = self.engine.metrics_mut();
            metrics.stimuli_expired += expired.len() as u64;
            metrics.stimuli_coalesced += (merged + debounced) as u64;
        }

        let mut applied = 0usize;
        for stimulus in stimuli {
            let id = stimulus.id;
            match self.engine.apply_stimulus(stimulus) {
                Ok(_) => applied += 1,
                Err(e) => {
                    self.engine.metrics_mut().stimuli_rejected += 1;
                    warn!(stimulus = %id, error = %e, "Stimulus rejected at application");
                }
            }
        }

        if applied > 0 {
            let now = Instant::now();
            self.last_stimulus = now;
            // Reactive: pull the next tick in, never push it out.
            self.next_tick = self.next_tick.min(now + self.cadence.min_tick());
            self.cadence.next_interval(Duration::ZERO);
        }
        debug!(
            received,
            applied,
            merged,
            debounced,
            expired = expired.len(),
            "Stimulus batch processed"
        );
        self.publish();
    }

    // ========== Commands ==========

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::CreateNode { request, reply } => {
                let result = self.engine.create_node(request);
                self.publish();
                let _ = reply.send(result);
            }
            Command::CreateLink { request, reply } => {
                let result = self.engine.create_link(request);
                self.publish();
                let _ = reply.send(result);
            }
            Command::RemoveLink { id, reply } => {
                let result = self.engine.remove_link(id);
                self.publish();
                let _ = reply.send(result);
            }
            Command::SetExternalGoal {
                embedding,
                confidence,
                reply,
            } => {
                let result = self.engine.set_external_goal(embedding, confidence);
                let _ = reply.send(result);
            }
            Command::ClearExternalGoal { reply } => {
                self.engine.clear_external_goal();
                let _ = reply.send(Ok(()));
            }
            Command::ScheduleGoal { goal, reply } => {
                let _ = reply.send(self.engine.schedule_goal(goal));
            }
            Command::SetTaskComplexity { complexity, reply } => {
                let _ = reply.send(self.engine.set_task_complexity(complexity));
            }
            Command::ReconstructContext {
                entry,
                entity,
                reply,
            } => {
                let _ = reply.send(self.engine.reconstruct_context(entry, entity));
            }
            Command::Highways { reply } => {
                let _ = reply.send(Ok(self.engine.highways()));
            }
            Command::SaveSnapshot { reply } => {
                let result = if self.store.is_some() {
                    self.save_to_store()
                } else {
                    Ok(self.engine.save_snapshot())
                };
                self.publish();
                let _ = reply.send(result);
            }
            Command::LoadSnapshot { snapshot, reply } => {
                let result = self.load(snapshot);
                if result.is_ok() {
                    // Node ids may now point elsewhere.
                    self.debouncer.clear();
                }
                self.refresh_directory();
                self.publish();
                let _ = reply.send(result);
            }
        }
    }

    fn load(&mut self, snapshot: Option<Box<GraphSnapshot>>) -> EngineResult<()> {
        let snapshot = match snapshot {
            Some(snapshot) => *snapshot,
            None => match &self.store {
                Some(store) => store.load()?,
                None => {
                    return Err(EngineError::validation(
                        "store",
                        "no snapshot given and no store attached",
                    ))
                }
            },
        };
        self.engine.load_snapshot(&snapshot)
    }

    // ========== Publication ==========

    fn publish(&mut self) {
        *self.shared.view.write() = self.engine.view();
        // Nodes are never removed, so only a load can change keys at a
        // constant count.
        if self.engine.graph().node_count() != self.published_nodes {
            self.refresh_directory();
        }
    }

    fn refresh_directory(&mut self) {
        *self.shared.directory.write() = self.engine.directory();
        self.published_nodes = self.engine.graph().node_count();
    }
}
