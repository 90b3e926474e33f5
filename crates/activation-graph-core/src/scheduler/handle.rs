//! Caller-side interface to a running scheduler.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::context::ReconstructedContext;
use crate::criticality::CriticalitySnapshot;
use crate::engine::{Engine, EngineView, Highway, NodeRequest, TickReport};
use crate::error::{EngineError, EngineResult};
use crate::goal::{Goal, ScheduledGoal};
use crate::persistence::{DurabilityStatus, GraphSnapshot};
use crate::stimulus::{Stimulus, StimulusEntry};
use crate::topology::ExplicitLink;
use crate::types::{Embedding, EntityId, Link, LinkId, NodeId, StimulusId};
use crate::workspace::Workspace;

use super::runtime::{Command, Shared};
use super::SchedulerState;

/// Cloneable handle to a scheduler task.
///
/// Reads (`get_*`, [`view`](Self::view)) return the state published after
/// the last completed tick, stimulus batch or command and never wait for the
/// task. Mutations are queued to the task and applied between ticks.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    stimulus_tx: mpsc::Sender<Stimulus>,
    command_tx: mpsc::Sender<Command>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    reports: watch::Receiver<Option<TickReport>>,
    shared: Arc<Shared>,
    join: Arc<Mutex<Option<JoinHandle<Engine>>>>,
}

impl EngineHandle {
    pub(crate) fn new(
        stimulus_tx: mpsc::Sender<Stimulus>,
        command_tx: mpsc::Sender<Command>,
        shutdown_tx: watch::Sender<bool>,
        reports: watch::Receiver<Option<TickReport>>,
        shared: Arc<Shared>,
        join: JoinHandle<Engine>,
    ) -> Self {
        Self {
            stimulus_tx,
            command_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            reports,
            shared,
            join: Arc::new(Mutex::new(Some(join))),
        }
    }

    // ========== Stimuli ==========

    /// Queue energy for `entry` in channel `entity`.
    ///
    /// Returns as soon as the stimulus is queued; it is applied before the
    /// next tick.
    ///
    /// # Errors
    /// - `Validation` for a non-positive or non-finite strength
    /// - `InvalidReference` if the entry names no existing or creatable node
    /// - `Busy` if the stimulus queue is full
    /// - `ShutDown` once the scheduler has stopped
    pub fn inject_stimulus(
        &self,
        entry: impl Into<StimulusEntry>,
        strength: f64,
        entity: EntityId,
        metadata: BTreeMap<String, String>,
        deadline: Option<DateTime<Utc>>,
    ) -> EngineResult<StimulusId> {
        let mut stimulus = Stimulus::new(entry, strength).with_entity(entity);
        stimulus.metadata = metadata;
        stimulus.deadline = deadline;
        self.submit(stimulus)
    }

    /// Queue a fully built stimulus, with the same checks as
    /// [`inject_stimulus`](Self::inject_stimulus).
    ///
    /// # Errors
    /// See [`inject_stimulus`](Self::inject_stimulus).
    pub fn submit(&self, stimulus: Stimulus) -> EngineResult<StimulusId> {
        if let Err(e) = self.check(&stimulus) {
            self.shared.note_intake_rejection();
            debug!(stimulus = %stimulus.id, error = %e, "Stimulus rejected at intake");
            return Err(e);
        }
        let id = stimulus.id;
        match self.stimulus_tx.try_send(stimulus) {
            Ok(()) => Ok(id),
            Err(TrySendError::Full(_)) => {
                self.shared.note_intake_rejection();
                warn!(stimulus = %id, capacity = self.shared.queue_capacity, "Stimulus queue full");
                Err(EngineError::Busy {
                    capacity: self.shared.queue_capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(EngineError::ShutDown),
        }
    }

    fn check(&self, stimulus: &Stimulus) -> EngineResult<()> {
        stimulus.validate()?;
        let config = &self.shared.stimulus;
        self.shared.directory.read().resolve(
            &stimulus.entry,
            config.resolve_threshold,
            config.create_on_miss,
        )?;
        Ok(())
    }

    // ========== Graph Mutation ==========

    /// # Errors
    /// - `DuplicateNode` or `Validation` from the engine
    pub async fn create_node(&self, request: NodeRequest) -> EngineResult<NodeId> {
        self.request(|reply| Command::CreateNode { request, reply }).await
    }

    /// # Errors
    /// - `NodeNotFound`, `DuplicateLink` or `Validation` from the engine
    pub async fn create_link(&self, request: ExplicitLink) -> EngineResult<LinkId> {
        self.request(|reply| Command::CreateLink { request, reply }).await
    }

    /// # Errors
    /// - `LinkNotFound` for a removed or stale id
    pub async fn remove_link(&self, id: LinkId) -> EngineResult<Link> {
        self.request(|reply| Command::RemoveLink { id, reply }).await
    }

    // ========== Reads ==========

    pub fn get_workspace(&self) -> Workspace {
        self.shared.view.read().workspace.clone()
    }

    /// # Errors
    /// - `NodeNotFound` for ids the graph never issued
    pub fn get_node_energy(&self, node: NodeId, entity: EntityId) -> EngineResult<f64> {
        self.shared.view.read().node_energy(node, entity)
    }

    pub fn get_criticality(&self) -> CriticalitySnapshot {
        self.shared.view.read().criticality.clone()
    }

    pub fn current_goal(&self) -> Goal {
        self.shared.view.read().goal.clone()
    }

    pub fn durability(&self) -> DurabilityStatus {
        self.shared.view.read().durability.clone()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        *self.shared.state.read()
    }

    /// Full published view, with intake rejections folded into the metrics.
    pub fn view(&self) -> EngineView {
        let mut view = self.shared.view.read().clone();
        view.metrics.stimuli_rejected += self.shared.intake_rejections();
        view
    }

    /// Receiver that sees every tick report published from now on.
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<TickReport>> {
        self.reports.clone()
    }

    /// # Errors
    /// - `NodeNotFound` for an unknown entry node
    pub async fn reconstruct_context(
        &self,
        entry: NodeId,
        entity: EntityId,
    ) -> EngineResult<ReconstructedContext> {
        self.request(|reply| Command::ReconstructContext {
            entry,
            entity,
            reply,
        })
        .await
    }

    /// # Errors
    /// - `ShutDown` once the scheduler has stopped
    pub async fn highways(&self) -> EngineResult<Vec<Highway>> {
        self.request(|reply| Command::Highways { reply }).await
    }

    // ========== Goals ==========

    /// # Errors
    /// - `Validation` for a bad embedding or confidence outside [0, 1]
    pub async fn set_external_goal(&self, embedding: Embedding, confidence: f64) -> EngineResult<()> {
        self.request(|reply| Command::SetExternalGoal {
            embedding,
            confidence,
            reply,
        })
        .await
    }

    /// # Errors
    /// - `ShutDown` once the scheduler has stopped
    pub async fn clear_external_goal(&self) -> EngineResult<()> {
        self.request(|reply| Command::ClearExternalGoal { reply }).await
    }

    /// # Errors
    /// - `Validation` for an empty window or bad embedding
    pub async fn schedule_goal(&self, goal: ScheduledGoal) -> EngineResult<()> {
        self.request(|reply| Command::ScheduleGoal { goal, reply }).await
    }

    /// # Errors
    /// - `Validation` unless `complexity` is finite and positive
    pub async fn set_task_complexity(&self, complexity: f64) -> EngineResult<()> {
        self.request(|reply| Command::SetTaskComplexity { complexity, reply })
            .await
    }

    // ========== Persistence ==========

    /// Capture a snapshot, writing it to the attached store if there is one.
    ///
    /// # Errors
    /// - `Persistence` if the store write fails; the running graph is
    ///   unaffected and durability is reported as degraded
    pub async fn save_snapshot(&self) -> EngineResult<GraphSnapshot> {
        self.request(|reply| Command::SaveSnapshot { reply }).await
    }

    /// Replace the running graph with `snapshot`.
    ///
    /// # Errors
    /// - `Persistence` if the snapshot is invalid; the running graph is kept
    pub async fn load_snapshot(&self, snapshot: GraphSnapshot) -> EngineResult<()> {
        self.request(|reply| Command::LoadSnapshot {
            snapshot: Some(Box::new(snapshot)),
            reply,
        })
        .await
    }

    /// Replace the running graph with the attached store's latest snapshot.
    ///
    /// # Errors
    /// - `Persistence` if nothing can be loaded; the running graph is kept
    /// - `Validation` if no store is attached
    pub async fn load_from_store(&self) -> EngineResult<()> {
        self.request(|reply| Command::LoadSnapshot {
            snapshot: None,
            reply,
        })
        .await
    }

    // ========== Lifecycle ==========

    /// Stop the scheduler after its in-flight work and hand back the engine.
    ///
    /// Queued stimuli are discarded. Every handle observes the shutdown;
    /// only the first caller gets the engine.
    ///
    /// # Errors
    /// - `ShutDown` if another caller already joined the task, or it panicked
    pub async fn shutdown(&self) -> EngineResult<Engine> {
        self.shutdown_tx.send_replace(true);
        let join = self.join.lock().take();
        match join {
            Some(join) => join.await.map_err(|e| {
                warn!(error = %e, "Scheduler task did not exit cleanly");
                EngineError::ShutDown
            }),
            None => Err(EngineError::ShutDown),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow() || self.stimulus_tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<EngineResult<T>>) -> Command,
    ) -> EngineResult<T> {
        if *self.shutdown_tx.borrow() {
            return Err(EngineError::ShutDown);
        }
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::ShutDown)?;
        response.await.map_err(|_| EngineError::ShutDown)?
    }
}
