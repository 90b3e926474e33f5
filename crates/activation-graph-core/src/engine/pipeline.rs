//! The engine: owned state plus the fixed per-tick sub-order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::context::{reconstruct_with_affect, ReconstructedContext, ReconstructionParams};
use crate::criticality::{CriticalityController, CriticalitySnapshot};
use crate::dynamics::{
    apply_traversals, decay_links, decayed_weight, diffuse, energized_links, energized_out_links,
    ChannelRates, DiffusionParams,
};
use crate::entity::{DetectionOutcome, EntityDetector};
use crate::error::{EngineError, EngineResult};
use crate::goal::{Goal, GoalContext, GoalManager, GoalSource, ScheduledGoal};
use crate::graph::{Frontier, GraphStore, NewNode};
use crate::persistence::{DurabilityStatus, GraphSnapshot};
use crate::scheduler::SchedulerState;
use crate::stimulus::{
    best_matches, health_factor, resolve_entry, split_budget, NodeDirectory, Resolution, Stimulus,
    StimulusEntry,
};
use crate::topology::{ExplicitLink, TopologyEvolver};
use crate::types::{Embedding, EntityId, Link, LinkId, LinkType, NodeId, StimulusId};
use crate::workspace::{
    adaptive_capacity, admission_floor, score_candidates, ScoringContext, Workspace,
    WorkspaceSelector,
};

use super::metrics::EngineMetrics;
use super::report::{GoalReport, TickReport, WorkspaceReport};
use super::stability::StabilityMonitor;
use super::view::EngineView;

const STIMULUS_NODE_TYPE: &str = "stimulus";

fn default_node_type() -> String {
    "concept".to_string()
}

fn default_base_weight() -> f64 {
    1.0
}

/// A caller-requested node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub key: String,
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub embedding: Embedding,
    #[serde(default = "default_base_weight")]
    pub base_weight: f64,
}

impl NodeRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            node_type: default_node_type(),
            embedding: Vec::new(),
            base_weight: default_base_weight(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_base_weight(mut self, base_weight: f64) -> Self {
        self.base_weight = base_weight;
        self
    }
}

/// Result of applying one stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStimulus {
    pub id: StimulusId,
    pub node: NodeId,
    /// The entry embedding matched nothing and a node was created for it.
    pub created: bool,
    /// Nodes that received priming energy from a reconstruction.
    pub primed_nodes: usize,
    /// ρ-dependent factor the strength was scaled by.
    pub health_factor: f64,
    /// Energy injected per node; the entry node comes first.
    pub targets: Vec<(NodeId, f64)>,
}

impl AppliedStimulus {
    pub fn injected(&self) -> f64 {
        self.targets.iter().map(|(_, e)| e).sum()
    }
}

/// A link whose weight has grown past the highway threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highway {
    pub link: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub link_type: LinkType,
    /// Weight decayed up to the current clock.
    pub weight: f64,
}

/// Activation-graph engine.
///
/// Owns the working graph and every piece of cross-tick state: criticality
/// loops, coactivation windows, cluster tracking, goals and the workspace.
/// All mutation goes through `&mut self`, so a single owner (the scheduler
/// task, or a test) serializes ticks, stimuli and commands.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: GraphStore,
    frontier: Frontier,
    criticality: CriticalityController,
    topology: TopologyEvolver,
    detector: EntityDetector,
    goals: GoalManager,
    selector: WorkspaceSelector,
    stability: StabilityMonitor,
    metrics: EngineMetrics,
    tick: u64,
    clock: f64,
    task_complexity: f64,
    last_detection: DetectionOutcome,
    last_report: Option<TickReport>,
    durability: DurabilityStatus,
    scheduler_state: SchedulerState,
}

impl Engine {
    /// Build an engine over an empty graph.
    ///
    /// # Errors
    /// - `InvalidConfig` if any section fails validation
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let base = ChannelRates::new(
            config.diffusion.alpha_init,
            config.diffusion.decay_state_rate_init,
        );
        info!(
            alpha = base.alpha,
            state_decay = base.state_decay,
            target = config.criticality.target,
            "Engine created"
        );
        Ok(Self {
            store: GraphStore::new(config.learning.w_max),
            frontier: Frontier::default(),
            criticality: CriticalityController::new(config.criticality.clone(), base),
            topology: TopologyEvolver::new(config.topology.clone()),
            detector: EntityDetector::new(config.emergence.clone()),
            goals: GoalManager::new(config.goals.clone()),
            selector: WorkspaceSelector::new(config.workspace.clone()),
            stability: StabilityMonitor::new(),
            metrics: EngineMetrics::default(),
            tick: 0,
            clock: 0.0,
            task_complexity: 1.0,
            last_detection: DetectionOutcome::default(),
            last_report: None,
            durability: DurabilityStatus::default(),
            scheduler_state: SchedulerState::default(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The working graph, read-only.
    pub fn graph(&self) -> &GraphStore {
        &self.store
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    // ========== Graph Mutation ==========

    /// # Errors
    /// - `DuplicateNode` / `Validation` from the store
    pub fn create_node(&mut self, request: NodeRequest) -> EngineResult<NodeId> {
        let id = self.store.add_node(NewNode {
            key: request.key,
            node_type: request.node_type,
            embedding: request.embedding,
            base_weight: request.base_weight,
            created_tick: self.tick,
        })?;
        self.metrics.nodes_created += 1;
        debug!(node = %id, tick = self.tick, "Node created");
        Ok(id)
    }

    /// Create an explicit link. It starts graduated at the explicit weight.
    ///
    /// # Errors
    /// - `NodeNotFound`, `DuplicateLink` or `Validation` from the store
    pub fn create_link(&mut self, request: ExplicitLink) -> EngineResult<LinkId> {
        let id = self
            .topology
            .create_explicit(&mut self.store, request, self.tick, self.clock)?;
        self.metrics.links_created_explicit += 1;
        Ok(id)
    }

    /// # Errors
    /// - `LinkNotFound` for unknown or stale ids
    pub fn remove_link(&mut self, id: LinkId) -> EngineResult<Link> {
        let link = self.store.remove_link(id)?;
        self.metrics.links_removed += 1;
        debug!(link = %id, source = %link.source, target = %link.target, "Link removed");
        Ok(link)
    }

    /// Add energy to one channel of a node.
    ///
    /// # Errors
    /// - `NodeNotFound`, or `Validation` for negative / non-finite amounts
    pub fn inject_energy(&mut self, node: NodeId, entity: EntityId, amount: f64) -> EngineResult<()> {
        self.store.add_energy(node, entity, amount)
    }

    /// Apply a stimulus: resolve (or create) its entry node, inject its
    /// strength, feed the goal stack and optionally prime a reconstructed
    /// context around the entry.
    ///
    /// The injected budget is the strength times [`health_factor`] of the
    /// current ρ while the controller runs. Embedding entries spread it over
    /// up to `stimulus.max_matches` similar nodes.
    ///
    /// # Errors
    /// - `Validation` for a malformed stimulus
    /// - `InvalidReference` if the entry cannot be resolved
    pub fn apply_stimulus(&mut self, stimulus: Stimulus) -> EngineResult<AppliedStimulus> {
        stimulus.validate()?;
        if let Some(goal) = &stimulus.goal_override {
            self.store.check_embedding(goal)?;
        }

        let threshold = self.config.stimulus.resolve_threshold;
        let create_on_miss = self.config.stimulus.create_on_miss;
        let (node, created) = match resolve_entry(&self.store, &stimulus.entry, threshold, create_on_miss)? {
            Resolution::Existing(id) => (id, false),
            Resolution::Create(embedding) => {
                let id = self.create_node(
                    NodeRequest::new(format!("stimulus:{}", stimulus.id))
                        .with_type(STIMULUS_NODE_TYPE)
                        .with_embedding(embedding),
                )?;
                (id, true)
            }
        };

        let factor = self.injection_factor();
        let budget = stimulus.strength * factor;
        let targets = match &stimulus.entry {
            StimulusEntry::Embedding(e) if !created && self.config.stimulus.max_matches > 1 => {
                let k = self.config.stimulus.max_matches;
                let matches = best_matches(&self.store, e, threshold, k);
                if matches.is_empty() {
                    vec![(node, budget)]
                } else {
                    split_budget(budget, &matches)
                }
            }
            _ => vec![(node, budget)],
        };
        for (id, amount) in &targets {
            self.store.add_energy(*id, stimulus.entity, *amount)?;
        }
        let embedding = self.store.node(node)?.embedding.clone();
        self.goals.note_stimulus(embedding);
        if let Some(goal) = stimulus.goal_override {
            self.goals.set_external(goal, 1.0);
        }

        let mut primed_nodes = 0;
        if stimulus.reconstruct {
            let context =
                self.reconstruct_with_affect(node, stimulus.entity, stimulus.affect.as_deref())?;
            let scale = self.config.reconstruction.priming_scale;
            for (id, activation) in &context.activations {
                if *id == node {
                    continue;
                }
                let amount = activation * scale;
                if amount > 0.0 && amount.is_finite() {
                    self.store.add_energy(*id, stimulus.entity, amount)?;
                    primed_nodes += 1;
                }
            }
        }

        self.metrics.stimuli_applied += 1;
        debug!(
            stimulus = %stimulus.id,
            node = %node,
            entity = %stimulus.entity,
            strength = stimulus.strength,
            factor,
            targets = targets.len(),
            created,
            primed_nodes,
            "Stimulus applied"
        );
        Ok(AppliedStimulus {
            id: stimulus.id,
            node,
            created,
            primed_nodes,
            health_factor: factor,
            targets,
        })
    }

    fn injection_factor(&self) -> f64 {
        let config = &self.config.stimulus;
        if !(config.health_modulation && self.config.criticality.enabled) {
            return 1.0;
        }
        health_factor(
            self.criticality.global_rho(),
            self.criticality.target(),
            config.health_min,
            config.health_max,
        )
    }

    // ========== Tick ==========

    /// Advance the engine by one tick of length `dt` (in ticks, capped by
    /// `diffusion.dt_cap`).
    ///
    /// Sub-order: frontier, link decay, diffusion + state decay, Hebbian
    /// learning, criticality update, topology, cluster detection, goal
    /// update, workspace selection. Learning uses the workspace selected on
    /// the previous tick; so does the goal stack.
    ///
    /// # Errors
    /// - `Validation` if `dt` is not finite and positive
    pub fn tick(&mut self, dt: f64) -> EngineResult<TickReport> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(EngineError::validation(
                "dt",
                format!("tick length must be finite and > 0, got {}", dt),
            ));
        }
        let dt = dt.min(self.config.diffusion.dt_cap);
        self.tick += 1;
        self.clock += dt;
        let tick = self.tick;
        let clock = self.clock;
        let floor = self.config.diffusion.activity_floor;
        let weight_decay = self.config.diffusion.decay_weight_rate_init;

        // 1. Frontier before the pass.
        let active_before = Frontier::collect(&self.store, floor).active_count();

        // 2. Bring the links diffusion will read up to the clock.
        let touched = energized_out_links(&self.store);
        decay_links(&mut self.store, touched, clock, weight_decay);

        // 3. Diffusion and state decay on the pre-tick snapshot, then swap.
        let rates = self.criticality.rate_table();
        let rates_used = rates.global();
        let diffusion = diffuse(
            &self.store,
            &rates,
            &DiffusionParams {
                dt,
                energy_epsilon: self.config.diffusion.energy_epsilon,
                traversal_epsilon: self.config.diffusion.traversal_epsilon,
            },
        );
        for (id, energy) in diffusion.energies {
            if let Err(e) = self.store.replace_energy(id, energy) {
                warn!(tick, node = %id, error = %e, "Dropped energy write for unknown node");
            }
        }

        // 4. Hebbian learning against the previous workspace.
        let workspace_nodes = self.selector.current().node_ids();
        let learning = apply_traversals(
            &mut self.store,
            &diffusion.traversals,
            &workspace_nodes,
            &self.config.learning,
            tick,
        );

        let stability = self.stability.record(
            tick,
            diffusion.negative_clamps,
            diffusion.non_finite,
            learning.ceiling_clamps,
        );

        // 5. Criticality on the post-pass frontier. Nodes energized by this
        // pass may sit on links nobody has touched for a while.
        let touched = energized_links(&self.store);
        decay_links(&mut self.store, touched, clock, weight_decay);
        let frontier = Frontier::collect(&self.store, floor);
        for id in frontier.active() {
            self.store.mark_activated(*id, tick);
        }
        let branching_ratio =
            (active_before > 0).then(|| frontier.active_count() as f64 / active_before as f64);
        let criticality = self
            .criticality
            .update(&self.store, &frontier, tick, dt, branching_ratio);

        // 6. Structural learning.
        let topology = self
            .topology
            .step(&mut self.store, &frontier, tick, clock, weight_decay);

        // 7. Clusters.
        let detection = self.detector.detect(&self.store, &frontier, tick);

        // 8. Goal stack, fed by the previous workspace.
        let previous = self.selector.current();
        let context = GoalContext {
            workspace_empty: previous.is_empty(),
            emergent: previous.centroid().map(|c| (c, previous.mean_coherence())),
        };
        let deadlocks_before = self.goals.deadlock_avoided_count();
        let goal_update = self.goals.update(tick, context);
        let goal = GoalReport {
            source: goal_update.source,
            switched: goal_update.switched,
            on_default: goal_update.deadlock_avoided,
            deadlock_avoided_event: self.goals.deadlock_avoided_count() > deadlocks_before,
        };

        // 9. Workspace.
        let active_entities = detection
            .emerged_clusters()
            .map(|c| c.entity)
            .collect::<BTreeSet<_>>()
            .len();
        let capacity = adaptive_capacity(&self.config.workspace, self.task_complexity, active_entities);
        let floor_score = admission_floor(
            self.config.workspace.admission_min_score,
            criticality.global,
            self.criticality.target(),
        );
        let candidates = score_candidates(
            &detection.clusters,
            &ScoringContext {
                goal: &self.goals.current().embedding,
                global_rho: criticality.global,
                entity_rho: &criticality.per_entity,
                target: self.criticality.target(),
            },
        );
        let selection = self.selector.select(candidates, capacity, floor_score, tick);
        let workspace = self.selector.current();

        let energy_by_entity = self.store.energy_by_entity();
        let report = TickReport {
            tick,
            dt,
            clock,
            frontier_size: frontier.active_count(),
            total_energy: energy_by_entity.values().sum(),
            energy_by_entity,
            transferred: diffusion.transferred,
            rates_used,
            criticality,
            links_strengthened: learning.strengthened,
            topology,
            stability,
            emerged: detection.emerged.clone(),
            dissolved: detection.dissolved.iter().map(|c| c.id).collect(),
            emergence_threshold: detection.threshold,
            clusters_tracked: self.detector.tracked().len(),
            workspace: WorkspaceReport {
                clusters: workspace.cluster_ids(),
                node_count: workspace.node_ids().len(),
                total_cost: workspace.total_cost,
                capacity: workspace.capacity,
                admission_floor: floor_score,
                admitted: selection.admitted,
                evicted: selection.evicted,
                excluded_for_capacity: selection.excluded_for_capacity,
                below_admission: selection.below_admission,
                frozen: selection.frozen,
            },
            goal,
            scheduler_state: None,
        };

        self.metrics.record_tick(&report);
        self.frontier = frontier;
        self.last_detection = detection;
        debug!(
            tick,
            dt,
            frontier = report.frontier_size,
            energy = report.total_energy,
            rho = ?report.criticality.global,
            workspace = report.workspace.clusters.len(),
            goal = %report.goal.source,
            "Tick complete"
        );
        self.last_report = Some(report.clone());
        Ok(report)
    }

    // ========== Queries ==========

    pub fn workspace(&self) -> &Workspace {
        self.selector.current()
    }

    /// # Errors
    /// - `NodeNotFound` for unknown ids
    pub fn node_energy(&self, node: NodeId, entity: EntityId) -> EngineResult<f64> {
        self.store.energy(node, entity)
    }

    pub fn criticality(&self) -> CriticalitySnapshot {
        self.criticality.snapshot()
    }

    pub fn current_goal(&self) -> &Goal {
        self.goals.current()
    }

    /// Frontier computed at the end of the last tick.
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Cluster detection of the last tick.
    pub fn clusters(&self) -> &DetectionOutcome {
        &self.last_detection
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut EngineMetrics {
        &mut self.metrics
    }

    pub fn stability(&self) -> &StabilityMonitor {
        &self.stability
    }

    pub fn durability(&self) -> &DurabilityStatus {
        &self.durability
    }

    pub(crate) fn set_durability(&mut self, status: DurabilityStatus) {
        self.durability = status;
    }

    pub(crate) fn set_scheduler_state(&mut self, state: SchedulerState) {
        self.scheduler_state = state;
    }

    /// Links whose weight, decayed up to the clock, is at or above
    /// `learning.highway_threshold`, strongest first.
    pub fn highways(&self) -> Vec<Highway> {
        let threshold = self.config.learning.highway_threshold;
        let rate = self.config.diffusion.decay_weight_rate_init;
        let mut highways: Vec<Highway> = self
            .store
            .links()
            .map(|l| Highway {
                link: l.id,
                source: l.source,
                target: l.target,
                link_type: l.link_type,
                weight: decayed_weight(l, self.clock, rate),
            })
            .filter(|h| h.weight >= threshold)
            .collect();
        highways.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.link.cmp(&b.link)));
        highways
    }

    /// Node directory for validating stimuli outside the tick task.
    pub fn directory(&self) -> NodeDirectory {
        NodeDirectory::from_store(&self.store)
    }

    /// Consistent read-only copy of the observable state.
    pub fn view(&self) -> EngineView {
        let energies: BTreeMap<NodeId, BTreeMap<EntityId, f64>> = self
            .store
            .energized()
            .filter_map(|id| {
                self.store
                    .node(id)
                    .ok()
                    .map(|n| (id, n.energies().clone()))
            })
            .collect();
        EngineView {
            tick: self.tick,
            clock: self.clock,
            node_count: self.store.node_count(),
            link_count: self.store.link_count(),
            workspace: self.selector.current().clone(),
            criticality: self.criticality.snapshot(),
            goal: self.goals.current().clone(),
            energies,
            energy_by_entity: self.store.energy_by_entity(),
            metrics: self.metrics.clone(),
            durability: self.durability.clone(),
            scheduler_state: self.scheduler_state,
        }
    }

    // ========== Goals ==========

    /// # Errors
    /// - `Validation` for an empty, non-finite or wrongly sized embedding
    pub fn set_external_goal(&mut self, embedding: Embedding, confidence: f64) -> EngineResult<()> {
        self.check_goal_embedding(&embedding)?;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::validation(
                "confidence",
                format!("must be in [0, 1], got {}", confidence),
            ));
        }
        self.goals.set_external(embedding, confidence);
        info!(tick = self.tick, "External goal set");
        Ok(())
    }

    pub fn clear_external_goal(&mut self) {
        if self.goals.has_external() {
            info!(tick = self.tick, "External goal cleared");
        }
        self.goals.clear_external();
    }

    /// # Errors
    /// - `Validation` for a bad embedding or an empty tick window
    pub fn schedule_goal(&mut self, goal: ScheduledGoal) -> EngineResult<()> {
        self.check_goal_embedding(&goal.embedding)?;
        if let Some(until) = goal.until_tick {
            if until <= goal.from_tick {
                return Err(EngineError::validation(
                    "until_tick",
                    format!("must be after from_tick ({}), got {}", goal.from_tick, until),
                ));
            }
        }
        self.goals.schedule(goal);
        Ok(())
    }

    fn check_goal_embedding(&self, embedding: &[f32]) -> EngineResult<()> {
        if embedding.is_empty() {
            return Err(EngineError::validation("embedding", "goal embedding must not be empty"));
        }
        self.store.check_embedding(embedding)
    }

    /// Scale the workspace budget. 1.0 is neutral.
    ///
    /// # Errors
    /// - `Validation` for non-finite or non-positive values
    pub fn set_task_complexity(&mut self, complexity: f64) -> EngineResult<()> {
        if !complexity.is_finite() || complexity <= 0.0 {
            return Err(EngineError::validation(
                "task_complexity",
                format!("must be finite and > 0, got {}", complexity),
            ));
        }
        self.task_complexity = complexity;
        Ok(())
    }

    pub fn goal_source(&self) -> GoalSource {
        self.goals.current().source
    }

    // ========== Context ==========

    /// Reconstruct the activation pattern around `entry` from the current
    /// graph, with every link weight decayed up to the clock. Reads only.
    ///
    /// # Errors
    /// - `NodeNotFound` if `entry` does not exist
    pub fn reconstruct_context(&self, entry: NodeId, entity: EntityId) -> EngineResult<ReconstructedContext> {
        self.reconstruct_with_affect(entry, entity, None)
    }

    /// Reconstruction favoring links whose affect resonates with `affect`.
    ///
    /// # Errors
    /// - `NodeNotFound` for an unknown entry
    pub fn reconstruct_with_affect(
        &self,
        entry: NodeId,
        entity: EntityId,
        affect: Option<&[f32]>,
    ) -> EngineResult<ReconstructedContext> {
        reconstruct_with_affect(
            &self.store,
            entry,
            entity,
            ReconstructionParams::from(&self.config.reconstruction)
                .at_clock(self.clock, self.config.diffusion.decay_weight_rate_init),
            affect,
        )
    }

    // ========== Persistence ==========

    /// Bring every link up to the clock and copy the graph.
    pub fn save_snapshot(&mut self) -> GraphSnapshot {
        let ids = self.store.link_ids();
        decay_links(
            &mut self.store,
            ids,
            self.clock,
            self.config.diffusion.decay_weight_rate_init,
        );
        let snapshot = GraphSnapshot::capture(&self.store, self.tick, self.clock);
        self.metrics.snapshots_saved += 1;
        info!(
            tick = self.tick,
            snapshot = %snapshot.snapshot_id,
            nodes = snapshot.nodes.len(),
            links = snapshot.links.len(),
            "Snapshot captured"
        );
        snapshot
    }

    /// Replace the working graph with a snapshot.
    ///
    /// The snapshot is validated in full before anything is touched. On
    /// success the tick counter and clock resume from the snapshot and all
    /// derived state (criticality loops, coactivation windows, clusters,
    /// workspace) starts over. Goals are caller state and are kept.
    ///
    /// # Errors
    /// - `Persistence` if the snapshot is invalid; the live graph is unchanged
    pub fn load_snapshot(&mut self, snapshot: &GraphSnapshot) -> EngineResult<()> {
        let store = snapshot
            .restore_with(self.config.learning.w_max)
            .map_err(|e| {
                error!(snapshot = %snapshot.snapshot_id, error = %e, "Snapshot rejected");
                e
            })?;
        self.store = store;
        self.tick = snapshot.tick;
        self.clock = snapshot.clock;
        self.frontier = Frontier::collect(&self.store, self.config.diffusion.activity_floor);
        self.criticality.reset();
        self.topology.reset();
        self.detector.reset();
        self.selector.reset();
        self.last_detection = DetectionOutcome::default();
        self.last_report = None;
        self.metrics.snapshots_loaded += 1;
        info!(
            tick = self.tick,
            snapshot = %snapshot.snapshot_id,
            nodes = self.store.node_count(),
            links = self.store.link_count(),
            "Snapshot loaded"
        );
        Ok(())
    }
}
