//! Debouncing of stimulus floods.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::EntityId;

use super::event::{NodeRef, Stimulus, StimulusEntry};

/// A batch after merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoalescedBatch {
    /// Survivors in arrival order.
    pub stimuli: Vec<Stimulus>,
    /// How many stimuli were folded into a survivor.
    pub merged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Node(NodeRef),
    Embedding(Vec<u32>),
}

fn entry_key(entry: &StimulusEntry) -> EntryKey {
    match entry {
        StimulusEntry::Node(node) => EntryKey::Node(node.clone()),
        StimulusEntry::Embedding(e) => EntryKey::Embedding(e.iter().map(|v| v.to_bits()).collect()),
    }
}

/// Merge stimuli that hit the same entry in the same channel within `window`
/// of the first one of their group.
///
/// A merged stimulus keeps the first one's id and arrival time and takes
/// the strongest strength, the union of metadata (later values win), the
/// latest deadline, the latest goal override and affect cue, and requests
/// reconstruction if any member did.
pub fn coalesce(mut batch: Vec<Stimulus>, window: Duration) -> CoalescedBatch {
    batch.sort_by_key(|s| s.received_at);
    let mut out: Vec<Stimulus> = Vec::with_capacity(batch.len());
    let mut open: HashMap<(EntryKey, EntityId), usize> = HashMap::new();
    let mut merged = 0;

    for stimulus in batch {
        let key = (entry_key(&stimulus.entry), stimulus.entity);
        let target = open
            .get(&key)
            .copied()
            .filter(|i| stimulus.received_at - out[*i].received_at <= window);
        match target {
            Some(i) => {
                fold(&mut out[i], stimulus);
                merged += 1;
            }
            None => {
                open.insert(key, out.len());
                out.push(stimulus);
            }
        }
    }

    CoalescedBatch {
        stimuli: out,
        merged,
    }
}

/// The applied stimulus that opened a debounce window.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    opened_at: DateTime<Utc>,
    /// Strength injected so far within the window.
    strength: f64,
    reconstruct: bool,
}

/// Debouncing across batches.
///
/// [`coalesce`] only merges what is queued together. A flood arriving a few
/// milliseconds apart reaches the scheduler as many small batches, so the
/// debouncer remembers, per entry and channel, the stimulus that opened the
/// current window and how much it injected. Until the window closes a repeat
/// is absorbed, or applied as a top-up when it is stronger, so the window as
/// a whole injects its strongest strength once.
///
/// Repeats carrying a goal override, or asking for a reconstruction the
/// window has not run yet, always pass.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    capacity: usize,
    open: HashMap<(EntryKey, EntityId), Anchor>,
}

impl Debouncer {
    /// `capacity` bounds the number of open windows; past it new entries
    /// are not debounced.
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            open: HashMap::new(),
        }
    }

    pub fn open_windows(&self) -> usize {
        self.open.len()
    }

    /// Close every window opened more than `window` before `now`.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.open.retain(|_, a| now - a.opened_at <= window);
    }

    /// `None` if the stimulus is absorbed by an open window; otherwise the
    /// stimulus to apply, its strength reduced to the top-up when it repeats
    /// a weaker one.
    pub fn admit(&mut self, mut stimulus: Stimulus) -> Option<Stimulus> {
        let key = (entry_key(&stimulus.entry), stimulus.entity);
        let window = self.window;
        let received_at = stimulus.received_at;
        if let Some(anchor) = self
            .open
            .get_mut(&key)
            .filter(|a| received_at - a.opened_at <= window)
        {
            let new_reconstruction = stimulus.reconstruct && !anchor.reconstruct;
            anchor.reconstruct |= stimulus.reconstruct;
            if stimulus.goal_override.is_some() || new_reconstruction {
                anchor.strength = anchor.strength.max(stimulus.strength);
                return Some(stimulus);
            }
            if stimulus.strength <= anchor.strength {
                return None;
            }
            let top_up = stimulus.strength - anchor.strength;
            anchor.strength = stimulus.strength;
            stimulus.strength = top_up;
            return Some(stimulus);
        }

        if self.open.len() < self.capacity || self.open.contains_key(&key) {
            self.open.insert(
                key,
                Anchor {
                    opened_at: received_at,
                    strength: stimulus.strength,
                    reconstruct: stimulus.reconstruct,
                },
            );
        }
        Some(stimulus)
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

fn fold(into: &mut Stimulus, from: Stimulus) {
    into.strength = into.strength.max(from.strength);
    into.metadata.extend(from.metadata);
    into.deadline = match (into.deadline, from.deadline) {
        (Some(a), Some(b)) => Some(a.max(b)),
        // No deadline on either side means the merged stimulus never expires.
        _ => None,
    };
    if from.goal_override.is_some() {
        into.goal_override = from.goal_override;
    }
    if from.affect.is_some() {
        into.affect = from.affect;
    }
    into.reconstruct |= from.reconstruct;
}
