// ── Mutator pipeline ──
//
// Recomputes the effective configuration tree from the live base by
// running every registered mutator in order: HEAD first, TAIL last,
// insertion order within a position. Writes never recompute; they
// bump the invalidation generation and the next read recomputes once.

mod intent_overlay;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, trace};

pub use intent_overlay::IntentOverlay;

use crate::intent::IntentStore;
use crate::live::LiveState;
use crate::model::ConfigTree;
use crate::wps::WpsManager;

// ── Invalidation ────────────────────────────────────────────────────

/// Cloneable handle every input source uses to mark the pipeline
/// stale. The generation only ever grows.
#[derive(Debug, Clone)]
pub struct Invalidator {
    generation: Arc<watch::Sender<u64>>,
}

impl Invalidator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            generation: Arc::new(tx),
        }
    }

    pub fn invalidate(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Fires once per invalidation burst.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

impl Default for Invalidator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Mutators ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Position {
    Head,
    Tail,
}

/// Everything a mutator may read.
#[derive(Clone, Copy)]
pub struct EngineView<'a> {
    pub intent: &'a IntentStore,
    pub live: &'a LiveState,
    pub wps: &'a WpsManager,
}

/// Overlays the fields a policy owns onto the tree.
///
/// Implementations must be idempotent and total: the same view and
/// base always produce the same output. Any input a mutator reads
/// that is not in the view's intent or live state must invalidate
/// the pipeline itself when it changes.
pub trait Mutator: Send {
    fn name(&self) -> &str;

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree);
}

struct Registration {
    position: Position,
    mutator: Box<dyn Mutator>,
}

// ── Pipeline ────────────────────────────────────────────────────────

pub struct Pipeline {
    registrations: Vec<Registration>,
    order: Vec<String>,
    invalidator: Invalidator,
    cached: Option<(u64, Arc<ConfigTree>)>,
    recomputations: u64,
}

impl Pipeline {
    pub fn new(invalidator: Invalidator) -> Self {
        Self {
            registrations: Vec::new(),
            order: Vec::new(),
            invalidator,
            cached: None,
            recomputations: 0,
        }
    }

    /// Mutator names that run first within their position, in this
    /// order. Others keep insertion order after them.
    pub fn set_order(&mut self, order: Vec<String>) {
        self.order = order;
        self.invalidator.invalidate();
    }

    pub fn register(&mut self, position: Position, mutator: Box<dyn Mutator>) {
        debug!(mutator = mutator.name(), %position, "mutator registered");
        self.registrations.push(Registration { position, mutator });
        self.invalidator.invalidate();
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    pub fn generation(&self) -> u64 {
        self.invalidator.generation()
    }

    /// Names in effective execution order.
    pub fn mutator_names(&self) -> Vec<&str> {
        self.ordered().iter().map(|r| r.mutator.name()).collect()
    }

    /// How many times the tree was actually rebuilt.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    fn ordered(&self) -> Vec<&Registration> {
        let rank = |r: &Registration| {
            self.order
                .iter()
                .position(|n| n == r.mutator.name())
                .unwrap_or(usize::MAX)
        };
        let mut ordered: Vec<&Registration> = self.registrations.iter().collect();
        ordered.sort_by_key(|r| (r.position, rank(r)));
        ordered
    }

    /// Build the tree from scratch, bypassing the cache.
    pub fn compute(&self, view: &EngineView<'_>) -> ConfigTree {
        let mut tree = ConfigTree::from_live(view.live);
        for reg in self.ordered() {
            trace!(mutator = reg.mutator.name(), "mutating");
            reg.mutator.mutate(view, &mut tree);
        }
        tree
    }

    /// Effective tree, recomputed only if invalidated since the last
    /// read.
    pub fn config(&mut self, view: &EngineView<'_>) -> Arc<ConfigTree> {
        let generation = self.invalidator.generation();
        if let Some((cached_gen, tree)) = &self.cached {
            if *cached_gen == generation {
                return Arc::clone(tree);
            }
        }
        let tree = Arc::new(self.compute(view));
        self.recomputations += 1;
        debug!(generation, recomputations = self.recomputations, "config recomputed");
        self.cached = Some((generation, Arc::clone(&tree)));
        tree
    }

    pub fn is_stale(&self) -> bool {
        self.cached
            .as_ref()
            .is_none_or(|(g, _)| *g != self.invalidator.generation())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("mutators", &self.mutator_names())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
