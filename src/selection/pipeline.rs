// Selection Pipeline - Batch -> tracker updates -> crossover filter -> ranked, capped ids
// Three explicit stages over a materialized candidate list

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, debug_span, info, warn};

use crate::core::config::{ConfigError, SelectionConfig};
use crate::core::types::{MaxCount, Observation};
use crate::store::TrackerStore;

/// A selected entity together with its ranking score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<K> {
    pub entity_id: K,
    pub scaled_delta: Decimal,
}

/// Pipeline statistics
#[derive(Debug, Clone)]
pub struct SelectionStats {
    pub batches_processed: u64,
    pub observations_processed: u64,
    pub failed_updates: u64,
    pub out_of_order_observations: u64,
    pub last_selection_size: usize,
    pub trackers: usize,
}

impl fmt::Display for SelectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Selection(batches={}, observations={}, failed={}, out_of_order={}, last_selected={}, trackers={})",
            self.batches_processed,
            self.observations_processed,
            self.failed_updates,
            self.out_of_order_observations,
            self.last_selection_size,
            self.trackers
        )
    }
}

/// Turns observation batches into a ranked, capped list of entity ids.
///
/// The pipeline only holds counters besides its config; all indicator state
/// lives in the shared [`TrackerStore`], so any number of threads may call
/// [`select`](Self::select) on one pipeline (or on pipelines sharing a store).
pub struct SelectionPipeline<K> {
    store: Arc<TrackerStore<K>>,
    config: SelectionConfig,

    // Statistics
    batches_processed: AtomicU64,
    observations_processed: AtomicU64,
    failed_updates: AtomicU64,
    out_of_order_observations: AtomicU64,
    last_selection_size: AtomicUsize,
}

impl<K> SelectionPipeline<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new(config: SelectionConfig) -> Result<Self, ConfigError> {
        Self::with_store(config, Arc::new(TrackerStore::new()))
    }

    /// Build a pipeline over an existing store, e.g. one shared with another
    /// pipeline.
    pub fn with_store(config: SelectionConfig, store: Arc<TrackerStore<K>>) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            fast_window = config.fast_window,
            slow_window = config.slow_window,
            threshold = %config.threshold,
            max_count = %config.max_count,
            "Creating selection pipeline"
        );

        Ok(Self {
            store,
            config,
            batches_processed: AtomicU64::new(0),
            observations_processed: AtomicU64::new(0),
            failed_updates: AtomicU64::new(0),
            out_of_order_observations: AtomicU64::new(0),
            last_selection_size: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TrackerStore<K>> {
        &self.store
    }

    /// Run one batch with the pipeline's config and return the selected ids,
    /// best first.
    pub fn select(&self, batch: &[Observation<K>]) -> Vec<K> {
        into_ids(self.rank_batch(batch, &self.config))
    }

    /// Run one batch with per-call parameters.
    ///
    /// Windows only apply to entities seen for the first time; existing
    /// trackers keep the windows they were created with.
    pub fn select_with(&self, batch: &[Observation<K>], config: &SelectionConfig) -> Result<Vec<K>, ConfigError> {
        config.validate()?;
        Ok(into_ids(self.rank_batch(batch, config)))
    }

    /// Same as [`select`](Self::select) but keeps each entity's score.
    pub fn select_scored(&self, batch: &[Observation<K>]) -> Vec<Candidate<K>> {
        self.rank_batch(batch, &self.config)
    }

    fn rank_batch(&self, batch: &[Observation<K>], config: &SelectionConfig) -> Vec<Candidate<K>> {
        // Stage 1: every observation updates its tracker, no skipping
        let scores: Vec<Option<Decimal>> = batch.iter().map(|obs| self.apply(obs, config)).collect();

        // An entity seen more than once is judged by its last observation
        let mut last_seen: HashMap<&K, usize> = HashMap::with_capacity(batch.len());
        for (idx, obs) in batch.iter().enumerate() {
            last_seen.insert(&obs.entity_id, idx);
        }

        // Stage 2: filter
        let mut candidates: Vec<Candidate<K>> = batch
            .iter()
            .zip(scores)
            .enumerate()
            .filter(|(idx, (obs, _))| last_seen.get(&obs.entity_id) == Some(idx))
            .filter_map(|(_, (obs, score))| {
                score.map(|scaled_delta| Candidate {
                    entity_id: obs.entity_id.clone(),
                    scaled_delta,
                })
            })
            .collect();
        let candidate_count = candidates.len();

        // Stage 3: rank and cap
        rank_and_truncate(&mut candidates, config.max_count);

        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.observations_processed.fetch_add(batch.len() as u64, Ordering::Relaxed);
        self.last_selection_size.store(candidates.len(), Ordering::Relaxed);

        debug!(
            observations = batch.len(),
            candidates = candidate_count,
            selected = candidates.len(),
            "Batch selection complete"
        );
        candidates
    }

    /// Update one tracker and return its score if it is a candidate afterwards.
    /// Failures are confined to this observation.
    fn apply(&self, obs: &Observation<K>, config: &SelectionConfig) -> Option<Decimal> {
        let _span = debug_span!("observation", entity = ?obs.entity_id).entered();

        let tracker = match self
            .store
            .get_or_create(&obs.entity_id, config.fast_window, config.slow_window)
        {
            Ok(tracker) => tracker,
            Err(e) => {
                self.failed_updates.fetch_add(1, Ordering::Relaxed);
                warn!(entity = ?obs.entity_id, error = %e, "Tracker creation failed");
                return None;
            }
        };

        // Score is read under the same lock as the update
        let mut guard = tracker.lock();
        let out_of_order_before = guard.out_of_order_count();
        let result = guard.update(obs.timestamp, obs.value);
        if guard.out_of_order_count() > out_of_order_before {
            self.out_of_order_observations.fetch_add(1, Ordering::Relaxed);
        }

        match result {
            Ok(true) => guard.candidate_score(config.threshold),
            Ok(false) => None,
            Err(e) => {
                self.failed_updates.fetch_add(1, Ordering::Relaxed);
                warn!(
                    entity = ?obs.entity_id,
                    timestamp = obs.timestamp,
                    error = %e,
                    "Observation rejected, entity excluded from this batch"
                );
                None
            }
        }
    }

    pub fn get_stats(&self) -> SelectionStats {
        SelectionStats {
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            observations_processed: self.observations_processed.load(Ordering::Relaxed),
            failed_updates: self.failed_updates.load(Ordering::Relaxed),
            out_of_order_observations: self.out_of_order_observations.load(Ordering::Relaxed),
            last_selection_size: self.last_selection_size.load(Ordering::Relaxed),
            trackers: self.store.len(),
        }
    }
}

impl<K> SelectionPipeline<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Ord,
{
    /// Rank every tracked entity by its current state without feeding any
    /// observation. Ties are broken by entity id.
    pub fn current_ranking(&self, max_count: MaxCount) -> Vec<K> {
        let mut candidates: Vec<Candidate<K>> = self
            .store
            .snapshot()
            .into_iter()
            .filter_map(|(entity_id, tracker)| {
                let score = tracker.lock().candidate_score(self.config.threshold);
                score.map(|scaled_delta| Candidate { entity_id, scaled_delta })
            })
            .collect();

        candidates.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        rank_and_truncate(&mut candidates, max_count);
        into_ids(candidates)
    }
}

/// Sort by score, best first, then cap. The sort is stable, so equal scores
/// keep their incoming order.
fn rank_and_truncate<K>(candidates: &mut Vec<Candidate<K>>, max_count: MaxCount) {
    candidates.sort_by(|a, b| b.scaled_delta.cmp(&a.scaled_delta));
    max_count.apply(candidates);
}

fn into_ids<K>(candidates: Vec<Candidate<K>>) -> Vec<K> {
    candidates.into_iter().map(|c| c.entity_id).collect()
}
