//! Comparison orchestration.
//!
//! A [`Comparator`] fetches the selected entities concurrently, caches their
//! record trees for the lifetime of the selection and re-runs the pure
//! comparison pipeline whenever the mode changes.

mod result;

pub use result::{build_comparison, ComparisonResult, ComparisonSummary, EntitySummary};

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::calculate::aggregate;
use crate::fetch::{DataSource, FetchError};
use crate::models::{ComparisonMode, DerivedStats, Entity, EntityId, EntityKind};

/// Fewest entities a comparison accepts.
pub const MIN_ENTITIES: usize = 2;

/// Most entities a comparison accepts.
pub const MAX_ENTITIES: usize = 5;

/// Errors that can occur while running a comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Failed to fetch {id}: {source}")]
    Fetch {
        id: EntityId,
        #[source]
        source: FetchError,
    },

    #[error("Comparison superseded by a newer selection")]
    Superseded,

    #[error("No entities selected")]
    NoSelection,

    #[error("Fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CompareError {
    /// Entity whose fetch failed, if any.
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            CompareError::Fetch { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct ComparatorConfig {
    /// Per-entity fetch timeout
    pub fetch_timeout: Duration,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Fetched trees and their stats for one entity selection.
#[derive(Debug)]
struct Selection {
    generation: u64,
    kind: EntityKind,
    entities: Vec<Entity>,
    stats: Vec<DerivedStats>,
}

/// Fetches, caches and compares entity selections.
pub struct Comparator {
    source: Arc<dyn DataSource>,
    config: ComparatorConfig,
    generation: AtomicU64,
    selection: RwLock<Option<Arc<Selection>>>,
}

impl Comparator {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self::with_config(source, ComparatorConfig::default())
    }

    pub fn with_config(source: Arc<dyn DataSource>, config: ComparatorConfig) -> Self {
        Self {
            source,
            config,
            generation: AtomicU64::new(0),
            selection: RwLock::new(None),
        }
    }

    /// Generation of the most recently started selection.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Ids of the currently cached selection, in selection order.
    pub async fn selected(&self) -> Option<(EntityKind, Vec<EntityId>)> {
        let guard = self.selection.read().await;
        guard
            .as_ref()
            .map(|s| (s.kind, s.entities.iter().map(|e| e.id.clone()).collect()))
    }

    /// Replace the selection: fetch every entity and cache the trees.
    ///
    /// Returns the generation of the new selection. Fails with
    /// [`CompareError::Superseded`] if another `select` started meanwhile,
    /// in which case the newer selection is left untouched.
    pub async fn select(&self, kind: EntityKind, ids: &[EntityId]) -> Result<u64, CompareError> {
        self.load(kind, ids).await.map(|s| s.generation)
    }

    /// Compare the cached selection under `mode` without re-fetching.
    pub async fn compare(&self, mode: ComparisonMode) -> Result<ComparisonResult, CompareError> {
        let selection = self
            .selection
            .read()
            .await
            .clone()
            .ok_or(CompareError::NoSelection)?;

        debug!(
            "Comparing generation {} under mode {}",
            selection.generation, mode
        );
        Ok(result::assemble(&selection.entities, &selection.stats, mode))
    }

    /// Select and compare in one step.
    pub async fn run(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
        mode: ComparisonMode,
    ) -> Result<ComparisonResult, CompareError> {
        let selection = self.load(kind, ids).await?;
        Ok(result::assemble(&selection.entities, &selection.stats, mode))
    }

    /// Fetch and aggregate a single entity.
    pub async fn entity_stats(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<EntitySummary, CompareError> {
        let timeout = self.config.fetch_timeout;
        let entity = fetch_with_timeout(Arc::clone(&self.source), kind, id, timeout)
            .await
            .map_err(|source| CompareError::Fetch {
                id: id.clone(),
                source,
            })?;
        let stats = aggregate(&entity.seasons);
        Ok(EntitySummary::new(&entity, stats))
    }

    async fn load(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Arc<Selection>, CompareError> {
        validate_selection(ids)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Selecting {} {}s via {} (generation {})",
            ids.len(),
            kind,
            self.source.name(),
            generation
        );

        let fetched = self.fetch_all(kind, ids).await;

        // Anything that completes after a newer select started is stale,
        // success or failure alike.
        let mut guard = self.selection.write().await;
        if self.generation() != generation {
            debug!("Discarding stale selection {}", generation);
            return Err(CompareError::Superseded);
        }

        let entities = match fetched {
            Ok(entities) => entities,
            Err(e) => {
                *guard = None;
                return Err(e);
            }
        };

        let stats = entities.iter().map(|e| aggregate(&e.seasons)).collect();
        let selection = Arc::new(Selection {
            generation,
            kind,
            entities,
            stats,
        });
        *guard = Some(Arc::clone(&selection));
        Ok(selection)
    }

    /// Fetch all entities concurrently. The first failure aborts the rest.
    async fn fetch_all(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<Entity>, CompareError> {
        let mut tasks = JoinSet::new();
        for (index, id) in ids.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let timeout = self.config.fetch_timeout;
            tasks.spawn(async move {
                let result = fetch_with_timeout(source, kind, &id, timeout).await;
                (index, id, result)
            });
        }

        let mut slots: Vec<Option<Entity>> = vec![None; ids.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, id, result) = joined?;
            match result {
                Ok(entity) => slots[index] = Some(entity),
                Err(source) => {
                    warn!("Failed to fetch {} {}: {}", kind, id, source);
                    tasks.abort_all();
                    return Err(CompareError::Fetch { id, source });
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

async fn fetch_with_timeout(
    source: Arc<dyn DataSource>,
    kind: EntityKind,
    id: &EntityId,
    timeout: Duration,
) -> Result<Entity, FetchError> {
    match tokio::time::timeout(timeout, source.fetch_entity(kind, id)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

fn validate_selection(ids: &[EntityId]) -> Result<(), CompareError> {
    if !(MIN_ENTITIES..=MAX_ENTITIES).contains(&ids.len()) {
        return Err(CompareError::InvalidSelection(format!(
            "expected {} to {} entities, got {}",
            MIN_ENTITIES,
            MAX_ENTITIES,
            ids.len()
        )));
    }

    let mut seen = HashSet::new();
    for id in ids {
        if id.as_str().trim().is_empty() {
            return Err(CompareError::InvalidSelection("empty entity id".to_string()));
        }
        if !seen.insert(id) {
            return Err(CompareError::InvalidSelection(format!(
                "{} selected more than once",
                id
            )));
        }
    }
    Ok(())
}
