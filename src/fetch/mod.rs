//! Entity data sources.
//!
//! The comparison engine never talks to the network directly; it asks a
//! [`DataSource`] for an entity's full record tree. Implementations:
//! - [`HttpDataSource`]: results API over HTTP with an on-disk response cache
//! - [`DirDataSource`]: JSON files laid out as `{dir}/{drivers|teams}/{id}.json`
//! - [`InMemoryDataSource`]: preloaded entities, for tests and fixtures

mod http;

pub use http::{HttpDataSource, HttpSourceConfig};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::{Entity, EntityId, EntityKind};

/// Errors that can occur while fetching an entity.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NotFound,
    Unavailable,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::NotFound { .. } => FetchErrorKind::NotFound,
            _ => FetchErrorKind::Unavailable,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FetchErrorKind::NotFound
    }
}

/// Source of entity record trees.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Fetch one entity with its full record tree.
    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError>;
}

/// The request is authoritative for identity; sources may omit or vary it.
fn stamp_identity(mut entity: Entity, kind: EntityKind, id: &EntityId) -> Entity {
    entity.id = id.clone();
    entity.kind = kind;
    entity
}

/// Reads entities from JSON files on disk.
pub struct DirDataSource {
    root: PathBuf,
}

impl DirDataSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Path of an entity file, or `None` if the id cannot name a file.
    fn entity_path(&self, kind: EntityKind, id: &EntityId) -> Option<PathBuf> {
        let id = id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return None;
        }
        Some(
            self.root
                .join(kind.collection())
                .join(format!("{}.json", id)),
        )
    }
}

#[async_trait]
impl DataSource for DirDataSource {
    fn name(&self) -> &'static str {
        "dir"
    }

    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError> {
        let not_found = || FetchError::NotFound {
            kind,
            id: id.to_string(),
        };
        let path = self.entity_path(kind, id).ok_or_else(not_found)?;

        debug!("Reading {} from {}", id, path.display());
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let entity: Entity = serde_json::from_str(&content)?;
        Ok(stamp_identity(entity, kind, id))
    }
}

/// Preloaded entities with optional per-entity latency and failures.
#[derive(Default)]
pub struct InMemoryDataSource {
    entities: HashMap<(EntityKind, EntityId), Entity>,
    delays: HashMap<EntityId, Duration>,
    failing: HashSet<EntityId>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add an entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities
            .insert((entity.kind, entity.id.clone()), entity);
        self
    }

    /// Builder method to delay responses for one entity.
    pub fn with_delay(mut self, id: impl Into<EntityId>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Builder method to make one entity always unavailable.
    pub fn with_failure(mut self, id: impl Into<EntityId>) -> Self {
        self.failing.insert(id.into());
        self
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError> {
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(id) {
            return Err(FetchError::Unavailable(format!("{} is unavailable", id)));
        }
        self.entities
            .get(&(kind, id.clone()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                kind,
                id: id.to_string(),
            })
    }
}
