//! HTTP data source with local response caching.
//!
//! Fetches entity JSON from `{base_url}/{drivers|teams}/{id}` and caches the
//! body on disk so repeated comparisons of the same entities stay offline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::{stamp_identity, DataSource, FetchError};
use crate::models::{Entity, EntityId, EntityKind};

/// Metadata stored alongside cached content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_length: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheMetadata {
    /// Whether the cached body is still usable at `now`.
    ///
    /// Entries without an expiry fall back to `fetched_at + ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let expires_at = self.expires_at.unwrap_or_else(|| {
            self.fetched_at + chrono::Duration::seconds(ttl.as_secs() as i64)
        });
        now < expires_at
    }
}

/// Configuration for the HTTP data source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL of the results API
    pub base_url: Url,

    /// Directory to cache responses in (`None` disables caching)
    pub cache_dir: Option<PathBuf>,

    /// How long cached content is considered fresh
    pub cache_ttl: Duration,

    /// Maximum response size to accept (default 20MB)
    pub max_content_size: usize,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl HttpSourceConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            cache_dir: None,
            cache_ttl: Duration::from_secs(3600), // 1 hour
            max_content_size: 20 * 1024 * 1024,   // 20MB
            timeout: Duration::from_secs(15),
            user_agent: format!("race-analytics/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Results API client with local caching.
pub struct HttpDataSource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpDataSource {
    /// Create a new data source with the given configuration.
    pub fn new(config: HttpSourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("race-analytics")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// URL of an entity resource. The id is percent-encoded as one path segment.
    pub fn entity_url(&self, kind: EntityKind, id: &EntityId) -> Result<Url, FetchError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .push(kind.collection())
            .push(id.as_str());
        Ok(url)
    }

    /// Fetch a URL body, using the cache if available and fresh.
    async fn fetch_body(
        &self,
        url: &Url,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<String, FetchError> {
        if let Some(cache_dir) = &self.config.cache_dir {
            let cache_path = Self::cache_path_for_url(cache_dir, url);
            let meta_path = Self::meta_path_for_url(cache_dir, url);

            if let Some(body) = self.check_cache(url, &cache_path, &meta_path).await? {
                return Ok(body);
            }

            let body = self.fetch_network(url, kind, id).await?;
            if let Err(e) = self.write_cache(url, &body, &cache_path, &meta_path).await {
                warn!("Failed to cache {}: {}", url, e);
            }
            return Ok(body);
        }

        self.fetch_network(url, kind, id).await
    }

    /// Check if content is cached and fresh.
    async fn check_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<Option<String>, FetchError> {
        if !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        if !meta.is_fresh(Utc::now(), self.config.cache_ttl) {
            debug!("Cache expired for {}", url);
            return Ok(None);
        }

        let body = fs::read_to_string(cache_path).await?;
        if body.len() != meta.content_length {
            warn!("Cached body for {} does not match its metadata, refetching", url);
            return Ok(None);
        }

        info!("Serving {} from cache", url);
        Ok(Some(body))
    }

    /// Fetch from the network.
    async fn fetch_network(
        &self,
        url: &Url,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<String, FetchError> {
        info!("Fetching {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.config.timeout)
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content = response.bytes().await?;
        if content.len() > self.config.max_content_size {
            return Err(FetchError::Unavailable(format!(
                "response too large: {} bytes (max {})",
                content.len(),
                self.config.max_content_size
            )));
        }

        String::from_utf8(content.to_vec())
            .map_err(|e| FetchError::Unavailable(format!("response is not UTF-8: {}", e)))
    }

    async fn write_cache(
        &self,
        url: &Url,
        body: &str,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<(), FetchError> {
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(cache_path).await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;

        let fetched_at = Utc::now();
        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_length: body.len(),
            expires_at: Some(
                fetched_at + chrono::Duration::seconds(self.config.cache_ttl.as_secs() as i64),
            ),
        };

        let meta_json = serde_json::to_string_pretty(&meta)?;
        fs::write(meta_path, meta_json).await?;
        Ok(())
    }

    /// Generate a cache path for a URL.
    fn cache_path_for_url(cache_dir: &Path, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or("unknown");
        cache_dir
            .join(host)
            .join(format!("{}.json", Self::url_hash(url)))
    }

    /// Generate a metadata path for a URL.
    fn meta_path_for_url(cache_dir: &Path, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or("unknown");
        cache_dir
            .join(host)
            .join(format!("{}.meta.json", Self::url_hash(url)))
    }

    /// Hash a URL to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError> {
        let url = self.entity_url(kind, id)?;
        let body = self.fetch_body(&url, kind, id).await?;
        let entity: Entity = serde_json::from_str(&body)?;
        Ok(stamp_identity(entity, kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(base: &str, cache_dir: Option<PathBuf>) -> HttpDataSource {
        let mut config = HttpSourceConfig::new(Url::parse(base).unwrap());
        config.cache_dir = cache_dir;
        HttpDataSource::new(config).unwrap()
    }

    #[test]
    fn test_entity_url() {
        let source = source("https://results.example.com/api", None);
        let url = source
            .entity_url(EntityKind::Driver, &"max-verstappen".into())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://results.example.com/api/drivers/max-verstappen"
        );
    }

    #[test]
    fn test_entity_url_trailing_slash_and_encoding() {
        let source = source("https://results.example.com/api/", None);
        let url = source
            .entity_url(EntityKind::Team, &"red bull/racing".into())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://results.example.com/api/teams/red%20bull%2Fracing"
        );
    }

    #[test]
    fn test_url_hash() {
        let url1 = Url::parse("https://example.com/drivers/a").unwrap();
        let url2 = Url::parse("https://example.com/drivers/b").unwrap();

        let hash1 = HttpDataSource::url_hash(&url1);
        let hash2 = HttpDataSource::url_hash(&url2);

        assert_ne!(hash1, hash2);
        assert_eq!(hash1.len(), 16);
    }

    #[test]
    fn test_cache_path_generation() {
        let temp_dir = TempDir::new().unwrap();
        let url = Url::parse("https://results.example.com/drivers/a").unwrap();
        let cache_path = HttpDataSource::cache_path_for_url(temp_dir.path(), &url);

        assert!(cache_path.starts_with(temp_dir.path()));
        assert!(cache_path.to_string_lossy().contains("results.example.com"));
        assert!(cache_path.to_string_lossy().ends_with(".json"));
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served_without_network() {
        let temp_dir = TempDir::new().unwrap();
        // Unroutable host: any network attempt would fail.
        let source = source("http://127.0.0.1:9/api", Some(temp_dir.path().to_path_buf()));
        let id: EntityId = "norris".into();
        let url = source.entity_url(EntityKind::Driver, &id).unwrap();

        let cache_path = HttpDataSource::cache_path_for_url(temp_dir.path(), &url);
        let meta_path = HttpDataSource::meta_path_for_url(temp_dir.path(), &url);
        source
            .write_cache(
                &url,
                r#"{"name": "Lando Norris", "seasons": {}}"#,
                &cache_path,
                &meta_path,
            )
            .await
            .unwrap();

        let entity = source
            .fetch_entity(EntityKind::Driver, &id)
            .await
            .unwrap();
        assert_eq!(entity.id, id);
        assert_eq!(entity.name, "Lando Norris");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let source = source("http://127.0.0.1:9/api", None);
        let err = source
            .fetch_entity(EntityKind::Driver, &"norris".into())
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_cache_metadata_serialization() {
        let meta = CacheMetadata {
            url: "https://example.com".to_string(),
            fetched_at: Utc::now(),
            content_length: 1234,
            expires_at: None,
        };

        let json = serde_json::to_string(&meta).unwrap();
        let parsed: CacheMetadata = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.url, meta.url);
        assert_eq!(parsed.content_length, meta.content_length);
    }

    #[test]
    fn test_cache_freshness() {
        let now = Utc::now();
        let ttl = Duration::from_secs(60);
        let mut meta = CacheMetadata {
            url: "https://example.com".to_string(),
            fetched_at: now - chrono::Duration::seconds(30),
            content_length: 0,
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        assert!(!meta.is_fresh(now, ttl));

        meta.expires_at = Some(now + chrono::Duration::seconds(1));
        assert!(meta.is_fresh(now, ttl));

        // Without an expiry the TTL applies from fetched_at.
        meta.expires_at = None;
        assert!(meta.is_fresh(now, ttl));
        assert!(!meta.is_fresh(now, Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_expired_or_mismatched_cache_is_not_served() {
        let temp_dir = TempDir::new().unwrap();
        let source = source("http://127.0.0.1:9/api", Some(temp_dir.path().to_path_buf()));
        let id: EntityId = "piastri".into();
        let url = source.entity_url(EntityKind::Driver, &id).unwrap();
        let cache_path = HttpDataSource::cache_path_for_url(temp_dir.path(), &url);
        let meta_path = HttpDataSource::meta_path_for_url(temp_dir.path(), &url);
        let body = r#"{"name": "Oscar Piastri"}"#;

        source
            .write_cache(&url, body, &cache_path, &meta_path)
            .await
            .unwrap();
        // Valid JSON, but not what the metadata recorded.
        std::fs::write(&cache_path, r#"{"name": "X"}"#).unwrap();
        assert!(source.fetch_entity(EntityKind::Driver, &id).await.is_err());

        source
            .write_cache(&url, body, &cache_path, &meta_path)
            .await
            .unwrap();
        let mut meta: CacheMetadata =
            serde_json::from_str(&std::fs::read_to_string(&meta_path).unwrap()).unwrap();
        meta.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        std::fs::write(&meta_path, serde_json::to_string(&meta).unwrap()).unwrap();
        assert!(source.fetch_entity(EntityKind::Driver, &id).await.is_err());
    }
}
