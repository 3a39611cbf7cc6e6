//! Typed cache facade over the task namespaces.
//!
//! `TaskCache` owns the TTL policy, the metrics seam, and the
//! error-folding that makes the cache safe to lean on: the read path can
//! only ever produce "value" or "miss", so callers keep exactly one
//! fallback (the source of truth) regardless of why a read came back empty.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use taskhive_core::{ProjectId, Task, TaskId, TeamId, UserId};

use crate::key::{CacheKey, CacheNamespace};
use crate::metrics::CacheMetrics;
use crate::store::{CacheError, KvStore};

/// Reserved key for availability probes, outside every entity namespace so
/// probe traffic never shows up in entity stats.
const HEALTH_SENTINEL_KEY: &str = "taskhive:health:probe";

/// How long a health sentinel may linger if the probe dies mid-check.
const HEALTH_SENTINEL_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// CONFIGURATION
// ============================================================================

/// TTL policy for cached entries, fixed per kind rather than per call.
///
/// Single entities tolerate longer staleness than list views: a list shifts
/// whenever any member task changes, so it earns the shorter deadline.
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    /// TTL for single-task entries.
    pub task_ttl: Duration,
    /// TTL for user/team/project list entries.
    pub list_ttl: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            task_ttl: Duration::from_secs(900),
            list_ttl: Duration::from_secs(600),
        }
    }
}

impl CacheTtlConfig {
    /// Create a config with default TTLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the single-task TTL.
    pub fn with_task_ttl(mut self, ttl: Duration) -> Self {
        self.task_ttl = ttl;
        self
    }

    /// Set the list-view TTL.
    pub fn with_list_ttl(mut self, ttl: Duration) -> Self {
        self.list_ttl = ttl;
        self
    }

    fn ttl_for(&self, namespace: CacheNamespace) -> Duration {
        match namespace {
            CacheNamespace::Task => self.task_ttl,
            CacheNamespace::UserTasks
            | CacheNamespace::TeamTasks
            | CacheNamespace::ProjectTasks => self.list_ttl,
        }
    }
}

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// Per-key result of an [`TaskCache::evict_related`] batch.
///
/// `true` means the backend acknowledged the delete (whether or not a key
/// was present); `false` means that single eviction failed. There is no
/// atomicity across the four - a partial batch is reported, not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionOutcome {
    pub task: bool,
    pub owner_list: bool,
    pub team_list: bool,
    pub project_list: bool,
}

impl EvictionOutcome {
    /// Whether every eviction in the batch was acknowledged.
    pub fn fully_evicted(&self) -> bool {
        self.task && self.owner_list && self.team_list && self.project_list
    }
}

/// Key counts by namespace, for observability endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheKeyStats {
    pub tasks: usize,
    pub user_lists: usize,
    pub team_lists: usize,
    pub project_lists: usize,
    pub total: usize,
}

// ============================================================================
// TASK CACHE
// ============================================================================

/// Cache facade for task aggregates and their derived list views.
///
/// # Type Parameters
///
/// - `S`: the key-value backend
/// - `M`: the injected metrics recorder
///
/// # Failure Semantics
///
/// Reads fold every failure (absent key, expired entry, backend error,
/// undecodable payload) into `None` plus a miss metric. Writes surface a
/// typed [`CacheError`] that the surrounding service logs and drops - a
/// cache outage degrades throughput, never correctness.
pub struct TaskCache<S, M>
where
    S: KvStore + ?Sized,
    M: CacheMetrics + ?Sized,
{
    store: Arc<S>,
    metrics: Arc<M>,
    ttl: CacheTtlConfig,
}

impl<S, M> TaskCache<S, M>
where
    S: KvStore + ?Sized,
    M: CacheMetrics + ?Sized,
{
    /// Create a cache with the default TTL policy.
    pub fn new(store: Arc<S>, metrics: Arc<M>) -> Self {
        Self::with_config(store, metrics, CacheTtlConfig::default())
    }

    /// Create a cache with an explicit TTL policy.
    pub fn with_config(store: Arc<S>, metrics: Arc<M>, ttl: CacheTtlConfig) -> Self {
        Self { store, metrics, ttl }
    }

    /// The TTL policy in effect.
    pub fn ttl_config(&self) -> &CacheTtlConfig {
        &self.ttl
    }

    // ========================================================================
    // SINGLE-TASK OPERATIONS
    // ========================================================================

    /// Store a task under `task:{id}`.
    pub async fn cache_task(&self, id: TaskId, task: &Task) -> Result<(), CacheError> {
        self.write(CacheKey::new(CacheNamespace::Task, id.as_uuid()), task)
            .await
    }

    /// Fetch a task, or `None` on miss or any backend failure.
    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        self.read(CacheKey::new(CacheNamespace::Task, id.as_uuid()))
            .await
    }

    /// Evict a single task entry. A missing key is not an error.
    pub async fn evict_task(&self, id: TaskId) -> Result<bool, CacheError> {
        self.evict(CacheKey::new(CacheNamespace::Task, id.as_uuid()))
            .await
    }

    // ========================================================================
    // LIST-VIEW OPERATIONS
    // ========================================================================

    /// Store a user's task list under `user_tasks:{userId}`.
    pub async fn cache_user_tasks(
        &self,
        user_id: UserId,
        tasks: &[Task],
    ) -> Result<(), CacheError> {
        self.write(
            CacheKey::new(CacheNamespace::UserTasks, user_id.as_uuid()),
            &tasks,
        )
        .await
    }

    /// Fetch a user's task list, or `None` on miss or failure.
    pub async fn get_user_tasks(&self, user_id: UserId) -> Option<Vec<Task>> {
        self.read(CacheKey::new(CacheNamespace::UserTasks, user_id.as_uuid()))
            .await
    }

    /// Store a team's task list under `team_tasks:{teamId}`.
    pub async fn cache_team_tasks(
        &self,
        team_id: TeamId,
        tasks: &[Task],
    ) -> Result<(), CacheError> {
        self.write(
            CacheKey::new(CacheNamespace::TeamTasks, team_id.as_uuid()),
            &tasks,
        )
        .await
    }

    /// Fetch a team's task list, or `None` on miss or failure.
    pub async fn get_team_tasks(&self, team_id: TeamId) -> Option<Vec<Task>> {
        self.read(CacheKey::new(CacheNamespace::TeamTasks, team_id.as_uuid()))
            .await
    }

    /// Store a project's task list under `project_tasks:{projectId}`.
    pub async fn cache_project_tasks(
        &self,
        project_id: ProjectId,
        tasks: &[Task],
    ) -> Result<(), CacheError> {
        self.write(
            CacheKey::new(CacheNamespace::ProjectTasks, project_id.as_uuid()),
            &tasks,
        )
        .await
    }

    /// Fetch a project's task list, or `None` on miss or failure.
    pub async fn get_project_tasks(&self, project_id: ProjectId) -> Option<Vec<Task>> {
        self.read(CacheKey::new(
            CacheNamespace::ProjectTasks,
            project_id.as_uuid(),
        ))
        .await
    }

    // ========================================================================
    // BATCH INVALIDATION
    // ========================================================================

    /// Evict the four entries a task write can invalidate.
    ///
    /// A task write affects the task's own entry and three derived list
    /// views; all four are evicted so no stale list survives a status,
    /// owner, team, or project change beyond its TTL.
    ///
    /// Evictions run sequentially in fixed order (task, user, team,
    /// project). Each one is attempted even if a prior one failed, each is
    /// metered individually, and failures are reported per key rather than
    /// raised - the TTL bounds the damage a missed eviction can do.
    pub async fn evict_related(
        &self,
        task_id: TaskId,
        owner_id: UserId,
        team_id: TeamId,
        project_id: ProjectId,
    ) -> EvictionOutcome {
        EvictionOutcome {
            task: self
                .evict_logged(CacheKey::new(CacheNamespace::Task, task_id.as_uuid()))
                .await,
            owner_list: self
                .evict_logged(CacheKey::new(CacheNamespace::UserTasks, owner_id.as_uuid()))
                .await,
            team_list: self
                .evict_logged(CacheKey::new(CacheNamespace::TeamTasks, team_id.as_uuid()))
                .await,
            project_list: self
                .evict_logged(CacheKey::new(
                    CacheNamespace::ProjectTasks,
                    project_id.as_uuid(),
                ))
                .await,
        }
    }

    // ========================================================================
    // OBSERVABILITY
    // ========================================================================

    /// Probe the backend with a full write/read/delete round trip.
    ///
    /// Health reporting only - normal operations never gate on this.
    pub async fn is_available(&self) -> bool {
        let probe = Uuid::now_v7();
        let payload = probe.as_bytes().as_slice();

        if self
            .store
            .set(HEALTH_SENTINEL_KEY, payload, HEALTH_SENTINEL_TTL)
            .await
            .is_err()
        {
            return false;
        }

        let read_back = match self.store.get(HEALTH_SENTINEL_KEY).await {
            Ok(Some(value)) => value == payload,
            _ => false,
        };

        let deleted = self.store.delete(HEALTH_SENTINEL_KEY).await.is_ok();

        read_back && deleted
    }

    /// Count live keys per namespace by prefix enumeration.
    ///
    /// A failed enumeration counts as zero, not an error.
    pub async fn stats(&self) -> CacheKeyStats {
        let mut counts = [0usize; 4];
        for namespace in CacheNamespace::ALL {
            counts[namespace.index()] = self
                .store
                .keys_with_prefix(&namespace.prefix())
                .await
                .map(|keys| keys.len())
                .unwrap_or(0);
        }
        CacheKeyStats {
            tasks: counts[0],
            user_lists: counts[1],
            team_lists: counts[2],
            project_lists: counts[3],
            total: counts.iter().sum(),
        }
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    async fn write<T: Serialize>(&self, key: CacheKey, value: &T) -> Result<(), CacheError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store
            .set(&key.render(), &bytes, self.ttl.ttl_for(key.namespace()))
            .await?;
        self.metrics.record_write(key.namespace());
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        match self.store.get(&key.render()).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit(key.namespace());
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "undecodable cache entry, treating as miss");
                    self.metrics.record_miss(key.namespace());
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss(key.namespace());
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                self.metrics.record_miss(key.namespace());
                None
            }
        }
    }

    async fn evict(&self, key: CacheKey) -> Result<bool, CacheError> {
        let deleted = self.store.delete(&key.render()).await?;
        self.metrics.record_eviction(key.namespace());
        tracing::debug!(key = %key, deleted, "cache eviction");
        Ok(deleted)
    }

    async fn evict_logged(&self, key: CacheKey) -> bool {
        match self.evict(key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache eviction failed");
                false
            }
        }
    }
}

impl<S, M> Clone for TaskCache<S, M>
where
    S: KvStore + ?Sized,
    M: CacheMetrics + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
            ttl: self.ttl.clone(),
        }
    }
}
