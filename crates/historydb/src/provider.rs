//! Provider Facade
//!
//! The [`Provider`] is the entry point front ends hold for the lifetime of
//! the process. It owns the shared pieces (substrate, session parameters,
//! chunk-count cache, engine configuration) and builds a fresh [`Session`]
//! for every call.
//!
//! ## Usage
//!
//! ```ignore
//! let provider = Provider::connect(&ProviderConfig::default())?;
//! provider.set_session_parameters(vec![1], 1);
//!
//! let outcome = provider.add_user_activity("alice", now, "login", None).await;
//! assert!(outcome.is_complete());
//!
//! let users = provider.get_active_users(now).await?;
//! ```

use crate::activity::ActivityOutcome;
use crate::config::{EngineConfig, ProviderConfig};
use crate::error::Result;
use crate::repartition::RepartitionReport;
use crate::session::{Session, SessionParameters};
use bytes::Bytes;
use futures::stream::BoxStream;
use historydb_core::{ActivityKey, LogEntry};
use historydb_observability::metrics;
use historydb_storage::{CacheConfig, ChunkCountCache, GroupId, Substrate};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub struct Provider {
    substrate: Arc<dyn Substrate>,
    params: RwLock<SessionParameters>,
    cache: Arc<ChunkCountCache>,
    config: Arc<EngineConfig>,
}

impl Provider {
    /// Provider over an existing substrate. Sessions have no groups until
    /// `set_session_parameters` is called.
    pub fn new(substrate: Arc<dyn Substrate>, config: EngineConfig) -> Self {
        Self {
            substrate,
            params: RwLock::new(SessionParameters::new(Vec::new(), 0)),
            cache: Arc::new(ChunkCountCache::default()),
            config: Arc::new(config),
        }
    }

    /// Replace the chunk-count cache with one built from `config`.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Arc::new(ChunkCountCache::new(config));
        self
    }

    /// Build the replicated substrate from `config` and apply its session
    /// parameters.
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        let substrate = config.substrate.build()?;
        tracing::info!(
            replicas = ?substrate.groups(),
            default_chunk_count = config.engine.default_chunk_count,
            max_cas_attempts = config.engine.max_cas_attempts,
            "Created provider"
        );

        let provider =
            Provider::new(Arc::new(substrate), config.engine.clone()).with_cache(config.cache.clone());
        provider.set_session_parameters(config.session_groups(), config.min_writes);
        Ok(provider)
    }

    /// Set the groups used by later sessions and the number of replicas that
    /// must acknowledge a write. Repeated groups count once and `min_writes` is
    /// clamped to the number of distinct groups.
    pub fn set_session_parameters(&self, groups: Vec<GroupId>, min_writes: usize) -> SessionParameters {
        let params = SessionParameters::new(groups, min_writes);
        if params.min_writes() < min_writes {
            tracing::warn!(
                requested = min_writes,
                clamped = params.min_writes(),
                "min_writes exceeds the number of distinct groups"
            );
        }
        tracing::info!(
            groups = ?params.groups(),
            min_writes = params.min_writes(),
            "Session parameters"
        );
        metrics::SESSION_GROUPS.set(params.groups().len() as i64);
        metrics::SESSION_MIN_WRITES.set(params.min_writes() as i64);

        let mut current = self.params.write().unwrap_or_else(|e| e.into_inner());
        *current = params.clone();
        params
    }

    pub fn session_parameters(&self) -> SessionParameters {
        self.params
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// A fresh session bound to the current parameters.
    pub fn session(&self) -> Session {
        Session::new(
            Arc::clone(&self.substrate),
            self.session_parameters(),
            Arc::clone(&self.cache),
            Arc::clone(&self.config),
        )
    }

    pub fn cache(&self) -> &Arc<ChunkCountCache> {
        &self.cache
    }

    pub async fn add_user_activity(
        &self,
        user: &str,
        time: u64,
        data: impl Into<Bytes>,
        key: Option<&str>,
    ) -> ActivityOutcome {
        self.session().add_user_activity(user, time, data, key).await
    }

    pub async fn get_active_users(&self, key: impl Into<ActivityKey>) -> Result<BTreeMap<String, u32>> {
        self.session().get_active_users(key).await
    }

    pub async fn for_active_users<F>(&self, key: impl Into<ActivityKey>, visitor: F) -> Result<usize>
    where
        F: FnMut(&str, u32) -> bool,
    {
        self.session().for_active_users(key, visitor).await
    }

    pub async fn get_user_logs(&self, user: &str, begin: u64, end: u64) -> Result<Vec<Bytes>> {
        self.session().get_user_logs(user, begin, end).await
    }

    pub async fn for_user_logs<F>(&self, user: &str, begin: u64, end: u64, visitor: F) -> Result<usize>
    where
        F: FnMut(&LogEntry) -> bool,
    {
        self.session().for_user_logs(user, begin, end, visitor).await
    }

    pub fn user_log_entries(&self, user: &str, begin: u64, end: u64) -> BoxStream<'static, Result<LogEntry>> {
        self.session().user_log_entries(user, begin, end)
    }

    pub async fn repartition_activity(
        &self,
        key: impl Into<ActivityKey>,
        chunk_count: u32,
    ) -> Result<RepartitionReport> {
        self.session().repartition_activity(key, chunk_count).await
    }

    pub async fn repartition_activity_to(
        &self,
        key: impl Into<ActivityKey>,
        new_key: &str,
        chunk_count: u32,
    ) -> Result<RepartitionReport> {
        self.session()
            .repartition_activity_to(key, new_key, chunk_count)
            .await
    }
}
