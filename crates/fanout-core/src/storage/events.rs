//! Repository for ingested events and the per-tenant recent-event index.
//!
//! Events are immutable once written. The index is a JSON array of
//! event IDs, newest first, capped so one tenant's history has a bounded
//! footprint.

use std::sync::Arc;

use crate::{
    error::Result,
    models::{Event, EventId, TenantId},
    store::{keys, KeyValueStore},
};

/// Maximum number of event IDs retained in the recent-event index.
pub const EVENT_INDEX_CAP: usize = 200;

/// Repository for event records.
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store handle.
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    /// Persists an event and prepends it to the recent-event index.
    ///
    /// The index write trims to [`EVENT_INDEX_CAP`] entries; the trimmed
    /// event records themselves are not deleted.
    pub async fn create(&self, tenant: &TenantId, event: &Event) -> Result<()> {
        let key = keys::event(tenant, event.id.as_str());
        self.store.put(&key, super::encode(event)?).await?;

        let mut index = self.load_index(tenant).await?;
        index.insert(0, event.id.clone());
        index.truncate(EVENT_INDEX_CAP);

        let index_key = keys::event_index(tenant);
        self.store.put(&index_key, super::encode(&index)?).await?;
        Ok(())
    }

    /// Reads a single event by ID.
    pub async fn get(&self, tenant: &TenantId, id: &EventId) -> Result<Option<Event>> {
        let key = keys::event(tenant, id.as_str());
        match self.store.get(&key).await? {
            Some(raw) => Ok(Some(super::decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Lists recent events, newest first.
    ///
    /// `cursor` is the ID of the last event from the previous page;
    /// listing resumes after it. An unknown cursor restarts from the
    /// top. Returns the page plus the cursor for the next page, `None`
    /// once the index is exhausted. Index entries whose event record is
    /// missing or unreadable are skipped.
    pub async fn list_recent(
        &self,
        tenant: &TenantId,
        limit: usize,
        cursor: Option<&EventId>,
    ) -> Result<(Vec<Event>, Option<EventId>)> {
        let index = self.load_index(tenant).await?;

        let start = cursor
            .and_then(|cursor| index.iter().position(|id| id == cursor))
            .map_or(0, |pos| pos + 1);
        let end = start.saturating_add(limit).min(index.len());
        let page_ids = &index[start.min(index.len())..end];

        let mut events = Vec::with_capacity(page_ids.len());
        for id in page_ids {
            let key = keys::event(tenant, id.as_str());
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match super::decode::<Event>(&key, &raw) {
                Ok(event) => events.push(event),
                Err(_) => continue,
            }
        }

        let next_cursor =
            if end < index.len() { page_ids.last().cloned() } else { None };
        Ok((events, next_cursor))
    }

    async fn load_index(&self, tenant: &TenantId) -> Result<Vec<EventId>> {
        let key = keys::event_index(tenant);
        match self.store.get(&key).await? {
            // An unreadable index is treated as empty rather than
            // failing ingestion.
            Some(raw) => Ok(super::decode(&key, &raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}
