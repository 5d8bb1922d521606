//! Hook Registry Service
//!
//! Owns handler definitions, indexes them by event in priority order, and
//! keeps per-handler execution statistics.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, HookError};
use crate::domain::models::{HandlerDefinition, HandlerStats, HookEvent, MAX_PRIORITY};

/// Event indexes over the registered definitions
#[derive(Default)]
struct RegistryIndex {
    /// Definitions keyed by id
    handlers: HashMap<String, Arc<HandlerDefinition>>,

    /// Handler ids per event, in registration order
    by_event: HashMap<HookEvent, Vec<String>>,

    /// Handler ids per event, in priority order (derived from `by_event`)
    sorted: HashMap<HookEvent, Vec<String>>,
}

impl RegistryIndex {
    fn add_to_event(&mut self, event: HookEvent, id: &str) {
        self.by_event.entry(event).or_default().push(id.to_string());
        self.rebuild(event);
    }

    fn remove_from_event(&mut self, event: HookEvent, id: &str) {
        if let Some(ids) = self.by_event.get_mut(&event) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.by_event.remove(&event);
            }
        }
        self.rebuild(event);
    }

    /// Re-derive the priority order for one event. Stable, so ties keep
    /// registration order.
    fn rebuild(&mut self, event: HookEvent) {
        let Some(ids) = self.by_event.get(&event) else {
            self.sorted.remove(&event);
            return;
        };

        let mut ordered = ids.clone();
        ordered.sort_by_key(|id| self.handlers.get(id).map_or(u32::MAX, |def| def.priority));
        self.sorted.insert(event, ordered);
    }

    fn get(&self, id: &str) -> DomainResult<&Arc<HandlerDefinition>> {
        self.handlers
            .get(id)
            .ok_or_else(|| HookError::NotFound(id.to_string()))
    }
}

/// Registry of handler definitions
#[derive(Default)]
pub struct HookRegistry {
    index: RwLock<RegistryIndex>,

    /// One lock per handler so concurrent handlers never contend
    stats: RwLock<HashMap<String, Arc<Mutex<HandlerStats>>>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler definition
    #[instrument(skip(self, definition), fields(handler_id = %definition.id))]
    pub async fn register(&self, mut definition: HandlerDefinition) -> DomainResult<()> {
        definition.validate()?;
        definition.dedup_events();

        let mut index = self.index.write().await;
        if index.handlers.contains_key(&definition.id) {
            return Err(HookError::Validation {
                id: definition.id,
                reason: "a handler with this id is already registered".to_string(),
            });
        }

        let id = definition.id.clone();
        let events = definition.events.clone();
        index.handlers.insert(id.clone(), Arc::new(definition));
        for event in events {
            index.add_to_event(event, &id);
        }
        drop(index);

        self.stats
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(HandlerStats::default())));

        info!(handler_id = %id, "Registered handler");
        Ok(())
    }

    /// Register several definitions, stopping at the first invalid one
    pub async fn register_all(
        &self,
        definitions: impl IntoIterator<Item = HandlerDefinition>,
    ) -> DomainResult<usize> {
        let mut count = 0;
        for definition in definitions {
            self.register(definition).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove a handler along with its index entries and statistics
    #[instrument(skip(self))]
    pub async fn unregister(&self, id: &str) -> DomainResult<Arc<HandlerDefinition>> {
        let mut index = self.index.write().await;
        let definition = index
            .handlers
            .remove(id)
            .ok_or_else(|| HookError::NotFound(id.to_string()))?;
        for event in &definition.events {
            index.remove_from_event(*event, id);
        }
        drop(index);

        self.stats.write().await.remove(id);

        info!(handler_id = %id, "Unregistered handler");
        Ok(definition)
    }

    /// Look up a definition by id
    pub async fn get(&self, id: &str) -> Option<Arc<HandlerDefinition>> {
        self.index.read().await.handlers.get(id).cloned()
    }

    /// All definitions, ordered by priority then id
    pub async fn list(&self) -> Vec<Arc<HandlerDefinition>> {
        let index = self.index.read().await;
        let mut all: Vec<_> = index.handlers.values().cloned().collect();
        all.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Enabled handlers for an event, lowest priority value first
    pub async fn for_event(&self, event: HookEvent) -> Vec<Arc<HandlerDefinition>> {
        let index = self.index.read().await;
        let Some(ids) = index.sorted.get(&event) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|id| index.handlers.get(id))
            .filter(|def| def.enabled)
            .cloned()
            .collect()
    }

    /// Number of registered handlers
    pub async fn len(&self) -> usize {
        self.index.read().await.handlers.len()
    }

    /// True when nothing is registered
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.handlers.is_empty()
    }

    /// Enable or disable a handler
    #[instrument(skip(self))]
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> DomainResult<()> {
        let mut index = self.index.write().await;
        let mut definition = HandlerDefinition::clone(index.get(id)?);
        definition.enabled = enabled;
        let events = definition.events.clone();
        index.handlers.insert(id.to_string(), Arc::new(definition));
        for event in events {
            index.rebuild(event);
        }

        info!(handler_id = %id, enabled, "Handler state changed");
        Ok(())
    }

    /// Change a handler's priority and re-derive its events' order
    #[instrument(skip(self))]
    pub async fn set_priority(&self, id: &str, priority: u32) -> DomainResult<()> {
        if priority > MAX_PRIORITY {
            return Err(HookError::Validation {
                id: id.to_string(),
                reason: format!("priority {priority} is out of range 0..={MAX_PRIORITY}"),
            });
        }

        let mut index = self.index.write().await;
        let mut definition = HandlerDefinition::clone(index.get(id)?);
        definition.priority = priority;
        let events = definition.events.clone();
        index.handlers.insert(id.to_string(), Arc::new(definition));
        for event in events {
            index.rebuild(event);
        }

        debug!(handler_id = %id, priority, "Handler reprioritized");
        Ok(())
    }

    /// Replace the set of events a handler applies to
    #[instrument(skip(self))]
    pub async fn set_events(&self, id: &str, events: Vec<HookEvent>) -> DomainResult<()> {
        let mut index = self.index.write().await;
        let mut definition = HandlerDefinition::clone(index.get(id)?);
        let previous = std::mem::replace(&mut definition.events, events);
        definition.validate()?;
        definition.dedup_events();

        let current = definition.events.clone();
        index.handlers.insert(id.to_string(), Arc::new(definition));
        for event in previous.iter().filter(|e| !current.contains(e)) {
            index.remove_from_event(*event, id);
        }
        for event in current.iter().filter(|e| !previous.contains(e)) {
            index.add_to_event(*event, id);
        }
        for event in current.iter().filter(|e| previous.contains(e)) {
            index.rebuild(*event);
        }

        debug!(handler_id = %id, events = ?current, "Handler events changed");
        Ok(())
    }

    async fn stats_slot(&self, id: &str) -> Option<Arc<Mutex<HandlerStats>>> {
        self.stats.read().await.get(id).cloned()
    }

    /// Fold one execution into a handler's statistics
    pub async fn record_outcome(&self, id: &str, duration_ms: u64, success: bool, blocked: bool) {
        match self.stats_slot(id).await {
            Some(slot) => slot
                .lock()
                .await
                .record_outcome(duration_ms, success, blocked, Utc::now()),
            None => warn!(handler_id = %id, "Outcome recorded for unregistered handler"),
        }
    }

    /// Append to a handler's error history
    pub async fn record_error(&self, id: &str, message: &str) {
        match self.stats_slot(id).await {
            Some(slot) => slot.lock().await.record_error(message, Utc::now()),
            None => warn!(handler_id = %id, "Error recorded for unregistered handler"),
        }
    }

    /// Snapshot of one handler's statistics
    pub async fn stats(&self, id: &str) -> Option<HandlerStats> {
        let slot = self.stats_slot(id).await?;
        let stats = slot.lock().await.clone();
        Some(stats)
    }

    /// Snapshot of every handler's statistics
    pub async fn all_stats(&self) -> HashMap<String, HandlerStats> {
        let slots: Vec<_> = self
            .stats
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();

        let mut snapshot = HashMap::with_capacity(slots.len());
        for (id, slot) in slots {
            snapshot.insert(id, slot.lock().await.clone());
        }
        snapshot
    }
}
