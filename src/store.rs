//! Per-entity record stores.
//!
//! Every entity type gets one collection with exactly one writer. Callers see
//! only the CRUD contract below and always receive copies, never references
//! into the collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::join::ID_FIELD;

/// A shallow patch: top-level field name to new value.
pub type Partial = serde_json::Map<String, Value>;

pub trait Record: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable entity name used in errors and logs.
    const ENTITY: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);

    fn stamp_created(&mut self, _now: DateTime<Utc>) {}
    fn stamp_updated(&mut self, _now: DateTime<Utc>) {}
}

#[async_trait]
pub trait EntityStore<T: Record>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<T>>;
    async fn get_by_id(&self, id: i64) -> Result<T>;
    async fn create(&self, partial: Partial) -> Result<T>;
    async fn update(&self, id: i64, partial: Partial) -> Result<T>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Simulated per-operation latency.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latency {
    pub get_all: Duration,
    pub get_by_id: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Latency {
    pub const fn none() -> Self {
        Latency::uniform(Duration::ZERO)
    }

    pub const fn uniform(d: Duration) -> Self {
        Latency {
            get_all: d,
            get_by_id: d,
            create: d,
            update: d,
            delete: d,
        }
    }

    /// The mock-data service timings the dashboard was built against.
    pub const fn mock() -> Self {
        Latency {
            get_all: Duration::from_millis(300),
            get_by_id: Duration::from_millis(200),
            create: Duration::from_millis(400),
            update: Duration::from_millis(400),
            delete: Duration::from_millis(300),
        }
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

/// Overlay `partial` onto `base`. The id is never taken from the patch.
pub fn merge_partial<T: Record>(base: &T, partial: &Partial) -> Result<T> {
    let mut value = serde_json::to_value(base)
        .map_err(|e| EngineError::invalid(format!("{}: {}", T::ENTITY, e)))?;
    let Some(obj) = value.as_object_mut() else {
        return Err(EngineError::invalid(format!(
            "{} must serialize to an object",
            T::ENTITY
        )));
    };
    for (key, v) in partial {
        if key == ID_FIELD {
            continue;
        }
        obj.insert(key.clone(), v.clone());
    }
    let mut merged: T = serde_json::from_value(value)
        .map_err(|e| EngineError::invalid(format!("{}: {}", T::ENTITY, e)))?;
    merged.set_id(base.id());
    Ok(merged)
}

struct Collection<T> {
    records: Vec<T>,
    /// Largest id ever handed out, including deleted ones.
    high_water: i64,
}

impl<T: Record> Collection<T> {
    fn position(&self, id: i64) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(EngineError::NotFound {
                entity: T::ENTITY,
                id,
            })
    }

    fn next_id(&self) -> i64 {
        let max_live = self.records.iter().map(|r| r.id()).max().unwrap_or(0);
        max_live.max(self.high_water).max(0) + 1
    }
}

pub struct MemoryStore<T> {
    inner: RwLock<Collection<T>>,
    latency: Latency,
}

impl<T: Record> MemoryStore<T> {
    pub fn new(latency: Latency) -> Self {
        MemoryStore {
            inner: RwLock::new(Collection {
                records: Vec::new(),
                high_water: 0,
            }),
            latency,
        }
    }

    /// Start from existing records, e.g. seed fixtures. Ids must be positive
    /// and unique.
    pub fn seeded(records: Vec<T>, latency: Latency) -> Result<Self> {
        let mut seen = HashSet::new();
        for r in &records {
            if r.id() <= 0 {
                return Err(EngineError::invalid(format!(
                    "{} id must be positive, got {}",
                    T::ENTITY,
                    r.id()
                )));
            }
            if !seen.insert(r.id()) {
                return Err(EngineError::invalid(format!(
                    "duplicate {} id {}",
                    T::ENTITY,
                    r.id()
                )));
            }
        }
        let high_water = records.iter().map(|r| r.id()).max().unwrap_or(0);
        Ok(MemoryStore {
            inner: RwLock::new(Collection {
                records,
                high_water,
            }),
            latency,
        })
    }
}

#[async_trait]
impl<T: Record> EntityStore<T> for MemoryStore<T> {
    async fn get_all(&self) -> Result<Vec<T>> {
        pause(self.latency.get_all).await;
        let guard = self.inner.read().await;
        Ok(guard.records.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<T> {
        pause(self.latency.get_by_id).await;
        let guard = self.inner.read().await;
        let idx = guard.position(id)?;
        Ok(guard.records[idx].clone())
    }

    async fn create(&self, partial: Partial) -> Result<T> {
        pause(self.latency.create).await;
        let mut guard = self.inner.write().await;
        let id = guard.next_id();

        let mut base = T::default();
        base.set_id(id);
        let mut record = merge_partial(&base, &partial)?;
        record.stamp_created(Utc::now());

        guard.records.push(record.clone());
        guard.high_water = id;
        tracing::debug!(entity = T::ENTITY, id, "record created");
        Ok(record)
    }

    async fn update(&self, id: i64, partial: Partial) -> Result<T> {
        pause(self.latency.update).await;
        let mut guard = self.inner.write().await;
        let idx = guard.position(id)?;

        let mut record = merge_partial(&guard.records[idx], &partial)?;
        record.stamp_updated(Utc::now());

        guard.records[idx] = record.clone();
        tracing::debug!(entity = T::ENTITY, id, fields = partial.len(), "record updated");
        Ok(record)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        pause(self.latency.delete).await;
        let mut guard = self.inner.write().await;
        let idx = guard.position(id)?;
        guard.records.remove(idx);
        tracing::debug!(entity = T::ENTITY, id, "record deleted");
        Ok(true)
    }
}
