//! In-memory resource stores.
//!
//! A [`ResourceStore`] owns the records of one resource type for the lifetime of
//! the process. One mutex guards the records and the id counter, so writes are
//! serialized against reads and a reader never sees a half-written record.

use crate::ids::RecordId;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A record type that can live in a [`ResourceStore`].
pub trait Record: Clone + Send + 'static {
    /// Client-supplied fields, already accepted by the schema validator.
    type Input: Debug + Send;

    /// Build a record from its fields and a server-assigned id.
    fn with_id(id: RecordId, input: Self::Input) -> Self;

    fn id(&self) -> &RecordId;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),
}

struct Inner<T> {
    records: Vec<T>,
    last_id: u64,
}

/// Ordered, mutex-guarded collection of records.
pub struct ResourceStore<T: Record> {
    inner: Mutex<Inner<T>>,
    entity_type: &'static str,
}

impl<T: Record> Default for ResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> ResourceStore<T> {
    pub fn new() -> Self {
        let entity_type = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Record");
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                last_id: 0,
            }),
            entity_type,
        }
    }

    // A panicking writer cannot leave a partial record behind (every mutation
    // is a single push/assign/remove), so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assign a fresh id, append the record and return it.
    pub fn create(&self, input: T::Input) -> T {
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = RecordId::from(inner.last_id);
        let record = T::with_id(id, input);
        inner.records.push(record.clone());
        info!(
            entity_type = self.entity_type,
            id = %record.id(),
            size = inner.records.len(),
            "Created"
        );
        record
    }

    /// Snapshot of all records in insertion order.
    pub fn list(&self) -> Vec<T> {
        let inner = self.lock();
        debug!(entity_type = self.entity_type, size = inner.records.len(), "List");
        inner.records.clone()
    }

    pub fn get(&self, id: &RecordId) -> Result<T, StoreError> {
        let inner = self.lock();
        let found = inner.records.iter().find(|r| r.id() == id).cloned();
        debug!(entity_type = self.entity_type, %id, found = found.is_some(), "Get");
        found.ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Replace the record wholesale, keeping the id from the caller.
    pub fn update(&self, id: &RecordId, input: T::Input) -> Result<T, StoreError> {
        let mut inner = self.lock();
        match inner.records.iter_mut().find(|r| r.id() == id) {
            Some(slot) => {
                *slot = T::with_id(id.clone(), input);
                info!(entity_type = self.entity_type, %id, "Updated");
                Ok(slot.clone())
            }
            None => {
                warn!(entity_type = self.entity_type, %id, "Update target not found");
                Err(StoreError::NotFound(id.clone()))
            }
        }
    }

    pub fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.records.iter().position(|r| r.id() == id) {
            Some(pos) => {
                inner.records.remove(pos);
                info!(
                    entity_type = self.entity_type,
                    %id,
                    size = inner.records.len(),
                    "Deleted"
                );
                Ok(())
            }
            None => {
                warn!(entity_type = self.entity_type, %id, "Delete target not found");
                Err(StoreError::NotFound(id.clone()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
