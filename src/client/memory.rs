use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use super::{ClientError, CollectionSource};
use crate::records::{Entity, RecordId};

#[derive(Debug, Default)]
struct Store {
    rows: Vec<Map<String, JsonValue>>,
    next_id: RecordId,
    failures: VecDeque<ClientError>,
    calls: Vec<String>,
}

/// In-process collection with the same contract as the HTTP one.
///
/// Rows are kept as raw JSON so fields the record type does not expose (such as
/// passwords) are stored and merged exactly like a server would.
#[derive(Debug)]
pub struct InMemoryCollection<E> {
    store: Mutex<Store>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for InMemoryCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryCollection<E> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_id: 1,
                ..Store::default()
            }),
            _entity: PhantomData,
        }
    }

    /// Seeds rows as-is. Ids already present in the rows are kept.
    pub fn with_rows(rows: Vec<JsonValue>) -> Self {
        let collection = Self::new();
        {
            let mut store = collection.lock();
            for row in rows {
                if let JsonValue::Object(map) = row {
                    let id = map.get(E::ID_FIELD).and_then(|v| v.as_i64()).unwrap_or(0);
                    store.next_id = store.next_id.max(id + 1);
                    store.rows.push(map);
                }
            }
        }
        collection
    }

    /// The next call fails with `error` instead of touching the rows.
    pub fn fail_next(&self, error: ClientError) {
        self.lock().failures.push_back(error);
    }

    /// Raw stored row, including fields the record type drops.
    pub fn raw(&self, id: RecordId) -> Option<JsonValue> {
        let store = self.lock();
        store
            .rows
            .iter()
            .find(|row| row_id::<E>(row) == Some(id))
            .map(|row| JsonValue::Object(row.clone()))
    }

    /// Names of the operations called so far, e.g. `["list", "update:3"]`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops a row without going through `remove`, as another client would.
    pub fn delete_behind(&self, id: RecordId) {
        self.lock().rows.retain(|row| row_id::<E>(row) != Some(id));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // a poisoned lock only means a test panicked mid-call
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, Store>, ClientError> {
        let mut store = self.lock();
        store.calls.push(call);
        match store.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(store),
        }
    }
}

fn row_id<E: Entity>(row: &Map<String, JsonValue>) -> Option<RecordId> {
    row.get(E::ID_FIELD).and_then(|v| v.as_i64())
}

fn decode_row<E: Entity>(row: &Map<String, JsonValue>) -> Result<E, ClientError> {
    serde_json::from_value(JsonValue::Object(row.clone()))
        .map_err(|e| ClientError::transport(format!("stored row does not decode: {e}")))
}

fn payload_object(payload: &JsonValue) -> Result<&Map<String, JsonValue>, ClientError> {
    payload.as_object().ok_or_else(|| ClientError::Validation {
        status: 400,
        message: "payload must be an object".to_string(),
    })
}

#[async_trait]
impl<E: Entity> CollectionSource<E> for InMemoryCollection<E> {
    async fn list(&self) -> Result<Vec<E>, ClientError> {
        let store = self.begin("list".to_string())?;
        store.rows.iter().map(decode_row::<E>).collect()
    }

    async fn create(&self, payload: &JsonValue) -> Result<E, ClientError> {
        let mut store = self.begin("create".to_string())?;
        let mut row = payload_object(payload)?.clone();
        let id = store.next_id;
        store.next_id += 1;
        row.insert(E::ID_FIELD.to_string(), JsonValue::from(id));
        let record = decode_row::<E>(&row).map_err(|e| ClientError::Validation {
            status: 400,
            message: e.to_string(),
        })?;
        store.rows.push(row);
        Ok(record)
    }

    async fn update(&self, id: RecordId, payload: &JsonValue) -> Result<E, ClientError> {
        let mut store = self.begin(format!("update:{id}"))?;
        let patch = payload_object(payload)?;
        let row = store
            .rows
            .iter_mut()
            .find(|row| row_id::<E>(row) == Some(id))
            .ok_or(ClientError::NotFound { id })?;
        for (key, value) in patch {
            if key != E::ID_FIELD {
                row.insert(key.clone(), value.clone());
            }
        }
        decode_row::<E>(row)
    }

    async fn remove(&self, id: RecordId) -> Result<(), ClientError> {
        let mut store = self.begin(format!("remove:{id}"))?;
        let before = store.rows.len();
        store.rows.retain(|row| row_id::<E>(row) != Some(id));
        if store.rows.len() == before {
            return Err(ClientError::NotFound { id });
        }
        Ok(())
    }
}
