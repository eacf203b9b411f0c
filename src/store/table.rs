use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::StoreError;

/// A row type kept in a [`Table`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable kind used in error messages ("farm", "payment", ...)
    const KIND: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Implement [`Record`] for a struct whose primary key is an `id: i64` field.
#[macro_export]
macro_rules! impl_record {
    ($ty:ty, $kind:literal) => {
        impl $crate::store::Record for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}

/// Rows keyed by id, with a monotonically increasing id sequence.
///
/// Ids are never reused after deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Table<T> {
    last_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Record> Table<T> {
    /// Assign the next id to `row`, store it and return the stored copy.
    pub fn insert(&mut self, mut row: T) -> T {
        self.last_id += 1;
        row.set_id(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    /// Replace an existing row, keeping its id.
    pub fn replace(&mut self, id: i64, mut row: T) -> Result<T, StoreError> {
        if !self.rows.contains_key(&id) {
            return Err(StoreError::not_found::<T>(id));
        }
        row.set_id(id);
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn require(&self, id: i64) -> Result<&T, StoreError> {
        self.rows.get(&id).ok_or_else(|| StoreError::not_found::<T>(id))
    }

    pub fn require_mut(&mut self, id: i64) -> Result<&mut T, StoreError> {
        self.rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found::<T>(id))
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    /// Remove every row matching `pred`, returning the removed ids.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<i64> {
        let ids: Vec<i64> = self
            .rows
            .iter()
            .filter(|(_, row)| pred(row))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.rows.remove(id);
        }
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.values_mut()
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.rows.values().find(|row| pred(row))
    }

    pub fn any(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.rows.values().any(|row| pred(row))
    }

    pub fn count(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.rows.values().filter(|row| pred(row)).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
