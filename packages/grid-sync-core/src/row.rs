//! Row records and the shared live row store.
//!
//! A [`Row`] is a JSON object. Editing a field for the first time stores the
//! pre-edit value in a shadow `<field>_old` entry on the same row, which is
//! what [`RowStore::restore_backups`] copies back on reset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GridError, Result};

/// Suffix of the shadow field holding a field's pre-edit value.
pub const BACKUP_SUFFIX: &str = "_old";

/// Returns the shadow field name for `field`.
pub fn backup_key(field: &str) -> String {
    format!("{}{}", field, BACKUP_SUFFIX)
}

/// A keyed record from the current page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets `field` to `value`, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Returns true if the row has an entry for `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the backed-up pre-edit value of `field`, if one was taken.
    pub fn backup(&self, field: &str) -> Option<&Value> {
        self.0.get(&backup_key(field))
    }

    /// Stores the current value of `field` as its backup unless a backup
    /// already exists. A missing field is backed up as `null`.
    ///
    /// Returns true if the backup was written by this call.
    pub fn ensure_backup(&mut self, field: &str) -> bool {
        let key = backup_key(field);
        if self.0.contains_key(&key) {
            return false;
        }
        let current = self.0.get(field).cloned().unwrap_or(Value::Null);
        self.0.insert(key, current);
        true
    }

    /// Copies every `<field>_old` value back onto `<field>`.
    ///
    /// Returns the number of fields restored.
    pub fn restore_backups(&mut self) -> usize {
        let restored: Vec<(String, Value)> = self
            .0
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix(BACKUP_SUFFIX)
                    .filter(|field| !field.is_empty())
                    .map(|field| (field.to_string(), value.clone()))
            })
            .collect();
        let count = restored.len();
        for (field, value) in restored {
            self.0.insert(field, value);
        }
        count
    }

    /// Iterates over the row's fields, backups included.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the row into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Row {
    type Error = GridError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(GridError::SerializationError(format!(
                "Expected a JSON object for a row, got {}",
                other
            ))),
        }
    }
}

/// Live, shared row set for the current page.
///
/// Clones share the same rows. [`RowStore::replace`] swaps the whole set and
/// bumps the generation; field writes through [`RowStore::soft_update`] mutate
/// rows in place and do not, so readers must tolerate fields changing between
/// renders without a generation change. Use [`RowStore::snapshot`] for an owned
/// copy to render from.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Arc<RwLock<Vec<Row>>>,
    generation: Arc<AtomicU64>,
}

impl RowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let store = Self::new();
        store.replace(rows);
        store
    }

    /// Replaces the whole row set.
    pub fn replace(&self, rows: Vec<Row>) {
        *self.rows.write() = rows;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns an owned copy of the current rows.
    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.read().clone()
    }

    /// Returns a copy of the row at `index`.
    pub fn row(&self, index: usize) -> Result<Row> {
        let rows = self.rows.read();
        rows.get(index).cloned().ok_or(GridError::RowNotFound {
            index,
            len: rows.len(),
        })
    }

    /// Returns the value of `field` in row `index`.
    pub fn value(&self, index: usize, field: &str) -> Result<Value> {
        let rows = self.rows.read();
        let row = rows.get(index).ok_or(GridError::RowNotFound {
            index,
            len: rows.len(),
        })?;
        row.get(field).cloned().ok_or_else(|| GridError::FieldNotFound {
            index,
            field: field.to_string(),
        })
    }

    /// Number of rows on the current page.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the page has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Replacement counter; changes only when the whole set is replaced.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Runs `f` against row `index` under the write lock.
    pub fn with_row_mut<T>(&self, index: usize, f: impl FnOnce(&mut Row) -> T) -> Result<T> {
        let mut rows = self.rows.write();
        let len = rows.len();
        let row = rows
            .get_mut(index)
            .ok_or(GridError::RowNotFound { index, len })?;
        Ok(f(row))
    }

    /// Writes `value` into `field` of row `index` in place.
    pub fn soft_update(&self, index: usize, field: &str, value: Value) -> Result<()> {
        self.with_row_mut(index, |row| {
            row.set(field, value);
        })
    }

    /// Takes the first-touch backup of `field` in row `index`.
    pub fn ensure_backup(&self, index: usize, field: &str) -> Result<bool> {
        self.with_row_mut(index, |row| row.ensure_backup(field))
    }

    /// Restores every backed-up field on every row.
    ///
    /// Returns the total number of fields restored.
    pub fn restore_backups(&self) -> usize {
        self.rows
            .write()
            .iter_mut()
            .map(Row::restore_backups)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;
    use serde_json::json;

    fn row(value: Value) -> Row {
        Row::try_from(value).unwrap()
    }

    #[test]
    #[timeout(1000)]
    fn test_backup_written_once() {
        let mut r = row(json!({"id": 1, "name": "a"}));
        assert!(r.ensure_backup("name"));
        r.set("name", json!("b"));
        assert!(!r.ensure_backup("name"));
        r.set("name", json!("c"));
        assert_eq!(r.backup("name"), Some(&json!("a")));
    }

    #[test]
    #[timeout(1000)]
    fn test_backup_of_missing_field_is_null() {
        let mut r = row(json!({"id": 1}));
        assert!(r.ensure_backup("note"));
        assert_eq!(r.get("note_old"), Some(&Value::Null));
    }

    #[test]
    #[timeout(1000)]
    fn test_restore_backups() {
        let mut r = row(json!({"name": "a", "age": 3}));
        r.ensure_backup("name");
        r.ensure_backup("age");
        r.set("name", json!("z"));
        r.set("age", json!(9));

        assert_eq!(r.restore_backups(), 2);
        assert_eq!(r.get("name"), Some(&json!("a")));
        assert_eq!(r.get("age"), Some(&json!(3)));
        // Backups survive a reset so later edits still reset to the original
        assert_eq!(r.backup("name"), Some(&json!("a")));
    }

    #[test]
    #[timeout(1000)]
    fn test_bare_suffix_is_not_a_backup() {
        let mut r = row(json!({"_old": 1, "x": 2}));
        assert_eq!(r.restore_backups(), 0);
        assert_eq!(r.get("x"), Some(&json!(2)));
    }

    #[test]
    #[timeout(1000)]
    fn test_non_object_row_rejected() {
        assert!(Row::try_from(json!([1, 2])).is_err());
    }

    #[test]
    #[timeout(1000)]
    fn test_store_generation_tracks_replace_only() {
        let store = RowStore::with_rows(vec![row(json!({"name": "a"}))]);
        let generation = store.generation();

        store.soft_update(0, "name", json!("b")).unwrap();
        assert_eq!(store.generation(), generation);
        assert_eq!(store.value(0, "name").unwrap(), json!("b"));

        store.replace(vec![]);
        assert_eq!(store.generation(), generation + 1);
        assert!(store.is_empty());
    }

    #[test]
    #[timeout(1000)]
    fn test_clones_share_rows() {
        let store = RowStore::with_rows(vec![row(json!({"n": 1}))]);
        let other = store.clone();
        other.soft_update(0, "n", json!(2)).unwrap();
        assert_eq!(store.value(0, "n").unwrap(), json!(2));
    }

    #[test]
    #[timeout(1000)]
    fn test_out_of_range() {
        let store = RowStore::new();
        let err = store.soft_update(3, "n", json!(1)).unwrap_err();
        assert!(matches!(err, GridError::RowNotFound { index: 3, len: 0 }));
        assert!(matches!(
            RowStore::with_rows(vec![Row::new()]).value(0, "missing"),
            Err(GridError::FieldNotFound { .. })
        ));
    }

    #[test]
    #[timeout(1000)]
    fn test_store_restore_all_rows() {
        let store = RowStore::with_rows(vec![
            row(json!({"name": "a"})),
            row(json!({"name": "b"})),
        ]);
        for i in 0..2 {
            store.ensure_backup(i, "name").unwrap();
            store.soft_update(i, "name", json!("edited")).unwrap();
        }
        assert_eq!(store.restore_backups(), 2);
        let rows = store.snapshot();
        assert_eq!(rows[0].get("name"), Some(&json!("a")));
        assert_eq!(rows[1].get("name"), Some(&json!("b")));
    }
}
