//! Per-row edit buffers indexed by row position.
//!
//! Slots are created when a row index first renders and dropped when a
//! render pass covers fewer rows. A slot seeded under an older row-store
//! generation belongs to a row that has since been replaced, so it is
//! rebuilt instead of reused.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::row::{Row, RowStore};

/// Presentation state backing the editable controls of one row.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    id: u64,
    row_index: usize,
    generation: u64,
    initial: Row,
    values: Map<String, Value>,
    touched: BTreeSet<String>,
}

impl EditBuffer {
    fn new(id: u64, row_index: usize, generation: u64, row: &Row) -> Self {
        Self {
            id,
            row_index,
            generation,
            initial: row.clone(),
            values: row.as_map().clone(),
            touched: BTreeSet::new(),
        }
    }

    /// Registry-unique id; a rebuilt slot always gets a new one.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Position of the row this buffer belongs to.
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    /// Values the buffer was seeded with.
    pub fn initial_values(&self) -> &Row {
        &self.initial
    }

    /// Current presentation value of `field`.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Records a user edit of `field`.
    pub fn set_value(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
        self.touched.insert(field.to_string());
    }

    /// Fields edited since the buffer was seeded or last reset.
    pub fn touched_fields(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    /// Returns true if any touched field differs from its seeded value.
    pub fn is_dirty(&self) -> bool {
        self.touched
            .iter()
            .any(|field| self.values.get(field) != self.initial.get(field))
    }

    /// Resets presentation state to match `row`.
    pub fn reset_to(&mut self, row: &Row) {
        self.values = row.as_map().clone();
        self.touched.clear();
    }
}

/// Arena of edit buffers, one per rendered row.
#[derive(Debug)]
pub struct RowFormRegistry {
    buffers: Vec<Option<EditBuffer>>,
    next_id: u64,
}

impl RowFormRegistry {
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            next_id: 1,
        }
    }

    /// Returns the buffer for row `index`, creating it if the slot is empty
    /// or was seeded for a row from an older generation.
    pub fn ensure(&mut self, index: usize, row: &Row, generation: u64) -> &mut EditBuffer {
        if self.buffers.len() <= index {
            self.buffers.resize_with(index + 1, || None);
        }

        let slot = &mut self.buffers[index];
        let buffer = match slot.take().filter(|b| b.generation == generation) {
            Some(buffer) => buffer,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                tracing::trace!("Creating edit buffer {} for row {}", id, index);
                EditBuffer::new(id, index, generation, row)
            }
        };
        slot.insert(buffer)
    }

    /// Drops every slot at or beyond `len`.
    ///
    /// Returns the number of buffers dropped.
    pub fn truncate(&mut self, len: usize) -> usize {
        if self.buffers.len() <= len {
            return 0;
        }
        let dropped = self.buffers[len..].iter().filter(|b| b.is_some()).count();
        self.buffers.truncate(len);
        if dropped > 0 {
            tracing::debug!("Dropped {} edit buffers beyond row {}", dropped, len);
        }
        dropped
    }

    pub fn get(&self, index: usize) -> Option<&EditBuffer> {
        self.buffers.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut EditBuffer> {
        self.buffers.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of slots, including any not yet rendered.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterates over live buffers in row order.
    pub fn iter(&self) -> impl Iterator<Item = &EditBuffer> {
        self.buffers.iter().flatten()
    }

    /// Restores backed-up values on every row, then resets every live buffer
    /// to match its row.
    ///
    /// The row store is the source of truth; buffers only mirror it.
    /// Returns the number of fields restored.
    pub fn reset_all(&mut self, rows: &RowStore) -> usize {
        let restored = rows.restore_backups();
        let snapshot = rows.snapshot();
        for buffer in self.buffers.iter_mut().flatten() {
            if let Some(row) = snapshot.get(buffer.row_index) {
                buffer.reset_to(row);
            }
        }
        tracing::debug!("Reset {} fields across {} rows", restored, snapshot.len());
        restored
    }
}

impl Default for RowFormRegistry {
    fn default() -> Self {
        Self::new()
    }
}
