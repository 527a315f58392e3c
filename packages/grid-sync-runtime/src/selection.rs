//! Row selection.
//!
//! The grid consumes selection as a capability: a [`SelectionProvider`]
//! maps the current rows and a [`SelectionConfig`] to a [`SelectionView`],
//! the merged state and actions exposed through the handle.
//! [`KeyedSelection`] is the bundled provider, tracking rows by the value
//! of a key field so selection survives page changes.

use std::fmt;
use std::sync::Arc;

use grid_sync_core::Row;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any number of rows
    #[default]
    Checkbox,
    /// At most one row
    Radio,
}

/// Row selection settings supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionConfig {
    #[serde(default)]
    pub mode: SelectionMode,
    /// Field whose value identifies a row
    pub row_key: String,
    /// Keys selected before any interaction
    #[serde(default)]
    pub preselected: Vec<Value>,
}

impl SelectionConfig {
    pub fn new(mode: SelectionMode, row_key: impl Into<String>) -> Self {
        Self {
            mode,
            row_key: row_key.into(),
            preselected: Vec::new(),
        }
    }

    pub fn preselect(mut self, keys: Vec<Value>) -> Self {
        self.preselected = keys;
        self
    }
}

/// Selection at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected keys in selection order, including rows not on this page
    pub selected_keys: Vec<Value>,
    /// Selected rows among the current rows
    pub selected_rows: Vec<Row>,
}

impl SelectionState {
    pub fn is_selected(&self, key: &Value) -> bool {
        self.selected_keys.contains(key)
    }
}

/// Operations that change the selection.
pub trait SelectionActions: Send + Sync {
    fn select(&self, key: Value);
    fn deselect(&self, key: &Value);
    fn toggle(&self, key: Value);
    /// Selects every current row; ignored in radio mode.
    fn select_all(&self);
    fn clear(&self);
}

/// Produces the selection view for a set of rows.
pub trait SelectionProvider: Send + Sync {
    fn selection(&self, rows: &[Row], config: &SelectionConfig) -> SelectionView;
}

/// Selection state merged with the actions that change it.
#[derive(Clone)]
pub struct SelectionView {
    pub state: SelectionState,
    pub actions: Arc<dyn SelectionActions>,
}

impl fmt::Debug for SelectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionView")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct KeySet {
    keys: Vec<Value>,
    seeded: bool,
}

/// Checkbox/radio selection keyed by a row field.
#[derive(Debug, Clone, Default)]
pub struct KeyedSelection {
    selected: Arc<RwLock<KeySet>>,
}

impl KeyedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected keys.
    pub fn selected_keys(&self) -> Vec<Value> {
        self.selected.read().keys.clone()
    }
}

impl SelectionProvider for KeyedSelection {
    fn selection(&self, rows: &[Row], config: &SelectionConfig) -> SelectionView {
        let keys = {
            let mut set = self.selected.write();
            if !set.seeded {
                set.seeded = true;
                for key in &config.preselected {
                    if !set.keys.contains(key) {
                        set.keys.push(key.clone());
                    }
                }
                if config.mode == SelectionMode::Radio {
                    set.keys.truncate(1);
                }
            }
            set.keys.clone()
        };

        let selected_rows = rows
            .iter()
            .filter(|row| row.get(&config.row_key).map_or(false, |k| keys.contains(k)))
            .cloned()
            .collect();

        SelectionView {
            state: SelectionState {
                selected_keys: keys,
                selected_rows,
            },
            actions: Arc::new(KeyedActions {
                selected: Arc::clone(&self.selected),
                mode: config.mode,
                row_keys: rows
                    .iter()
                    .filter_map(|row| row.get(&config.row_key).cloned())
                    .collect(),
            }),
        }
    }
}

struct KeyedActions {
    selected: Arc<RwLock<KeySet>>,
    mode: SelectionMode,
    /// Keys of the rows the view was built for
    row_keys: Vec<Value>,
}

impl SelectionActions for KeyedActions {
    fn select(&self, key: Value) {
        let mut set = self.selected.write();
        match self.mode {
            SelectionMode::Radio => set.keys = vec![key],
            SelectionMode::Checkbox => {
                if !set.keys.contains(&key) {
                    set.keys.push(key);
                }
            }
        }
    }

    fn deselect(&self, key: &Value) {
        self.selected.write().keys.retain(|k| k != key);
    }

    fn toggle(&self, key: Value) {
        let selected = self.selected.read().keys.contains(&key);
        if selected {
            self.deselect(&key);
        } else {
            self.select(key);
        }
    }

    fn select_all(&self) {
        if self.mode == SelectionMode::Radio {
            return;
        }
        let mut set = self.selected.write();
        for key in &self.row_keys {
            if !set.keys.contains(key) {
                set.keys.push(key.clone());
            }
        }
    }

    fn clear(&self) {
        self.selected.write().keys.clear();
    }
}
