//! Cell binding: control resolution, backups, and soft/hard updates.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::column::{Column, Control, CustomCell, InputConfig, SelectConfig, SelectOption};
use super::filter::OptionFilter;
use crate::error::{GridError, Result};
use crate::registry::{EditBuffer, RowFormRegistry};
use crate::row::RowStore;

/// Committed edit reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardUpdate {
    pub field: String,
    pub value: Value,
    pub row_index: usize,
}

/// Listener for committed edits.
pub type HardUpdateListener = Arc<dyn Fn(&HardUpdate) + Send + Sync>;

/// A bound text input.
#[derive(Debug, Clone)]
pub struct InputControl {
    pub config: InputConfig,
    pub value: Value,
}

/// A bound selection control.
#[derive(Debug, Clone)]
pub struct SelectControl {
    pub config: SelectConfig,
    pub value: Value,
}

impl SelectControl {
    /// Options passing the filter typed as `input`.
    pub fn filter_options(&self, input: &str) -> Vec<&SelectOption> {
        let filter = OptionFilter::new(input);
        self.config
            .options
            .iter()
            .filter(|option| filter.matches(option))
            .collect()
    }
}

/// What a cell renders as.
#[derive(Debug, Clone)]
pub enum CellKind {
    /// Read-only value
    Plain(Value),
    /// Host-rendered control; commits on blur like a text input
    Custom { cell: CustomCell, value: Value },
    Input(InputControl),
    Select(SelectControl),
}

/// A cell bound to its row position and field.
#[derive(Debug, Clone)]
pub struct BoundCell {
    pub row_index: usize,
    pub field: String,
    pub kind: CellKind,
}

impl BoundCell {
    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, CellKind::Plain(_))
    }

    /// Value the cell was rendered with.
    pub fn value(&self) -> &Value {
        match &self.kind {
            CellKind::Plain(value) => value,
            CellKind::Custom { value, .. } => value,
            CellKind::Input(input) => &input.value,
            CellKind::Select(select) => &select.value,
        }
    }

    fn invalid(&self, event: &'static str) -> GridError {
        GridError::InvalidCell {
            index: self.row_index,
            field: self.field.clone(),
            event,
        }
    }
}

/// Binds columns to rows and reconciles edits into the row store.
///
/// Every change on an editable cell is written into the live row at once
/// (soft update). Commits, which happen on blur for inputs and custom cells
/// and on every change for selects, are reported to listeners as
/// [`HardUpdate`]s. Host callbacks on the control run before either step.
#[derive(Clone, Default)]
pub struct CellBindingEngine {
    columns: Vec<Column>,
    listeners: Vec<HardUpdateListener>,
}

impl fmt::Debug for CellBindingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellBindingEngine")
            .field("columns", &self.columns)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CellBindingEngine {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            listeners: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Registers a listener for committed edits.
    pub fn on_hard_update(&mut self, listener: impl Fn(&HardUpdate) + Send + Sync + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Binds one column of row `index`.
    ///
    /// The first time a field renders as editable for a row, its current
    /// value is backed up; later renders never refresh the backup.
    pub fn bind_cell(
        &self,
        column: &Column,
        rows: &RowStore,
        buffer: &EditBuffer,
        index: usize,
    ) -> Result<BoundCell> {
        let row = rows.row(index)?;
        let value = row.get(&column.key).cloned().unwrap_or(Value::Null);
        let control = column
            .edit
            .as_ref()
            .and_then(|edit| edit.resolve(buffer, &row, index));

        let kind = match control {
            None => CellKind::Plain(value),
            Some(control) => {
                if rows.ensure_backup(index, &column.key)? {
                    tracing::trace!("Backed up '{}' on row {}", column.key, index);
                }
                match control {
                    Control::Custom(cell) => CellKind::Custom { cell, value },
                    Control::Input(config) => CellKind::Input(InputControl { config, value }),
                    Control::Select(config) => CellKind::Select(SelectControl { config, value }),
                }
            }
        };

        Ok(BoundCell {
            row_index: index,
            field: column.key.clone(),
            kind,
        })
    }

    /// Binds every column of row `index`, creating its edit buffer on first
    /// render.
    pub fn render_row(
        &self,
        rows: &RowStore,
        forms: &mut RowFormRegistry,
        index: usize,
    ) -> Result<Vec<BoundCell>> {
        let row = rows.row(index)?;
        let buffer: &EditBuffer = forms.ensure(index, &row, rows.generation());
        self.columns
            .iter()
            .map(|column| self.bind_cell(column, rows, buffer, index))
            .collect()
    }

    /// Full render pass: binds every row, then drops edit buffers for rows
    /// that no longer exist.
    pub fn render_page(
        &self,
        rows: &RowStore,
        forms: &mut RowFormRegistry,
    ) -> Result<Vec<Vec<BoundCell>>> {
        let len = rows.len();
        let cells = (0..len)
            .map(|index| self.render_row(rows, forms, index))
            .collect::<Result<Vec<_>>>()?;
        forms.truncate(len);
        Ok(cells)
    }

    /// Handles a change event on `cell`.
    ///
    /// Returns the hard update when the change also commits (selects).
    /// `forms` is locked only while the edit buffer is written, so host
    /// callbacks and listeners may use the registry themselves.
    pub fn change(
        &self,
        cell: &BoundCell,
        value: Value,
        rows: &RowStore,
        forms: &Mutex<RowFormRegistry>,
    ) -> Result<Option<HardUpdate>> {
        match &cell.kind {
            CellKind::Plain(_) => Err(cell.invalid("change")),
            CellKind::Custom { .. } => {
                self.soft_update(cell, value, rows, forms)?;
                Ok(None)
            }
            CellKind::Input(input) => {
                if let Some(on_change) = &input.config.on_change {
                    on_change.call(&value);
                }
                let value = input.config.clamp(value);
                self.soft_update(cell, value, rows, forms)?;
                Ok(None)
            }
            CellKind::Select(select) => {
                if let Some(on_change) = &select.config.on_change {
                    on_change.call(&value);
                }
                self.soft_update(cell, value.clone(), rows, forms)?;
                Ok(Some(self.commit(cell, value)))
            }
        }
    }

    /// Handles a blur event on `cell`, committing the row's current value.
    ///
    /// Selects commit on change, so blurring one reports nothing.
    pub fn blur(&self, cell: &BoundCell, rows: &RowStore) -> Result<Option<HardUpdate>> {
        match &cell.kind {
            CellKind::Plain(_) => Err(cell.invalid("blur")),
            CellKind::Select(_) => Ok(None),
            CellKind::Custom { .. } => {
                let value = self.current_value(cell, rows)?;
                Ok(Some(self.commit(cell, value)))
            }
            CellKind::Input(input) => {
                let value = self.current_value(cell, rows)?;
                if let Some(on_blur) = &input.config.on_blur {
                    on_blur.call(&value);
                }
                Ok(Some(self.commit(cell, value)))
            }
        }
    }

    fn current_value(&self, cell: &BoundCell, rows: &RowStore) -> Result<Value> {
        let row = rows.row(cell.row_index)?;
        Ok(row.get(&cell.field).cloned().unwrap_or(Value::Null))
    }

    fn soft_update(
        &self,
        cell: &BoundCell,
        value: Value,
        rows: &RowStore,
        forms: &Mutex<RowFormRegistry>,
    ) -> Result<()> {
        rows.ensure_backup(cell.row_index, &cell.field)?;
        if let Some(buffer) = forms.lock().get_mut(cell.row_index) {
            buffer.set_value(&cell.field, value.clone());
        }
        rows.soft_update(cell.row_index, &cell.field, value)
    }

    fn commit(&self, cell: &BoundCell, value: Value) -> HardUpdate {
        let update = HardUpdate {
            field: cell.field.clone(),
            value,
            row_index: cell.row_index,
        };
        tracing::debug!(
            "Committed '{}' on row {} ({} listeners)",
            update.field,
            update.row_index,
            self.listeners.len()
        );
        for listener in &self.listeners {
            listener(&update);
        }
        update
    }
}
