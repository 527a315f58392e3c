//! The composed editable grid.

use std::sync::Arc;

use grid_sync_core::{
    BoundCell, CellBindingEngine, Column, GridConfig, HardUpdate, RowFormRegistry, RowStore,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::controller::QueryController;
use crate::handle::{Bindings, GridHandle, SelectionBinding};
use crate::request::{FetchOutcome, TableChange};
use crate::selection::{SelectionConfig, SelectionProvider};
use crate::source::QuerySource;
use crate::Result;

/// Row store, edit buffers, cell binding, query controller and handle wired
/// together.
///
/// The host drives the grid with lifecycle calls (`mount`/`unmount`),
/// render passes and cell events; everything else goes through the
/// [`GridHandle`].
pub struct EditableGrid {
    rows: RowStore,
    forms: Arc<Mutex<RowFormRegistry>>,
    engine: CellBindingEngine,
    controller: Arc<QueryController>,
    selection: Option<SelectionBinding>,
    handle: Arc<GridHandle>,
}

impl std::fmt::Debug for EditableGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableGrid")
            .field("engine", &self.engine)
            .field("controller", &self.controller)
            .field("rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

impl EditableGrid {
    pub fn new(columns: Vec<Column>, source: Arc<dyn QuerySource>, config: GridConfig) -> Self {
        let rows = RowStore::new();
        let controller = Arc::new(QueryController::new(source, rows.clone(), config));
        Self {
            rows,
            forms: Arc::new(Mutex::new(RowFormRegistry::new())),
            engine: CellBindingEngine::new(columns),
            controller,
            selection: None,
            handle: Arc::new(GridHandle::new()),
        }
    }

    /// Enables row selection through `provider`.
    pub fn with_selection(
        mut self,
        provider: impl SelectionProvider + 'static,
        config: SelectionConfig,
    ) -> Self {
        self.selection = Some(SelectionBinding {
            provider: Arc::new(provider),
            config,
        });
        self.sync_handle();
        self
    }

    /// Registers a listener for committed edits.
    pub fn on_hard_update(&mut self, listener: impl Fn(&HardUpdate) + Send + Sync + 'static) {
        self.engine.on_hard_update(listener);
    }

    /// Streams committed edits into a channel.
    pub fn subscribe_hard_updates(&mut self) -> mpsc::UnboundedReceiver<HardUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.engine.on_hard_update(move |update| {
            if tx.send(update.clone()).is_err() {
                tracing::debug!("Hard update receiver dropped");
            }
        });
        rx
    }

    /// Mounts the grid: attaches the handle and schedules the first fetch.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn mount(&self) {
        self.controller.mount();
        self.sync_handle();
        tracing::info!("Grid mounted with {} columns", self.engine.columns().len());
    }

    /// Unmounts the grid and detaches the handle.
    pub fn unmount(&self) {
        self.controller.unmount();
        self.handle.detach();
        tracing::info!("Grid unmounted");
    }

    /// Re-publishes the grid's live state to the handle while mounted.
    pub fn sync_handle(&self) {
        if !self.controller.is_mounted() {
            return;
        }
        self.handle.bind(Bindings {
            controller: Arc::clone(&self.controller),
            rows: self.rows.clone(),
            forms: Arc::clone(&self.forms),
            selection: self.selection.clone(),
        });
    }

    /// Render pass over the current rows.
    pub fn render(&self) -> Result<Vec<Vec<BoundCell>>> {
        let mut forms = self.forms.lock();
        self.engine.render_page(&self.rows, &mut forms)
    }

    /// Change event on a rendered cell.
    pub fn change(&self, cell: &BoundCell, value: Value) -> Result<Option<HardUpdate>> {
        self.engine.change(cell, value, &self.rows, &self.forms)
    }

    /// Blur event on a rendered cell.
    pub fn blur(&self, cell: &BoundCell) -> Result<Option<HardUpdate>> {
        self.engine.blur(cell, &self.rows)
    }

    /// Table interaction: page, filter or sort change.
    pub async fn table_change(&self, change: TableChange) -> Result<FetchOutcome> {
        self.controller.table_changed(change).await
    }

    pub fn handle(&self) -> Arc<GridHandle> {
        Arc::clone(&self.handle)
    }

    pub fn controller(&self) -> &Arc<QueryController> {
        &self.controller
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        self.engine.columns()
    }
}
