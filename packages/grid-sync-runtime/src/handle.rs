//! Imperative handle exposed to the host.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use grid_sync_core::{GridError, Pagination, Row, RowFormRegistry, RowStore};
use parking_lot::Mutex;

use crate::controller::QueryController;
use crate::request::{FetchOutcome, QueryArgs};
use crate::selection::{SelectionConfig, SelectionProvider, SelectionView};
use crate::Result;

/// Selection capability wired into a grid.
#[derive(Clone)]
pub(crate) struct SelectionBinding {
    pub(crate) provider: Arc<dyn SelectionProvider>,
    pub(crate) config: SelectionConfig,
}

/// Live state a mounted grid publishes to its handle.
#[derive(Clone)]
pub(crate) struct Bindings {
    pub(crate) controller: Arc<QueryController>,
    pub(crate) rows: RowStore,
    pub(crate) forms: Arc<Mutex<RowFormRegistry>>,
    pub(crate) selection: Option<SelectionBinding>,
}

/// Long-lived handle to a grid.
///
/// The handle object is created once and never replaced; the grid
/// re-publishes its bindings on mount and detaches them on unmount. While
/// detached, mutating operations fail with [`GridError::Detached`] and reads
/// return empty values.
pub struct GridHandle {
    bindings: ArcSwapOption<Bindings>,
}

impl Default for GridHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GridHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl GridHandle {
    pub fn new() -> Self {
        Self {
            bindings: ArcSwapOption::empty(),
        }
    }

    pub(crate) fn bind(&self, bindings: Bindings) {
        self.bindings.store(Some(Arc::new(bindings)));
    }

    pub(crate) fn detach(&self) {
        self.bindings.store(None);
    }

    pub fn is_attached(&self) -> bool {
        self.bindings.load().is_some()
    }

    fn bound(&self) -> Result<Arc<Bindings>> {
        self.bindings.load_full().ok_or(GridError::Detached)
    }

    /// Re-queries from page 1 with optional overrides.
    ///
    /// # Errors
    /// [`GridError::Detached`] when the grid is not mounted, otherwise the
    /// query source's error.
    pub async fn query(&self, args: QueryArgs) -> Result<FetchOutcome> {
        let bindings = self.bound()?;
        bindings.controller.refresh(args).await
    }

    /// Current rows.
    pub fn data(&self) -> Vec<Row> {
        self.bindings
            .load_full()
            .map(|b| b.rows.snapshot())
            .unwrap_or_default()
    }

    /// Restores every backed-up field and resets the edit buffers.
    ///
    /// Returns the number of fields restored.
    pub fn reset_forms(&self) -> Result<usize> {
        let bindings = self.bound()?;
        let restored = bindings.forms.lock().reset_all(&bindings.rows);
        tracing::debug!("Reset forms, {} fields restored", restored);
        Ok(restored)
    }

    /// Selection view for the current rows, if selection is configured.
    pub fn selection(&self) -> Option<SelectionView> {
        let bindings = self.bindings.load_full()?;
        let selection = bindings.selection.as_ref()?;
        Some(
            selection
                .provider
                .selection(&bindings.rows.snapshot(), &selection.config),
        )
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.bindings.load_full().map(|b| b.controller.pagination())
    }

    pub fn is_loading(&self) -> bool {
        self.bindings
            .load_full()
            .map_or(false, |b| b.controller.is_loading())
    }

    /// Number of live edit buffers.
    pub fn form_count(&self) -> usize {
        match self.bindings.load_full() {
            Some(bindings) => {
                let forms = bindings.forms.lock();
                forms.iter().count()
            }
            None => 0,
        }
    }

    /// Edit buffer ids in row order.
    pub fn form_ids(&self) -> Vec<u64> {
        match self.bindings.load_full() {
            Some(bindings) => {
                let forms = bindings.forms.lock();
                forms.iter().map(|buffer| buffer.id()).collect()
            }
            None => Vec::new(),
        }
    }
}
