//! Async runtime for editable data grids.
//!
//! Drives the query source, applies results to the shared row store, and
//! exposes the imperative [`GridHandle`] and row selection to the host.

mod controller;
mod grid;
mod handle;
pub mod request;
pub mod selection;
pub mod source;

pub use controller::QueryController;
pub use grid::EditableGrid;
pub use grid_sync_core::GridError;
pub use handle::GridHandle;
pub use request::{
    FetchOutcome, QueryArgs, QueryPage, QueryRequest, SortOrder, Sorter, TableChange,
};
pub use selection::{
    KeyedSelection, SelectionActions, SelectionConfig, SelectionMode, SelectionProvider,
    SelectionState, SelectionView,
};
pub use source::{MemorySource, QuerySource};

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, GridError>;
