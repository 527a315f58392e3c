//! Core state for editable, paginated data grids.
//!
//! Provides the shared row store with backup fields, pagination state,
//! the per-row edit buffer registry, and the cell binding engine that
//! reconciles soft and hard edits.

pub mod binding;
pub mod config;
pub mod error;
pub mod pagination;
pub mod registry;
pub mod row;

pub use binding::{BoundCell, CellBindingEngine, CellKind, Column, HardUpdate};
pub use config::{GridConfig, ResponseOrdering};
pub use error::{GridError, Result};
pub use pagination::{PagePatch, PageRequest, PageState, Pagination};
pub use registry::{EditBuffer, RowFormRegistry};
pub use row::{Row, RowStore};
