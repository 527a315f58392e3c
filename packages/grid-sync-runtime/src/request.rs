//! Query request and response types exchanged with the query source.

use std::collections::BTreeMap;

use grid_sync_core::{PagePatch, PageRequest, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction reported by a table interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascend,
    Descend,
}

/// Active sort of a table interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub field: String,
    pub order: SortOrder,
}

/// Filter, sort and pagination state reported by a table interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChange {
    /// Position the table moved to; its total, if any, is never sent upstream
    #[serde(default)]
    pub pagination: PagePatch,
    /// Accepted values per field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorter: Option<Sorter>,
}

impl TableChange {
    /// A page change to `current` with `page_size` rows.
    pub fn page(current: u64, page_size: u64) -> Self {
        Self {
            pagination: PagePatch {
                current: Some(current),
                page_size: Some(page_size),
                total: None,
            },
            ..Default::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.insert(field.into(), values);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sorter = Some(Sorter {
            field: field.into(),
            order,
        });
        self
    }
}

/// One logical query sent to the query source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// 1-based sequence number within the current mount
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
    /// Caller context, reused from the last request that carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<TableChange>,
}

/// A page of rows returned by the query source.
///
/// Paging fields that are present override the grid's pagination; absent
/// ones leave it as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl QueryPage {
    pub fn new(data: Vec<Row>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_paging(mut self, current: u64, page_size: u64, total: u64) -> Self {
        self.current = Some(current);
        self.page_size = Some(page_size);
        self.total = Some(total);
        self
    }

    /// Paging metadata carried by this page.
    pub fn patch(&self) -> PagePatch {
        PagePatch {
            current: self.current,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

/// Caller arguments for a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    /// Explicit position; on refresh only the page size is honoured
    pub pagination: Option<PagePatch>,
    pub payload: Option<Value>,
    pub changes: Option<TableChange>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn page(mut self, current: u64, page_size: u64) -> Self {
        self.pagination = Some(PagePatch {
            current: Some(current),
            page_size: Some(page_size),
            total: None,
        });
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.pagination = Some(PagePatch {
            page_size: Some(page_size),
            ..self.pagination.unwrap_or_default()
        });
        self
    }
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Result applied to the row set
    Applied { count: u64, rows: usize },
    /// Source returned no page; nothing changed
    Aborted,
    /// Grid was unmounted or remounted while the request was in flight
    Discarded,
    /// A newer request was issued while this one was in flight
    Superseded,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
