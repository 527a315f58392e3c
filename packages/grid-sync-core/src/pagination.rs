//! Pagination state shared between the grid and its query source.

use serde::{Deserialize, Serialize};

/// Committed page position, as last confirmed by a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// Current page number (1-indexed)
    pub current: u64,
    /// Rows per page
    pub page_size: u64,
    /// Total rows in the data source, when the source reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PageState {
    /// Creates a page state on page 1 with no known total.
    pub fn first(page_size: u64) -> Self {
        Self {
            current: 1,
            page_size,
            total: None,
        }
    }

    /// Total number of pages, if the total is known.
    pub fn total_pages(&self) -> Option<u64> {
        let page_size = self.page_size.max(1);
        self.total
            .map(|total| total.saturating_add(page_size - 1) / page_size)
            .map(|pages| pages.max(1))
    }

    /// Number of rows preceding the current page.
    pub fn offset(&self) -> u64 {
        self.current.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Whether a next page exists. Unknown totals allow paging forward.
    pub fn can_go_next(&self) -> bool {
        self.total_pages()
            .map_or(true, |pages| self.current < pages)
    }

    /// Whether a previous page exists.
    pub fn can_go_prev(&self) -> bool {
        self.current > 1
    }

    /// The upstream view of this state: position only, never the total.
    pub fn request(&self) -> PageRequest {
        PageRequest {
            current: self.current,
            page_size: self.page_size,
        }
    }
}

/// Page position sent to the query source.
///
/// Carries no total: totals are only ever received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub current: u64,
    pub page_size: u64,
}

/// Partial paging metadata; present fields override, absent ones keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PagePatch {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.page_size.is_none() && self.total.is_none()
    }
}

/// Pagination mode of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Pagination {
    /// No paging; every row is shown.
    Disabled,
    /// Page-based paging.
    Paged(PageState),
}

impl Pagination {
    /// Paged state on page 1.
    pub fn first_page(page_size: u64) -> Self {
        Self::Paged(PageState::first(page_size))
    }

    /// Returns the page state if paging is enabled.
    pub fn state(&self) -> Option<&PageState> {
        match self {
            Self::Paged(state) => Some(state),
            Self::Disabled => None,
        }
    }

    /// Upstream request for the committed position, total stripped.
    pub fn request(&self) -> Option<PageRequest> {
        self.state().map(PageState::request)
    }

    /// Merges fields present in `patch`. Disabled pagination stays disabled.
    pub fn merge(&mut self, patch: &PagePatch) {
        if let Self::Paged(state) = self {
            if let Some(current) = patch.current {
                state.current = current;
            }
            if let Some(page_size) = patch.page_size {
                state.page_size = page_size;
            }
            if let Some(total) = patch.total {
                state.total = Some(total);
            }
        }
    }

    /// Adopts the position of an applied request. The total is kept.
    pub fn settle(&mut self, request: &PageRequest) {
        if let Self::Paged(state) = self {
            state.current = request.current;
            state.page_size = request.page_size;
        }
    }

    /// Moves back to page 1, optionally changing the page size.
    ///
    /// Returns the resulting upstream request, or `None` when disabled.
    pub fn reset_to_first(&mut self, page_size: Option<u64>) -> Option<PageRequest> {
        match self {
            Self::Paged(state) => {
                state.current = 1;
                if let Some(page_size) = page_size {
                    state.page_size = page_size;
                }
                Some(state.request())
            }
            Self::Disabled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[test]
    #[timeout(1000)]
    fn test_merge_only_present_fields() {
        let mut pagination = Pagination::Paged(PageState {
            current: 3,
            page_size: 20,
            total: Some(100),
        });
        pagination.merge(&PagePatch {
            total: Some(42),
            ..Default::default()
        });
        assert_eq!(
            pagination.state(),
            Some(&PageState {
                current: 3,
                page_size: 20,
                total: Some(42),
            })
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_request_strips_total() {
        let pagination = Pagination::Paged(PageState {
            current: 2,
            page_size: 10,
            total: Some(55),
        });
        let json = serde_json::to_value(pagination.request().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"current": 2, "pageSize": 10}));
    }

    #[test]
    #[timeout(1000)]
    fn test_reset_to_first_keeps_page_size() {
        let mut pagination = Pagination::Paged(PageState {
            current: 4,
            page_size: 25,
            total: Some(200),
        });
        let request = pagination.reset_to_first(None).unwrap();
        assert_eq!(request, PageRequest { current: 1, page_size: 25 });

        let request = pagination.reset_to_first(Some(50)).unwrap();
        assert_eq!(request.page_size, 50);
    }

    #[test]
    #[timeout(1000)]
    fn test_settle_keeps_total() {
        let mut pagination = Pagination::Paged(PageState {
            current: 3,
            page_size: 5,
            total: Some(25),
        });
        pagination.settle(&PageRequest {
            current: 1,
            page_size: 50,
        });
        assert_eq!(
            pagination.state(),
            Some(&PageState {
                current: 1,
                page_size: 50,
                total: Some(25),
            })
        );

        let mut disabled = Pagination::Disabled;
        disabled.settle(&PageRequest {
            current: 2,
            page_size: 10,
        });
        assert_eq!(disabled, Pagination::Disabled);
    }

    #[test]
    #[timeout(1000)]
    fn test_disabled_ignores_merge() {
        let mut pagination = Pagination::Disabled;
        pagination.merge(&PagePatch {
            current: Some(2),
            ..Default::default()
        });
        assert_eq!(pagination, Pagination::Disabled);
        assert!(pagination.reset_to_first(None).is_none());
    }

    #[test]
    #[timeout(1000)]
    fn test_page_math() {
        let state = PageState {
            current: 3,
            page_size: 10,
            total: Some(25),
        };
        assert_eq!(state.total_pages(), Some(3));
        assert_eq!(state.offset(), 20);
        assert!(!state.can_go_next());
        assert!(state.can_go_prev());

        let empty = PageState {
            current: 1,
            page_size: 10,
            total: Some(0),
        };
        assert_eq!(empty.total_pages(), Some(1));
        assert!(PageState::first(10).can_go_next());
    }
}
