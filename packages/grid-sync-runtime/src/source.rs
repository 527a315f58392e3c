//! Query sources: the host-supplied operation that loads a page.

use std::cmp::Ordering;
use std::future::Future;

use async_trait::async_trait;
use grid_sync_core::Row;
use parking_lot::RwLock;
use serde_json::Value;

use crate::request::{QueryPage, QueryRequest, SortOrder};
use crate::Result;

/// Loads one page for a query request.
///
/// `Ok(None)` means the request was intentionally dropped (e.g. a host that
/// skips the automatic first fetch); it is not an error. An `Err` reaches
/// the caller as [`GridError::QueryFailed`](crate::GridError::QueryFailed).
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<Option<QueryPage>>;
}

#[async_trait]
impl<F, Fut> QuerySource for F
where
    F: Fn(QueryRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<QueryPage>>> + Send + 'static,
{
    async fn query(&self, request: QueryRequest) -> Result<Option<QueryPage>> {
        (self)(request).await
    }
}

/// In-memory source over a fixed row set.
///
/// Applies equality filters and a single-field sort from the request's
/// table changes, then slices the requested page and reports the total.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: RwLock<Vec<Row>>,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Replaces the backing rows.
    pub fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.write() = rows;
    }

    /// Writes a committed value back into the backing rows.
    ///
    /// `index` is the absolute position in the backing set.
    pub fn persist(&self, index: usize, field: &str, value: Value) -> bool {
        match self.rows.write().get_mut(index) {
            Some(row) => {
                row.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Computes the page for `request` synchronously.
    pub fn page(&self, request: &QueryRequest) -> QueryPage {
        let rows = self.rows.read();
        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| match &request.changes {
                Some(changes) => changes.filters.iter().all(|(field, accepted)| {
                    accepted.is_empty()
                        || row.get(field).map_or(false, |value| accepted.contains(value))
                }),
                None => true,
            })
            .collect();

        if let Some(sorter) = request.changes.as_ref().and_then(|c| c.sorter.as_ref()) {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(&sorter.field), b.get(&sorter.field));
                match sorter.order {
                    SortOrder::Ascend => ordering,
                    SortOrder::Descend => ordering.reverse(),
                }
            });
        }

        let total = matched.len() as u64;
        match request.pagination {
            Some(page) => {
                let page_size = page.page_size.max(1);
                let offset = page.current.saturating_sub(1).saturating_mul(page_size);
                let data = matched
                    .into_iter()
                    .skip(offset as usize)
                    .take(page_size as usize)
                    .cloned()
                    .collect();
                QueryPage::new(data).with_paging(page.current, page_size, total)
            }
            None => QueryPage {
                data: matched.into_iter().cloned().collect(),
                total: Some(total),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl QuerySource for MemorySource {
    async fn query(&self, request: QueryRequest) -> Result<Option<QueryPage>> {
        tracing::debug!(
            "Memory source serving request {} ({:?})",
            request.count,
            request.pagination
        );
        Ok(Some(self.page(&request)))
    }
}

/// Orders JSON values: missing and null first, then numbers, strings, and
/// everything else by its JSON text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == rank(b) => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TableChange;
    use grid_sync_core::PageRequest;
    use ntest::timeout;
    use serde_json::json;

    fn source() -> MemorySource {
        MemorySource::new(
            (1..=25)
                .map(|i| {
                    Row::try_from(json!({
                        "id": i,
                        "team": if i % 2 == 0 { "even" } else { "odd" },
                    }))
                    .unwrap()
                })
                .collect(),
        )
    }

    fn request(current: u64, page_size: u64, changes: Option<TableChange>) -> QueryRequest {
        QueryRequest {
            count: 1,
            pagination: Some(PageRequest { current, page_size }),
            payload: None,
            changes,
        }
    }

    fn ids(page: &QueryPage) -> Vec<Value> {
        page.data.iter().map(|r| r.get("id").cloned().unwrap()).collect()
    }

    #[test]
    #[timeout(1000)]
    fn test_slices_pages() {
        let page = source().page(&request(3, 10, None));
        assert_eq!(ids(&page), (21..=25).map(|i| json!(i)).collect::<Vec<_>>());
        assert_eq!(page.total, Some(25));
        assert_eq!(page.current, Some(3));
    }

    #[test]
    #[timeout(1000)]
    fn test_filter_and_sort() {
        let changes = TableChange::page(1, 3)
            .filter("team", vec![json!("even")])
            .sort("id", SortOrder::Descend);
        let page = source().page(&request(1, 3, Some(changes)));
        assert_eq!(ids(&page), vec![json!(24), json!(22), json!(20)]);
        assert_eq!(page.total, Some(12));
    }

    #[test]
    #[timeout(1000)]
    fn test_unpaged_returns_everything() {
        let mut req = request(1, 10, None);
        req.pagination = None;
        let page = source().page(&req);
        assert_eq!(page.data.len(), 25);
        assert_eq!(page.current, None);
    }

    #[test]
    #[timeout(1000)]
    fn test_persist() {
        let source = source();
        assert!(source.persist(0, "team", json!("none")));
        assert!(!source.persist(99, "team", json!("none")));
        let page = source.page(&request(1, 1, None));
        assert_eq!(page.data[0].get("team"), Some(&json!("none")));
    }

    #[test]
    #[timeout(1000)]
    fn test_compare_mixed_values() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("a"))), Ordering::Less);
    }
}
