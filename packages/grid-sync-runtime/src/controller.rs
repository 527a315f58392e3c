//! Query controller: pagination, loading state, and result reconciliation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grid_sync_core::{
    GridConfig, GridError, PagePatch, PageRequest, PageState, Pagination, ResponseOrdering,
    RowStore,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::request::{FetchOutcome, QueryArgs, QueryRequest, TableChange};
use crate::source::QuerySource;
use crate::Result;

/// Mutable controller state, always accessed under one lock.
#[derive(Debug)]
struct ControllerState {
    /// Committed pagination
    pagination: Pagination,
    /// Last caller payload
    payload: Option<Value>,
    /// Requests issued in the current mount
    counter: u64,
    /// Bumped on every mount
    epoch: u64,
    mounted: bool,
}

/// Keeps the loading flag raised for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::AcqRel);
        Self(in_flight)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Turns mount, refresh and table events into source queries and applies
/// their results to the row store.
///
/// Results are applied only while the controller is mounted and in the
/// mount epoch the request was issued in. With
/// [`ResponseOrdering::LatestIssued`] a result is also dropped once a newer
/// request has been issued.
pub struct QueryController {
    source: Arc<dyn QuerySource>,
    rows: RowStore,
    config: GridConfig,
    state: Mutex<ControllerState>,
    in_flight: AtomicUsize,
    initial_fetch: Mutex<Option<JoinHandle<()>>>,
    applied: watch::Sender<u64>,
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("state", &*self.state.lock())
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .finish()
    }
}

impl QueryController {
    pub fn new(source: Arc<dyn QuerySource>, rows: RowStore, config: GridConfig) -> Self {
        let (applied, _) = watch::channel(rows.generation());
        Self {
            source,
            rows,
            state: Mutex::new(ControllerState {
                pagination: initial_pagination(&config),
                payload: None,
                counter: 0,
                epoch: 0,
                mounted: false,
            }),
            config,
            in_flight: AtomicUsize::new(0),
            initial_fetch: Mutex::new(None),
            applied,
        }
    }

    /// Marks the controller mounted and schedules the automatic first fetch
    /// after the configured delay.
    ///
    /// Every mount starts from fresh state. A fetch still pending from an
    /// earlier mount is cancelled, so a quick mount/unmount/mount cycle
    /// issues one fetch.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn mount(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.mounted = true;
            state.epoch += 1;
            state.counter = 0;
            state.payload = None;
            state.pagination = initial_pagination(&self.config);
            tracing::debug!("Query controller mounted (epoch {})", state.epoch);
        }

        let controller = Arc::clone(self);
        let delay = self.config.initial_fetch_delay();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match controller.fetch(QueryArgs::default()).await {
                Ok(outcome) => tracing::debug!("Initial fetch finished: {:?}", outcome),
                Err(e) => tracing::warn!("Initial fetch failed: {}", e),
            }
        });

        if let Some(previous) = self.initial_fetch.lock().replace(task) {
            previous.abort();
        }
    }

    /// Tears the controller down. Results still in flight are discarded
    /// when they resolve; a pending automatic fetch is cancelled.
    pub fn unmount(&self) {
        {
            let mut state = self.state.lock();
            state.mounted = false;
            state.counter = 0;
            tracing::debug!("Query controller unmounted (epoch {})", state.epoch);
        }
        if let Some(task) = self.initial_fetch.lock().take() {
            task.abort();
        }
    }

    /// Issues one query.
    ///
    /// Pagination comes from `args` (missing fields filled from the
    /// committed state), else from the committed state. The payload comes
    /// from `args`, else the cached one; a supplied payload is cached.
    ///
    /// # Errors
    /// Source failures are reported as [`GridError::QueryFailed`]. The
    /// loading flag is cleared on every path.
    pub async fn fetch(&self, args: QueryArgs) -> Result<FetchOutcome> {
        let (request, epoch) = {
            let mut state = self.state.lock();
            state.counter += 1;
            if args.payload.is_some() {
                state.payload = args.payload;
            }
            let pagination = match args.pagination {
                Some(patch) => Some(self.resolve_page(&state.pagination, &patch)),
                None => state.pagination.request(),
            };
            let request = QueryRequest {
                count: state.counter,
                pagination,
                payload: state.payload.clone(),
                changes: args.changes,
            };
            (request, state.epoch)
        };
        self.dispatch(request, epoch).await
    }

    /// Re-queries from page 1, keeping the last page size and payload
    /// unless `args` overrides them.
    ///
    /// The committed pagination moves only if the result is applied.
    pub async fn refresh(&self, args: QueryArgs) -> Result<FetchOutcome> {
        let page_size = args.pagination.and_then(|p| p.page_size);
        let mut target = self.state.lock().pagination;
        let first = target.reset_to_first(page_size);
        let args = QueryArgs {
            pagination: first.map(|page| PagePatch {
                current: Some(page.current),
                page_size: Some(page.page_size),
                total: None,
            }),
            ..args
        };
        self.fetch(args).await
    }

    /// Queries for a table interaction (page, filter or sort change).
    ///
    /// The table's reported position is used as-is, minus any total; the
    /// cached payload is reused.
    pub async fn table_changed(&self, mut change: TableChange) -> Result<FetchOutcome> {
        change.pagination.total = None;
        let pagination = if change.pagination.is_empty() {
            None
        } else {
            Some(change.pagination)
        };
        self.fetch(QueryArgs {
            pagination,
            payload: None,
            changes: Some(change),
        })
        .await
    }

    async fn dispatch(&self, request: QueryRequest, epoch: u64) -> Result<FetchOutcome> {
        let count = request.count;
        let requested = request.pagination;
        tracing::debug!(
            "Issuing query {} (pagination: {:?})",
            count,
            request.pagination
        );

        let _loading = LoadingGuard::new(&self.in_flight);
        let page = match self.source.query(request).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                tracing::debug!("Query {} aborted by source", count);
                return Ok(FetchOutcome::Aborted);
            }
            Err(e) => {
                tracing::warn!("Query {} failed: {}", count, e);
                return Err(match e {
                    GridError::QueryFailed(_) => e,
                    other => GridError::QueryFailed(other.to_string()),
                });
            }
        };

        let mut state = self.state.lock();
        if !state.mounted || state.epoch != epoch {
            tracing::debug!("Discarding query {} resolved after unmount", count);
            return Ok(FetchOutcome::Discarded);
        }
        let latest_only = self.config.response_ordering == ResponseOrdering::LatestIssued;
        if latest_only && state.counter != count {
            tracing::debug!(
                "Discarding query {} superseded by query {}",
                count,
                state.counter
            );
            return Ok(FetchOutcome::Superseded);
        }

        let rows = page.data.len();
        let patch = page.patch();
        self.rows.replace(page.data);
        if let Some(requested) = &requested {
            state.pagination.settle(requested);
        }
        state.pagination.merge(&patch);
        drop(state);

        self.applied.send_replace(self.rows.generation());
        tracing::debug!("Applied query {} ({} rows)", count, rows);
        Ok(FetchOutcome::Applied { count, rows })
    }

    fn resolve_page(&self, committed: &Pagination, patch: &PagePatch) -> PageRequest {
        let base = committed
            .state()
            .copied()
            .unwrap_or_else(|| PageState::first(self.config.default_page_size));
        PageRequest {
            current: patch.current.unwrap_or(base.current),
            page_size: patch.page_size.unwrap_or(base.page_size),
        }
    }

    /// Committed pagination.
    pub fn pagination(&self) -> Pagination {
        self.state.lock().pagination
    }

    /// True while any query is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Requests issued since the last mount.
    pub fn request_count(&self) -> u64 {
        self.state.lock().counter
    }

    /// Cached caller payload.
    pub fn payload(&self) -> Option<Value> {
        self.state.lock().payload.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    /// Row store results are applied to.
    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    /// Watches applied results; the value is the row store generation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.applied.subscribe()
    }
}

fn initial_pagination(config: &GridConfig) -> Pagination {
    if config.pagination_enabled {
        Pagination::first_page(config.default_page_size)
    } else {
        Pagination::Disabled
    }
}
