use std::sync::Arc;
use std::time::Instant;

use flume::Sender;
use patchvault_core::context::QueryTag;
use patchvault_core::errors::{ExError, ExErrorKind};
use patchvault_core::{log_op_end, log_op_error, log_op_start};
use patchvault_core::{PatchFilter, PatchHolder, PatchStore};
use patchvault_core_types::QueryId;

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub filter: PatchFilter,
    pub skip: usize,
    pub limit: usize,
}

/// One page plus the total the filter matches
#[derive(Debug, Clone)]
pub struct Page {
    pub total: usize,
    pub patches: Vec<PatchHolder>,
}

/// Answer to a page query, tagged with the session state it was issued for
#[derive(Debug, Clone)]
pub struct PageResult {
    pub query_id: QueryId,
    pub tag: QueryTag,
    pub page: Result<Page, ExError>,
}

fn fetch(store: &dyn PatchStore, request: &PageRequest) -> Result<Page, ExError> {
    let total = store.count(&request.filter)?;
    let patches = store.paged_fetch(&request.filter, request.skip, request.limit)?;
    Ok(Page { total, patches })
}

/// Run a count plus paged fetch off the calling thread
///
/// The result is delivered on `results`; the returned id matches
/// [`PageResult::query_id`].
///
/// # Errors
///
/// Returns `Internal` when the worker thread cannot be spawned.
pub fn spawn_page_query(
    store: Arc<dyn PatchStore>,
    request: PageRequest,
    tag: QueryTag,
    results: Sender<PageResult>,
) -> Result<QueryId, ExError> {
    let query_id = QueryId::new();
    let worker_query_id = query_id.clone();

    std::thread::Builder::new()
        .name("page-query".into())
        .spawn(move || {
            let op = "page_query";
            log_op_start!(
                op,
                query_id = %worker_query_id,
                variant = %request.filter.variant,
                skip = request.skip,
                limit = request.limit
            );
            let start = Instant::now();
            let page = fetch(store.as_ref(), &request);
            match &page {
                Ok(page) => {
                    log_op_end!(
                        op,
                        duration_ms = start.elapsed().as_millis() as u64,
                        query_id = %worker_query_id,
                        total = page.total
                    );
                }
                Err(e) => {
                    log_op_error!(
                        op,
                        e.clone(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        query_id = %worker_query_id
                    );
                }
            }
            // The receiver is gone when the engine was dropped meanwhile
            let _ = results.send(PageResult {
                query_id: worker_query_id,
                tag,
                page,
            });
        })
        .map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("spawn_page_query")
                .with_message(e.to_string())
        })?;

    Ok(query_id)
}
