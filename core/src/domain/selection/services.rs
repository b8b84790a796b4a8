use tracing::debug;

use crate::domain::common::entities::ListFilterError;
use crate::domain::filter::value_objects::{
    DIRECTION_PARAM, FilterInput, FilterValue, PAGE_PARAM, REDIRECT_MARKER, RESET_PARAM, SORT_PARAM,
};
use crate::domain::selection::entities::{PaginationCursor, PersistedSelection};
use crate::domain::selection::ports::SelectionStore;
use crate::domain::selection::value_objects::{FlowDecision, HttpMethod, RequestSnapshot, SelectionKey};

/// Default namespace under which selections are stored.
pub const DEFAULT_NAMESPACE: &str = "ListFilter";

/// Drives the selection state machine for one request: turns form
/// submissions into bookmarkable GET URLs, replays stored selections on
/// plain visits and honors the reset flag. Pass `None` for the store to
/// run without persistence.
#[derive(Debug, Clone)]
pub struct SelectionFlow {
    namespace: String,
}

impl Default for SelectionFlow {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl SelectionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Store key for the route the request addresses.
    pub fn key_for(&self, req: &RequestSnapshot) -> SelectionKey {
        SelectionKey::new(&self.namespace, req.plugin.as_deref(), &req.controller, &req.action)
    }

    pub async fn process<S: SelectionStore>(
        &self,
        req: &RequestSnapshot,
        store: Option<&S>,
    ) -> Result<FlowDecision, ListFilterError> {
        let key = self.key_for(req).dotted();

        // A submitted form becomes a GET redirect so the filtered list is
        // bookmarkable. An all-blank submission clears the selection.
        if req.method == HttpMethod::Post
            && let Some(posted) = &req.posted
        {
            let params = posted.to_query_params();
            if params.is_empty() {
                if let Some(store) = store {
                    store.delete(&key).await?;
                }
                return Ok(FlowDecision::Redirect(req.path.clone()));
            }
            // Pagination restarts at page 1 after a filter change.
            let cursor = PaginationCursor::from_input(&req.query).without_page();
            if let Some(store) = store {
                store
                    .write(&key, &PersistedSelection::new(params.clone(), cursor.clone()))
                    .await?;
            }
            return Ok(FlowDecision::Redirect(build_redirect_url(&req.path, &params, &cursor, false)));
        }

        if req.query.get(RESET_PARAM).is_some() {
            debug!("Filter reset requested for '{}'", key);
            if let Some(store) = store {
                store.delete(&key).await?;
            }
            return Ok(FlowDecision::Redirect(req.path.clone()));
        }

        if req.query.has_filter_params() {
            // Keep the stored selection in sync with the URL the user is on.
            if let Some(store) = store {
                let selection =
                    PersistedSelection::new(req.query.filter_params(), PaginationCursor::from_input(&req.query));
                store.write(&key, &selection).await?;
            }
            return Ok(FlowDecision::Proceed);
        }

        // Arriving through a replay redirect with no filters left means the
        // selection was cleared client-side.
        if req.query.get(REDIRECT_MARKER).is_some() {
            if let Some(store) = store {
                store.delete(&key).await?;
            }
            return Ok(FlowDecision::Proceed);
        }

        if let Some(store) = store
            && let Some(stored) = store.read(&key).await?
            && !stored.is_empty()
        {
            let cursor = stored.cursor.merge(&PaginationCursor::from_input(&req.query));
            store
                .write(&key, &PersistedSelection::new(stored.params.clone(), cursor.clone()))
                .await?;
            debug!("Replaying stored filter selection for '{}'", key);
            return Ok(FlowDecision::Redirect(build_redirect_url(&req.path, &stored.params, &cursor, true)));
        }

        Ok(FlowDecision::Proceed)
    }
}

fn render_pairs(params: &[(String, FilterValue)], cursor: &PaginationCursor) -> Vec<String> {
    let mut pairs = Vec::new();
    for (name, value) in params {
        match value {
            FilterValue::Single(v) => pairs.push(format!("{name}={}", urlencoding::encode(v))),
            FilterValue::Many(values) => pairs.extend(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("{name}[{i}]={}", urlencoding::encode(v))),
            ),
        }
    }
    if let Some(page) = &cursor.page {
        pairs.push(format!("{PAGE_PARAM}={}", urlencoding::encode(page)));
    }
    if let Some(sort) = &cursor.sort {
        pairs.push(format!("{SORT_PARAM}={}", urlencoding::encode(sort)));
    }
    if let Some(direction) = &cursor.direction {
        pairs.push(format!("{DIRECTION_PARAM}={}", urlencoding::encode(direction)));
    }
    pairs
}

/// GET URL equivalent to a filter selection. With `with_marker` the URL
/// carries `Filterredirect=1` so the receiving request is not replayed
/// again. Multi-valued parameters render as `name[0]=a&name[1]=b`.
pub fn build_redirect_url(
    path: &str,
    params: &[(String, FilterValue)],
    cursor: &PaginationCursor,
    with_marker: bool,
) -> String {
    let mut pairs = render_pairs(params, cursor);
    if with_marker {
        pairs.push(format!("{REDIRECT_MARKER}=1"));
    }
    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", pairs.join("&"))
    }
}

/// Appends the active filter and pagination parameters to a URL, e.g. for
/// a "back to list" link on a detail page.
pub fn add_persistent_params(url: &str, query: &FilterInput) -> String {
    let pairs = render_pairs(&query.filter_params(), &PaginationCursor::from_input(query));
    if pairs.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", pairs.join("&"))
}
