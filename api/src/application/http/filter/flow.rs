use tracing::debug;

use listfilter_core::domain::common::ListFilterError;
use listfilter_core::domain::filter::{
    DerivedFilter, FilterSchema, apply_default_filters, derive_conditions,
};
use listfilter_core::domain::selection::{
    FlowDecision, PersistConfig, RequestSnapshot, SelectionFlow, SelectionStore,
};
use listfilter_core::infrastructure::selection::PairedSelectionStore;

/// What a list action does after the filter pass.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Send this redirect instead of rendering.
    Redirect(String),
    /// Render the list with these conditions and view values.
    Filtered(DerivedFilter),
}

/// Per-request filter orchestrator for one list action: runs the
/// selection state machine, then applies defaults and derives conditions
/// from whatever query survives it.
#[derive(Debug, Clone)]
pub struct ListFilter {
    schema: FilterSchema,
    flow: SelectionFlow,
    persist: PersistConfig,
}

impl ListFilter {
    pub fn new(schema: FilterSchema) -> Self {
        Self {
            schema,
            flow: SelectionFlow::new(),
            persist: PersistConfig {
                session: true,
                cookie: true,
            },
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.flow = self.flow.with_namespace(namespace);
        self
    }

    /// Restricts which of the passed stores are actually used.
    pub fn with_persistence(mut self, persist: PersistConfig) -> Self {
        self.persist = persist;
        self
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    /// Runs one request through the state machine. `session` is the
    /// server-side store, `cookie` the client-side one; pass `None` for
    /// whichever the host does not wire up. With both present reads
    /// prefer the session store and writes go to both.
    pub async fn handle<P, C>(
        &self,
        req: &RequestSnapshot,
        session: Option<&P>,
        cookie: Option<&C>,
    ) -> Result<Outcome, ListFilterError>
    where
        P: SelectionStore,
        C: SelectionStore,
    {
        let session = if self.persist.session { session } else { None };
        let cookie = if self.persist.cookie { cookie } else { None };

        let decision = match (session, cookie) {
            (Some(session), Some(cookie)) => {
                let paired = PairedSelectionStore::new(session, cookie);
                self.flow.process(req, Some(&paired)).await?
            }
            (Some(session), None) => self.flow.process(req, Some(session)).await?,
            (None, Some(cookie)) => self.flow.process(req, Some(cookie)).await?,
            (None, None) => {
                self.flow
                    .process(req, None::<&PairedSelectionStore<P, C>>)
                    .await?
            }
        };

        match decision {
            FlowDecision::Redirect(url) => {
                debug!("Filter flow for {}.{} redirects to '{}'", req.controller, req.action, url);
                Ok(Outcome::Redirect(url))
            }
            FlowDecision::Proceed => {
                let mut input = req.query.clone();
                apply_default_filters(&self.schema, &mut input);
                Ok(Outcome::Filtered(derive_conditions(&self.schema, &input)))
            }
        }
    }
}
