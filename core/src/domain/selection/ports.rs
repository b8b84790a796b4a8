use std::future::Future;

use crate::domain::common::entities::ListFilterError;
use crate::domain::selection::entities::PersistedSelection;

/// Backing store for persisted filter selections, keyed by the dotted
/// selection key. Session and cookie backends implement this.
#[cfg_attr(test, mockall::automock)]
pub trait SelectionStore: Send + Sync {
    fn read(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<PersistedSelection>, ListFilterError>> + Send;

    fn write(
        &self,
        key: &str,
        selection: &PersistedSelection,
    ) -> impl Future<Output = Result<(), ListFilterError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), ListFilterError>> + Send;
}
