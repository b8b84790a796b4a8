use crate::domain::common::entities::ListFilterError;
use crate::domain::selection::entities::PersistedSelection;
use crate::domain::selection::ports::SelectionStore;

/// Couples two stores so session and cookie persistence can run side by
/// side. Reads prefer the primary and fall back to the secondary, writes
/// and deletes hit both.
pub struct PairedSelectionStore<'a, P, S> {
    primary: &'a P,
    secondary: &'a S,
}

impl<'a, P, S> PairedSelectionStore<'a, P, S>
where
    P: SelectionStore,
    S: SelectionStore,
{
    pub fn new(primary: &'a P, secondary: &'a S) -> Self {
        Self { primary, secondary }
    }
}

impl<P, S> SelectionStore for PairedSelectionStore<'_, P, S>
where
    P: SelectionStore,
    S: SelectionStore,
{
    async fn read(&self, key: &str) -> Result<Option<PersistedSelection>, ListFilterError> {
        if let Some(selection) = self.primary.read(key).await? {
            return Ok(Some(selection));
        }
        self.secondary.read(key).await
    }

    async fn write(&self, key: &str, selection: &PersistedSelection) -> Result<(), ListFilterError> {
        self.primary.write(key, selection).await?;
        self.secondary.write(key, selection).await
    }

    async fn delete(&self, key: &str) -> Result<(), ListFilterError> {
        self.primary.delete(key).await?;
        self.secondary.delete(key).await
    }
}
