use serde::{Deserialize, Serialize};

use crate::domain::filter::value_objects::{DIRECTION_PARAM, FilterInput, FilterValue, PAGE_PARAM, SORT_PARAM};

/// The pagination state carried along with a filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl PaginationCursor {
    pub fn from_input(input: &FilterInput) -> Self {
        let scalar = |name: &str| {
            input
                .get(name)
                .and_then(FilterValue::as_single)
                .map(str::to_string)
        };
        Self {
            page: scalar(PAGE_PARAM),
            sort: scalar(SORT_PARAM),
            direction: scalar(DIRECTION_PARAM),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.sort.is_none() && self.direction.is_none()
    }

    /// Fields present in `current` win over the stored ones.
    pub fn merge(&self, current: &PaginationCursor) -> Self {
        Self {
            page: current.page.clone().or_else(|| self.page.clone()),
            sort: current.sort.clone().or_else(|| self.sort.clone()),
            direction: current.direction.clone().or_else(|| self.direction.clone()),
        }
    }

    /// Pagination restarts after a filter change, ordering is kept.
    pub fn without_page(&self) -> Self {
        Self {
            page: None,
            sort: self.sort.clone(),
            direction: self.direction.clone(),
        }
    }
}

/// A stored filter selection: the raw parameters as submitted, before any
/// condition derivation, plus the pagination cursor to restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSelection {
    pub params: Vec<(String, FilterValue)>,
    #[serde(default)]
    pub cursor: PaginationCursor,
}

impl PersistedSelection {
    pub fn new(params: Vec<(String, FilterValue)>, cursor: PaginationCursor) -> Self {
        Self { params, cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
