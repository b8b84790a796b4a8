use std::fmt;
use std::sync::Arc;

use crate::domain::filter::value_objects::Conjunction;

/// How a configured field interprets its submitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    /// Substring match. `*` in the input acts as a wildcard.
    #[default]
    Wildcard,
    /// Tokenized search for every term across one or more columns.
    Fulltext,
    /// Exact match against a configured option list.
    Select,
    /// Set membership against a configured option list.
    MultipleSelect,
    /// Date range bounded by `_from` / `_to` companion parameters.
    BetweenDates,
    /// Lower-bounded date comparison.
    AfterDate,
}

/// A selectable option, either standalone or grouped under a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionItem {
    Entry {
        value: String,
        label: String,
    },
    Group {
        label: String,
        entries: Vec<(String, String)>,
    },
}

/// Ordered option list for select-style fields. Groups only affect
/// rendering; validation works on the flattened values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    items: Vec<OptionItem>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.items.push(OptionItem::Entry {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    pub fn group(mut self, label: impl Into<String>, entries: &[(&str, &str)]) -> Self {
        self.items.push(OptionItem::Group {
            label: label.into(),
            entries: entries
                .iter()
                .map(|(value, text)| (value.to_string(), text.to_string()))
                .collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[OptionItem] {
        &self.items
    }

    /// Groups collapsed away, order preserved.
    pub fn flatten(&self) -> Vec<(&str, &str)> {
        let mut flat = Vec::new();
        for item in &self.items {
            match item {
                OptionItem::Entry { value, label } => flat.push((value.as_str(), label.as_str())),
                OptionItem::Group { entries, .. } => {
                    flat.extend(entries.iter().map(|(value, label)| (value.as_str(), label.as_str())));
                }
            }
        }
        flat
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.flatten().iter().any(|(v, _)| *v == value)
    }
}

/// One search term after tokenization. `AnyOf` carries alternatives that
/// are ORed together, e.g. a synonym expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    One(String),
    AnyOf(Vec<String>),
}

impl Term {
    pub fn alternatives(&self) -> &[String] {
        match self {
            Term::One(term) => std::slice::from_ref(term),
            Term::AnyOf(terms) => terms,
        }
    }
}

impl From<&str> for Term {
    fn from(term: &str) -> Self {
        Term::One(term.to_string())
    }
}

impl From<String> for Term {
    fn from(term: String) -> Self {
        Term::One(term)
    }
}

/// Rewrites tokenized fulltext terms before conditions are built, e.g. to
/// expand synonyms or drop stop words.
pub type TermsCallback = Arc<dyn Fn(Vec<String>) -> Vec<Term> + Send + Sync>;

/// Behavior of a single filterable field.
#[derive(Clone)]
pub struct FilterField {
    pub search_type: SearchType,
    pub options: OptionSet,
    /// Columns searched by fulltext fields. Empty means the field itself.
    pub search_fields: Vec<String>,
    /// Overrides the column expression used in conditions.
    pub condition_field: Option<String>,
    pub terms_callback: Option<TermsCallback>,
    pub label: Option<String>,
    /// Hidden fields still derive conditions but render no widget.
    pub show_form_field: bool,
    /// Whether select widgets offer a blank first option.
    pub empty: bool,
    /// Applied when the request carries no value for the field. The
    /// sentinel `"all"` clears it.
    pub default_value: Option<String>,
    /// Year span offered by date selects, inclusive.
    pub year_range: Option<(i32, i32)>,
}

impl Default for FilterField {
    fn default() -> Self {
        Self {
            search_type: SearchType::default(),
            options: OptionSet::default(),
            search_fields: Vec::new(),
            condition_field: None,
            terms_callback: None,
            label: None,
            show_form_field: true,
            empty: true,
            default_value: None,
            year_range: None,
        }
    }
}

impl fmt::Debug for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterField")
            .field("search_type", &self.search_type)
            .field("options", &self.options)
            .field("search_fields", &self.search_fields)
            .field("condition_field", &self.condition_field)
            .field("terms_callback", &self.terms_callback.is_some())
            .field("label", &self.label)
            .field("show_form_field", &self.show_form_field)
            .field("empty", &self.empty)
            .field("default_value", &self.default_value)
            .field("year_range", &self.year_range)
            .finish()
    }
}

impl FilterField {
    pub fn wildcard() -> Self {
        Self::default()
    }

    pub fn fulltext() -> Self {
        Self {
            search_type: SearchType::Fulltext,
            ..Self::default()
        }
    }

    pub fn select(options: OptionSet) -> Self {
        Self {
            search_type: SearchType::Select,
            options,
            ..Self::default()
        }
    }

    pub fn multiple_select(options: OptionSet) -> Self {
        Self {
            search_type: SearchType::MultipleSelect,
            options,
            ..Self::default()
        }
    }

    pub fn between_dates() -> Self {
        Self {
            search_type: SearchType::BetweenDates,
            ..Self::default()
        }
    }

    pub fn after_date() -> Self {
        Self {
            search_type: SearchType::AfterDate,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_condition_field(mut self, expr: impl Into<String>) -> Self {
        self.condition_field = Some(expr.into());
        self
    }

    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_terms_callback(mut self, callback: TermsCallback) -> Self {
        self.terms_callback = Some(callback);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_year_range(mut self, start: i32, end: i32) -> Self {
        self.year_range = Some((start, end));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show_form_field = false;
        self
    }

    pub fn no_empty(mut self) -> Self {
        self.empty = false;
        self
    }
}

/// Filter configuration for one list action, keyed by qualified field
/// name (`Entity.field`). Re-adding a name replaces the earlier entry, so
/// merged configuration stays normalized.
#[derive(Debug, Clone, Default)]
pub struct FilterSchema {
    fields: Vec<(String, FilterField)>,
    terms_conjunction: Conjunction,
}

impl FilterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: FilterField) -> Self {
        let name = name.into();
        if let Some(existing) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = field;
        } else {
            self.fields.push((name, field));
        }
        self
    }

    /// How fulltext term groups combine with each other.
    pub fn with_terms_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.terms_conjunction = conjunction;
        self
    }

    pub fn get(&self, name: &str) -> Option<&FilterField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FilterField)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn terms_conjunction(&self) -> Conjunction {
        self.terms_conjunction
    }

    /// Qualified names with a configured default, paired with the default.
    pub fn default_values(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(name, field)| {
                field
                    .default_value
                    .as_deref()
                    .map(|value| (name.as_str(), value))
            })
            .collect()
    }
}

/// Per-action schema registry for a controller.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    actions: Vec<(String, FilterSchema)>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, name: impl Into<String>, schema: FilterSchema) -> Self {
        self.actions.push((name.into(), schema));
        self
    }

    pub fn for_action(&self, name: &str) -> Option<&FilterSchema> {
        self.actions.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }
}
