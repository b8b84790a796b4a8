use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix of every filter query parameter, `Filter-Entity-field`.
pub const FILTER_PREFIX: &str = "Filter-";
/// Presence of this parameter clears the stored selection.
pub const RESET_PARAM: &str = "resetFilter";
/// Marks a URL produced by replaying a stored selection.
pub const REDIRECT_MARKER: &str = "Filterredirect";
pub const PAGE_PARAM: &str = "page";
pub const SORT_PARAM: &str = "sort";
pub const DIRECTION_PARAM: &str = "direction";
/// Default value that clears a configured default instead of filtering.
pub const ALL_SENTINEL: &str = "all";

static BRACKET_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\[\d*\]$").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Which bound of a date range a parameter addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSide {
    From,
    To,
}

impl RangeSide {
    pub fn suffix(&self) -> &'static str {
        match self {
            RangeSide::From => "_from",
            RangeSide::To => "_to",
        }
    }
}

/// A parsed `Filter-Entity-field` parameter name. Range suffixes are
/// split off so `Filter-Posts-created_from` resolves to the configured
/// field `Posts.created`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    pub entity: String,
    pub field: String,
    pub range: Option<RangeSide>,
}

impl ParamKey {
    /// Parses a query parameter name, `None` when it is not a filter
    /// parameter. Only the first dash after the prefix separates entity
    /// from field, so field names may contain dashes.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(FILTER_PREFIX)?;
        let (entity, field) = rest.split_once('-')?;
        if entity.is_empty() || field.is_empty() {
            return None;
        }
        let (field, range) = if let Some(base) = field.strip_suffix("_from") {
            (base, Some(RangeSide::From))
        } else if let Some(base) = field.strip_suffix("_to") {
            (base, Some(RangeSide::To))
        } else {
            (field, None)
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            entity: entity.to_string(),
            field: field.to_string(),
            range,
        })
    }

    /// Builds a key from a qualified `Entity.field` name.
    pub fn from_qualified(name: &str, range: Option<RangeSide>) -> Option<Self> {
        let (entity, field) = name.split_once('.')?;
        if entity.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self {
            entity: entity.to_string(),
            field: field.to_string(),
            range,
        })
    }

    /// Schema lookup key, `Entity.field` with any range suffix stripped.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.entity, self.field)
    }

    /// Field name as widgets address it, range suffix included.
    pub fn view_field(&self) -> String {
        match self.range {
            Some(side) => format!("{}{}", self.field, side.suffix()),
            None => self.field.clone(),
        }
    }

    /// Round-trips back to the query parameter name.
    pub fn param_name(&self) -> String {
        format!("{}{}-{}", FILTER_PREFIX, self.entity, self.view_field())
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.param_name())
    }
}

/// A query parameter value, scalar or repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FilterValue::Single(value) => Some(value),
            FilterValue::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[String]> {
        match self {
            FilterValue::Single(_) => None,
            FilterValue::Many(values) => Some(values),
        }
    }

    /// Scalar promoted to a one-element list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            FilterValue::Single(value) => vec![value.clone()],
            FilterValue::Many(values) => values.clone(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Single(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::Many(values)
    }
}

/// Decoded query parameters in arrival order. Bracketed keys such as
/// `Filter-Posts-multi[0]` collapse into one multi-valued entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    params: Vec<(String, FilterValue)>,
}

impl FilterInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut input = Self::default();
        for (key, value) in pairs {
            input.push_raw(key.as_ref(), value.as_ref());
        }
        input
    }

    /// Adds one raw `key=value` pair, folding legacy array notation:
    /// repeated `key[i]` members collapse into one multi-value entry.
    pub fn push_raw(&mut self, key: &str, value: &str) {
        let base = BRACKET_KEY
            .captures(key)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        match base {
            Some(base) => match self.params.iter_mut().find(|(name, _)| *name == base) {
                Some((_, FilterValue::Many(values))) => values.push(value.to_string()),
                Some(entry) => entry.1 = FilterValue::Many(vec![value.to_string()]),
                None => self
                    .params
                    .push((base, FilterValue::Many(vec![value.to_string()]))),
            },
            None => self.insert(key, FilterValue::Single(value.to_string())),
        }
    }

    /// Sets a parameter, replacing an earlier entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: FilterValue) {
        let name = name.into();
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<FilterValue> {
        let index = self.params.iter().position(|(n, _)| n == name)?;
        Some(self.params.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// True when at least one parameter names a filter field.
    pub fn has_filter_params(&self) -> bool {
        self.params.iter().any(|(name, _)| ParamKey::parse(name).is_some())
    }

    /// The filter-prefixed subset, other parameters dropped.
    pub fn filter_params(&self) -> Vec<(String, FilterValue)> {
        self.params
            .iter()
            .filter(|(name, _)| ParamKey::parse(name).is_some())
            .cloned()
            .collect()
    }
}

/// A calendar date split into the three widget values. Parts stay as the
/// literal substrings they were parsed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DateParts {
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    /// Splits `YYYY-MM-DD`, rejecting text that is not a real date.
    pub fn split(value: &str) -> Option<Self> {
        if !ISO_DATE.is_match(value) {
            return None;
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        let mut parts = value.splitn(3, '-');
        Some(Self {
            year: parts.next().unwrap_or_default().to_string(),
            month: parts.next().unwrap_or_default().to_string(),
            day: parts.next().unwrap_or_default().to_string(),
        })
    }

    /// Joins back to `YYYY-MM-DD`, zero-padding short parts.
    pub fn join(&self) -> String {
        format!("{:0>4}-{:0>2}-{:0>2}", self.year, self.month, self.day)
    }

    pub fn is_blank(&self) -> bool {
        self.year.is_empty() && self.month.is_empty() && self.day.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.year.is_empty() && !self.month.is_empty() && !self.day.is_empty()
    }
}

/// Value a form widget redisplays after derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewValue {
    Text(String),
    Many(Vec<String>),
    Date(DateParts),
}

/// Redisplay values grouped by entity then field, the shape form
/// rendering consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewValues {
    entities: BTreeMap<String, BTreeMap<String, ViewValue>>,
}

impl ViewValues {
    pub fn set(&mut self, entity: &str, field: &str, value: ViewValue) {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn get(&self, entity: &str, field: &str) -> Option<&ViewValue> {
        self.entities.get(entity)?.get(field)
    }

    /// Looks up `Entity.field`, the field part keeping any range suffix.
    pub fn get_qualified(&self, name: &str) -> Option<&ViewValue> {
        let (entity, field) = name.split_once('.')?;
        self.get(entity, field)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.values().all(BTreeMap::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &ViewValue)> {
        self.entities.iter().flat_map(|(entity, fields)| {
            fields
                .iter()
                .map(move |(field, value)| (entity.as_str(), field.as_str(), value))
        })
    }
}

/// How sibling condition groups combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Like,
    In,
    GreaterOrEqual,
    LessOrEqual,
}

impl CompareOp {
    /// Operator suffix as it appears in rendered condition keys.
    pub fn suffix(&self) -> &'static str {
        match self {
            CompareOp::Eq => "",
            CompareOp::Like => " LIKE",
            CompareOp::In => " IN",
            CompareOp::GreaterOrEqual => " >=",
            CompareOp::LessOrEqual => " <=",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Scalar(String),
    List(Vec<String>),
}

/// A node of the derived condition tree, either a single comparison or a
/// conjunction of nested nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionNode {
    Compare {
        expr: String,
        op: CompareOp,
        value: ConditionValue,
    },
    Group {
        conjunction: Conjunction,
        nodes: Vec<ConditionNode>,
    },
}

impl ConditionNode {
    pub fn scalar(expr: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        ConditionNode::Compare {
            expr: expr.into(),
            op,
            value: ConditionValue::Scalar(value.into()),
        }
    }

    pub fn list(expr: impl Into<String>, op: CompareOp, values: Vec<String>) -> Self {
        ConditionNode::Compare {
            expr: expr.into(),
            op,
            value: ConditionValue::List(values),
        }
    }

    pub fn group(conjunction: Conjunction, nodes: Vec<ConditionNode>) -> Self {
        ConditionNode::Group { conjunction, nodes }
    }
}

/// Ordered conditions keyed the way they render, e.g. `Posts.title LIKE`.
/// Re-deriving a key replaces the entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    entries: Vec<(String, ConditionNode)>,
}

impl ConditionSet {
    pub fn insert(&mut self, key: impl Into<String>, node: ConditionNode) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = node;
        } else {
            self.entries.push((key, node));
        }
    }

    /// Appends nodes into the group stored under `key`, creating it when
    /// absent. Lets several fulltext fields share one condition subtree.
    pub fn merge_group(&mut self, key: &str, conjunction: Conjunction, mut new_nodes: Vec<ConditionNode>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, ConditionNode::Group { nodes, .. })) => nodes.append(&mut new_nodes),
            Some(entry) => {
                entry.1 = ConditionNode::Group {
                    conjunction,
                    nodes: new_nodes,
                }
            }
            None => self.entries.push((
                key.to_string(),
                ConditionNode::Group {
                    conjunction,
                    nodes: new_nodes,
                },
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConditionNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionNode)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of translating request parameters against a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFilter {
    pub conditions: ConditionSet,
    pub view_values: ViewValues,
}

impl DerivedFilter {
    /// True when at least one condition was derived.
    pub fn is_active(&self) -> bool {
        !self.conditions.is_empty()
    }
}
