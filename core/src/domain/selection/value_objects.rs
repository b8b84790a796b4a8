use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::filter::value_objects::{DateParts, FilterInput, FilterValue};

static POSTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Filter\[([^\]]+)\]\[([^\]]+)\](?:\[([^\]]*)\])?$").unwrap());

/// Plugin name used in store keys for routes outside any plugin.
pub const NO_PLUGIN: &str = "App";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// A submitted form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostedValue {
    Text(String),
    Many(Vec<String>),
    Date(DateParts),
}

/// The nested `Filter[Entity][field]` body of a submitted filter form.
/// Date widgets arrive as separate `[year]`, `[month]` and `[day]` keys
/// and are folded back into one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostedForm {
    entities: Vec<(String, Vec<(String, PostedValue)>)>,
}

impl PostedForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes raw body pairs. Keys outside the `Filter[...]` shape and
    /// malformed sub-keys are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            if let Some(caps) = POSTED_KEY.captures(key.as_ref())
                && let (Some(entity), Some(field)) = (caps.get(1), caps.get(2))
            {
                let sub = caps.get(3).map(|m| m.as_str());
                form.apply_raw(entity.as_str(), field.as_str(), sub, value.as_ref());
            }
        }
        form
    }

    fn apply_raw(&mut self, entity: &str, field: &str, sub: Option<&str>, value: &str) {
        match sub {
            None => self.set(entity, field, PostedValue::Text(value.to_string())),
            Some(index) if index.is_empty() || index.chars().all(|c| c.is_ascii_digit()) => {
                self.push_multi(entity, field, value);
            }
            Some(part @ ("year" | "month" | "day")) => self.set_date_part(entity, field, part, value),
            Some(_) => {}
        }
    }

    pub fn set(&mut self, entity: &str, field: &str, value: PostedValue) {
        let fields = self.entity_mut(entity);
        if let Some(entry) = fields.iter_mut().find(|(name, _)| name == field) {
            entry.1 = value;
        } else {
            fields.push((field.to_string(), value));
        }
    }

    pub fn set_text(&mut self, entity: &str, field: &str, value: impl Into<String>) {
        self.set(entity, field, PostedValue::Text(value.into()));
    }

    pub fn set_date(&mut self, entity: &str, field: &str, parts: DateParts) {
        self.set(entity, field, PostedValue::Date(parts));
    }

    pub fn push_multi(&mut self, entity: &str, field: &str, value: &str) {
        let fields = self.entity_mut(entity);
        match fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, PostedValue::Many(values))) => values.push(value.to_string()),
            Some(entry) => entry.1 = PostedValue::Many(vec![value.to_string()]),
            None => fields.push((field.to_string(), PostedValue::Many(vec![value.to_string()]))),
        }
    }

    fn set_date_part(&mut self, entity: &str, field: &str, part: &str, value: &str) {
        let fields = self.entity_mut(entity);
        let index = match fields.iter().position(|(name, _)| name == field) {
            Some(index) => index,
            None => {
                fields.push((field.to_string(), PostedValue::Date(DateParts::default())));
                fields.len() - 1
            }
        };
        if !matches!(fields[index].1, PostedValue::Date(_)) {
            fields[index].1 = PostedValue::Date(DateParts::default());
        }
        if let PostedValue::Date(parts) = &mut fields[index].1 {
            match part {
                "year" => parts.year = value.to_string(),
                "month" => parts.month = value.to_string(),
                _ => parts.day = value.to_string(),
            }
        }
    }

    fn entity_mut(&mut self, entity: &str) -> &mut Vec<(String, PostedValue)> {
        let index = match self.entities.iter().position(|(name, _)| name == entity) {
            Some(index) => index,
            None => {
                self.entities.push((entity.to_string(), Vec::new()));
                self.entities.len() - 1
            }
        };
        &mut self.entities[index].1
    }

    pub fn get(&self, entity: &str, field: &str) -> Option<&PostedValue> {
        self.entities
            .iter()
            .find(|(name, _)| name == entity)?
            .1
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.iter().all(|(_, fields)| fields.is_empty())
    }

    /// Rewrites the form values as `Filter-Entity-field` query parameters.
    /// Blank texts, incomplete dates and empty lists drop out, so an empty
    /// submission yields no parameters at all.
    pub fn to_query_params(&self) -> Vec<(String, FilterValue)> {
        let mut params = Vec::new();
        for (entity, fields) in &self.entities {
            for (field, value) in fields {
                let name = format!("Filter-{entity}-{field}");
                match value {
                    PostedValue::Text(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            params.push((name, FilterValue::Single(trimmed.to_string())));
                        }
                    }
                    PostedValue::Date(parts) => {
                        if parts.is_complete() {
                            params.push((name, FilterValue::Single(parts.join())));
                        }
                    }
                    PostedValue::Many(values) => {
                        let kept: Vec<String> = values
                            .iter()
                            .filter(|v| !v.trim().is_empty())
                            .cloned()
                            .collect();
                        if !kept.is_empty() {
                            params.push((name, FilterValue::Many(kept)));
                        }
                    }
                }
            }
        }
        params
    }
}

/// Everything the selection flow needs to know about one request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: HttpMethod,
    pub path: String,
    pub plugin: Option<String>,
    pub controller: String,
    pub action: String,
    pub query: FilterInput,
    pub posted: Option<PostedForm>,
}

impl RequestSnapshot {
    pub fn get(
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
        query: FilterInput,
    ) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            plugin: None,
            controller: controller.into(),
            action: action.into(),
            query,
            posted: None,
        }
    }

    pub fn post(
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
        query: FilterInput,
        posted: PostedForm,
    ) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            plugin: None,
            controller: controller.into(),
            action: action.into(),
            query,
            posted: Some(posted),
        }
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }
}

/// Store key of a persisted selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub namespace: String,
    pub plugin: String,
    pub controller: String,
    pub action: String,
}

impl SelectionKey {
    pub fn new(namespace: &str, plugin: Option<&str>, controller: &str, action: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            plugin: plugin.unwrap_or(NO_PLUGIN).to_string(),
            controller: controller.to_string(),
            action: action.to_string(),
        }
    }

    pub fn dotted(&self) -> String {
        format!("{}.{}.{}.{}", self.namespace, self.plugin, self.controller, self.action)
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// What the caller must do with the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowDecision {
    /// Issue an HTTP redirect to this URL.
    Redirect(String),
    /// Render the list, deriving conditions from the query.
    Proceed,
}

/// Which stores a submitted selection is written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistConfig {
    pub session: bool,
    pub cookie: bool,
}

impl PersistConfig {
    pub fn enabled(&self) -> bool {
        self.session || self.cookie
    }
}
