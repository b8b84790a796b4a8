use chrono::{Datelike, Utc};
use tracing::warn;

use listfilter_core::domain::filter::value_objects::RESET_PARAM;
use listfilter_core::domain::filter::{
    DerivedFilter, FilterField, FilterInput, FilterSchema, OptionItem, OptionSet, SearchType,
    ViewValue, ViewValues,
};
use listfilter_core::domain::selection::add_persistent_params;

/// Years offered above and below the current one when a date field
/// configures no explicit range.
const DEFAULT_YEAR_SPREAD: i32 = 20;

/// Renders the filter box for one schema as plain HTML. Widgets pre-fill
/// from the view values of the last derivation, and the box carries an
/// `opened`/`closed` class depending on whether any filter is active.
pub struct FilterFormBuilder<'a> {
    schema: &'a FilterSchema,
    view: &'a ViewValues,
    active: bool,
    action_url: String,
    title: String,
}

impl<'a> FilterFormBuilder<'a> {
    pub fn new(
        schema: &'a FilterSchema,
        derived: &'a DerivedFilter,
        action_url: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            view: &derived.view_values,
            active: derived.is_active(),
            action_url: action_url.into(),
            title: "Filter".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The whole filter box: open, every widget, close.
    pub fn render(&self) -> String {
        format!("{}{}{}", self.open(), self.widgets(), self.close())
    }

    pub fn open(&self) -> String {
        let state = if self.active { "opened" } else { "closed" };
        let toggle = if self.active { "Close" } else { "Open" };
        let mut out = format!("<div class=\"list-filter well clearfix {state}\">");
        out.push_str(&format!(
            "<div class=\"pull-left\"><h3>{}</h3></div>",
            escape_html(&self.title)
        ));
        out.push_str(&format!(
            "<div class=\"pull-right\"><a href=\"javascript:\" class=\"btn btn-xs btn-primary toggle\">{toggle}</a></div>"
        ));
        out.push_str("<hr style=\"clear:both\"/><div class=\"content\">");
        out.push_str(&format!(
            "<form method=\"post\" accept-charset=\"utf-8\" action=\"{}\">",
            escape_html(&self.action_url)
        ));
        out
    }

    pub fn close(&self) -> String {
        format!(
            "<div class=\"submit-group\"><span></span>{} {}</div></form></div></div>",
            self.submit_button("Search"),
            self.reset_link("Reset"),
        )
    }

    /// All visible widgets in schema order, two per bootstrap row.
    pub fn widgets(&self) -> String {
        let rendered: Vec<String> = self
            .schema
            .fields()
            .flat_map(|(name, _)| self.widget_parts(name))
            .collect();

        let mut out = String::from("<div class=\"row\">");
        for (i, widget) in rendered.iter().enumerate() {
            out.push_str("<div class=\"col-md-6\">");
            out.push_str(widget);
            out.push_str("</div>");
            if (i + 1) % 2 == 0 {
                out.push_str("</div><div class=\"row\">");
            }
        }
        out.push_str("</div>");
        out
    }

    /// A single widget by qualified field name, `None` for hidden fields
    /// and for names the schema does not know.
    pub fn widget(&self, name: &str) -> Option<String> {
        let parts = self.widget_parts(name);
        if parts.is_empty() { None } else { Some(parts.concat()) }
    }

    fn widget_parts(&self, name: &str) -> Vec<String> {
        let Some(field) = self.schema.get(name) else {
            warn!("No filter configured for '{}', widget skipped", name);
            return Vec::new();
        };
        if !field.show_form_field {
            return Vec::new();
        }
        let Some((entity, fname)) = name.split_once('.') else {
            warn!("Malformed filter field name '{}', widget skipped", name);
            return Vec::new();
        };
        let label = field
            .label
            .clone()
            .unwrap_or_else(|| humanize(fname));

        match field.search_type {
            SearchType::Select => vec![self.select_widget(entity, fname, field, &label)],
            SearchType::MultipleSelect => {
                vec![self.multi_select_widget(entity, fname, field, &label)]
            }
            SearchType::BetweenDates => vec![
                self.date_widget(entity, &format!("{fname}_from"), field, &format!("{label} from")),
                self.date_widget(entity, &format!("{fname}_to"), field, &format!("{label} to")),
            ],
            SearchType::AfterDate => vec![self.date_widget(entity, fname, field, &label)],
            SearchType::Wildcard | SearchType::Fulltext => {
                vec![self.text_widget(entity, fname, &label)]
            }
        }
    }

    /// The submit button markup, without surrounding form.
    pub fn submit_button(&self, label: &str) -> String {
        format!(
            "<input type=\"submit\" class=\"btn btn-primary\" value=\"{}\"/>",
            escape_html(label)
        )
    }

    /// Link clearing the stored selection via the reset parameter.
    pub fn reset_link(&self, label: &str) -> String {
        let separator = if self.action_url.contains('?') { "&amp;" } else { "?" };
        format!(
            "<a href=\"{}{separator}{RESET_PARAM}=1\" class=\"btn btn-default\">{}</a>",
            escape_html(&self.action_url),
            escape_html(label)
        )
    }

    fn text_widget(&self, entity: &str, fname: &str, label: &str) -> String {
        let id = dom_id(entity, fname);
        let value = match self.view.get(entity, fname) {
            Some(ViewValue::Text(text)) => text.as_str(),
            _ => "",
        };
        format!(
            "<div class=\"input text\"><label for=\"{id}\">{}</label>\
             <input type=\"text\" name=\"Filter[{entity}][{fname}]\" id=\"{id}\" value=\"{}\"/></div>",
            escape_html(label),
            escape_html(value),
        )
    }

    fn select_widget(&self, entity: &str, fname: &str, field: &FilterField, label: &str) -> String {
        let id = dom_id(entity, fname);
        let current = match self.view.get(entity, fname) {
            Some(ViewValue::Text(text)) => Some(text.as_str()),
            _ => None,
        };
        let options = option_list(&field.options, |value| current == Some(value), field.empty);
        format!(
            "<div class=\"input select\"><label for=\"{id}\">{}</label>\
             <select name=\"Filter[{entity}][{fname}]\" id=\"{id}\">{options}</select></div>",
            escape_html(label),
        )
    }

    fn multi_select_widget(
        &self,
        entity: &str,
        fname: &str,
        field: &FilterField,
        label: &str,
    ) -> String {
        let id = dom_id(entity, fname);
        let current: &[String] = match self.view.get(entity, fname) {
            Some(ViewValue::Many(values)) => values,
            _ => &[],
        };
        let options = option_list(
            &field.options,
            |value| current.iter().any(|v| v == value),
            field.empty,
        );
        format!(
            "<div class=\"input select\"><label for=\"{id}\">{}</label>\
             <select name=\"Filter[{entity}][{fname}][]\" id=\"{id}\" multiple=\"multiple\" class=\"select2\">{options}</select></div>",
            escape_html(label),
        )
    }

    fn date_widget(&self, entity: &str, view_field: &str, field: &FilterField, label: &str) -> String {
        let id = dom_id(entity, view_field);
        let (start, end) = field.year_range.unwrap_or_else(|| {
            let current = Utc::now().year();
            (current - DEFAULT_YEAR_SPREAD, current + DEFAULT_YEAR_SPREAD)
        });
        let parts = match self.view.get(entity, view_field) {
            Some(ViewValue::Date(parts)) => Some(parts),
            _ => None,
        };

        // Latest year first, like date widgets usually offer them.
        let years: Vec<String> = (start..=end).rev().map(|y| y.to_string()).collect();
        let months: Vec<String> = (1..=12).map(|m| format!("{m:02}")).collect();
        let days: Vec<String> = (1..=31).map(|d| format!("{d:02}")).collect();

        let base = format!("Filter[{entity}][{view_field}]");
        let selects = format!(
            "{}{}{}",
            date_select(
                &format!("{base}[year]"),
                &format!("{id}-year"),
                &years,
                parts.map(|p| p.year.as_str()),
                field.empty,
            ),
            date_select(
                &format!("{base}[month]"),
                &format!("{id}-month"),
                &months,
                parts.map(|p| p.month.as_str()),
                field.empty,
            ),
            date_select(
                &format!("{base}[day]"),
                &format!("{id}-day"),
                &days,
                parts.map(|p| p.day.as_str()),
                field.empty,
            ),
        );
        format!(
            "<div class=\"input date\"><label for=\"{id}-year\">{}</label>{selects}</div>",
            escape_html(label),
        )
    }
}

/// Button returning from a detail page to the list, with the current
/// filter and pagination parameters appended to the target URL.
pub fn back_to_list_button(label: &str, url: &str, query: &FilterInput) -> String {
    format!(
        "<a href=\"{}\" class=\"btn btn-default btn-sm\">{}</a>",
        escape_html(&add_persistent_params(url, query)),
        escape_html(label),
    )
}

fn date_select(name: &str, id: &str, values: &[String], selected: Option<&str>, empty: bool) -> String {
    let mut options = String::new();
    if empty {
        options.push_str("<option value=\"\"></option>");
    }
    for value in values {
        options.push_str(&option_tag(value, value, selected == Some(value.as_str())));
    }
    format!("<select name=\"{name}\" id=\"{id}\">{options}</select>")
}

fn option_list<F>(options: &OptionSet, selected: F, empty: bool) -> String
where
    F: Fn(&str) -> bool,
{
    let mut out = String::new();
    if empty {
        out.push_str("<option value=\"\"></option>");
    }
    for item in options.items() {
        match item {
            OptionItem::Entry { value, label } => {
                out.push_str(&option_tag(value, label, selected(value)));
            }
            OptionItem::Group { label, entries } => {
                out.push_str(&format!("<optgroup label=\"{}\">", escape_html(label)));
                for (value, text) in entries {
                    out.push_str(&option_tag(value, text, selected(value)));
                }
                out.push_str("</optgroup>");
            }
        }
    }
    out
}

fn option_tag(value: &str, label: &str, selected: bool) -> String {
    if selected {
        format!(
            "<option value=\"{}\" selected=\"selected\">{}</option>",
            escape_html(value),
            escape_html(label),
        )
    } else {
        format!("<option value=\"{}\">{}</option>", escape_html(value), escape_html(label))
    }
}

/// Widget element id, `filter-posts-author-id` style.
fn dom_id(entity: &str, field: &str) -> String {
    format!("filter-{}-{}", dasherize(entity), dasherize(field))
}

fn dasherize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for (i, c) in text.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

/// Default widget label from a field name, `author_id` to `Author Id`.
fn humanize(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
