use tracing::debug;

use crate::domain::filter::entities::{FilterField, FilterSchema, SearchType, Term};
use crate::domain::filter::value_objects::{
    ALL_SENTINEL, CompareOp, ConditionNode, Conjunction, DateParts, DerivedFilter, FilterInput, FilterValue, ParamKey,
    RangeSide, ViewValue,
};

/// Translates request parameters into a condition tree and the values the
/// form redisplays. Unknown fields, out-of-vocabulary values and malformed
/// input are skipped, never errors, so stale or hand-edited URLs degrade to
/// a weaker filter instead of breaking the page.
pub fn derive_conditions(schema: &FilterSchema, input: &FilterInput) -> DerivedFilter {
    let mut derived = DerivedFilter::default();

    for (name, value) in input.iter() {
        let Some(key) = ParamKey::parse(name) else {
            continue;
        };
        let qualified = key.qualified();
        let Some(field) = schema.get(&qualified) else {
            debug!("No filter configured for '{}', skipping", name);
            continue;
        };

        if field.search_type == SearchType::MultipleSelect {
            derive_multiple_select(&key, field, &qualified, value, &mut derived);
            continue;
        }

        let Some(raw) = value.as_single() else {
            continue;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Closed vocabularies reject unknown values outright.
        if !field.options.is_empty() && !field.options.contains_value(trimmed) {
            debug!("Value '{}' for '{}' is outside the configured options, skipping", trimmed, name);
            continue;
        }

        let expr = field
            .condition_field
            .clone()
            .unwrap_or_else(|| qualified.clone());

        match field.search_type {
            SearchType::Wildcard => {
                let pattern = format!("%{trimmed}%").replace('*', "%");
                derived.conditions.insert(
                    format!("{expr}{}", CompareOp::Like.suffix()),
                    ConditionNode::scalar(&expr, CompareOp::Like, pattern),
                );
                derived
                    .view_values
                    .set(&key.entity, &key.view_field(), ViewValue::Text(trimmed.to_string()));
            }
            SearchType::Select => {
                derived
                    .conditions
                    .insert(expr.clone(), ConditionNode::scalar(&expr, CompareOp::Eq, trimmed));
                derived
                    .view_values
                    .set(&key.entity, &key.view_field(), ViewValue::Text(trimmed.to_string()));
            }
            SearchType::BetweenDates => {
                let Some(side) = key.range else {
                    continue;
                };
                let Some(parts) = DateParts::split(trimmed) else {
                    debug!("'{}' is not a valid date for '{}', skipping", trimmed, name);
                    continue;
                };
                let op = match side {
                    RangeSide::From => CompareOp::GreaterOrEqual,
                    RangeSide::To => CompareOp::LessOrEqual,
                };
                let base = field
                    .condition_field
                    .clone()
                    .unwrap_or_else(|| format!("DATE({qualified})"));
                derived.conditions.insert(
                    format!("{base}{}", op.suffix()),
                    ConditionNode::scalar(&base, op, trimmed),
                );
                derived
                    .view_values
                    .set(&key.entity, &key.view_field(), ViewValue::Date(parts));
            }
            SearchType::AfterDate => {
                derived.conditions.insert(
                    format!("{expr}{}", CompareOp::GreaterOrEqual.suffix()),
                    ConditionNode::scalar(&expr, CompareOp::GreaterOrEqual, trimmed),
                );
                let view = match DateParts::split(trimmed) {
                    Some(parts) => ViewValue::Date(parts),
                    None => ViewValue::Text(trimmed.to_string()),
                };
                derived.view_values.set(&key.entity, &key.view_field(), view);
            }
            SearchType::Fulltext => {
                let groups = fulltext_groups(field, &expr, trimmed);
                if !groups.is_empty() {
                    derived
                        .conditions
                        .merge_group(&qualified, schema.terms_conjunction(), groups);
                }
                derived
                    .view_values
                    .set(&key.entity, &key.view_field(), ViewValue::Text(trimmed.to_string()));
            }
            SearchType::MultipleSelect => {}
        }
    }

    derived
}

/// Intersects the submitted values with the configured vocabulary, keeping
/// submission order. Invalid entries are dropped one by one, not the whole
/// field.
fn derive_multiple_select(
    key: &ParamKey,
    field: &FilterField,
    qualified: &str,
    value: &FilterValue,
    derived: &mut DerivedFilter,
) {
    let submitted = value.to_list();
    let valid: Vec<String> = if field.options.is_empty() {
        submitted
    } else {
        submitted
            .into_iter()
            .filter(|v| field.options.contains_value(v))
            .collect()
    };
    if valid.is_empty() {
        return;
    }

    let expr = field
        .condition_field
        .clone()
        .unwrap_or_else(|| qualified.to_string());
    derived.conditions.insert(
        format!("{expr}{}", CompareOp::In.suffix()),
        ConditionNode::list(&expr, CompareOp::In, valid.clone()),
    );
    derived
        .view_values
        .set(&key.entity, &key.view_field(), ViewValue::Many(valid));
}

/// One OR-group per search term, each matching any of the search columns.
/// A terms callback may rewrite the token list and expand single tokens
/// into alternatives.
fn fulltext_groups(field: &FilterField, expr: &str, phrase: &str) -> Vec<ConditionNode> {
    let tokens: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
    let terms: Vec<Term> = match field.terms_callback.as_deref() {
        Some(callback) => callback(tokens),
        None => tokens.into_iter().map(Term::One).collect(),
    };

    let search_fields: Vec<&str> = if field.search_fields.is_empty() {
        vec![expr]
    } else {
        field.search_fields.iter().map(String::as_str).collect()
    };

    terms
        .iter()
        .map(|term| {
            let likes: Vec<ConditionNode> = term
                .alternatives()
                .iter()
                .flat_map(|alt| {
                    search_fields
                        .iter()
                        .map(move |sf| ConditionNode::scalar(*sf, CompareOp::Like, format!("%{alt}%")))
                })
                .collect();
            ConditionNode::group(Conjunction::Or, likes)
        })
        .collect()
}

/// Inserts configured defaults for fields the request does not mention.
/// Passing the sentinel `"all"` for a defaulted field clears it, so the
/// unfiltered list stays reachable.
pub fn apply_default_filters(schema: &FilterSchema, input: &mut FilterInput) {
    for (name, default) in schema.default_values() {
        let Some(key) = ParamKey::from_qualified(name, None) else {
            continue;
        };
        let param = key.param_name();
        match input.get(&param) {
            Some(FilterValue::Single(value)) if value == ALL_SENTINEL => {
                input.remove(&param);
            }
            Some(_) => {}
            None => input.insert(param, FilterValue::Single(default.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::filter::entities::OptionSet;
    use crate::domain::filter::value_objects::ConditionValue;

    fn like(expr: &str, pattern: &str) -> ConditionNode {
        ConditionNode::scalar(expr, CompareOp::Like, pattern)
    }

    #[test]
    fn test_wildcard_fields_derive_like_conditions() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field("Posts.body", FilterField::wildcard());
        let input = FilterInput::from_pairs([("Filter-Posts-title", "foo"), ("Filter-Posts-body", "bar")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(derived.conditions.get("Posts.title LIKE"), Some(&like("Posts.title", "%foo%")));
        assert_eq!(derived.conditions.get("Posts.body LIKE"), Some(&like("Posts.body", "%bar%")));
        assert!(derived.is_active());
        assert_eq!(
            derived.view_values.get("Posts", "title"),
            Some(&ViewValue::Text("foo".into()))
        );
    }

    #[test]
    fn test_wildcard_translates_asterisks_and_trims() {
        let schema = FilterSchema::new().field("Posts.title", FilterField::wildcard());
        let input = FilterInput::from_pairs([("Filter-Posts-title", "  foo*bar ")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Posts.title LIKE"),
            Some(&like("Posts.title", "%foo%bar%"))
        );
        assert_eq!(
            derived.view_values.get("Posts", "title"),
            Some(&ViewValue::Text("foo*bar".into()))
        );
    }

    #[test]
    fn test_all_search_types_translate() {
        let schema = FilterSchema::new()
            .field("Comments.comment", FilterField::wildcard())
            .field(
                "Comments.author_id",
                FilterField::select(OptionSet::new().entry("1", "John Doe").entry("2", "Max Example")),
            )
            .field("Comments.created", FilterField::between_dates())
            .field(
                "Posts.multi",
                FilterField::multiple_select(OptionSet::new().entry("1", "one").entry("2", "two")),
            )
            .field(
                "Comments.post_id_optgroup",
                FilterField::select(
                    OptionSet::new()
                        .group("group1", &[("1", "one"), ("2", "two")])
                        .group("group2", &[("3", "three"), ("4", "four")]),
                ),
            );
        let input = FilterInput::from_pairs([
            ("Filter-Comments-comment", "foo"),
            ("Filter-Comments-author_id", "1"),
            ("Filter-Comments-created_from", "2015-01-01"),
            ("Filter-Comments-created_to", "2015-01-31"),
            ("Filter-Posts-multi[0]", "1"),
            ("Filter-Posts-multi[1]", "2"),
            ("Filter-Comments-post_id_optgroup", "3"),
        ]);

        let derived = derive_conditions(&schema, &input);

        let keys: Vec<&str> = derived.conditions.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "Comments.comment LIKE",
                "Comments.author_id",
                "DATE(Comments.created) >=",
                "DATE(Comments.created) <=",
                "Posts.multi IN",
                "Comments.post_id_optgroup",
            ]
        );
        assert_eq!(
            derived.conditions.get("Comments.author_id"),
            Some(&ConditionNode::scalar("Comments.author_id", CompareOp::Eq, "1"))
        );
        assert_eq!(
            derived.conditions.get("DATE(Comments.created) >="),
            Some(&ConditionNode::scalar(
                "DATE(Comments.created)",
                CompareOp::GreaterOrEqual,
                "2015-01-01"
            ))
        );
        assert_eq!(
            derived.conditions.get("Posts.multi IN"),
            Some(&ConditionNode::list("Posts.multi", CompareOp::In, vec!["1".into(), "2".into()]))
        );

        // Values the form pre-fills with, dates decomposed for the widgets.
        assert_eq!(
            derived.view_values.get("Comments", "comment"),
            Some(&ViewValue::Text("foo".into()))
        );
        assert_eq!(
            derived.view_values.get("Comments", "created_from"),
            Some(&ViewValue::Date(DateParts::new("2015", "01", "01")))
        );
        assert_eq!(
            derived.view_values.get("Comments", "created_to"),
            Some(&ViewValue::Date(DateParts::new("2015", "01", "31")))
        );
        assert_eq!(
            derived.view_values.get("Posts", "multi"),
            Some(&ViewValue::Many(vec!["1".into(), "2".into()]))
        );
    }

    #[test]
    fn test_fulltext_single_field_builds_or_groups_per_term() {
        let schema = FilterSchema::new().field("Comments.comment", FilterField::fulltext());
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "term1 term2")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Comments.comment"),
            Some(&ConditionNode::group(
                Conjunction::And,
                vec![
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term1%")]),
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term2%")]),
                ]
            ))
        );
        assert_eq!(
            derived.view_values.get("Comments", "comment"),
            Some(&ViewValue::Text("term1 term2".into()))
        );
    }

    #[test]
    fn test_fulltext_terms_callback_rewrites_tokens() {
        let schema = FilterSchema::new().field(
            "Comments.comment",
            FilterField::fulltext().with_terms_callback(Arc::new(|mut terms| {
                terms.push("term3".to_string());
                terms.into_iter().map(Term::One).collect()
            })),
        );
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "term1 term2")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Comments.comment"),
            Some(&ConditionNode::group(
                Conjunction::And,
                vec![
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term1%")]),
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term2%")]),
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term3%")]),
                ]
            ))
        );
    }

    #[test]
    fn test_fulltext_callback_alternatives_share_one_group() {
        let schema = FilterSchema::new().field(
            "Comments.comment",
            FilterField::fulltext()
                .with_terms_callback(Arc::new(|_| vec![Term::AnyOf(vec!["term1".into(), "synonym1".into()])])),
        );
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "term1")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Comments.comment"),
            Some(&ConditionNode::group(
                Conjunction::And,
                vec![ConditionNode::group(
                    Conjunction::Or,
                    vec![like("Comments.comment", "%term1%"), like("Comments.comment", "%synonym1%")]
                )]
            ))
        );
    }

    #[test]
    fn test_fulltext_multiple_search_fields() {
        let schema = FilterSchema::new().field(
            "Comments.comment",
            FilterField::fulltext().with_search_fields(&["Comments.comment", "Comments.note"]),
        );
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "term1 term2")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Comments.comment"),
            Some(&ConditionNode::group(
                Conjunction::And,
                vec![
                    ConditionNode::group(
                        Conjunction::Or,
                        vec![like("Comments.comment", "%term1%"), like("Comments.note", "%term1%")]
                    ),
                    ConditionNode::group(
                        Conjunction::Or,
                        vec![like("Comments.comment", "%term2%"), like("Comments.note", "%term2%")]
                    ),
                ]
            ))
        );
    }

    #[test]
    fn test_fulltext_or_conjunction_combines_term_groups() {
        let schema = FilterSchema::new()
            .field(
                "Comments.comment",
                FilterField::fulltext().with_search_fields(&["Comments.comment", "Comments.note"]),
            )
            .with_terms_conjunction(Conjunction::Or);
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "term1 term2")]);

        let derived = derive_conditions(&schema, &input);

        match derived.conditions.get("Comments.comment") {
            Some(ConditionNode::Group { conjunction, nodes }) => {
                assert_eq!(*conjunction, Conjunction::Or);
                assert_eq!(nodes.len(), 2);
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_fulltext_does_not_clobber_sibling_conditions() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field("Comments.comment", FilterField::fulltext());
        let input = FilterInput::from_pairs([
            ("Filter-Posts-title", "foo"),
            ("Filter-Comments-comment", "term1"),
        ]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(derived.conditions.len(), 2);
        assert!(derived.conditions.get("Posts.title LIKE").is_some());
        assert!(derived.conditions.get("Comments.comment").is_some());
    }

    #[test]
    fn test_fulltext_lowercases_tokens() {
        let schema = FilterSchema::new().field("Comments.comment", FilterField::fulltext());
        let input = FilterInput::from_pairs([("Filter-Comments-comment", "Term1 TERM2")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Comments.comment"),
            Some(&ConditionNode::group(
                Conjunction::And,
                vec![
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term1%")]),
                    ConditionNode::group(Conjunction::Or, vec![like("Comments.comment", "%term2%")]),
                ]
            ))
        );
        // The redisplayed phrase keeps its casing.
        assert_eq!(
            derived.view_values.get("Comments", "comment"),
            Some(&ViewValue::Text("Term1 TERM2".into()))
        );
    }

    #[test]
    fn test_unknown_and_invalid_values_are_skipped() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field(
                "Posts.author_id",
                FilterField::select(OptionSet::new().entry("valid", "valid")),
            )
            .field(
                "Posts.multi",
                FilterField::multiple_select(OptionSet::new().entry("valid1", "valid1").entry("valid2", "valid2")),
            );
        let input = FilterInput::from_pairs([
            ("Filter-Posts-title", "foo"),
            // body is not configured at all
            ("Filter-Posts-body", "bar"),
            ("Filter-Posts-author_id", "invalid"),
            ("Filter-Posts-multi[0]", "valid1"),
            ("Filter-Posts-multi[1]", "invalid"),
        ]);

        let derived = derive_conditions(&schema, &input);

        let keys: Vec<&str> = derived.conditions.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Posts.title LIKE", "Posts.multi IN"]);
        assert_eq!(
            derived.conditions.get("Posts.multi IN"),
            Some(&ConditionNode::list("Posts.multi", CompareOp::In, vec!["valid1".into()]))
        );
        assert!(derived.view_values.get("Posts", "author_id").is_none());
    }

    #[test]
    fn test_empty_values_are_skipped_but_zero_is_kept() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field("Posts.rating", FilterField::wildcard());
        let input = FilterInput::from_pairs([("Filter-Posts-title", "   "), ("Filter-Posts-rating", "0")]);

        let derived = derive_conditions(&schema, &input);

        assert!(derived.conditions.get("Posts.title LIKE").is_none());
        assert_eq!(
            derived.conditions.get("Posts.rating LIKE"),
            Some(&like("Posts.rating", "%0%"))
        );
    }

    #[test]
    fn test_multiselect_dropped_entirely_when_nothing_valid() {
        let schema = FilterSchema::new().field(
            "Posts.multi",
            FilterField::multiple_select(OptionSet::new().entry("1", "one")),
        );
        let input = FilterInput::from_pairs([("Filter-Posts-multi[0]", "9"), ("Filter-Posts-multi[1]", "8")]);

        let derived = derive_conditions(&schema, &input);

        assert!(!derived.is_active());
        assert!(derived.view_values.get("Posts", "multi").is_none());
    }

    #[test]
    fn test_multiselect_accepts_scalar_value() {
        let schema = FilterSchema::new().field(
            "Posts.multi",
            FilterField::multiple_select(OptionSet::new().entry("1", "one").entry("2", "two")),
        );
        let input = FilterInput::from_pairs([("Filter-Posts-multi", "2")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Posts.multi IN"),
            Some(&ConditionNode::list("Posts.multi", CompareOp::In, vec!["2".into()]))
        );
    }

    #[test]
    fn test_condition_field_overrides_expression() {
        let schema = FilterSchema::new()
            .field(
                "Posts.title",
                FilterField::wildcard().with_condition_field("Posts.title_normalized"),
            )
            .field(
                "Comments.created",
                FilterField::between_dates().with_condition_field("Comments.created_date"),
            );
        let input = FilterInput::from_pairs([
            ("Filter-Posts-title", "foo"),
            ("Filter-Comments-created_from", "2015-01-01"),
        ]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Posts.title_normalized LIKE"),
            Some(&like("Posts.title_normalized", "%foo%"))
        );
        // An explicit condition field replaces the DATE() wrapper.
        assert_eq!(
            derived.conditions.get("Comments.created_date >="),
            Some(&ConditionNode::scalar(
                "Comments.created_date",
                CompareOp::GreaterOrEqual,
                "2015-01-01"
            ))
        );
    }

    #[test]
    fn test_between_dates_rejects_invalid_dates_and_bare_params() {
        let schema = FilterSchema::new().field("Comments.created", FilterField::between_dates());
        let input = FilterInput::from_pairs([
            ("Filter-Comments-created_from", "2015-13-01"),
            ("Filter-Comments-created_to", "junk"),
            ("Filter-Comments-created", "2015-01-01"),
        ]);

        let derived = derive_conditions(&schema, &input);

        assert!(!derived.is_active());
        assert!(derived.view_values.is_empty());
    }

    #[test]
    fn test_after_date_keeps_raw_value_in_condition() {
        let schema = FilterSchema::new().field("Posts.published", FilterField::after_date());
        let input = FilterInput::from_pairs([("Filter-Posts-published", "2015-06-01")]);

        let derived = derive_conditions(&schema, &input);

        assert_eq!(
            derived.conditions.get("Posts.published >="),
            Some(&ConditionNode::scalar("Posts.published", CompareOp::GreaterOrEqual, "2015-06-01"))
        );
        assert_eq!(
            derived.view_values.get("Posts", "published"),
            Some(&ViewValue::Date(DateParts::new("2015", "06", "01")))
        );
    }

    #[test]
    fn test_deriving_twice_yields_identical_results() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field("Comments.comment", FilterField::fulltext());
        let input = FilterInput::from_pairs([
            ("Filter-Posts-title", "foo"),
            ("Filter-Comments-comment", "term1 term2"),
        ]);

        assert_eq!(derive_conditions(&schema, &input), derive_conditions(&schema, &input));
    }

    #[test]
    fn test_pagination_params_derive_nothing() {
        let schema = FilterSchema::new().field("Posts.title", FilterField::wildcard());
        let input = FilterInput::from_pairs([("page", "2"), ("sort", "title"), ("direction", "asc")]);

        let derived = derive_conditions(&schema, &input);

        assert!(!derived.is_active());
    }

    #[test]
    fn test_defaults_fill_missing_params_only() {
        let schema = FilterSchema::new()
            .field("Posts.title", FilterField::wildcard())
            .field(
                "Posts.status",
                FilterField::select(OptionSet::new().entry("1", "Active").entry("2", "Inactive")).with_default("1"),
            );

        let mut untouched = FilterInput::from_pairs([("Filter-Posts-status", "2")]);
        apply_default_filters(&schema, &mut untouched);
        assert_eq!(
            untouched.get("Filter-Posts-status"),
            Some(&FilterValue::Single("2".into()))
        );

        let mut filled = FilterInput::from_pairs([("Filter-Posts-title", "foo")]);
        apply_default_filters(&schema, &mut filled);
        assert_eq!(
            filled.get("Filter-Posts-status"),
            Some(&FilterValue::Single("1".into()))
        );
    }

    #[test]
    fn test_all_sentinel_clears_default() {
        let schema = FilterSchema::new().field(
            "Posts.status",
            FilterField::select(OptionSet::new().entry("1", "Active")).with_default("1"),
        );

        let mut input = FilterInput::from_pairs([("Filter-Posts-status", "all")]);
        apply_default_filters(&schema, &mut input);

        assert!(input.get("Filter-Posts-status").is_none());
        assert!(!derive_conditions(&schema, &input).is_active());
    }

    #[test]
    fn test_derived_values_survive_condition_value_inspection() {
        let schema = FilterSchema::new().field(
            "Posts.multi",
            FilterField::multiple_select(OptionSet::new().entry("1", "one").entry("2", "two")),
        );
        let input = FilterInput::from_pairs([("Filter-Posts-multi[0]", "1"), ("Filter-Posts-multi[1]", "2")]);

        let derived = derive_conditions(&schema, &input);

        match derived.conditions.get("Posts.multi IN") {
            Some(ConditionNode::Compare { value: ConditionValue::List(values), .. }) => {
                assert_eq!(values, &vec!["1".to_string(), "2".to_string()]);
            }
            other => panic!("expected IN list, got {other:?}"),
        }
    }
}
