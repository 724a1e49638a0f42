//! Property-based checks of the path and filter grammars, paging and the
//! in-memory provider.
//!
//! Uses proptest for generated inputs with automatic shrinking.

use proptest::prelude::*;
use scim_protocol::protocol::{CaseMode, PaginationParameters};
use scim_protocol::providers::{InMemoryProvider, Provider, RequestContext};
use scim_protocol::{AttributePath, FilterPredicate, Resource, ResourceKind, SchemaSet};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

fn attribute_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,7}".prop_filter("identifiers compare ignoring case", |name| {
        !name.eq_ignore_ascii_case("id")
    })
}

fn comparison_value() -> impl Strategy<Value = String> {
    "\\PC{0,12}"
}

prop_compose! {
    fn schema_prefix()(prefix in prop::option::of(prop::sample::select(vec![
        "urn:ietf:params:scim:schemas:core:2.0:User",
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
    ]))) -> Option<String> {
        prefix.map(str::to_string)
    }
}

prop_compose! {
    fn sub_filter()(
        predicates in prop::collection::vec((attribute_name(), comparison_value()), 1..3)
    ) -> String {
        predicates
            .iter()
            .map(|(name, value)| FilterPredicate::equals(name, value.clone()).to_string())
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

prop_compose! {
    fn attribute_path()(
        schema in schema_prefix(),
        name in attribute_name(),
        filter in prop::option::of(sub_filter()),
        sub in prop::option::of(attribute_name()),
    ) -> AttributePath {
        let mut text = String::new();
        if let Some(schema) = schema {
            text.push_str(&schema);
            text.push(':');
        }
        text.push_str(&name);
        if let Some(filter) = filter {
            text.push('[');
            text.push_str(&filter);
            text.push(']');
        }
        if let Some(sub) = sub {
            text.push('.');
            text.push_str(&sub);
        }
        AttributePath::parse(&text).unwrap()
    }
}

proptest! {
    #[test]
    fn path_display_round_trips(path in attribute_path()) {
        let reparsed = AttributePath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(&reparsed, &path);
        prop_assert_eq!(reparsed.to_string(), path.to_string());
    }

    #[test]
    fn conjunction_matches_iff_every_predicate_matches(
        attributes in prop::collection::btree_map(attribute_name(), (comparison_value(), any::<bool>()), 1..5)
    ) {
        let object: Map<String, Value> = attributes
            .iter()
            .map(|(name, (value, _))| (name.clone(), Value::String(value.clone())))
            .collect();
        let text = attributes
            .iter()
            .map(|(name, (value, hit))| {
                let compared = if *hit { value.clone() } else { format!("{}~miss", value) };
                FilterPredicate::equals(name, compared).to_string()
            })
            .collect::<Vec<_>>()
            .join(" and ");

        let filter = FilterPredicate::parse(&text).unwrap();
        prop_assert_eq!(filter.len(), attributes.len());
        let expected = attributes.values().all(|(_, hit)| *hit);
        prop_assert_eq!(filter.matches(&Value::Object(object), CaseMode::Exact).unwrap(), expected);
    }

    #[test]
    fn keyword_spelled_attributes_parse_as_paths(
        keyword in prop::sample::select(vec!["not", "NOT", "and", "or", "pr", "eq"]),
        value in comparison_value(),
    ) {
        let filter = FilterPredicate::parse(&FilterPredicate::equals(keyword, value.clone()).to_string()).unwrap();
        prop_assert_eq!(filter.attribute_path().attribute_name(), keyword);
        prop_assert_eq!(filter.comparison_value(), value.as_str());
    }

    #[test]
    fn pages_never_exceed_the_cap(
        total in 0usize..60,
        start in -5i64..80,
        count in prop::option::of(-5i64..80),
        max_results in 0usize..40,
    ) {
        let page = PaginationParameters::new(Some(start), count);
        let items: Vec<usize> = (1..=total).collect();
        let window = page.window(items, max_results);

        prop_assert!(window.len() <= max_results);
        prop_assert!(page.start_index() >= 1);
        if let Some(first) = window.first() {
            prop_assert_eq!(*first, page.start_index());
        }
    }

    #[test]
    fn schema_sets_fold_case(identifiers in prop::collection::vec("urn:[a-zA-Z]{1,4}", 0..12)) {
        let set = SchemaSet::new();
        for identifier in &identifiers {
            set.add(identifier.clone());
        }
        let distinct: BTreeSet<String> = identifiers.iter().map(|i| i.to_ascii_lowercase()).collect();
        prop_assert_eq!(set.len(), distinct.len());
        for identifier in &identifiers {
            prop_assert!(set.contains(&identifier.to_ascii_uppercase()));
        }
    }

    #[test]
    fn user_name_queries_find_exactly_one(names in prop::collection::btree_set("[a-z]{3,10}", 1..8)) {
        let provider = InMemoryProvider::default();
        let context = RequestContext::new("property");
        let found: BTreeMap<String, usize> = tokio_test::block_on(async {
            for name in &names {
                let user = Resource::from_json(json!({
                    "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                    "userName": name
                }))
                .unwrap();
                provider.create(ResourceKind::User, user, &context).await.unwrap();
            }

            let mut found = BTreeMap::new();
            for name in &names {
                let filter = FilterPredicate::equals("userName", name.clone());
                let matches = provider
                    .query(ResourceKind::User, std::slice::from_ref(&filter), &context)
                    .await
                    .unwrap();
                found.insert(name.clone(), matches.len());
            }
            found
        });

        prop_assert!(found.values().all(|count| *count == 1));
        prop_assert_eq!(found.len(), names.len());
    }
}
